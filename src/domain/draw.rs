//! Draw semantics: input coercion and the shared draw list.
//!
//! Everything here is pure apart from the caller-supplied random source,
//! so the coordinator can be tested with a seeded `StdRng`.

use rand::Rng;

use super::error::DrawError;

/// Lower bound applied to both ends of a numeric draw
pub const NUMBER_FLOOR: i64 = -1_000_000;

/// Upper bound applied to both ends of a numeric draw
pub const NUMBER_CEILING: i64 = 1_000_000;

/// Default lower bound when a numeric draw omits `min`
pub const DEFAULT_MIN: i64 = 1;

/// Default upper bound when a numeric draw omits `max`
pub const DEFAULT_MAX: i64 = 100;

/// Maximum number of raw entries considered by `set_list`
pub const MAX_LIST_ITEMS: usize = 200;

pub const HEADS: &str = "Heads";
pub const TAILS: &str = "Tails";

/// Clamp a numeric bound into [`NUMBER_FLOOR`, `NUMBER_CEILING`].
///
/// `None` stands for non-numeric input and maps to the floor, as do
/// non-finite values. Fractions are truncated toward zero.
pub fn clamp_bound(raw: Option<f64>) -> i64 {
    match raw {
        Some(value) if value.is_finite() => {
            (value.trunc() as i64).clamp(NUMBER_FLOOR, NUMBER_CEILING)
        }
        _ => NUMBER_FLOOR,
    }
}

/// Validated inclusive range for a numeric draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberRange {
    min: i64,
    max: i64,
}

impl NumberRange {
    /// Build a range from already clamped bounds.
    ///
    /// # Errors
    ///
    /// Returns `DrawError::InvertedRange` when `min > max`.
    pub fn new(min: i64, max: i64) -> Result<Self, DrawError> {
        if min > max {
            return Err(DrawError::InvertedRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Uniform integer in `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        rng.gen_range(self.min..=self.max)
    }
}

/// Single independent coin flip.
pub fn flip_coin<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    if rng.gen_bool(0.5) { HEADS } else { TAILS }
}

/// Sanitize a `set_list` payload.
///
/// Looks at the first [`MAX_LIST_ITEMS`] raw entries, keeps the string ones
/// (`Some`), trims them and drops whatever is empty afterwards.
///
/// # Errors
///
/// Returns `DrawError::EmptyList` if nothing survives.
pub fn sanitize_items<'a, I>(raw: I) -> Result<Vec<String>, DrawError>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let items: Vec<String> = raw
        .into_iter()
        .take(MAX_LIST_ITEMS)
        .flatten()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();

    if items.is_empty() {
        return Err(DrawError::EmptyList);
    }
    Ok(items)
}

/// The room's shared item pool.
///
/// When `with_replacement` is false, `drawn.len() + remaining.len()` always
/// equals `items.len()` and every index in `remaining` is below `items.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawList {
    items: Vec<String>,
    with_replacement: bool,
    drawn: Vec<String>,
    remaining: Vec<usize>,
}

/// Outcome of drawing from a [`DrawList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDraw {
    pub item: String,
    /// Whether the list state changed (without-replacement draws only)
    pub consumed: bool,
}

impl DrawList {
    /// Create a fresh list with empty drawn history and every index remaining.
    ///
    /// # Errors
    ///
    /// Returns `DrawError::EmptyList` if `items` is empty.
    pub fn new(items: Vec<String>, with_replacement: bool) -> Result<Self, DrawError> {
        if items.is_empty() {
            return Err(DrawError::EmptyList);
        }
        let remaining = (0..items.len()).collect();
        Ok(Self {
            items,
            with_replacement,
            drawn: Vec::new(),
            remaining,
        })
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn with_replacement(&self) -> bool {
        self.with_replacement
    }

    /// Drawn history as clients see it: always empty in with-replacement mode.
    pub fn visible_drawn(&self) -> &[String] {
        if self.with_replacement {
            &[]
        } else {
            &self.drawn
        }
    }

    pub fn remaining_indices(&self) -> &[usize] {
        &self.remaining
    }

    /// Draw one item.
    ///
    /// With replacement the item is picked from the full list and nothing
    /// changes. Without replacement a random remaining index is removed and
    /// its item appended to the drawn history.
    ///
    /// # Errors
    ///
    /// Returns `DrawError::Exhausted` when no index remains.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<ListDraw, DrawError> {
        if self.with_replacement {
            let index = rng.gen_range(0..self.items.len());
            return Ok(ListDraw {
                item: self.items[index].clone(),
                consumed: false,
            });
        }

        if self.remaining.is_empty() {
            return Err(DrawError::Exhausted);
        }
        let slot = rng.gen_range(0..self.remaining.len());
        let index = self.remaining.swap_remove(slot);
        let item = self.items[index].clone();
        self.drawn.push(item.clone());
        Ok(ListDraw {
            item,
            consumed: true,
        })
    }
}
