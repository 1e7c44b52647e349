//! Core domain models for the draw room.

use std::collections::VecDeque;

use rand::Rng;

use super::{
    draw::{DrawList, NumberRange, flip_coin},
    error::DrawError,
    value_object::{DisplayName, DrawMode, RoomId, SessionId, Timestamp},
};

/// Default number of activity log entries kept per room
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Represents a draw room with its sessions, draw list and history
#[derive(Debug, Clone)]
pub struct Room {
    /// Room identifier
    pub id: RoomId,
    /// Timestamp when the room was created
    pub created_at: Timestamp,
    /// Attached sessions in attach order
    sessions: Vec<Session>,
    draw_list: Option<DrawList>,
    last_result: Option<DrawResult>,
    activity_log: VecDeque<LogEntry>,
    log_capacity: usize,
    next_log_id: u64,
    draws_performed: u64,
}

/// A draw requested by a session, with bounds already clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawRequest {
    Coin,
    Number { min: i64, max: i64 },
    List,
}

impl DrawRequest {
    pub fn mode(&self) -> DrawMode {
        match self {
            Self::Coin => DrawMode::Coin,
            Self::Number { .. } => DrawMode::Number,
            Self::List => DrawMode::List,
        }
    }
}

/// A validated request from one session, ready to be applied to a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    Ping,
    Rename(DisplayName),
    /// Sanitized list, or the reason it was rejected
    SetList(Result<DrawList, DrawError>),
    Draw(DrawRequest),
}

/// Result of a successful draw together with what else changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawOutcome {
    pub result: DrawResult,
    /// True when a without-replacement draw consumed an item
    pub list_changed: bool,
}

impl Room {
    /// Create a new empty room with the given ID and creation timestamp
    pub fn new(id: RoomId, created_at: Timestamp) -> Self {
        Self::with_log_capacity(id, created_at, DEFAULT_LOG_CAPACITY)
    }

    /// Create a new empty room keeping at most `log_capacity` log entries
    pub fn with_log_capacity(id: RoomId, created_at: Timestamp, log_capacity: usize) -> Self {
        Self {
            id,
            created_at,
            sessions: Vec::new(),
            draw_list: None,
            last_result: None,
            activity_log: VecDeque::new(),
            log_capacity,
            next_log_id: 1,
            draws_performed: 0,
        }
    }

    pub fn add_session(&mut self, session: Session) {
        self.sessions.push(session);
    }

    /// Remove a session by ID, returning it if it was attached
    pub fn remove_session(&mut self, session_id: &SessionId) -> Option<Session> {
        let position = self.sessions.iter().position(|s| &s.id == session_id)?;
        Some(self.sessions.remove(position))
    }

    /// Rename a session. Returns `false` if the session is unknown.
    pub fn rename_session(&mut self, session_id: &SessionId, name: DisplayName) -> bool {
        match self.sessions.iter_mut().find(|s| &s.id == session_id) {
            Some(session) => {
                session.name = name;
                true
            }
            None => false,
        }
    }

    pub fn get_session(&self, session_id: &SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| &s.id == session_id)
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|s| s.id.clone()).collect()
    }

    /// Display names of attached sessions, in attach order
    pub fn presence(&self) -> Vec<String> {
        self.sessions
            .iter()
            .map(|s| s.name.as_str().to_string())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Replace the draw list wholesale, discarding drawn history
    pub fn set_draw_list(&mut self, list: DrawList) {
        self.draw_list = Some(list);
    }

    pub fn draw_list(&self) -> Option<&DrawList> {
        self.draw_list.as_ref()
    }

    pub fn last_result(&self) -> Option<&DrawResult> {
        self.last_result.as_ref()
    }

    pub fn draws_performed(&self) -> u64 {
        self.draws_performed
    }

    /// Perform a draw on behalf of `by`.
    ///
    /// On success the last result is overwritten and the activity log
    /// appended. On error nothing changes.
    ///
    /// # Errors
    ///
    /// Returns the `DrawError` describing the validation failure.
    pub fn draw<R: Rng + ?Sized>(
        &mut self,
        by: DisplayName,
        request: DrawRequest,
        now: Timestamp,
        rng: &mut R,
    ) -> Result<DrawOutcome, DrawError> {
        let (value, list_changed) = match request {
            DrawRequest::Coin => (flip_coin(rng).to_string(), false),
            DrawRequest::Number { min, max } => {
                let range = NumberRange::new(min, max)?;
                (range.sample(rng).to_string(), false)
            }
            DrawRequest::List => {
                let list = self.draw_list.as_mut().ok_or(DrawError::NoList)?;
                let drawn = list.draw(rng)?;
                (drawn.item, drawn.consumed)
            }
        };

        let result = DrawResult {
            mode: request.mode(),
            value,
            by,
            ts: now,
        };
        self.record(&result);

        Ok(DrawOutcome {
            result,
            list_changed,
        })
    }

    fn record(&mut self, result: &DrawResult) {
        self.last_result = Some(result.clone());
        self.draws_performed += 1;

        if self.log_capacity == 0 {
            return;
        }
        if self.activity_log.len() >= self.log_capacity {
            self.activity_log.pop_front();
        }
        self.activity_log.push_back(LogEntry {
            id: self.next_log_id,
            ts: result.ts,
            by: result.by.clone(),
            mode: result.mode,
            result: result.value.clone(),
        });
        self.next_log_id += 1;
    }

    /// One page of the activity log, newest first
    pub fn log_page(&self, page: usize, page_size: usize) -> Vec<LogEntry> {
        self.activity_log
            .iter()
            .rev()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect()
    }
}

/// Represents a participant attached to a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub name: DisplayName,
}

impl Session {
    /// Create a session named after its guest label
    pub fn new(id: SessionId) -> Self {
        let name = id.guest_label();
        Self {
            id,
            name,
        }
    }
}

/// The most recent draw outcome of a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawResult {
    pub mode: DrawMode,
    pub value: String,
    pub by: DisplayName,
    pub ts: Timestamp,
}

/// One line of the room's activity log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: u64,
    pub ts: Timestamp,
    pub by: DisplayName,
    pub mode: DrawMode,
    pub result: String,
}
