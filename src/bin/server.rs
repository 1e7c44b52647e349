//! Draw room server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin server
//! cargo run --bin server -- --host 0.0.0.0 --port 3000 --idle-grace-secs 120
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use draw_room::{
    common::logger::setup_logger,
    domain::MessagePusher,
    infrastructure::message_pusher::WebSocketMessagePusher,
    ui::Server,
    usecase::{RegistryConfig, RoomRegistry},
};

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Shared draw room server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Seconds an empty room is kept before it is disposed
    #[arg(long, default_value = "60")]
    idle_grace_secs: u64,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    // One pusher per room
    let config = RegistryConfig {
        idle_grace: Duration::from_secs(args.idle_grace_secs),
    };
    let registry = Arc::new(RoomRegistry::new(
        config,
        Arc::new(|| Arc::new(WebSocketMessagePusher::new()) as Arc<dyn MessagePusher>),
    ));

    let server = Server::new(registry);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
