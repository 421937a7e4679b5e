//! The hxlink language server runtime.
//!
//! Three tightly coupled subsystems:
//!
//! - [`codec`] + [`protocol`] — framed JSON-RPC 2.0 over stdin/stdout;
//! - [`server`] — the dispatcher: lifecycle state machine, per-request
//!   cancellation and timeouts, asynchronous response multiplexing;
//! - [`workspace`] — the project index consulted by the [`handlers`].
//!
//! [`start`] wires them together for the `hxlink lsp` subcommand.

pub mod codec;
pub mod config;
pub mod handlers;
pub mod protocol;
pub mod server;
pub mod workspace;

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::protocol::{ServerCapabilities, methods};
use crate::server::{Initializer, Server};
use crate::workspace::Workspace;

/// Run the language server over stdin/stdout until `exit`.
pub async fn start(config: ServerConfig) -> anyhow::Result<()> {
    let workspace = Arc::new(Workspace::new());

    let init_ws = workspace.clone();
    let initializer: Initializer = Box::new(move |root_path: &str| init_ws.open(root_path));

    let mut server = Server::new(
        tokio::io::stdin(),
        tokio::io::stdout(),
        initializer,
        ServerCapabilities::default(),
        config,
    );

    server.handle_request(methods::DID_OPEN, handlers::did_open(workspace.clone()));
    server.handle_request(methods::DID_CHANGE, handlers::did_change(workspace.clone()));
    server.handle_request(methods::DID_CLOSE, handlers::did_close(workspace.clone()));
    server.handle_request(methods::DID_SAVE, handlers::did_save());
    server.handle_request(methods::HOVER, handlers::hover(workspace.clone()));
    server.handle_request(methods::DIAGNOSTIC, handlers::diagnostic(workspace));

    server.run().await
}
