//! Request handlers: thin glue between the dispatcher and the index.
//!
//! Each handler is produced by a factory that captures the shared
//! [`Workspace`](crate::workspace::Workspace) handle and returns the boxed
//! closure shape the dispatcher registers.

mod diagnostics;
mod hover;
mod sync;

pub use diagnostics::diagnostic;
pub use hover::hover;
pub use sync::{did_change, did_close, did_open, did_save};
