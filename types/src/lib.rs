//! Shared vocabulary types for the hxlink language server.
//!
//! Everything in here is plain data: source positions, ranges, diagnostic
//! severities and diagnostics. The analysis and LSP crates both speak these
//! types, so they live in a leaf crate with no dependencies beyond serde.

mod diagnostic;
mod position;

pub use diagnostic::{Diagnostic, Severity};
pub use position::{Position, Range};
