//! Source analysis for the hxlink language server.
//!
//! This crate turns text into the index's vocabulary:
//!
//! - [`uri`] — the normalized URI model shared by route declarations and
//!   template references, and the match-level ranking between them.
//! - [`expr`] — the small Go-expression grammar both sides use to spell a
//!   path (`"/foo" + id`, `fmt.Sprintf("/foo/%s", id)`, ...).
//! - [`routes`] — the routes-file analyzer and the ordered [`routes::RoutesIndex`].
//! - [`templ`] — the template analyzer extracting `hx-*` attribute URIs.
//! - [`pkg`] — enumeration of handler packages referenced by routes.
//! - [`manifest`] — the module identifier from `go.mod`.

pub mod expr;
pub mod manifest;
pub mod pkg;
pub mod routes;
pub mod templ;
pub mod text;
pub mod uri;
