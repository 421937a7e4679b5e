//! The routes-file analyzer and the ordered routes index.
//!
//! The routes file registers handlers with calls of the shape
//!
//! ```text
//! r.Handle("GET /foo/{id}", page.Show(db))
//! ```
//!
//! Scanning is token-based and deliberately tolerant: comments and strings
//! are respected, anything that is not a two-argument `Handle` call with a
//! leading string literal is skipped, and a file that fails to scan simply
//! yields no routes.

use std::collections::HashMap;
use std::ops::Range as ByteRange;

use logos::Logos;

use hxlink_types::Position;

use crate::text::LineIndex;
use crate::uri::{MatchLevel, Uri, match_level};

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
enum GoToken {
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,
    #[regex(r"`[^`]*`")]
    RawStr,
    #[regex(r"'([^'\\\n]|\\.)*'")]
    Char,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[regex(r".", priority = 0)]
    Punct,
}

struct Scanned<'a> {
    tokens: Vec<(GoToken, ByteRange<usize>)>,
    src: &'a str,
}

impl<'a> Scanned<'a> {
    fn new(src: &'a str) -> Self {
        let mut tokens = Vec::new();
        let mut lexer = GoToken::lexer(src);
        while let Some(tok) = lexer.next() {
            // Unlexable bytes are skipped; the scanner only cares about the
            // token shapes below.
            if let Ok(tok) = tok {
                tokens.push((tok, lexer.span()));
            }
        }
        Self { tokens, src }
    }

    fn slice(&self, i: usize) -> &'a str {
        &self.src[self.tokens[i].1.clone()]
    }

    fn kind(&self, i: usize) -> Option<&GoToken> {
        self.tokens.get(i).map(|(tok, _)| tok)
    }
}

/// The handler call of a route: its name and source range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRef {
    pub call: String,
    pub from: Position,
    pub to: Position,
}

/// One registered route: its URI pattern, handler, and the import path of
/// the handler's package (empty when the handler is local).
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub uri: Uri,
    pub handler: HandlerRef,
    pub pkg: String,
}

/// Ordered list of routes plus a snapshot of the routes-file bytes.
///
/// Uninitialized until the first [`RoutesIndex::update`] or
/// [`RoutesIndex::set_empty`]; a workspace without a routes file is
/// "empty but initialized".
#[derive(Debug, Clone, Default)]
pub struct RoutesIndex {
    routes: Vec<Route>,
    raw: Option<Vec<u8>>,
}

impl RoutesIndex {
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.raw.is_some()
    }

    /// Mark the index initialized with no routes (missing routes file).
    pub fn set_empty(&mut self) {
        self.routes.clear();
        self.raw = Some(Vec::new());
    }

    /// Re-parse the routes file and swap the route list.
    pub fn update(&mut self, bytes: &[u8]) {
        let src = String::from_utf8_lossy(bytes);
        self.routes = parse_routes(&src);
        self.raw = Some(bytes.to_vec());
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Route> {
        self.routes.get(index)
    }

    /// Index of the best-matching route for `probe`, ties resolved by
    /// declaration order. `None` when nothing matches.
    #[must_use]
    pub fn query(&self, probe: &Uri) -> Option<usize> {
        let mut best: Option<(usize, MatchLevel)> = None;
        for (i, route) in self.routes.iter().enumerate() {
            let level = match_level(&route.uri, probe);
            if level == MatchLevel::NoMatch {
                continue;
            }
            match best {
                Some((_, best_level)) if level <= best_level => {}
                _ => best = Some((i, level)),
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Scan the routes file for `Handle` registrations.
#[must_use]
pub fn parse_routes(src: &str) -> Vec<Route> {
    let scanned = Scanned::new(src);
    let index = LineIndex::new(src);
    let imports = imports_table(&scanned);
    let mut routes = Vec::new();

    for i in 0..scanned.tokens.len() {
        if scanned.kind(i) != Some(&GoToken::Ident) || scanned.slice(i) != "Handle" {
            continue;
        }
        if i == 0 || scanned.kind(i - 1) != Some(&GoToken::Dot) {
            continue;
        }
        if scanned.kind(i + 1) != Some(&GoToken::LParen) {
            continue;
        }
        if let Some(route) = parse_handle_call(&scanned, &index, &imports, i + 2) {
            routes.push(route);
        }
    }

    routes
}

/// Parse the arguments of one `Handle(` call starting at token `start`.
///
/// Expects exactly `("<VERB> <path>", <call expr>)`; anything else is not a
/// route registration and is skipped.
fn parse_handle_call(
    scanned: &Scanned<'_>,
    index: &LineIndex,
    imports: &HashMap<String, String>,
    start: usize,
) -> Option<Route> {
    if scanned.kind(start) != Some(&GoToken::Str) {
        return None;
    }
    let lit_span = scanned.tokens[start].1.clone();
    let lit = scanned.slice(start);

    if scanned.kind(start + 1) != Some(&GoToken::Comma) {
        return None;
    }

    // Collect the second argument up to the matching close paren, requiring
    // it to be the only remaining argument.
    let arg2_start = start + 2;
    let mut depth = 1usize;
    let mut end = arg2_start;
    loop {
        match scanned.kind(end)? {
            GoToken::LParen => depth += 1,
            GoToken::RParen => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            GoToken::Comma if depth == 1 => return None,
            _ => {}
        }
        end += 1;
    }
    if end == arg2_start {
        return None;
    }

    // The handler argument must be a call: `Name(...)` or `pkg.Name(...)`.
    let mut path = Vec::new();
    let mut j = arg2_start;
    loop {
        if scanned.kind(j) != Some(&GoToken::Ident) {
            return None;
        }
        path.push(scanned.slice(j).to_string());
        match scanned.kind(j + 1) {
            Some(GoToken::Dot) => j += 2,
            Some(GoToken::LParen) => break,
            _ => return None,
        }
    }

    let call = path.last()?.clone();
    let pkg = if path.len() > 1 {
        imports.get(&path[0]).cloned().unwrap_or_default()
    } else {
        String::new()
    };

    // Split `"<VERB> <path>"` on the first space.
    let inner = lit.trim_matches('"');
    let (verb, pattern) = inner.split_once(' ')?;

    let uri = Uri::parse_at(
        verb,
        format!("\"{pattern}\""),
        index.position(lit_span.start),
        index.position(lit_span.end),
    );

    let handler_span_start = scanned.tokens[arg2_start].1.start;
    let handler_span_end = scanned.tokens[end - 1].1.end;

    Some(Route {
        uri,
        handler: HandlerRef {
            call,
            from: index.position(handler_span_start),
            to: index.position(handler_span_end),
        },
        pkg,
    })
}

/// Build the imports table: package qualifier → import path.
///
/// Named imports take precedence; otherwise the last path component of the
/// import string is the qualifier.
fn imports_table(scanned: &Scanned<'_>) -> HashMap<String, String> {
    let mut imports = HashMap::new();
    let mut i = 0;
    while i < scanned.tokens.len() {
        let is_import = scanned.kind(i) == Some(&GoToken::Ident) && scanned.slice(i) == "import";
        if !is_import {
            i += 1;
            continue;
        }
        match scanned.kind(i + 1) {
            Some(GoToken::LParen) => {
                let mut j = i + 2;
                let mut alias: Option<String> = None;
                loop {
                    match scanned.kind(j) {
                        Some(GoToken::Ident) => {
                            alias = Some(scanned.slice(j).to_string());
                        }
                        Some(GoToken::Str) => {
                            record_import(&mut imports, scanned.slice(j), alias.take());
                        }
                        Some(GoToken::RParen) | None => break,
                        _ => {
                            alias = None;
                        }
                    }
                    j += 1;
                }
                i = j;
            }
            Some(GoToken::Str) => {
                record_import(&mut imports, scanned.slice(i + 1), None);
                i += 2;
            }
            _ => i += 1,
        }
    }
    imports
}

fn record_import(imports: &mut HashMap<String, String>, quoted: &str, alias: Option<String>) {
    let path = quoted.trim_matches('"').to_string();
    let name = alias.unwrap_or_else(|| {
        path.rsplit('/')
            .next()
            .unwrap_or(path.as_str())
            .to_string()
    });
    imports.insert(name, path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use hxlink_types::Severity;

    const ROUTES_SRC: &str = r#"package server

import (
	"net/http"

	"example.com/app/internal/server/handlers/page"
	hx "example.com/app/internal/server/handlers/partial"
)

func Routes(r *http.ServeMux, db *sql.DB) {
	r.Handle("GET /", page.Index(db))
	r.Handle("GET /items/{id}", page.Item(db))
	r.Handle("POST /items", hx.CreateItem(db))
	r.Handle("DELETE /items/{id}", hx.DeleteItem(db))
	r.Handle("GET /assets/*", serveAssets(db))
}
"#;

    #[test]
    fn test_parses_all_handle_calls() {
        let routes = parse_routes(ROUTES_SRC);
        assert_eq!(routes.len(), 5);
        assert_eq!(routes[0].uri.verb, "GET");
        assert_eq!(routes[0].uri.segments, vec![""]);
        assert_eq!(routes[1].uri.segments, vec!["items", "{}"]);
        assert_eq!(routes[2].uri.verb, "POST");
        assert_eq!(routes[4].uri.segments, vec!["assets", "*"]);
    }

    #[test]
    fn test_handler_package_resolution() {
        let routes = parse_routes(ROUTES_SRC);
        assert_eq!(routes[0].handler.call, "Index");
        assert_eq!(routes[0].pkg, "example.com/app/internal/server/handlers/page");
        // Named import takes precedence over the path component.
        assert_eq!(routes[2].pkg, "example.com/app/internal/server/handlers/partial");
        // Unqualified handlers are local.
        assert_eq!(routes[4].handler.call, "serveAssets");
        assert_eq!(routes[4].pkg, "");
    }

    #[test]
    fn test_route_literal_range_is_zero_based() {
        let routes = parse_routes(ROUTES_SRC);
        // `"GET /"` sits on line 10 (0-based), after `\tr.Handle(`.
        assert_eq!(routes[0].uri.from, Position::new(10, 10));
        assert_eq!(routes[0].uri.to, Position::new(10, 17));
    }

    #[test]
    fn test_handler_range_spans_the_call() {
        let routes = parse_routes(ROUTES_SRC);
        assert_eq!(routes[0].handler.from, Position::new(10, 19));
        assert_eq!(routes[0].handler.to, Position::new(10, 33));
    }

    #[test]
    fn test_malformed_literal_is_skipped() {
        let src = r#"package server
func Routes(r *mux) {
	r.Handle("badliteral", page.Index(db))
	r.Handle("GET /ok", page.Ok(db))
}
"#;
        let routes = parse_routes(src);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].uri.segments, vec!["ok"]);
    }

    #[test]
    fn test_non_call_handler_is_skipped() {
        let src = r#"package server
func Routes(r *mux) {
	r.Handle("GET /a", someValue)
	r.Handle("GET /b", three, args)
}
"#;
        assert!(parse_routes(src).is_empty());
    }

    #[test]
    fn test_handle_inside_comment_is_ignored() {
        let src = r#"package server
// r.Handle("GET /ghost", page.Ghost(db))
func Routes(r *mux) {
	r.Handle("GET /real", page.Real(db))
}
"#;
        let routes = parse_routes(src);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].uri.segments, vec!["real"]);
    }

    #[test]
    fn test_route_diagnostics_surface_on_uri() {
        let src = r#"package server
func Routes(r *mux) {
	r.Handle("GET /a b/c", page.Index(db))
}
"#;
        let routes = parse_routes(src);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].uri.diagnostics.len(), 1);
        assert_eq!(routes[0].uri.diagnostics[0].severity, Severity::Error);
    }

    // ── RoutesIndex ────────────────────────────────────────────────────

    #[test]
    fn test_index_starts_uninitialized() {
        let index = RoutesIndex::default();
        assert!(!index.is_initialized());
        assert!(index.routes().is_empty());
    }

    #[test]
    fn test_set_empty_initializes() {
        let mut index = RoutesIndex::default();
        index.set_empty();
        assert!(index.is_initialized());
        assert!(index.routes().is_empty());
    }

    #[test]
    fn test_update_swaps_routes() {
        let mut index = RoutesIndex::default();
        index.update(ROUTES_SRC.as_bytes());
        assert!(index.is_initialized());
        assert_eq!(index.routes().len(), 5);

        index.update(b"package server\nfunc Routes() {}\n");
        assert!(index.routes().is_empty());
        assert!(index.is_initialized());
    }

    #[test]
    fn test_query_prefers_exact_over_variable() {
        let src = r#"package server
func Routes(r *mux) {
	r.Handle("GET /items/{id}", page.Item(db))
	r.Handle("GET /items/new", page.New(db))
}
"#;
        let mut index = RoutesIndex::default();
        index.update(src.as_bytes());

        let probe = Uri::parse("GET", r#""/items/new""#);
        assert_eq!(index.query(&probe), Some(1));

        let var = Uri::parse("GET", r#""/items/42""#);
        assert_eq!(index.query(&var), Some(0));
    }

    #[test]
    fn test_query_ties_go_to_first_declared() {
        let src = r#"package server
func Routes(r *mux) {
	r.Handle("GET /items/{id}", page.A(db))
	r.Handle("GET /items/{key}", page.B(db))
}
"#;
        let mut index = RoutesIndex::default();
        index.update(src.as_bytes());
        let probe = Uri::parse("GET", r#""/items/42""#);
        assert_eq!(index.query(&probe), Some(0));
    }

    #[test]
    fn test_query_no_match_is_none() {
        let mut index = RoutesIndex::default();
        index.update(ROUTES_SRC.as_bytes());
        let probe = Uri::parse("GET", r#""/nowhere/at/all/deep""#);
        assert_eq!(index.query(&probe), None);
    }
}
