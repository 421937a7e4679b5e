//! The normalized URI model and the route/reference match ranking.
//!
//! A [`Uri`] is the common currency between a route declaration
//! (`"GET /foo/{id}"`) and a template reference (`hx-get={ ... }`). Both are
//! reduced to a verb plus a list of normalized path segments:
//!
//! - literal parts stay as written (`foo`),
//! - path variables (`{id}`) and format placeholders (`%s`) collapse to `{}`,
//! - the root catch-all `{$}` and the wildcard `*` are preserved verbatim so
//!   the match walk can rank them.
//!
//! Matching never fails hard; anything the grammar rejects becomes a
//! diagnostic attached to the URI.

use hxlink_types::{Diagnostic, Position};

use crate::expr::{self, Expr};

/// A normalized routing pattern or template reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    /// HTTP verb (`GET`, `POST`, `PUT`, `DELETE`).
    pub verb: String,
    /// The original textual expression, quotes and operators included.
    pub raw: String,
    /// Normalized path segments. Empty only when the expression failed to
    /// parse, in which case at least one error diagnostic is attached.
    pub segments: Vec<String>,
    /// Parse- and validation-level issues for this URI.
    pub diagnostics: Vec<Diagnostic>,
    pub from: Position,
    pub to: Position,
}

impl Uri {
    /// Parse an expression into a URI with a zero source range.
    #[must_use]
    pub fn parse(verb: impl Into<String>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let (segments, diagnostics) = segments(raw.trim());
        Self {
            verb: verb.into(),
            raw,
            segments,
            diagnostics,
            from: Position::default(),
            to: Position::default(),
        }
    }

    /// Parse an expression into a URI anchored at a source range.
    #[must_use]
    pub fn parse_at(
        verb: impl Into<String>,
        raw: impl Into<String>,
        from: Position,
        to: Position,
    ) -> Self {
        let mut uri = Self::parse(verb, raw);
        uri.from = from;
        uri.to = to;
        uri
    }

    /// Whether `pos` falls within this URI's source range.
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        self.from <= pos && pos <= self.to
    }
}

/// How precisely a referenced URI resolves to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchLevel {
    NoMatch,
    Wildcard,
    Variable,
    Exact,
}

/// Rank how well `probe` (a template reference) matches `route`.
///
/// Router rules, mirrored from the target convention: `/` matches root,
/// `/{$}` is the root catch-all, `/foo` matches exactly, `/foo/{id}` binds
/// a path variable, `/assets/*` swallows the remaining segments.
#[must_use]
pub fn match_level(route: &Uri, probe: &Uri) -> MatchLevel {
    if probe.verb != route.verb || probe.segments.is_empty() {
        return MatchLevel::NoMatch;
    }

    let r = &route.segments;
    let p = &probe.segments;

    // A trailing route-side wildcard swallows the rest of the probe, so the
    // usual length equality is relaxed to "probe at least as long".
    let tail_wildcard = r.last().is_some_and(|s| s == "*");
    if r.len() != p.len() && !(tail_wildcard && p.len() >= r.len()) {
        return MatchLevel::NoMatch;
    }

    // The root catch-all reference matches whatever route survived the
    // length check, at wildcard precision.
    if p.len() == 1 && p[0] == "{$}" {
        return MatchLevel::Wildcard;
    }

    if r == p {
        return MatchLevel::Exact;
    }

    let mut wildcard = false;
    let mut variable = false;
    for (i, rs) in r.iter().enumerate() {
        // The probe is at least as long as the route here, so `p[i]` is in
        // bounds even on the relaxed-length wildcard path.
        let ps = &p[i];
        if (rs == "{$}" || ps == "{$}") && i != 0 {
            return MatchLevel::NoMatch;
        }
        if rs == "*" && i == r.len() - 1 {
            wildcard = true;
            break;
        }
        if rs == "{}" || ps == "{}" {
            variable = true;
            continue;
        }
        if rs == "*" {
            wildcard = true;
            continue;
        }
        if rs != ps {
            return MatchLevel::NoMatch;
        }
    }

    if wildcard {
        MatchLevel::Wildcard
    } else if variable {
        MatchLevel::Variable
    } else {
        MatchLevel::Exact
    }
}

/// Extract normalized segments (and any diagnostics) from a path expression.
///
/// Expression parse failure yields no segments and a single error; every
/// other irregularity keeps the segments and attaches a diagnostic.
#[must_use]
pub fn segments(pattern: &str) -> (Vec<String>, Vec<Diagnostic>) {
    let tree = match expr::parse(pattern) {
        Ok(tree) => tree,
        Err(err) => {
            return (
                Vec::new(),
                vec![Diagnostic::error(format!("invalid expression: {err}"))],
            );
        }
    };

    let mut seg = Vec::new();
    let mut diag = Vec::new();
    let mut saw = Saw::default();
    walk(&tree, &mut seg, &mut diag, &mut saw);

    if saw.literal && saw.call {
        diag.push(Diagnostic::warning(
            "mixed literal and function call, combine into a single formatted call",
        ));
    }

    for (i, s) in seg.iter().enumerate() {
        if s == "{$}" && i != 0 {
            diag.push(Diagnostic::error(
                "invalid route pattern {$}: {$} is only allowed at the root path",
            ));
        }
    }

    (seg, diag)
}

#[derive(Default)]
struct Saw {
    literal: bool,
    call: bool,
}

fn walk(expr: &Expr, seg: &mut Vec<String>, diag: &mut Vec<Diagnostic>, saw: &mut Saw) {
    match expr {
        Expr::Lit(raw) => {
            saw.literal = true;
            literal_segments(raw, seg, diag);
        }
        Expr::Ident(_) | Expr::Selector(_) => seg.push("{}".to_string()),
        Expr::Concat(lhs, rhs) => {
            walk(lhs, seg, diag, saw);
            walk(rhs, seg, diag, saw);
        }
        Expr::Call { path, args } => {
            saw.call = true;
            if path.last().map(String::as_str) != Some("Sprintf") {
                diag.push(Diagnostic::warning(format!(
                    "unexpected function call {}, use Sprintf instead",
                    path.join(".")
                )));
                return;
            }
            // Only literal arguments contribute segments; the placeholders
            // in the format literal already produced `{}` for the rest.
            for arg in args {
                if let Expr::Lit(raw) = arg {
                    saw.literal = true;
                    literal_segments(raw, seg, diag);
                }
            }
        }
    }
}

fn literal_segments(raw: &str, seg: &mut Vec<String>, diag: &mut Vec<Diagnostic>) {
    let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '`');
    let trimmed = trimmed.trim_matches('/');

    for part in trimmed.split('/') {
        if part == "{$}" {
            seg.push(part.to_string());
        } else if part.starts_with('{') || part.starts_with('%') {
            seg.push("{}".to_string());
        } else if part.starts_with('*') {
            seg.push("*".to_string());
        } else {
            if !part.is_empty() && !part.chars().all(is_valid_segment_char) {
                diag.push(Diagnostic::error(format!(
                    "invalid character in uri segment {part}"
                )));
            }
            seg.push(part.to_string());
        }
    }
}

fn is_valid_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '{' | '}' | '*')
}
