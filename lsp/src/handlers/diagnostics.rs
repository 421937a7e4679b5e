//! Diagnostic pull: full reports for the routes file and open templates.

use std::sync::Arc;

use hxlink_types::Range;

use hxlink_analysis::uri::Uri;

use crate::protocol::{
    self, DiagnosticParams, FullDiagnosticReport, LspDiagnostic, Response,
};
use crate::server::{Handler, HandlerError};
use crate::workspace::{self, Workspace};

/// The `source` field on every diagnostic this server reports.
const DIAGNOSTIC_SOURCE: &str = "hxlink";

pub fn diagnostic(ws: Arc<Workspace>) -> Handler {
    Box::new(move |ctx, sink, req| {
        let ws = ws.clone();
        Box::pin(async move {
            if !ws.is_valid() {
                sink.send(Response::from_value(
                    ctx.id,
                    &FullDiagnosticReport::new(Vec::new()),
                ));
                return Ok(());
            }

            let params: DiagnosticParams = protocol::decode_params(&req)?;
            let path = protocol::document_path(&params.text_document.uri);

            let mut items = Vec::new();
            if workspace::is_routes_path(&path) {
                for route in ws.routes() {
                    items.extend(uri_diagnostics(&route.uri));
                }
            } else if workspace::is_template_path(&path) {
                let Some(doc) = ws.template(&path) else {
                    tracing::error!(path = %path, "diagnostics for template that is not open");
                    return Err(HandlerError::Internal);
                };
                for uri in &doc.uris {
                    items.extend(uri_diagnostics(uri));
                }
            }

            sink.send(Response::from_value(
                ctx.id,
                &FullDiagnosticReport::new(items),
            ));
            Ok(())
        })
    })
}

/// Flatten a URI's diagnostics into wire items at the URI's range, with the
/// severity label folded into the message.
fn uri_diagnostics(uri: &Uri) -> Vec<LspDiagnostic> {
    uri.diagnostics
        .iter()
        .map(|diag| LspDiagnostic {
            range: Range::new(uri.from, uri.to),
            severity: diag.severity,
            source: DIAGNOSTIC_SOURCE.to_string(),
            message: format!("{}: {}", diag.severity.label(), diag.message),
        })
        .collect()
}
