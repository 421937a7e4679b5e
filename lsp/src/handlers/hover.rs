//! Hover: link a template URI to its route declaration and handler.

use std::sync::Arc;

use hxlink_types::Position;

use crate::protocol::{self, EmptyHover, Hover, HoverParams, MarkupContent, Response};
use crate::server::Handler;
use crate::workspace::{self, TemplateDoc, Workspace};

pub fn hover(ws: Arc<Workspace>) -> Handler {
    Box::new(move |ctx, sink, req| {
        let ws = ws.clone();
        Box::pin(async move {
            if !ws.is_valid() {
                sink.send(Response::from_value(ctx.id, &EmptyHover::default()));
                return Ok(());
            }

            let params: HoverParams = protocol::decode_params(&req)?;
            let path = protocol::document_path(&params.text_document.uri);
            if !workspace::is_template_path(&path) {
                sink.send(Response::from_value(ctx.id, &EmptyHover::default()));
                return Ok(());
            }

            let Some(doc) = ws.template(&path) else {
                tracing::error!(path = %path, "hover over template that is not open");
                return Err(crate::server::HandlerError::Internal);
            };

            // Empty hover when the cursor is not on a URI, or the URI has no
            // route to link to.
            let Some(uri_index) = hovered_uri(&doc, params.position) else {
                sink.send(Response::from_value(ctx.id, &EmptyHover::default()));
                return Ok(());
            };
            let Some(route_index) = doc.route_index[uri_index] else {
                sink.send(Response::from_value(ctx.id, &EmptyHover::default()));
                return Ok(());
            };
            let Some(route) = ws.route(route_index) else {
                return Err(crate::server::HandlerError::Internal);
            };

            let root = ws.root_path();
            let mut links = format!(
                "[routes.go]({}/{}#{})",
                root.display(),
                workspace::ROUTES_FILE,
                route.uri.from.line + 1
            );
            if let Some(func) = ws.package_function(&route.pkg, &route.handler.call) {
                links.push_str(&format!(
                    " | [{}]({}#{})",
                    route.handler.call,
                    func.file.display(),
                    func.pos.line + 1
                ));
            }

            let hover = Hover {
                contents: MarkupContent {
                    kind: "markdown".to_string(),
                    value: format!("```go\n\n{}\n\n```\n\ngo to {}", route.uri.raw, links),
                },
            };
            sink.send(Response::from_value(ctx.id, &hover));
            Ok(())
        })
    })
}

/// Index of the URI whose source range encloses the cursor.
fn hovered_uri(doc: &TemplateDoc, pos: Position) -> Option<usize> {
    doc.uris.iter().position(|uri| uri.contains(pos))
}
