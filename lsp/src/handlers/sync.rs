//! Document synchronization: didOpen / didChange / didClose / didSave.
//!
//! These are the only writers of the index. Everything is gated on the
//! workspace being a valid managed project; otherwise the notifications are
//! silently absorbed.

use std::sync::Arc;

use crate::protocol::{self, DidChangeParams, DidCloseParams, DidOpenParams};
use crate::server::Handler;
use crate::workspace::{self, Workspace};

pub fn did_open(ws: Arc<Workspace>) -> Handler {
    Box::new(move |_ctx, _sink, req| {
        let ws = ws.clone();
        Box::pin(async move {
            if !ws.is_valid() {
                return Ok(());
            }
            let params: DidOpenParams = protocol::decode_params(&req)?;
            let path = protocol::document_path(&params.text_document.uri);
            if workspace::is_template_path(&path) {
                tracing::debug!(path = %path, "opening template");
                ws.open_template(&path, &params.text_document.text);
            }
            Ok(())
        })
    })
}

pub fn did_change(ws: Arc<Workspace>) -> Handler {
    Box::new(move |_ctx, _sink, req| {
        let ws = ws.clone();
        Box::pin(async move {
            if !ws.is_valid() {
                return Ok(());
            }
            let params: DidChangeParams = protocol::decode_params(&req)?;
            // Full-document sync: the first change is the whole document.
            let Some(change) = params.content_changes.into_iter().next() else {
                return Ok(());
            };
            let path = protocol::document_path(&params.text_document.uri);
            if workspace::is_template_path(&path) {
                tracing::debug!(path = %path, "template changed");
                ws.change_template(&path, &change.text);
            } else if workspace::is_routes_path(&path) {
                tracing::debug!(path = %path, "routes file changed");
                ws.update_routes(change.text.as_bytes());
            }
            Ok(())
        })
    })
}

pub fn did_close(ws: Arc<Workspace>) -> Handler {
    Box::new(move |_ctx, _sink, req| {
        let ws = ws.clone();
        Box::pin(async move {
            if !ws.is_valid() {
                return Ok(());
            }
            let params: DidCloseParams = protocol::decode_params(&req)?;
            let path = protocol::document_path(&params.text_document.uri);
            if workspace::is_template_path(&path) {
                ws.close_template(&path);
            }
            Ok(())
        })
    })
}

pub fn did_save() -> Handler {
    Box::new(|_ctx, _sink, _req| Box::pin(async { Ok(()) }))
}
