//! The LSP dispatcher.
//!
//! Turns the sequential request stream into concurrent handler execution:
//!
//! - lifecycle transitions (`initialize`, `initialized`, `shutdown`, `exit`)
//!   are resolved inline in the read loop, totally ordered with dispatch;
//! - every other registered method runs in its own spawned task under a
//!   cancel token and a deadline;
//! - all output funnels through one unbounded channel drained by a writer
//!   task, so responses may complete in any order while writes stay
//!   serialized.
//!
//! Shutdown quiesces the writer: handler responses enqueued after the
//! shutdown acknowledgement are dropped, while lifecycle/protocol errors
//! (notably `InvalidRequest` for post-shutdown requests) are still written.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, Notify, mpsc};

use crate::codec::{FrameError, FrameReader, FrameWriter};
use crate::config::ServerConfig;
use crate::protocol::{
    self, CancelParams, InitializeParams, InitializeResult, Request, Response, ServerCapabilities,
    methods,
};

/// Sentinel errors a handler may return; the dispatcher maps them to
/// JSON-RPC error responses.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HandlerError {
    #[error("invalid params")]
    InvalidParams,
    #[error("internal error")]
    Internal,
}

/// Cooperative cancellation signal handed to each request handler.
///
/// Built from an `AtomicBool` + `Notify` pair: `cancel` flips the flag and
/// wakes waiters; handlers poll [`CancelToken::is_cancelled`] at natural
/// suspension points or await [`CancelToken::cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Per-request context: the request id and its cancel token.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub id: i64,
    cancel: CancelToken,
}

impl RequestContext {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    #[cfg(test)]
    pub(crate) fn for_tests(id: i64, cancel: CancelToken) -> Self {
        Self { id, cancel }
    }
}

pub(crate) enum WriterCommand {
    /// Handler output; dropped once the server has quiesced.
    Respond(Response),
    /// Lifecycle replies and protocol errors; always written.
    Lifecycle(Response),
    /// Stop emitting handler responses.
    Quiesce,
}

/// Handler-facing sender into the writer task.
#[derive(Clone)]
pub struct ResponseSink {
    tx: mpsc::UnboundedSender<WriterCommand>,
}

impl ResponseSink {
    /// Queue a response for writing. Send failures mean the writer is gone
    /// (server shutting down); the response is dropped on the floor.
    pub fn send(&self, response: Response) {
        let _ = self.tx.send(WriterCommand::Respond(response));
    }

    /// A sink wired to a bare channel, for driving handlers directly.
    #[cfg(test)]
    pub(crate) fn for_tests() -> (Self, mpsc::UnboundedReceiver<WriterCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

/// Pop the next queued response off a test sink's channel.
#[cfg(test)]
pub(crate) fn next_response(rx: &mut mpsc::UnboundedReceiver<WriterCommand>) -> Option<Response> {
    match rx.try_recv() {
        Ok(WriterCommand::Respond(response)) | Ok(WriterCommand::Lifecycle(response)) => {
            Some(response)
        }
        _ => None,
    }
}

/// A registered request handler.
///
/// One shape for every method: the request context, the response sink, and
/// the raw request (handlers decode their own params). Returning a
/// [`HandlerError`] makes the dispatcher emit the corresponding error
/// response; a cancelled handler simply returns `Ok` without replying.
pub type Handler = Box<
    dyn Fn(RequestContext, ResponseSink, Request) -> BoxFuture<'static, Result<(), HandlerError>>
        + Send
        + Sync,
>;

/// Called once with the workspace root from `initialize`.
pub type Initializer = Box<dyn Fn(&str) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Ready,
    Shutdown,
}

type ActiveTable = Arc<Mutex<HashMap<i64, CancelToken>>>;

/// The LSP server: read loop, lifecycle state, handler registry.
pub struct Server<R, W> {
    reader: FrameReader<R>,
    writer: Option<FrameWriter<W>>,
    handlers: HashMap<&'static str, Handler>,
    initializer: Initializer,
    capabilities: ServerCapabilities,
    config: ServerConfig,
    state: Lifecycle,
    active: ActiveTable,
}

impl<R, W> Server<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(
        input: R,
        output: W,
        initializer: Initializer,
        capabilities: ServerCapabilities,
        config: ServerConfig,
    ) -> Self {
        Self {
            reader: FrameReader::new(input),
            writer: Some(FrameWriter::new(output)),
            handlers: HashMap::new(),
            initializer,
            capabilities,
            config,
            state: Lifecycle::Uninitialized,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a non-lifecycle method handler.
    pub fn handle_request(&mut self, method: &'static str, handler: Handler) {
        self.handlers.insert(method, handler);
    }

    #[cfg(test)]
    pub(crate) fn active_table(&self) -> ActiveTable {
        self.active.clone()
    }

    /// Serve until `exit`. Returns an error on fatal conditions (failed
    /// initialization, peer vanishing without `exit`), which the binary
    /// turns into a non-zero exit code.
    pub async fn run(mut self) -> anyhow::Result<()> {
        tracing::info!("server is listening");

        let (tx, rx) = mpsc::unbounded_channel();
        let writer = self.writer.take().context("server already running")?;
        let writer_task = tokio::spawn(drain_responses(writer, rx));
        let sink = ResponseSink { tx: tx.clone() };

        let result = self.read_loop(&tx, &sink).await;

        // Dropping the senders ends the writer task once the queue drains.
        drop(sink);
        drop(tx);
        let _ = writer_task.await;

        result
    }

    async fn read_loop(
        &mut self,
        tx: &mpsc::UnboundedSender<WriterCommand>,
        sink: &ResponseSink,
    ) -> anyhow::Result<()> {
        loop {
            let request = match self.reader.read().await {
                Ok(request) => request,
                Err(FrameError::Eof) => {
                    anyhow::bail!("client closed the connection before exit");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "error reading request");
                    continue;
                }
            };

            match request.method.as_str() {
                methods::EXIT => {
                    tracing::info!("server exit");
                    return Ok(());
                }
                methods::INITIALIZE => self.on_initialize(&request, tx)?,
                methods::INITIALIZED => {
                    tracing::info!("server is initialized");
                    self.state = Lifecycle::Ready;
                }
                methods::SHUTDOWN => {
                    tracing::info!("server is shutting down");
                    lifecycle_send(tx, Response::ok(request.id, serde_json::Value::Null));
                    let _ = tx.send(WriterCommand::Quiesce);
                    self.state = Lifecycle::Shutdown;
                    self.cancel_all().await;
                }
                methods::CANCEL => self.on_cancel(&request).await,
                _ => self.dispatch(request, tx, sink).await,
            }
        }
    }

    fn on_initialize(
        &mut self,
        request: &Request,
        tx: &mpsc::UnboundedSender<WriterCommand>,
    ) -> anyhow::Result<()> {
        let params: InitializeParams = match protocol::decode_params(request) {
            Ok(params) => params,
            Err(_) => {
                tracing::warn!("initialize request missing or invalid params");
                lifecycle_send(
                    tx,
                    Response::error(
                        request.id,
                        protocol::ERROR_INVALID_PARAMS,
                        "initialize request missing or invalid params",
                    ),
                );
                return Ok(());
            }
        };

        if let Err(err) = (self.initializer)(&params.root_path) {
            lifecycle_send(
                tx,
                Response::error(
                    request.id,
                    protocol::ERROR_INTERNAL,
                    "error calling initializer",
                ),
            );
            return Err(err.context("initialize failed"));
        }

        lifecycle_send(
            tx,
            Response::from_value(
                request.id,
                &InitializeResult {
                    capabilities: self.capabilities.clone(),
                },
            ),
        );
        tracing::info!("completed the initialization");
        Ok(())
    }

    async fn on_cancel(&self, request: &Request) {
        let params: CancelParams = match protocol::decode_params(request) {
            Ok(params) => params,
            Err(_) => {
                tracing::warn!("cancel request decode error");
                return;
            }
        };
        if let Some(token) = self.active.lock().await.remove(&params.id) {
            tracing::debug!(id = params.id, "cancelling request");
            token.cancel();
        }
    }

    async fn cancel_all(&self) {
        let mut active = self.active.lock().await;
        for token in active.values() {
            token.cancel();
        }
        active.clear();
    }

    async fn dispatch(
        &mut self,
        request: Request,
        tx: &mpsc::UnboundedSender<WriterCommand>,
        sink: &ResponseSink,
    ) {
        // Requests outside the lifecycle window are rejected whether or not
        // the method is known.
        if self.state != Lifecycle::Ready {
            let message = match self.state {
                Lifecycle::Shutdown => "received request after shutdown",
                _ => "received request before initialization",
            };
            lifecycle_send(
                tx,
                Response::error(request.id, protocol::ERROR_INVALID_REQUEST, message),
            );
            return;
        }

        let Some(handler) = self.handlers.get(request.method.as_str()) else {
            tracing::warn!(method = %request.method, "unhandled method");
            return;
        };

        let id = request.id;
        let token = CancelToken::new();
        self.active.lock().await.insert(id, token.clone());

        let ctx = RequestContext { id, cancel: token };
        let future = handler(ctx, sink.clone(), request);

        let active = self.active.clone();
        let sink = sink.clone();
        let timeout = self.config.handler_timeout;
        tokio::spawn(async move {
            let result = tokio::time::timeout(timeout, future).await;
            active.lock().await.remove(&id);
            match result {
                Ok(Ok(())) => {}
                Ok(Err(HandlerError::InvalidParams)) => sink.send(Response::error(
                    id,
                    protocol::ERROR_INVALID_PARAMS,
                    "invalid params",
                )),
                Ok(Err(HandlerError::Internal)) => {
                    sink.send(Response::error(id, protocol::ERROR_INTERNAL, "internal error"));
                }
                Err(_) => sink.send(Response::error(
                    id,
                    protocol::ERROR_INTERNAL,
                    "handler timed out or was cancelled",
                )),
            }
        });
    }
}

fn lifecycle_send(tx: &mpsc::UnboundedSender<WriterCommand>, response: Response) {
    let _ = tx.send(WriterCommand::Lifecycle(response));
}

/// The writer task: the single point where frames hit the output stream.
async fn drain_responses<W: AsyncWrite + Unpin>(
    mut writer: FrameWriter<W>,
    mut rx: mpsc::UnboundedReceiver<WriterCommand>,
) {
    let mut quiesced = false;
    while let Some(command) = rx.recv().await {
        let response = match command {
            WriterCommand::Quiesce => {
                quiesced = true;
                continue;
            }
            WriterCommand::Respond(_) if quiesced => {
                tracing::debug!("dropping handler response after shutdown");
                continue;
            }
            WriterCommand::Respond(response) | WriterCommand::Lifecycle(response) => response,
        };
        if let Err(err) = writer.write(&response).await {
            tracing::warn!(error = %err, "error writing response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf, duplex, split};

    type Client = (
        FrameWriter<WriteHalf<DuplexStream>>,
        FrameReader<ReadHalf<DuplexStream>>,
    );

    struct Fixture {
        client_tx: FrameWriter<WriteHalf<DuplexStream>>,
        client_rx: FrameReader<ReadHalf<DuplexStream>>,
        server_task: tokio::task::JoinHandle<anyhow::Result<()>>,
        active: ActiveTable,
        init_calls: Arc<StdMutex<Vec<String>>>,
    }

    fn make_client(stream: DuplexStream) -> Client {
        let (read, write) = split(stream);
        (FrameWriter::new(write), FrameReader::new(read))
    }

    fn start_server(
        config: ServerConfig,
        register: impl FnOnce(&mut Server<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>),
    ) -> Fixture {
        let (client_stream, server_stream) = duplex(64 * 1024);
        let (server_read, server_write) = split(server_stream);

        let init_calls: Arc<StdMutex<Vec<String>>> = Arc::new(StdMutex::new(Vec::new()));
        let calls = init_calls.clone();
        let initializer: Initializer = Box::new(move |root: &str| {
            calls.lock().unwrap().push(root.to_string());
            Ok(())
        });

        let mut server = Server::new(
            server_read,
            server_write,
            initializer,
            ServerCapabilities::default(),
            config,
        );
        register(&mut server);
        let active = server.active_table();
        let server_task = tokio::spawn(server.run());

        let (client_tx, client_rx) = make_client(client_stream);
        Fixture {
            client_tx,
            client_rx,
            server_task,
            active,
            init_calls,
        }
    }

    fn request(id: i64, method: &str, params: serde_json::Value) -> serde_json::Value {
        serde_json::json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
    }

    fn notification(method: &str) -> serde_json::Value {
        serde_json::json!({"jsonrpc": "2.0", "method": method})
    }

    async fn initialize(fixture: &mut Fixture) {
        fixture
            .client_tx
            .write(&request(1, "initialize", serde_json::json!({"rootPath": "/p"})))
            .await
            .unwrap();
        let reply = fixture.client_rx.read_value().await.unwrap();
        assert_eq!(reply["id"], 1);
        assert!(reply["result"]["capabilities"].is_object());
        fixture
            .client_tx
            .write(&notification("initialized"))
            .await
            .unwrap();
    }

    /// Handler that replies immediately with a fixed payload.
    fn reply_handler(payload: serde_json::Value) -> Handler {
        Box::new(move |ctx, sink, _req| {
            let payload = payload.clone();
            Box::pin(async move {
                sink.send(Response::ok(ctx.id, payload));
                Ok(())
            })
        })
    }

    /// Handler that sleeps, then replies unless cancelled.
    fn slow_handler(delay: Duration, payload: serde_json::Value) -> Handler {
        Box::new(move |ctx, sink, _req| {
            let payload = payload.clone();
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                if ctx.is_cancelled() {
                    return Ok(());
                }
                sink.send(Response::ok(ctx.id, payload));
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn test_lifecycle_script_end_to_end() {
        let mut fixture = start_server(ServerConfig::default(), |_| {});

        initialize(&mut fixture).await;

        fixture
            .client_tx
            .write(&request(2, "shutdown", serde_json::Value::Null))
            .await
            .unwrap();
        let ack = fixture.client_rx.read_value().await.unwrap();
        assert_eq!(ack["id"], 2);
        assert!(ack["error"].is_null());

        fixture.client_tx.write(&notification("exit")).await.unwrap();
        let result = fixture.server_task.await.unwrap();
        assert!(result.is_ok());

        let calls = fixture.init_calls.lock().unwrap();
        assert_eq!(*calls, vec!["/p".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_handlers_respond_out_of_order() {
        let mut fixture = start_server(ServerConfig::default(), |server| {
            server.handle_request(
                "test/foo",
                slow_handler(
                    Duration::from_millis(100),
                    serde_json::json!({"foo": "response"}),
                ),
            );
            server.handle_request("test/bar", reply_handler(serde_json::json!({"bar": "response"})));
        });

        initialize(&mut fixture).await;

        let started = std::time::Instant::now();
        fixture
            .client_tx
            .write(&request(3, "test/foo", serde_json::Value::Null))
            .await
            .unwrap();
        fixture
            .client_tx
            .write(&request(4, "test/bar", serde_json::Value::Null))
            .await
            .unwrap();

        let first = fixture.client_rx.read_value().await.unwrap();
        let second = fixture.client_rx.read_value().await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(first["id"], 4, "fast handler must answer first");
        assert_eq!(first["result"]["bar"], "response");
        assert_eq!(second["id"], 3);
        assert_eq!(second["result"]["foo"], "response");
        assert!(elapsed <= Duration::from_millis(200), "handlers must overlap");
    }

    #[tokio::test]
    async fn test_cancel_suppresses_response_and_clears_table() {
        let mut fixture = start_server(ServerConfig::default(), |server| {
            server.handle_request(
                "test/foo",
                slow_handler(Duration::from_millis(100), serde_json::json!({"foo": "late"})),
            );
            server.handle_request("test/bar", reply_handler(serde_json::json!({"bar": "ok"})));
        });

        initialize(&mut fixture).await;

        fixture
            .client_tx
            .write(&request(5, "test/foo", serde_json::Value::Null))
            .await
            .unwrap();
        fixture
            .client_tx
            .write(&request(0, "$/cancelRequest", serde_json::json!({"id": 5})))
            .await
            .unwrap();

        // Give the cancelled handler time to wake up and observe the token.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!fixture.active.lock().await.contains_key(&5));

        // The next response on the wire is bar's, not foo's.
        fixture
            .client_tx
            .write(&request(6, "test/bar", serde_json::Value::Null))
            .await
            .unwrap();
        let reply = fixture.client_rx.read_value().await.unwrap();
        assert_eq!(reply["id"], 6);
        assert_eq!(reply["result"]["bar"], "ok");
    }

    #[tokio::test]
    async fn test_timeout_produces_single_internal_error() {
        let config = ServerConfig {
            handler_timeout: Duration::from_millis(50),
        };
        let mut fixture = start_server(config, |server| {
            server.handle_request(
                "test/slow",
                slow_handler(Duration::from_millis(500), serde_json::json!({"too": "late"})),
            );
            server.handle_request("test/bar", reply_handler(serde_json::json!({"bar": "ok"})));
        });

        initialize(&mut fixture).await;

        fixture
            .client_tx
            .write(&request(7, "test/slow", serde_json::Value::Null))
            .await
            .unwrap();
        let reply = fixture.client_rx.read_value().await.unwrap();
        assert_eq!(reply["id"], 7);
        assert_eq!(reply["error"]["code"], protocol::ERROR_INTERNAL);
        assert_eq!(reply["error"]["message"], "handler timed out or was cancelled");

        // Exactly one response for the timed-out id: the next frame belongs
        // to a different request.
        fixture
            .client_tx
            .write(&request(8, "test/bar", serde_json::Value::Null))
            .await
            .unwrap();
        let next = fixture.client_rx.read_value().await.unwrap();
        assert_eq!(next["id"], 8);
    }

    #[tokio::test]
    async fn test_request_before_initialization_is_invalid() {
        let mut fixture = start_server(ServerConfig::default(), |server| {
            server.handle_request("test/bar", reply_handler(serde_json::json!({})));
        });

        fixture
            .client_tx
            .write(&request(1, "test/bar", serde_json::Value::Null))
            .await
            .unwrap();
        let reply = fixture.client_rx.read_value().await.unwrap();
        assert_eq!(reply["error"]["code"], protocol::ERROR_INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_request_after_shutdown_is_invalid() {
        let mut fixture = start_server(ServerConfig::default(), |server| {
            server.handle_request("test/bar", reply_handler(serde_json::json!({})));
        });

        initialize(&mut fixture).await;

        fixture
            .client_tx
            .write(&request(2, "shutdown", serde_json::Value::Null))
            .await
            .unwrap();
        let ack = fixture.client_rx.read_value().await.unwrap();
        assert_eq!(ack["id"], 2);

        fixture
            .client_tx
            .write(&request(9, "test/bar", serde_json::Value::Null))
            .await
            .unwrap();
        let reply = fixture.client_rx.read_value().await.unwrap();
        assert_eq!(reply["id"], 9);
        assert_eq!(reply["error"]["code"], protocol::ERROR_INVALID_REQUEST);
        assert_eq!(reply["error"]["message"], "received request after shutdown");
    }

    #[tokio::test]
    async fn test_unknown_method_is_dropped() {
        let mut fixture = start_server(ServerConfig::default(), |server| {
            server.handle_request("test/bar", reply_handler(serde_json::json!({"bar": "ok"})));
        });

        initialize(&mut fixture).await;

        fixture
            .client_tx
            .write(&request(10, "test/nope", serde_json::Value::Null))
            .await
            .unwrap();
        fixture
            .client_tx
            .write(&request(11, "test/bar", serde_json::Value::Null))
            .await
            .unwrap();
        let reply = fixture.client_rx.read_value().await.unwrap();
        assert_eq!(reply["id"], 11, "unknown method must produce no response");
    }

    #[tokio::test]
    async fn test_handler_error_maps_to_json_rpc_code() {
        let mut fixture = start_server(ServerConfig::default(), |server| {
            server.handle_request(
                "test/badparams",
                Box::new(|_ctx, _sink, _req| Box::pin(async { Err(HandlerError::InvalidParams) })),
            );
            server.handle_request(
                "test/broken",
                Box::new(|_ctx, _sink, _req| Box::pin(async { Err(HandlerError::Internal) })),
            );
        });

        initialize(&mut fixture).await;

        fixture
            .client_tx
            .write(&request(12, "test/badparams", serde_json::Value::Null))
            .await
            .unwrap();
        let reply = fixture.client_rx.read_value().await.unwrap();
        assert_eq!(reply["error"]["code"], protocol::ERROR_INVALID_PARAMS);

        fixture
            .client_tx
            .write(&request(13, "test/broken", serde_json::Value::Null))
            .await
            .unwrap();
        let reply = fixture.client_rx.read_value().await.unwrap();
        assert_eq!(reply["error"]["code"], protocol::ERROR_INTERNAL);
    }

    #[tokio::test]
    async fn test_initialize_failure_is_fatal() {
        let (client_stream, server_stream) = duplex(64 * 1024);
        let (server_read, server_write) = split(server_stream);
        let initializer: Initializer =
            Box::new(|_root: &str| Err(anyhow::anyhow!("workspace is broken")));
        let server = Server::new(
            server_read,
            server_write,
            initializer,
            ServerCapabilities::default(),
            ServerConfig::default(),
        );
        let server_task = tokio::spawn(server.run());
        let (mut client_tx, mut client_rx) = make_client(client_stream);

        client_tx
            .write(&request(1, "initialize", serde_json::json!({"rootPath": "/p"})))
            .await
            .unwrap();
        let reply = client_rx.read_value().await.unwrap();
        assert_eq!(reply["error"]["code"], protocol::ERROR_INTERNAL);
        assert_eq!(reply["error"]["message"], "error calling initializer");

        let result = server_task.await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_eof_without_exit_is_an_error() {
        let (client_stream, server_stream) = duplex(1024);
        let (server_read, server_write) = split(server_stream);
        let initializer: Initializer = Box::new(|_root: &str| Ok(()));
        let server = Server::new(
            server_read,
            server_write,
            initializer,
            ServerCapabilities::default(),
            ServerConfig::default(),
        );
        let server_task = tokio::spawn(server.run());

        drop(client_stream);
        let result = server_task.await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cancel_token_wakes_waiters() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let task = tokio::spawn(async move {
            waiter.cancelled().await;
            true
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        assert!(task.await.unwrap());
        assert!(token.is_cancelled());
    }
}
