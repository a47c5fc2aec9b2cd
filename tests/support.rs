#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use wirecall::handler::RpcHandler;
use wirecall::shutdown::ShutdownHandle;
use wirecall::tcp::{RpcListener, ServerConfig};

/// Echoes the caller's arguments back, wrapped in an object.
#[derive(Default)]
pub struct EchoHandler;

#[async_trait]
impl RpcHandler for EchoHandler {
    async fn handle(&self, args: Value) -> Result<Value, anyhow::Error> {
        Ok(json!({ "echo": args }))
    }
}

/// Fails every call with a recognizable message.
#[derive(Default)]
pub struct FailingHandler;

#[async_trait]
impl RpcHandler for FailingHandler {
    async fn handle(&self, _args: Value) -> Result<Value, anyhow::Error> {
        Err(anyhow!("handler exploded on purpose"))
    }
}

/// Sleeps before echoing, for isolation and timeout scenarios.
pub struct SlowHandler {
    pub delay: Duration,
}

#[async_trait]
impl RpcHandler for SlowHandler {
    async fn handle(&self, args: Value) -> Result<Value, anyhow::Error> {
        tokio::time::sleep(self.delay).await;
        Ok(args)
    }
}

/// A listener serving on an OS-assigned localhost port, with `echo.ping`
/// and `echo.fail` registered.
pub struct TestServer {
    pub listener: Arc<RpcListener>,
    pub shutdown: ShutdownHandle,
    serve_task: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub async fn start() -> TestServer {
        TestServer::start_with_config(ServerConfig::default()).await
    }

    pub async fn start_with_config(config: ServerConfig) -> TestServer {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let listener = Arc::new(
            RpcListener::bind_with_config("127.0.0.1:0", config)
                .await
                .expect("bind test listener"),
        );
        listener
            .register_handler("echo", "ping", Arc::new(EchoHandler))
            .expect("register echo.ping");
        listener
            .register_handler("echo", "fail", Arc::new(FailingHandler))
            .expect("register echo.fail");
        let shutdown = listener.shutdown_handle();
        let serving = listener.clone();
        let serve_task = tokio::spawn(async move { serving.serve().await });
        TestServer { listener, shutdown, serve_task }
    }

    /// Address clients should connect to.
    pub fn addr(&self) -> String {
        format!("127.0.0.1:{}", self.listener.local_port())
    }

    /// Signals shutdown and waits for the accept loop to stop.
    pub async fn stop(self) {
        self.shutdown.signal();
        let _ = self.serve_task.await;
    }
}
