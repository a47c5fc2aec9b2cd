use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

use wirecall::handler_fn;
use wirecall::tcp::RpcListener;

/// Port number on which the RPC server will listen
const HOSTPORT: u16 = 46999;

/// Demo RPC server using the wirecall library.
/// Registers a couple of methods and serves until interrupted.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(std::io::stderr)
        .init();

    let listener = RpcListener::bind(&format!("0.0.0.0:{HOSTPORT}")).await.unwrap();
    listener
        .register_handler(
            "echo",
            "ping",
            Arc::new(handler_fn(|args| async move { Ok(json!({ "echo": args })) })),
        )
        .unwrap();
    listener
        .register_handler(
            "clock",
            "now",
            Arc::new(handler_fn(|_| async {
                let unix_millis = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0);
                Ok(json!({ "unix_millis": unix_millis }))
            })),
        )
        .unwrap();

    println!("Serving RPC on 0.0.0.0:{HOSTPORT}");
    println!("Methods: echo.ping (echoes its arguments), clock.now (server time)");
    println!("You can call them with: cargo run --example echocall");
    listener.serve().await.unwrap();
}
