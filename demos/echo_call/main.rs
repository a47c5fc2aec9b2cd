use std::time::Duration;

use serde_json::json;

use wirecall::invoke_once;

/// Address of a running echoserver demo
const DEFAULT_ADDR: &str = "127.0.0.1:46999";

/// Demo RPC client using the wirecall library.
/// Makes one-shot calls against a running echoserver demo.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(std::io::stderr)
        .init();

    let addr = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_ADDR.to_string());

    let echoed = invoke_once(
        addr.as_str(),
        "echo",
        "ping",
        json!({ "hello": "wirecall" }),
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    println!("echo.ping -> {echoed}");

    let now = invoke_once(addr.as_str(), "clock", "now", json!({}), Duration::from_secs(5))
        .await
        .unwrap();
    println!("clock.now -> {now}");
}
