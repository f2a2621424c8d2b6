//! Example: Calculator
//!
//! Runs a TCP JSON-RPC server and a client on the same peer engine, then
//! issues a few calls both singly and as a batch.
//! Usage: cargo run --example calculator

use std::sync::Arc;

use serde_json::json;
use tandem::{DefaultHandler, Peer, ServeMux, Server, ERROR_INVALID_PARAMS};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mux = Arc::new(ServeMux::new());
    mux.handle_fn("sum", |w, r| async move {
        match r.parse_params::<Vec<i64>>() {
            Ok(nums) => {
                let _ = w.write_message(nums.iter().sum::<i64>());
            }
            Err(e) => {
                let _ = w.write_error(ERROR_INVALID_PARAMS, e);
            }
        }
    })?;
    mux.handle_fn("product", |w, r| async move {
        match r.parse_params::<Vec<i64>>() {
            Ok(nums) => {
                let _ = w.write_message(nums.iter().product::<i64>());
            }
            Err(e) => {
                let _ = w.write_error(ERROR_INVALID_PARAMS, e);
            }
        }
    })?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = Server::new(mux);
    let srv = server.clone();
    tokio::spawn(async move {
        let _ = srv.serve(listener).await;
    });

    let cli = Peer::dial(addr, Arc::new(DefaultHandler)).await?;
    let ctx = CancellationToken::new();

    let sum = cli.invoke(&ctx, "sum", json!([3, 5, 7])).await?;
    println!("sum(3, 5, 7) = {sum}");

    let mut batch = cli.batch();
    let a = batch.invoke("sum", json!([1, 2, 3]))?;
    let b = batch.invoke("product", json!([2, 4, 6]))?;
    batch.notify("log", json!(["batch away"]))?;
    batch.commit(&ctx).await?;
    println!("batched sum = {:?}, product = {:?}", a.get(), b.get());

    cli.close().await?;
    server.close().await?;
    Ok(())
}
