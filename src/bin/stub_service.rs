//! Stub map service
//!
//! Serves `POST /graphql`, prints each request body, and answers every
//! request with the same status and body. Handy for trying
//! `location-setter` against 200 / 500 / 511 without a real map service.
//!
//! Usage: cargo run --bin stub-service [bind_addr] [status] [body]
//!
//!   cargo run --bin stub-service 127.0.0.1:4000 511 '{"errors":[{"message":"session expired"}]}'

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;

/// The canned reply handed back for every request
struct Reply {
    status: StatusCode,
    body: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1);
    let bind: SocketAddr = args
        .next()
        .unwrap_or_else(|| "127.0.0.1:4000".to_string())
        .parse()?;
    let status = StatusCode::from_u16(args.next().unwrap_or_else(|| "200".to_string()).parse()?)?;
    let body = args
        .next()
        .unwrap_or_else(|| r#"{"data":{"webhook":{"__typename":"Webhook"}}}"#.to_string());

    println!("🗺️  Stub map service");
    println!("  Listening: http://{}/graphql", bind);
    println!("  Answering: {} {}", status, body);
    println!();

    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app(status, body))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

fn app(status: StatusCode, body: String) -> Router {
    Router::new()
        .route("/graphql", post(webhook))
        .with_state(Arc::new(Reply { status, body }))
}

async fn webhook(State(reply): State<Arc<Reply>>, payload: String) -> impl IntoResponse {
    println!("📨 POST /graphql");
    println!("   {}", payload);
    println!("   ↩️  {}", reply.status);

    (
        reply.status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body.clone(),
    )
}
