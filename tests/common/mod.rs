#![allow(dead_code)]

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    routing::get,
    Router,
};
use sitecheck::{Method, Site};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Local HTTP server with `/ok` (200), `/fail` (500) and `/missing` (404).
pub async fn spawn_http_fixture() -> SocketAddr {
    let app = Router::new()
        .route("/ok", get(|| async { "ok" }))
        .route(
            "/fail",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "fail") }),
        )
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Forward HTTP proxy stand-in: answers 200 to every request and records
/// the request URIs it saw.
pub async fn spawn_forward_proxy() -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .fallback(|State(seen): State<Arc<Mutex<Vec<String>>>>, uri: Uri| async move {
            seen.lock().unwrap().push(uri.to_string());
            "proxied"
        })
        .with_state(Arc::clone(&seen));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

/// An address nothing is listening on.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

pub fn site(id: &str, method: &str, target: impl Into<String>) -> Site {
    Site {
        id: id.to_string(),
        target: target.into(),
        name: format!("site-{id}"),
        method: Method::from(method.to_string()),
    }
}
