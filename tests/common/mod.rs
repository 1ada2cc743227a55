#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;

use search_portal::backend::{self, AppState};
use search_portal::engine::{IndexMapping, MemoryEngine, SearchEngine, INDEX_NAME};
use search_portal::startup::Readiness;

/// Memory engine with the collection created and `docs` (id, text) written and refreshed.
pub async fn engine_with(docs: &[(&str, &str)]) -> Arc<MemoryEngine> {
    let engine = Arc::new(MemoryEngine::new());
    engine
        .create_index(INDEX_NAME, &IndexMapping::documents())
        .await
        .expect("create index");
    for (id, text) in docs {
        engine
            .index_document(INDEX_NAME, Some(id), text)
            .await
            .expect("index document");
    }
    engine.refresh(INDEX_NAME).await.expect("refresh");
    engine
}

pub fn backend_router(engine: Arc<MemoryEngine>) -> Router {
    backend::router(AppState::new(Readiness::Ready(engine)))
}

pub fn backend_server(engine: Arc<MemoryEngine>) -> TestServer {
    TestServer::new(backend_router(engine)).expect("test server")
}

pub fn not_ready_router() -> Router {
    backend::router(AppState::new(Readiness::NotReady))
}

/// Serve `router` on an ephemeral loopback port for the lifetime of the test runtime.
pub async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    addr
}

/// A loopback address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    listener.local_addr().expect("local addr")
}

pub fn base_url(addr: SocketAddr) -> url::Url {
    url::Url::parse(&format!("http://{addr}/")).expect("url")
}
