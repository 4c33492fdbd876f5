//! HTTP front end: every request goes through the site router

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::response::Response;
use http::header::IF_NONE_MATCH;
use http::{HeaderMap, Method, Uri};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::content::DocsResponse;
use crate::site::handler::{SiteHandler, SiteRequest};
use crate::site::router::SiteRouter;

/// Builds the axum application; there are no fixed routes, only the site router
pub fn app<H: SiteHandler + 'static>(router: Arc<SiteRouter<H>>) -> Router {
    Router::new().fallback(handle::<H>).with_state(router)
}

/// Serves until Ctrl-C is received
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}", addr);
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn handle<H: SiteHandler + 'static>(
    State(router): State<Arc<SiteRouter<H>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let request = SiteRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().filter(|q| !q.is_empty()).map(str::to_string),
        if_none_match: headers
            .get(IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    into_response(router.route(&request).await)
}

fn into_response(response: DocsResponse) -> Response {
    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() = response.status;
    *out.headers_mut() = response.headers;
    out
}
