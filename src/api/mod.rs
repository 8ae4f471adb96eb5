use crate::state::SharedState;
use axum::Router;
use axum::routing::get;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

pub mod handlers;
pub mod responses;

/// Longest wait for open HTTP connections once shutdown has been requested.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(handlers::get_index))
        .route("/distance", get(handlers::get_distance))
        .route("/health", get(handlers::get_health))
        .with_state(state)
}

/// Serve the API until `signal` resolves.
///
/// `stop` is raised as soon as the signal arrives, before any connection is
/// drained, so the control loop never waits on HTTP clients. Draining is cut
/// off after `drain`.
pub async fn serve_until<F>(
    listener: TcpListener,
    state: SharedState,
    signal: F,
    stop: Arc<AtomicBool>,
    drain: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    let (drain_tx, drain_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = drain_rx.await;
        })
        .into_future();
    let mut server = std::pin::pin!(server);

    tokio::select! {
        served = &mut server => {
            stop.store(true, Ordering::Relaxed);
            return served;
        }
        () = signal => {}
    }

    stop.store(true, Ordering::Relaxed);
    info!("Stop requested, draining HTTP connections");
    let _ = drain_tx.send(());

    match tokio::time::timeout(drain, server).await {
        Ok(served) => served,
        Err(_) => {
            warn!(
                drain_ms = drain.as_millis(),
                "HTTP connections still open after drain timeout, closing"
            );
            Ok(())
        }
    }
}
