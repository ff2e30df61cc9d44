// Keep-alive server
// Answers uptime pings with the aggregate buffer size and exposes
// Prometheus metrics on /metrics.

use std::sync::Arc;

use tracing::info;
use warp::Filter;

use crate::buffer::MessageStore;
use crate::metrics::MetricsRegistry;

pub async fn run(store: MessageStore, metrics: Arc<MetricsRegistry>, port: u16) {
    let status_route = warp::path::end()
        .and(warp::get())
        .and(with_store(store))
        .and_then(handle_status);

    let metrics_route = warp::path("metrics")
        .and(warp::get())
        .and(with_metrics(metrics))
        .and_then(handle_metrics);

    let routes = status_route.or(metrics_route);

    info!(port, "Keep-alive server listening");
    warp::serve(routes).run(([0, 0, 0, 0], port)).await;
}

fn with_store(
    store: MessageStore,
) -> impl Filter<Extract = (MessageStore,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || store.clone())
}

fn with_metrics(
    metrics: Arc<MetricsRegistry>,
) -> impl Filter<Extract = (Arc<MetricsRegistry>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || metrics.clone())
}

async fn handle_status(store: MessageStore) -> Result<impl warp::Reply, warp::Rejection> {
    let count = store.total_buffered().await;
    Ok(format!("Bot is running! Cached messages: {}", count))
}

async fn handle_metrics(metrics: Arc<MetricsRegistry>) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::with_header(
        metrics.gather_metrics(),
        "Content-Type",
        "text/plain; version=0.0.4; charset=utf-8",
    ))
}
