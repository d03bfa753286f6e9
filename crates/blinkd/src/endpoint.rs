//! The idle-timeout HTTP endpoint.
//!
//! Binds a loopback listener on an OS-assigned port, reports its URL once
//! over a rendezvous channel, and answers every request with the same
//! resource until no request has arrived for the configured idle window.

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use blink_lib::rendezvous::RendezvousSender;
use blink_lib::{BlinkError, ContentSource};
use std::future::IntoFuture;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::content::Resource;
use crate::idle::IdleTimer;

/// Bind a listener on `host` with an OS-assigned port.
///
/// # Errors
/// Returns [`BlinkError::BindFailure`] when `host` is not a loopback address
/// or the socket cannot be bound.
pub async fn bind(host: IpAddr) -> Result<TcpListener, BlinkError> {
    if !host.is_loopback() {
        return Err(BlinkError::BindFailure(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{host} is not a loopback address"),
        )));
    }
    TcpListener::bind((host, 0))
        .await
        .map_err(BlinkError::BindFailure)
}

/// The URL clients use to reach `addr`.
///
/// # Examples
///
/// ```
/// use blinkd::endpoint::url_for;
///
/// assert_eq!(url_for("127.0.0.1:8080".parse().expect("addr")), "http://127.0.0.1:8080");
/// assert_eq!(url_for("[::1]:80".parse().expect("addr")), "http://[::1]:80");
/// ```
pub fn url_for(addr: SocketAddr) -> String {
    format!("http://{addr}")
}

/// Serve `source` until the idle window elapses.
///
/// The URL is sent through `reporter` before the first request is accepted.
///
/// # Errors
/// Fails when the source was never consumed, the listener cannot be bound,
/// the URL cannot be delivered, or the server loop fails.
pub async fn serve<S>(source: ContentSource, config: &Config, reporter: S) -> Result<(), BlinkError>
where
    S: RendezvousSender,
{
    let name = source.name.clone();
    let resource = Resource::new(source)
        .await
        .map_err(|e| BlinkError::input(name, e))?;
    let listener = bind(config.host).await?;
    let addr = listener.local_addr().map_err(BlinkError::BindFailure)?;
    let url = url_for(addr);
    let timer = IdleTimer::start(config.idle_timeout());

    reporter
        .send(url.clone())
        .await
        .map_err(BlinkError::RendezvousFailure)?;
    tracing::info!(%url, idle = ?timer.window(), "Serving");

    run(listener, resource, timer, config.shutdown_grace()).await?;
    tracing::info!("Idle window elapsed");
    Ok(())
}

/// Run the HTTP server on `listener` until `timer` expires.
///
/// Once the timer fires no new connections are accepted. In-flight responses
/// get `grace` to finish before this returns regardless.
///
/// # Errors
/// Returns [`BlinkError::Serve`] when the server loop fails.
pub async fn run(
    listener: TcpListener,
    resource: Resource,
    timer: IdleTimer,
    grace: Duration,
) -> Result<(), BlinkError> {
    let app = router(resource, timer.clone());
    let shutdown = {
        let timer = timer.clone();
        async move { timer.expired().await }
    };
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .into_future();

    tokio::select! {
        res = server => res.map_err(BlinkError::Serve),
        () = async {
            timer.expired().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(?grace, "In-flight responses outlived the grace period");
            Ok(())
        }
    }
}

#[derive(Clone)]
struct Shared {
    resource: Arc<Resource>,
    timer: IdleTimer,
}

/// Every path and method lands on the fallback.
fn router(resource: Resource, timer: IdleTimer) -> Router {
    Router::new()
        .fallback(handle)
        .with_state(Shared {
            resource: Arc::new(resource),
            timer,
        })
        .layer(TraceLayer::new_for_http())
}

async fn handle(State(shared): State<Shared>, method: Method, headers: HeaderMap) -> Response {
    shared.timer.reset();
    shared.resource.respond(&method, &headers).await
}
