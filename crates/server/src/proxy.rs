//! HTTP/1 front end that pages talk to.
//!
//! Each connection runs on its own task. Each request is turned into a
//! [`Request`] on the origin, then routed while the lifecycle is in control
//! or forwarded untouched otherwise.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderName, HeaderValue};
use hyper::http::request::Parts;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Response, StatusCode};
use hyper_util::rt::TokioIo;
use shellcache_client::{is_hop_by_hop, resolve};
use shellcache_core::{Error, HttpResponse, Network, Request};
use tokio::net::TcpListener;
use url::Url;

use crate::error::{ProxyError, failed_fetch};
use crate::lifecycle::Lifecycle;
use crate::router::Router;

/// Request header browsers set to `navigate` for full-page loads.
const FETCH_MODE: &str = "sec-fetch-mode";

pub struct Proxy {
    origin: Url,
    lifecycle: Arc<Lifecycle>,
    router: Arc<Router>,
    network: Arc<dyn Network>,
    /// Largest request body accepted from a page.
    max_body: usize,
}

impl Proxy {
    pub fn new(
        origin: Url, lifecycle: Arc<Lifecycle>, router: Arc<Router>, network: Arc<dyn Network>, max_body: usize,
    ) -> Self {
        Self { origin, lifecycle, router, network, max_body }
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn serve(self: Arc<Self>, listener: TcpListener, shutdown: impl Future<Output = ()>) -> std::io::Result<()> {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutting down proxy");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            continue;
                        }
                    };

                    let proxy = Arc::clone(&self);
                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let proxy = Arc::clone(&proxy);
                            async move { Ok::<_, Infallible>(proxy.handle(req).await) }
                        });
                        if let Err(e) = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await
                        {
                            tracing::debug!(%peer, error = %e, "connection ended with error");
                        }
                    });
                }
            }
        }
    }

    async fn handle(self: Arc<Self>, req: hyper::Request<Incoming>) -> Response<Full<Bytes>> {
        let (parts, body) = req.into_parts();
        let body = match Limited::new(body, self.max_body).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                tracing::debug!(uri = %parts.uri, limit = self.max_body, "request body too large");
                return Response::from(&ProxyError::BodyTooLarge(self.max_body));
            }
            Err(e) => return Response::from(&ProxyError::BodyRead(e.to_string())),
        };

        match intercepted_request(&self.origin, &parts, body) {
            Ok(request) => self.respond(request).await,
            Err(e) => {
                tracing::debug!(uri = %parts.uri, error = %e, "rejected request");
                Response::from(&e)
            }
        }
    }

    /// Serve one request on its own task.
    ///
    /// The page dropping the connection does not abort a fetch or a store
    /// write that is already under way.
    pub async fn respond(self: Arc<Self>, request: Request) -> Response<Full<Bytes>> {
        let task = tokio::spawn(async move { self.dispatch(&request).await });

        match task.await {
            Ok(Ok(response)) => into_hyper(response),
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "request failed");
                failed_fetch(&e)
            }
            Err(e) => Response::from(&ProxyError::Internal(e.to_string())),
        }
    }

    async fn dispatch(&self, request: &Request) -> Result<HttpResponse, Error> {
        if self.lifecycle.is_controlling()
            && let Some(response) = self.router.handle(request).await?
        {
            return Ok(response);
        }
        self.network.fetch(request).await
    }
}

fn intercepted_request(origin: &Url, parts: &Parts, body: Bytes) -> Result<Request, ProxyError> {
    let target = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let url = resolve(origin, target).map_err(|e| ProxyError::InvalidTarget(e.to_string()))?;

    let navigate = parts
        .headers
        .get(FETCH_MODE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("navigate"));

    let headers = parts
        .headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect();

    Ok(Request { method: parts.method.as_str().to_string(), url, navigate, headers, body })
}

fn into_hyper(response: HttpResponse) -> Response<Full<Bytes>> {
    let mut out = Response::new(Full::new(response.body));
    *out.status_mut() = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);

    for (name, value) in response.headers.iter().filter(|(name, _)| !is_hop_by_hop(name)) {
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            out.headers_mut().append(name, value);
        }
    }

    out
}
