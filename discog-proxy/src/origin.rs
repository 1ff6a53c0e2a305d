//! Pass-through to the origin host.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tracing::debug;

/// Connection-scoped headers that must not be relayed (RFC 9110 §7.6.1).
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, thiserror::Error)]
pub enum OriginError {
    #[error("origin request failed: {0}")]
    Transport(String),
}

#[derive(Debug)]
pub struct ForwardRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug)]
pub struct ForwardResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IntoResponse for ForwardResponse {
    fn into_response(self) -> Response {
        let mut headers = strip_hop_by_hop(self.headers);
        headers.remove(header::CONTENT_LENGTH);
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        (self.status, headers, self.body).into_response()
    }
}

#[async_trait]
pub trait Origin: Send + Sync {
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse, OriginError>;
}

pub struct HttpOrigin {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpOrigin {
    pub fn new(base_url: String, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout,
        }
    }

    fn target_url(&self, uri: &Uri) -> String {
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        format!("{}{}", self.base_url, path_and_query)
    }
}

/// Request headers to send upstream: the caller's headers minus hop-by-hop
/// ones and `Host`, with any caching layer told to revalidate.
pub fn outbound_headers(headers: HeaderMap) -> HeaderMap {
    let mut headers = strip_hop_by_hop(headers);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

fn strip_hop_by_hop(mut headers: HeaderMap) -> HeaderMap {
    // Headers listed in `Connection` are connection-scoped too.
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
    headers
}

#[async_trait]
impl Origin for HttpOrigin {
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse, OriginError> {
        let url = self.target_url(&request.uri);
        debug!("forwarding {} {url}", request.method);

        let resp = self
            .client
            .request(request.method, &url)
            .headers(outbound_headers(request.headers))
            .body(request.body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| OriginError::Transport(format!("{url}: {e}")))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| OriginError::Transport(format!("read body {url}: {e}")))?;

        Ok(ForwardResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_headers_disable_caching() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "music.example.com".parse().unwrap());
        headers.insert(header::CACHE_CONTROL, "max-age=3600".parse().unwrap());
        headers.insert(header::USER_AGENT, "Mozilla/5.0".parse().unwrap());
        headers.insert(header::CONNECTION, "keep-alive, x-session".parse().unwrap());
        headers.insert("x-session", "abc".parse().unwrap());
        headers.insert("keep-alive", "timeout=5".parse().unwrap());

        let out = outbound_headers(headers);
        assert!(out.get(header::HOST).is_none());
        assert!(out.get(header::CONNECTION).is_none());
        assert!(out.get("x-session").is_none());
        assert!(out.get("keep-alive").is_none());
        assert_eq!(out.get(header::CACHE_CONTROL).unwrap(), "no-cache");
        assert_eq!(out.get(header::PRAGMA).unwrap(), "no-cache");
        assert_eq!(out.get(header::USER_AGENT).unwrap(), "Mozilla/5.0");
    }

    #[test]
    fn target_url_keeps_path_and_query() {
        let origin = HttpOrigin::new(
            "https://origin.example.com/".to_string(),
            reqwest::Client::new(),
            Duration::from_secs(5),
        );
        assert_eq!(
            origin.target_url(&"/pages/freshPlayer.html?track=92".parse().unwrap()),
            "https://origin.example.com/pages/freshPlayer.html?track=92"
        );
        assert_eq!(
            origin.target_url(&"/".parse().unwrap()),
            "https://origin.example.com/"
        );
    }

    #[test]
    fn forwarded_response_is_never_cached() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CACHE_CONTROL, "public, max-age=600".parse().unwrap());
        headers.insert(header::CONTENT_TYPE, "text/html".parse().unwrap());
        headers.insert(header::TRANSFER_ENCODING, "chunked".parse().unwrap());

        let resp = ForwardResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::from_static(b"<html></html>"),
        }
        .into_response();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "text/html");
        assert!(resp.headers().get(header::TRANSFER_ENCODING).is_none());
    }

    #[tokio::test]
    async fn unreachable_origin_is_transport_error() {
        let origin = HttpOrigin::new(
            "http://127.0.0.1:9".to_string(),
            reqwest::Client::new(),
            Duration::from_secs(2),
        );
        let err = origin
            .forward(ForwardRequest {
                method: Method::GET,
                uri: "/".parse().unwrap(),
                headers: HeaderMap::new(),
                body: Bytes::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OriginError::Transport(_)));
    }
}
