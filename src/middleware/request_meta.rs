use axum::{
    extract::{ConnectInfo, OriginalUri, Request},
    http::{header, HeaderMap},
};
use std::net::SocketAddr;

/// Request facts shared by the audit trail and the error log
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: String,
    /// Path plus query string as the client sent it.
    pub url: String,
    pub path: String,
    pub query: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn from_request(req: &Request) -> Self {
        // Nested routers strip their prefix from `uri()`
        let uri = req
            .extensions()
            .get::<OriginalUri>()
            .map(|o| o.0.clone())
            .unwrap_or_else(|| req.uri().clone());

        let url = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Self {
            method: req.method().to_string(),
            url,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            ip: client_ip(req.headers()).or(peer),
            user_agent: req
                .headers()
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }
}

/// First hop of `X-Forwarded-For`, then `X-Real-IP`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn prefers_forwarded_for() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/users/create?x=1")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "10.0.0.9")
            .header("user-agent", "curl/8")
            .body(Body::empty())
            .unwrap();

        let meta = RequestMeta::from_request(&req);
        assert_eq!(meta.method, "POST");
        assert_eq!(meta.url, "/api/v1/users/create?x=1");
        assert_eq!(meta.path, "/api/v1/users/create");
        assert_eq!(meta.query.as_deref(), Some("x=1"));
        assert_eq!(meta.ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8"));
    }

    #[test]
    fn falls_back_to_peer_address() {
        let mut req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        let meta = RequestMeta::from_request(&req);
        assert_eq!(meta.ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(meta.user_agent, None);
    }
}
