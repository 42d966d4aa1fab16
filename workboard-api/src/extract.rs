//! Request extractors

use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequest, FromRequestParts},
    http::request::Parts,
    Extension,
};
use serde::Deserialize;
use workboard_shared::auth::verifier::AuthContext;
use workboard_shared::models::pagination::PageRequest;
use workboard_shared::services::Caller;

use crate::error::ApiError;

/// `Json` whose rejections use the error envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);

/// Client address for the audit trail
///
/// The first `X-Forwarded-For` entry wins; otherwise the socket peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub Option<String>);

pub(crate) fn forwarded_for(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = forwarded_for(parts).or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        Ok(ClientIp(ip))
    }
}

/// The verified caller plus its address
///
/// Only valid behind the auth layer, which stores the [`AuthContext`].
pub struct Authenticated(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(ctx) = Extension::<AuthContext>::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                ApiError::Unauthorized(
                    "Authentication required. Please provide a valid token.".to_string(),
                )
            })?;

        let ClientIp(ip) = match ClientIp::from_request_parts(parts, state).await {
            Ok(ip) => ip,
            Err(never) => match never {},
        };

        Ok(Authenticated(Caller::new(ctx, ip)))
    }
}

/// `?page=&limit=`; extracted next to the filter query of each listing
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct Paging {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Paging {
    pub fn request(&self, default_limit: i64) -> PageRequest {
        PageRequest::new(self.page, self.limit, default_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_client_ip_prefers_forwarded_for() {
        let mut parts = parts(
            Request::builder().header("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
        );
        parts
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9000))));

        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ip.as_deref(), Some("203.0.113.7"));
    }

    #[tokio::test]
    async fn test_client_ip_falls_back_to_peer() {
        let mut parts = parts(Request::builder());
        parts
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 9000))));

        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ip.as_deref(), Some("192.0.2.1"));
    }

    #[tokio::test]
    async fn test_client_ip_unknown() {
        let mut parts = parts(Request::builder());
        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ip, None);
    }

    #[tokio::test]
    async fn test_authenticated_requires_context() {
        let mut parts = parts(Request::builder());
        let result = Authenticated::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_paging_clamps() {
        let paging = Paging {
            page: Some(0),
            limit: Some(500),
        };
        let request = paging.request(20);
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, 100);
    }
}
