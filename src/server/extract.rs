//! Request extractors for the submission endpoint

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequest, FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde_json::Value;

use super::error::ApiError;
use crate::submission::{RawSubmission, RequestContext};

/// First address in `X-Forwarded-For`, if any
fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("x-forwarded-for")?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    if first.is_empty() {
        return None;
    }
    Some(first.to_string())
}

impl RequestContext {
    /// Client address from `X-Forwarded-For`, else the peer socket; user agent
    /// from its header.
    pub fn from_headers(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let ip_address = forwarded_for(headers).or_else(|| peer.map(|addr| addr.ip().to_string()));
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Self::new(ip_address, user_agent)
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::from_headers(&parts.headers, peer))
    }
}

/// A submission body, JSON or urlencoded
pub struct SubmissionPayload(pub RawSubmission);

impl<S> FromRequest<S> for SubmissionPayload
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| {
                    tracing::debug!("Rejected form body: {}", e.body_text());
                    ApiError::InvalidBody.into_response()
                })?;
            Ok(Self(RawSubmission::from_pairs(pairs)))
        } else {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| {
                    tracing::debug!("Rejected JSON body: {}", e.body_text());
                    ApiError::InvalidBody.into_response()
                })?;
            Ok(Self(RawSubmission::from_json(&value)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_wins_over_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.4, 10.0.0.1"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));

        let peer: SocketAddr = "127.0.0.1:5555".parse().unwrap();
        let ctx = RequestContext::from_headers(&headers, Some(peer));
        assert_eq!(ctx.ip_address.as_deref(), Some("198.51.100.4"));
        assert_eq!(ctx.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn test_peer_address_fallback() {
        let peer: SocketAddr = "192.0.2.10:40000".parse().unwrap();
        let ctx = RequestContext::from_headers(&HeaderMap::new(), Some(peer));
        assert_eq!(ctx.ip_address.as_deref(), Some("192.0.2.10"));
        assert_eq!(ctx.user_agent, None);

        let ctx = RequestContext::from_headers(&HeaderMap::new(), None);
        assert_eq!(ctx, RequestContext::default());
    }
}
