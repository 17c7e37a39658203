//! API request handlers

mod creatives;
mod media_buys;
mod steps;
mod system;

pub use creatives::*;
pub use media_buys::*;
pub use steps::*;
pub use system::*;

use crate::error::ApiError;
use axum::http::HeaderMap;
use buyline_types::TenantId;

/// Header carrying the caller's tenant. Authentication proper lives in
/// front of this daemon; the header scopes reads and writes.
pub(crate) const TENANT_HEADER: &str = "x-buyline-tenant";

pub(crate) fn tenant_from_headers(headers: &HeaderMap) -> Result<TenantId, ApiError> {
    match headers.get(TENANT_HEADER) {
        None => Ok(TenantId::new("default")),
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|_| ApiError::BadRequest("tenant header is not valid text".to_string()))?;
            if raw.trim().is_empty() {
                return Err(ApiError::BadRequest(
                    "tenant header must not be empty".to_string(),
                ));
            }
            Ok(TenantId::new(raw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_missing_tenant_header_defaults() {
        let headers = HeaderMap::new();
        let tenant = tenant_from_headers(&headers).unwrap();
        assert_eq!(tenant, TenantId::new("default"));
    }

    #[test]
    fn test_tenant_header_is_honored() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static("acme"));
        let tenant = tenant_from_headers(&headers).unwrap();
        assert_eq!(tenant, TenantId::new("acme"));
    }

    #[test]
    fn test_blank_tenant_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static("  "));
        assert!(tenant_from_headers(&headers).is_err());
    }
}
