use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::routes::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const USER_ID_HEADER: &str = "x-user-id";

/// Presented API key, if any
pub fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// Executive caller id, if present and numeric
pub fn user_id(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Gate for dashboard and credential-rotation routes.
///
/// Missing credentials are rejected before any storage access.
pub async fn require_executive(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = user_id(request.headers());
    let key = api_key(request.headers());
    if user_id.is_none() || key.is_none() {
        return Err(ApiError::Unauthorized);
    }

    let conn = state.db.acquire().await?;
    state
        .authenticator
        .authorize_executive(&conn, user_id, key)
        .await?;
    drop(conn);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn api_key_reads_and_trims_the_header() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("  branch-key  "));
        assert_eq!(api_key(&headers), Some("branch-key"));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("   "));
        assert_eq!(api_key(&headers), None);
        assert_eq!(api_key(&HeaderMap::new()), None);
    }

    #[test]
    fn user_id_must_be_numeric() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("42"));
        assert_eq!(user_id(&headers), Some(42));

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("forty-two"));
        assert_eq!(user_id(&headers), None);
    }
}
