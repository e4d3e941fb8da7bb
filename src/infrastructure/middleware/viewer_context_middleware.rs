// ViewerContext Middleware - resolves the bearer token into a request-scoped identity

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::infrastructure::viewer::ViewerContext;
use crate::services::auth_service::AuthService;

/// Application state that can resolve session tokens
pub trait HasAuthService {
    fn auth_service(&self) -> &AuthService;
}

/// Inject an `Arc<ViewerContext>` into the request extensions.
/// Unknown or missing tokens produce an unauthenticated viewer rather than a
/// rejection; each operation decides what that means.
pub async fn viewer_context_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    T: HasAuthService + Clone + Send + Sync + 'static,
{
    let token = extract_bearer_token(request.headers())?;
    let request_id = format!("req-{}", Uuid::new_v4());

    let viewer_context = match token {
        Some(token) => match app_state.auth_service().resolve_session(&token).await {
            Ok(Some(user_id)) => ViewerContext::authenticated(user_id, Some(token), request_id),
            Ok(None) => ViewerContext::unauthenticated(request_id),
            Err(e) => {
                warn!("Session lookup failed for {}: {}", request_id, e);
                return Err(StatusCode::INTERNAL_SERVER_ERROR);
            }
        },
        None => ViewerContext::unauthenticated(request_id),
    };

    request.extensions_mut().insert(Arc::new(viewer_context));
    Ok(next.run(request).await)
}

/// `Authorization: Bearer <token>`; anything else in that header is a bad request
fn extract_bearer_token(headers: &HeaderMap) -> Result<Option<String>, StatusCode> {
    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let auth_str = auth_header.to_str().map_err(|_| StatusCode::BAD_REQUEST)?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer token123"));
        assert_eq!(extract_bearer_token(&headers).unwrap(), Some("token123".to_string()));
    }

    #[test]
    fn missing_header_is_anonymous() {
        let headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers).unwrap(), None);
    }

    #[test]
    fn other_schemes_are_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_bearer_token(&headers), Err(StatusCode::BAD_REQUEST));

        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer_token(&headers), Err(StatusCode::BAD_REQUEST));
    }
}
