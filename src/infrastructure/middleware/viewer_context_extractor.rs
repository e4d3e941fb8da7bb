// ViewerContext Extractor - hands handlers the identity resolved by the middleware

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use std::sync::Arc;

use crate::infrastructure::viewer::ViewerContext;

/// Cheap-to-clone handle on the request's `ViewerContext`.
///
/// ```ignore
/// async fn handler(vc: Vc, State(state): State<AppState>) -> AppResult<Json<Vec<Page>>> {
///     Ok(Json(state.pages.list(&vc).await?))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Vc(Arc<ViewerContext>);

// vc.user_id, vc.require_user(), ... work directly on the wrapper
impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<ViewerContext> for Vc {
    fn as_ref(&self) -> &ViewerContext {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        // Missing context means the middleware was not layered on this route
        let vc = parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .map(|vc| Vc(vc.clone()))
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR);

        async move { vc }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::UserId;
    use axum::http::Request;

    #[tokio::test]
    async fn extracts_context_from_extensions() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        parts
            .extensions
            .insert(Arc::new(ViewerContext::for_user(UserId(3))));

        let vc = Vc::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(vc.user_id, Some(UserId(3)));
        assert!(vc.is_authenticated());
    }

    #[tokio::test]
    async fn missing_context_is_a_server_error() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let err = Vc::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
