//! Request bodies.

use axum::extract::{rejection::JsonRejection, FromRequest, Request};
use crate::EcommerceError;

/// `axum::Json` whose rejections (bad syntax, missing fields, wrong content type)
/// come back as a 400 validation error in the usual error body.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = EcommerceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(EcommerceError::Validation(rejection.body_text())),
        }
    }
}
