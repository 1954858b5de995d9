/// Request extractors
///
/// [`ValidJson`] is `Json<T>` plus `validator` checks, with every rejection
/// rendered as a 400 [`ApiError`] instead of Axum's plain-text 415/422.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ApiError;

/// JSON body that has been deserialized and validated
///
/// # Example
///
/// ```
/// use smartrental_api::extract::ValidJson;
/// use serde::Deserialize;
/// use validator::Validate;
///
/// #[derive(Deserialize, Validate)]
/// struct Rename {
///     #[validate(length(min = 1, max = 150))]
///     username: String,
/// }
///
/// async fn rename(ValidJson(body): ValidJson<Rename>) -> String {
///     body.username
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;

        value.validate()?;

        Ok(ValidJson(value))
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(e) => ApiError::BadRequest(e.body_text()),
        JsonRejection::JsonSyntaxError(_) => {
            ApiError::BadRequest("Request body is not valid JSON".to_string())
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::BadRequest("Expected Content-Type: application/json".to_string())
        }
        other => ApiError::BadRequest(other.body_text()),
    }
}
