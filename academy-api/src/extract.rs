/// Extractors whose rejections use the API error envelope
///
/// Axum's own `Json`, `Query` and `Multipart` reject with plain-text bodies.
/// These wrappers turn the rejection into an [`ApiError`] instead.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Multipart, Request},
    http::request::Parts,
};
use serde_json::Value;

use crate::error::ApiError;

/// JSON object body
///
/// Only a top-level object is accepted. serde would otherwise bind a JSON
/// array to a struct's fields by position.
#[derive(Debug, Clone)]
pub struct AppJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(body) = axum::Json::<Value>::from_request(req, state).await?;
        from_object(body).map(AppJson)
    }
}

fn from_object<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    if !body.is_object() {
        return Err(ApiError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    }

    serde_json::from_value(body).map_err(|e| {
        ApiError::BadRequest(format!(
            "Failed to deserialize the JSON body into the target type: {}",
            e
        ))
    })
}

/// Query string
#[derive(Debug, Clone)]
pub struct AppQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for AppQuery<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) =
            axum::extract::Query::<T>::from_request_parts(parts, state).await?;
        Ok(AppQuery(value))
    }
}

/// `multipart/form-data` body
pub struct AppMultipart(pub Multipart);

#[async_trait]
impl<S> FromRequest<S> for AppMultipart
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state).await?;
        Ok(AppMultipart(multipart))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Credentials {
        email: String,
        password: String,
    }

    #[test]
    fn test_object_body_accepted() {
        let creds: Credentials = from_object(json!({"email": "a@b.com", "password": "pw"})).unwrap();
        assert_eq!(creds.email, "a@b.com");
        assert_eq!(creds.password, "pw");
    }

    #[test]
    fn test_positional_array_rejected() {
        let result = from_object::<Credentials>(json!(["a@b.com", "pw"]));
        assert!(matches!(result, Err(ApiError::BadRequest(ref m)) if m.contains("JSON object")));
    }

    #[test]
    fn test_scalar_and_missing_fields_rejected() {
        assert!(matches!(
            from_object::<Credentials>(json!("a@b.com")),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            from_object::<Credentials>(json!({"email": "a@b.com"})),
            Err(ApiError::BadRequest(_))
        ));
    }
}
