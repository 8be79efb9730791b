use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let code = if let Some(code) = err.find::<ApiErrorCode>() {
        code.clone()
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some() {
        ApiErrorCode::MalformedBody
    } else if err.find::<reject::UnsupportedMediaType>().is_some() {
        ApiErrorCode::UnsupportedMediaType
    } else if err.find::<reject::MissingHeader>().is_some()
        || err.find::<reject::InvalidHeader>().is_some()
    {
        // only the authorization header is read
        ApiErrorCode::InvalidToken
    } else if err.is_not_found() || err.find::<reject::MethodNotAllowed>().is_some() {
        ApiErrorCode::NotFound
    } else {
        ApiErrorCode::internal(format!("unhandled rejection: {:?}", err))
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), code.to_string()));
    Ok(warp::reply::with_status(json, code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
pub enum ApiErrorCode {
    #[error("Missing or empty request field")]
    ValidationError,
    #[error("Request body could not be decoded")]
    MalformedBody,
    #[error("Unsupported content type")]
    UnsupportedMediaType,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Token has expired")]
    ExpiredToken,
    #[error("Not found")]
    NotFound,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ApiErrorCode::MalformedBody => StatusCode::UNPROCESSABLE_ENTITY,
            ApiErrorCode::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiErrorCode::InvalidToken | ApiErrorCode::ExpiredToken => StatusCode::UNAUTHORIZED,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::TokenInvalid => ApiErrorCode::InvalidToken,
            AuthError::TokenExpired => ApiErrorCode::ExpiredToken,
            AuthError::Persistence(e) => ApiErrorCode::internal(e),
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}
