use super::error::*;
use crate::application_port::*;
use crate::domain_model::Subject;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

pub async fn login(
    subject: String,
    session_service: Arc<dyn SessionService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let subject = Subject(subject);
    if subject.is_blank() {
        return Err(reject::custom(ApiErrorCode::ValidationError));
    }

    let pair = session_service
        .create_session(&subject)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(pair)))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

pub async fn refresh(
    authorization: Option<String>,
    body: RefreshRequest,
    session_service: Arc<dyn SessionService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if body.refresh_token.is_empty() {
        return Err(reject::custom(ApiErrorCode::ValidationError));
    }

    let access_token = authorization
        .map(|header| bearer_token(&header).ok_or(ApiErrorCode::InvalidToken))
        .transpose()
        .map_err(reject::custom)?;

    let pair = session_service
        .refresh_session(&RefreshToken(body.refresh_token), access_token.as_ref())
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(pair)))
}

#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub subject: Subject,
}

pub async fn whoami(subject: Subject) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok(WhoamiResponse { subject })))
}

pub fn bearer_token(header: &str) -> Option<AccessToken> {
    header
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .map(|token| AccessToken(token.to_string()))
}
