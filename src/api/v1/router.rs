use super::error::*;
use super::handler;
use crate::application_port::SessionService;
use crate::domain_model::Subject;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

const AUTHORIZATION: &str = "authorization";

pub fn routes(
    session_service: Arc<dyn SessionService>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let login = warp::post()
        .and(warp::path("auth"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(with(session_service.clone()))
        .and_then(handler::login);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::header::optional::<String>(AUTHORIZATION))
        .and(warp::body::json())
        .and(with(session_service.clone()))
        .and_then(handler::refresh);

    let whoami = warp::get()
        .and(warp::path("whoami"))
        .and(warp::path::end())
        .and(with_verification(session_service))
        .and_then(handler::whoami);

    login.or(refresh).or(whoami)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_verification(
    session_service: Arc<dyn SessionService>,
) -> impl Filter<Extract = (Subject,), Error = warp::Rejection> + Clone {
    warp::header::<String>(AUTHORIZATION).and_then(move |header: String| {
        let session_service = session_service.clone();
        async move {
            let token = handler::bearer_token(&header)
                .ok_or_else(|| reject::custom(ApiErrorCode::InvalidToken))?;
            let subject = session_service
                .authenticate(&token)
                .await
                .map_err(ApiErrorCode::from)
                .map_err(reject::custom)?;
            Ok::<Subject, warp::Rejection>(subject)
        }
    })
}
