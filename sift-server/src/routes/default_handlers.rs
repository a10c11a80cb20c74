use hyper::{Body, Response, StatusCode};
use routerify::RouteError;

use crate::error::SiftError;
use crate::helpers::{SiftRequest, SiftResponse};
use crate::responders::json_response;

pub async fn handle_404(_req: SiftRequest) -> SiftResponse {
    json_response(StatusCode::NOT_FOUND, "No route matched for path.")
}

pub async fn error_handler(err: RouteError) -> Response<Body> {
    let (status, message) = match err.downcast::<SiftError>() {
        Ok(e) => {
            let status = e.status();
            if status.is_server_error() {
                error!(error = %e, "request failed");
            } else {
                debug!(error = %e, "request rejected");
            }

            (status, e.to_string())
        },
        Err(other) => {
            error!(error = %other, "unhandled router error");
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        },
    };

    match json_response(status, &message) {
        Ok(resp) => resp,
        Err(_) => {
            let mut resp = Response::new(Body::from(message));
            *resp.status_mut() = status;
            resp
        },
    }
}
