use hyper::{Body, Request, Response};
use routerify::ext::RequestExt;

use crate::error::{Result, SiftError};
use crate::state::State;

pub type SiftRequest = Request<Body>;
pub type SiftResponse = Result<Response<Body>>;

#[macro_export]
macro_rules! bad_request {
    ($val:expr) => {{
        Err($crate::error::SiftError::BadRequest($val))
    }};
}

#[macro_export]
macro_rules! get_or_400 {
    ($val:expr) => {{
        match $val {
            Some(v) => v,
            None => return $crate::bad_request!("missing a required path parameter"),
        }
    }};
}

#[macro_export]
macro_rules! json {
    ($body:expr) => {{
        let body = hyper::body::to_bytes($body).await?;
        serde_json::from_slice(&body)?
    }};
}

/// The shared server state attached to the router.
pub fn state(req: &SiftRequest) -> Result<State> {
    req.data::<State>()
        .cloned()
        .ok_or_else(|| SiftError::Other(anyhow::anyhow!("router is missing the server state")))
}

/// Splits a raw URL query string into decoded `(name, value)` pairs.
///
/// `+` is a space and empty values are dropped, `category=` does not
/// activate a filter.
pub fn parse_query_pairs(query: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = vec![];

    for part in query.split('&').filter(|p| !p.is_empty()) {
        let (name, value) = part.split_once('=').unwrap_or((part, ""));

        let name = decode_component(name)?;
        let value = decode_component(value)?;
        if name.is_empty() || value.is_empty() {
            continue;
        }

        pairs.push((name, value));
    }

    Ok(pairs)
}

fn decode_component(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|v| v.into_owned())
        .map_err(|_| SiftError::BadRequest("query string is not valid UTF-8"))
}
