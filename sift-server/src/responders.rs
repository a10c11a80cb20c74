use headers::{ContentType, HeaderMapExt};
use hyper::{Body, StatusCode};
use serde::Serialize;

use crate::error::Result;

#[derive(Serialize)]
pub struct Response<'a, T: Serialize + ?Sized> {
    status: u16,
    data: &'a T,
}

/// Wraps the payload as `{"status": .., "data": ..}`.
pub fn json_response<T: Serialize + ?Sized>(
    status: StatusCode,
    body: &T,
) -> Result<hyper::Response<Body>> {
    let payload = Response {
        status: status.as_u16(),
        data: body,
    };

    let buffer = serde_json::to_vec(&payload)?;
    let mut resp = hyper::Response::new(Body::from(buffer));
    *resp.status_mut() = status;
    resp.headers_mut().typed_insert(ContentType::json());

    Ok(resp)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    #[tokio::test]
    async fn wraps_payload_with_status() -> anyhow::Result<()> {
        let resp = json_response(StatusCode::NOT_FOUND, "missing")?;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body = hyper::body::to_bytes(resp.into_body()).await?;
        let decoded: Value = serde_json::from_slice(&body)?;
        assert_eq!(decoded, json!({ "status": 404, "data": "missing" }));

        Ok(())
    }
}
