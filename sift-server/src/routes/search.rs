use std::collections::BTreeMap;

use hyper::StatusCode;
use query_builder::Request;
use routerify::ext::RequestExt;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::helpers::{parse_query_pairs, state, SiftRequest, SiftResponse};
use crate::responders::json_response;
use crate::{bad_request, get_or_400, json};

#[derive(Serialize)]
struct EndpointSummary<'a> {
    indices: &'a [String],
    features: usize,
}

/// A parameter in a batch body, a bare string or a list of values.
#[derive(Deserialize)]
#[serde(untagged)]
enum ParamValues {
    One(String),
    Many(Vec<String>),
}

impl ParamValues {
    /// The non-empty values, `""` does not activate a filter.
    fn into_values(self) -> Vec<String> {
        let values = match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        };

        values.into_iter().filter(|v| !v.is_empty()).collect()
    }
}

type BatchBody = Vec<BTreeMap<String, ParamValues>>;

/// Converts a batch body into requests, rejecting empty and oversized
/// batches.
fn batch_requests(body: BatchBody, max_batch_size: usize) -> Result<Vec<Request>> {
    if body.is_empty() {
        return bad_request!("a batch must contain at least one search");
    }

    if body.len() > max_batch_size {
        return bad_request!("batch exceeds the maximum number of searches");
    }

    let requests = body
        .into_iter()
        .map(|params| {
            Request::from_pairs(params.into_iter().filter_map(|(param, values)| {
                let values = values.into_values();
                if param.is_empty() || values.is_empty() {
                    None
                } else {
                    Some((param, values))
                }
            }))
        })
        .collect();

    Ok(requests)
}

pub async fn list_endpoints(req: SiftRequest) -> SiftResponse {
    let state = state(&req)?;

    let summaries: BTreeMap<&str, EndpointSummary> = state
        .endpoints
        .iter()
        .map(|(name, endpoint)| {
            let summary = EndpointSummary {
                indices: endpoint.indices(),
                features: endpoint.feature_count(),
            };
            (name.as_str(), summary)
        })
        .collect();

    json_response(StatusCode::OK, &summaries)
}

pub async fn search(req: SiftRequest) -> SiftResponse {
    let state = state(&req)?;
    let name = get_or_400!(req.param("name")).to_string();
    let endpoint = state.endpoint(&name)?;

    let pairs = parse_query_pairs(req.uri().query().unwrap_or_default())?;
    let request = Request::from_pairs(pairs.into_iter().map(|(param, value)| (param, [value])));

    if state.log_search {
        info!(endpoint = %name, params = request.len(), "executing search");
    }

    let result = state
        .executor
        .spawn(move || endpoint.execute(request))
        .await??;

    json_response(StatusCode::OK, &result)
}

pub async fn search_batch(mut req: SiftRequest) -> SiftResponse {
    let body: BatchBody = json!(req.body_mut());
    let state = state(&req)?;
    let name = get_or_400!(req.param("name")).to_string();
    let endpoint = state.endpoint(&name)?;

    let requests = batch_requests(body, state.max_batch_size)?;

    if state.log_search {
        info!(endpoint = %name, searches = requests.len(), "executing search batch");
    }

    let results = state
        .executor
        .spawn(move || endpoint.execute_multiple(requests))
        .await??;

    json_response(StatusCode::OK, &results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SiftError;

    fn body(raw: &str) -> anyhow::Result<BatchBody> {
        Ok(serde_json::from_str(raw)?)
    }

    #[test]
    fn empty_values_do_not_activate_filters() -> anyhow::Result<()> {
        let requests = batch_requests(
            body(r#"[{ "category": "", "brand": ["", "acme"], "tags": [""], "q": "shoes" }]"#)?,
            8,
        )?;

        let expected = Request::from_pairs(vec![("brand", vec!["acme"]), ("q", vec!["shoes"])]);
        assert_eq!(requests, vec![expected]);

        Ok(())
    }

    #[test]
    fn oversized_batch_is_a_bad_request() -> anyhow::Result<()> {
        let err = batch_requests(body(r#"[{}, {}, {}]"#)?, 2).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        assert_eq!(batch_requests(body(r#"[{}, {}]"#)?, 2)?.len(), 2);

        Ok(())
    }

    #[test]
    fn empty_batch_is_a_bad_request() -> anyhow::Result<()> {
        let err = batch_requests(body("[]")?, 2).unwrap_err();
        assert!(matches!(err, SiftError::BadRequest(_)));

        Ok(())
    }
}
