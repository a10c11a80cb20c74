use std::time::Duration;

use anyhow::{bail, Context, Result};
use query_builder::{QueryBuilder, SearchResult};
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use search_pipeline::{Backend, MultiRawResponse, RawResponse};
use serde::de::DeserializeOwned;
use serde_json::json;

/// A search engine speaking the Elasticsearch `_search` / `_msearch` API.
///
/// The client blocks, calls must come from outside the async runtime.
pub struct ElasticBackend {
    client: Client,
    base_url: String,
}

impl ElasticBackend {
    pub fn connect(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sift/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building engine http client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, indices: &[String]) -> String {
        if indices.is_empty() {
            format!("{}/_search", self.base_url)
        } else {
            format!("{}/{}/_search", self.base_url, join_indices(indices))
        }
    }

    fn multi_search_url(&self) -> String {
        format!("{}/_msearch", self.base_url)
    }
}

fn join_indices(indices: &[String]) -> String {
    indices
        .iter()
        .map(|index| urlencoding::encode(index))
        .collect::<Vec<_>>()
        .join(",")
}

/// Renders the newline delimited `_msearch` body, one header and one
/// search line per query.
fn multi_search_body(queries: &[QueryBuilder]) -> Result<String> {
    let mut body = String::new();

    for query in queries {
        let header = if query.indices().is_empty() {
            json!({})
        } else {
            json!({ "index": query.indices().join(",") })
        };

        body.push_str(&serde_json::to_string(&header)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&query.build())?);
        body.push('\n');
    }

    Ok(body)
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        bail!("search engine returned {}: {}", status, body);
    }

    response.json::<T>().context("decoding search engine response")
}

impl Backend for ElasticBackend {
    #[instrument(name = "engine-search", skip_all, fields(indices = ?query.indices()))]
    fn execute(&self, query: &QueryBuilder) -> Result<SearchResult> {
        let response = self
            .client
            .post(self.search_url(query.indices()))
            .json(&query.build())
            .send()
            .context("sending search to engine")?;

        let raw: RawResponse = decode(response)?;
        debug!(took_ms = raw.took, "engine search complete");

        raw.into_result()
    }

    #[instrument(name = "engine-multi-search", skip_all, fields(queries = queries.len()))]
    fn execute_multiple(&self, queries: &[QueryBuilder]) -> Result<Vec<SearchResult>> {
        if queries.is_empty() {
            return Ok(vec![]);
        }

        let response = self
            .client
            .post(self.multi_search_url())
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(multi_search_body(queries)?)
            .send()
            .context("sending multi search to engine")?;

        let raw: MultiRawResponse = decode(response)?;
        raw.into_results()
    }
}

#[cfg(test)]
mod tests {
    use query_builder::{Clause, Request};
    use serde_json::Value;

    use super::*;

    #[test]
    fn urls_address_the_indices() -> Result<()> {
        let backend = ElasticBackend::connect("http://localhost:9200/", Duration::from_secs(1))?;

        assert_eq!(backend.search_url(&[]), "http://localhost:9200/_search");
        assert_eq!(
            backend.search_url(&["orders".to_string(), "archive".to_string()]),
            "http://localhost:9200/orders,archive/_search"
        );
        assert_eq!(backend.multi_search_url(), "http://localhost:9200/_msearch");

        Ok(())
    }

    #[test]
    fn multi_search_body_pairs_headers_and_bodies() -> Result<()> {
        let mut first = QueryBuilder::new(Request::new(), vec!["orders".to_string()]);
        first.with(Clause::term("status", "open"));
        let second = QueryBuilder::new(Request::new(), vec![]);

        let body = multi_search_body(&[first, second])?;
        let lines: Vec<Value> = body
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;

        assert!(body.ends_with('\n'));
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], json!({ "index": "orders" }));
        assert_eq!(
            lines[1]["query"],
            json!({ "bool": { "must": [ { "term": { "status": "open" } } ] } })
        );
        assert_eq!(lines[2], json!({}));
        assert_eq!(lines[3]["query"], json!({ "match_all": {} }));

        Ok(())
    }
}
