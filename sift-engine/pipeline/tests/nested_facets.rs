use std::sync::{Arc, Mutex};

use anyhow::Result;
use query_builder::{QueryBuilder, Request, ResultBucket, SearchResult};
use search_pipeline::{Backend, DynamicFilter, Endpoint, NestedFilter, RawResponse};
use serde_json::{json, Value};

/// Records every rendered body and answers with a canned engine response.
struct RecordingBackend {
    bodies: Mutex<Vec<Value>>,
    response: Value,
}

impl RecordingBackend {
    fn new(response: Value) -> Self {
        Self {
            bodies: Mutex::new(vec![]),
            response,
        }
    }

    fn last_body(&self) -> Value {
        self.bodies.lock().unwrap().last().cloned().unwrap_or(Value::Null)
    }
}

impl Backend for RecordingBackend {
    fn execute(&self, query: &QueryBuilder) -> Result<SearchResult> {
        self.bodies.lock().unwrap().push(query.build());

        let raw: RawResponse = serde_json::from_value(self.response.clone())?;
        raw.into_result()
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

fn engine_response() -> Value {
    json!({
        "took": 3,
        "hits": {
            "total": { "value": 1, "relation": "eq" },
            "hits": [ { "_source": { "name": "order-1" } } ]
        },
        "aggregations": {
            "category": {
                "doc_count": 5,
                "category._filter": {
                    "doc_count": 3,
                    "category": {
                        "buckets": [
                            { "key": "Widget", "doc_count": 2 },
                            { "key": "Gadget", "doc_count": 1 }
                        ]
                    }
                }
            },
            "tags": {
                "doc_count": 5,
                "tags._filter": {
                    "doc_count": 2,
                    "tags": { "buckets": [ { "key": "Active", "doc_count": 2 } ] }
                }
            }
        }
    })
}

fn endpoint(backend: Arc<RecordingBackend>, disjunctive: bool) -> Endpoint {
    let nested = NestedFilter::new("items")
        .with_child(DynamicFilter::new("category", "items.category"))
        .with_child(DynamicFilter::new("tags", "items.tags"))
        .disjunctive(disjunctive);

    Endpoint::new(vec!["orders".to_string()], backend).with_feature(nested)
}

fn request() -> Request {
    Request::from_pairs(vec![("category", vec!["Widget"]), ("tags", vec!["Active"])])
}

#[test]
fn disjunctive_nested_facets_end_to_end() -> Result<()> {
    init_logging();

    let backend = Arc::new(RecordingBackend::new(engine_response()));
    let result = endpoint(backend.clone(), true).execute(request())?;

    let body = backend.last_body();

    assert_eq!(
        body["query"],
        json!({
            "bool": {
                "must": [{
                    "nested": {
                        "path": "items",
                        "query": {
                            "bool": {
                                "must": [
                                    { "term": { "items.category": "Widget" } },
                                    { "term": { "items.tags": "Active" } }
                                ]
                            }
                        }
                    }
                }]
            }
        })
    );

    let aggs = body["aggs"].as_object().cloned().unwrap_or_default();
    assert!(aggs.contains_key("category"));
    assert!(aggs.contains_key("tags"));

    assert_eq!(
        body["aggs"]["category"]["aggs"]["category._filter"]["filter"],
        json!({ "bool": { "must": [ { "term": { "items.tags": "Active" } } ] } })
    );
    assert_eq!(
        body["aggs"]["tags"]["aggs"]["tags._filter"]["filter"],
        json!({ "bool": { "must": [ { "term": { "items.category": "Widget" } } ] } })
    );

    assert_eq!(result.total_hit_count, 1);
    assert_eq!(
        result.facet("category"),
        Some(&[ResultBucket::new("Widget", 2), ResultBucket::new("Gadget", 1)][..])
    );
    assert_eq!(result.facet("tags"), Some(&[ResultBucket::new("Active", 2)][..]));
    assert!(result.request.is_some());

    Ok(())
}

#[test]
fn conjunctive_nested_facets_share_every_filter() -> Result<()> {
    init_logging();

    let backend = Arc::new(RecordingBackend::new(engine_response()));
    endpoint(backend.clone(), false).execute(request())?;

    let body = backend.last_body();
    let everything = json!({
        "bool": {
            "must": [
                { "term": { "items.category": "Widget" } },
                { "term": { "items.tags": "Active" } }
            ]
        }
    });

    assert_eq!(body["aggs"]["category"]["aggs"]["category._filter"]["filter"], everything);
    assert_eq!(body["aggs"]["tags"]["aggs"]["tags._filter"]["filter"], everything);

    Ok(())
}

#[test]
fn batch_results_follow_request_order() -> Result<()> {
    init_logging();

    let backend = Arc::new(RecordingBackend::new(engine_response()));
    let endpoint = endpoint(backend.clone(), true);

    let requests = vec![
        Request::from_pairs(vec![("category", vec!["Widget"])]),
        Request::from_pairs(vec![("category", vec!["Gadget"])]),
        Request::new(),
    ];
    let results = endpoint.execute_multiple(requests.clone())?;

    let echoed: Vec<Option<Request>> = results.iter().map(|r| r.request.clone()).collect();
    assert_eq!(echoed, requests.into_iter().map(Some).collect::<Vec<_>>());

    let filtered_on: Vec<Value> = backend
        .bodies
        .lock()
        .unwrap()
        .iter()
        .map(|body| body["query"]["bool"]["must"][0]["nested"]["query"]["bool"]["must"][0].clone())
        .collect();
    assert_eq!(
        filtered_on,
        vec![
            json!({ "term": { "items.category": "Widget" } }),
            json!({ "term": { "items.category": "Gadget" } }),
            Value::Null,
        ]
    );

    Ok(())
}
