use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::clauses::Clause;

/// The bucketing performed by a single aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationKind {
    /// One bucket per distinct value of the field.
    ///
    /// When `missing` is set, documents without a value are counted
    /// under that label.
    Terms {
        field: String,
        size: Option<usize>,
        missing: Option<String>,
    },

    /// Fixed width numeric buckets.
    Histogram {
        field: String,
        interval: f64,
        min_doc_count: u64,
    },

    /// Calendar aligned date buckets.
    DateHistogram {
        field: String,
        calendar_interval: String,
        format: Option<String>,
        min_doc_count: u64,
    },

    /// Steps into the nested documents under `path`.
    Nested { path: String },

    /// A single bucket restricted to the documents matching the clause.
    Filter(Clause),
}

/// An aggregation definition together with its named sub aggregations.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    kind: AggregationKind,
    sub_aggregations: BTreeMap<String, Aggregation>,
}

impl Aggregation {
    pub fn new(kind: AggregationKind) -> Self {
        Self {
            kind,
            sub_aggregations: BTreeMap::new(),
        }
    }

    pub fn terms(field: impl Into<String>) -> Self {
        Self::new(AggregationKind::Terms {
            field: field.into(),
            size: None,
            missing: None,
        })
    }

    pub fn histogram(field: impl Into<String>, interval: f64) -> Self {
        Self::new(AggregationKind::Histogram {
            field: field.into(),
            interval,
            min_doc_count: 1,
        })
    }

    pub fn date_histogram(
        field: impl Into<String>,
        calendar_interval: impl Into<String>,
        format: Option<String>,
    ) -> Self {
        Self::new(AggregationKind::DateHistogram {
            field: field.into(),
            calendar_interval: calendar_interval.into(),
            format,
            min_doc_count: 1,
        })
    }

    pub fn nested(path: impl Into<String>) -> Self {
        Self::new(AggregationKind::Nested { path: path.into() })
    }

    pub fn filter(clause: Clause) -> Self {
        Self::new(AggregationKind::Filter(clause))
    }

    /// Limits the number of buckets of a `terms` aggregation.
    pub fn with_size(mut self, limit: usize) -> Self {
        if let AggregationKind::Terms { size, .. } = &mut self.kind {
            *size = Some(limit);
        }
        self
    }

    /// Sets the label documents without a value are counted under
    /// for a `terms` aggregation.
    pub fn with_missing(mut self, label: impl Into<String>) -> Self {
        if let AggregationKind::Terms { missing, .. } = &mut self.kind {
            *missing = Some(label.into());
        }
        self
    }

    pub fn with_sub_aggregation(
        mut self,
        name: impl Into<String>,
        aggregation: Aggregation,
    ) -> Self {
        self.sub_aggregations.insert(name.into(), aggregation);
        self
    }

    #[inline]
    pub fn kind(&self) -> &AggregationKind {
        &self.kind
    }

    #[inline]
    pub fn sub_aggregation(&self, name: &str) -> Option<&Aggregation> {
        self.sub_aggregations.get(name)
    }

    #[inline]
    pub fn sub_aggregations(&self) -> &BTreeMap<String, Aggregation> {
        &self.sub_aggregations
    }

    pub fn to_json(&self) -> Value {
        let (name, body) = match &self.kind {
            AggregationKind::Terms {
                field,
                size,
                missing,
            } => {
                let mut body = Map::new();
                body.insert("field".to_string(), Value::from(field.as_str()));
                if let Some(size) = size {
                    body.insert("size".to_string(), Value::from(*size));
                }
                if let Some(missing) = missing {
                    body.insert("missing".to_string(), Value::from(missing.as_str()));
                }
                ("terms", Value::Object(body))
            },
            AggregationKind::Histogram {
                field,
                interval,
                min_doc_count,
            } => (
                "histogram",
                json!({
                    "field": field,
                    "interval": interval,
                    "min_doc_count": min_doc_count,
                }),
            ),
            AggregationKind::DateHistogram {
                field,
                calendar_interval,
                format,
                min_doc_count,
            } => {
                let mut body = json!({
                    "field": field,
                    "calendar_interval": calendar_interval,
                    "min_doc_count": min_doc_count,
                });
                if let (Some(format), Value::Object(map)) = (format, &mut body) {
                    map.insert("format".to_string(), Value::from(format.as_str()));
                }
                ("date_histogram", body)
            },
            AggregationKind::Nested { path } => ("nested", json!({ "path": path })),
            AggregationKind::Filter(clause) => ("filter", clause.to_json()),
        };

        let mut rendered = Map::new();
        rendered.insert(name.to_string(), body);

        if !self.sub_aggregations.is_empty() {
            let subs = self
                .sub_aggregations
                .iter()
                .map(|(name, agg)| (name.clone(), agg.to_json()))
                .collect();
            rendered.insert("aggs".to_string(), Value::Object(subs));
        }

        Value::Object(rendered)
    }
}

impl Serialize for Aggregation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
