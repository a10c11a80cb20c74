use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// What order to sort the returned data.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Sort the data in ascending order.
    Asc,

    /// Sort the data in descending order. (Default)
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::Desc
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,

    #[serde(default)]
    pub order: SortOrder,
}

impl SortField {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

/// Which fields are returned and which page of hits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub size: Option<usize>,
    pub from: Option<usize>,
    pub sort: Vec<SortField>,
}

impl Selection {
    pub(crate) fn render_into(&self, body: &mut Map<String, Value>) {
        if !self.includes.is_empty() || !self.excludes.is_empty() {
            body.insert(
                "_source".to_string(),
                json!({
                    "includes": self.includes,
                    "excludes": self.excludes,
                }),
            );
        }

        if let Some(size) = self.size {
            body.insert("size".to_string(), Value::from(size));
        }

        if let Some(from) = self.from {
            body.insert("from".to_string(), Value::from(from));
        }

        if !self.sort.is_empty() {
            let sort = self
                .sort
                .iter()
                .map(|s| json!({ s.field.as_str(): { "order": s.order } }))
                .collect();
            body.insert("sort".to_string(), Value::Array(sort));
        }
    }
}

/// A script evaluated by the engine per hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub source: String,

    #[serde(default)]
    pub params: Map<String, Value>,
}

impl Script {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            params: Map::new(),
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        if self.params.is_empty() {
            json!({ "script": { "source": self.source } })
        } else {
            json!({ "script": { "source": self.source, "params": self.params } })
        }
    }
}
