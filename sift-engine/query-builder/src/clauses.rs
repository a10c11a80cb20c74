use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// A single query fragment in the engine's wire shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Matches every document.
    MatchAll,

    /// Exact match of a single value.
    Term { field: String, value: Value },

    /// Exact match of any of the given values.
    Terms { field: String, values: Vec<Value> },

    /// Inclusive bounds, either side may be open.
    Range {
        field: String,
        gte: Option<Value>,
        lte: Option<Value>,
        format: Option<String>,
    },

    /// The field holds at least one non-null value.
    Exists { field: String },

    /// A scored free text query across several fields.
    MultiMatch { query: String, fields: Vec<String> },

    Bool(Box<BoolClause>),

    /// Runs the inner query against the nested documents under `path`.
    Nested { path: String, query: Box<Clause> },
}

impl Clause {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::Exists {
            field: field.into(),
        }
    }

    /// Matches documents where the field is absent, null, an empty
    /// list or a list of nulls.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Bool(Box::new(BoolClause {
            must_not: vec![Self::exists(field)],
            ..BoolClause::default()
        }))
    }

    pub fn nested(path: impl Into<String>, query: Clause) -> Self {
        Self::Nested {
            path: path.into(),
            query: Box::new(query),
        }
    }

    /// Combines the clauses with AND semantics.
    ///
    /// An empty list matches everything.
    pub fn all_of(clauses: Vec<Clause>) -> Self {
        if clauses.is_empty() {
            return Self::MatchAll;
        }

        Self::Bool(Box::new(BoolClause {
            must: clauses,
            ..BoolClause::default()
        }))
    }

    /// Combines the clauses with OR semantics.
    ///
    /// A single clause is returned as is, an empty list yields nothing.
    pub fn any_of(mut clauses: Vec<Clause>) -> Option<Self> {
        match clauses.len() {
            0 => None,
            1 => clauses.pop(),
            _ => Some(Self::Bool(Box::new(BoolClause {
                should: clauses,
                minimum_should_match: Some(1),
                ..BoolClause::default()
            }))),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::MatchAll => json!({ "match_all": {} }),
            Self::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            Self::Terms { field, values } => json!({ "terms": { field.as_str(): values } }),
            Self::Range {
                field,
                gte,
                lte,
                format,
            } => {
                let mut bounds = Map::new();
                if let Some(gte) = gte {
                    bounds.insert("gte".to_string(), gte.clone());
                }
                if let Some(lte) = lte {
                    bounds.insert("lte".to_string(), lte.clone());
                }
                if let Some(format) = format {
                    bounds.insert("format".to_string(), Value::from(format.as_str()));
                }

                json!({ "range": { field.as_str(): bounds } })
            },
            Self::Exists { field } => json!({ "exists": { "field": field } }),
            Self::MultiMatch { query, fields } => json!({
                "multi_match": {
                    "query": query,
                    "fields": fields,
                }
            }),
            Self::Bool(inner) => inner.to_json(),
            Self::Nested { path, query } => json!({
                "nested": {
                    "path": path,
                    "query": query.to_json(),
                }
            }),
        }
    }
}

impl Serialize for Clause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// A boolean combination of clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolClause {
    pub must: Vec<Clause>,
    pub must_not: Vec<Clause>,
    pub should: Vec<Clause>,
    pub minimum_should_match: Option<u32>,
}

impl BoolClause {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty() && self.should.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let mut body = Map::new();

        for (key, clauses) in [
            ("must", &self.must),
            ("must_not", &self.must_not),
            ("should", &self.should),
        ] {
            if !clauses.is_empty() {
                let rendered = clauses.iter().map(Clause::to_json).collect();
                body.insert(key.to_string(), Value::Array(rendered));
            }
        }

        if let Some(minimum) = self.minimum_should_match {
            body.insert("minimum_should_match".to_string(), Value::from(minimum));
        }

        json!({ "bool": body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_renders_must_not_exists() {
        let rendered = Clause::missing("items.tags").to_json();

        assert_eq!(
            rendered,
            json!({ "bool": { "must_not": [ { "exists": { "field": "items.tags" } } ] } })
        );
    }

    #[test]
    fn any_of_degenerates() {
        assert_eq!(Clause::any_of(vec![]), None);

        let single = Clause::any_of(vec![Clause::term("a", "b")]);
        assert_eq!(single, Some(Clause::term("a", "b")));

        let many = Clause::any_of(vec![Clause::term("a", "b"), Clause::exists("a")]);
        match many {
            Some(Clause::Bool(inner)) => {
                assert_eq!(inner.should.len(), 2);
                assert_eq!(inner.minimum_should_match, Some(1));
            },
            other => panic!("expected bool clause, got {:?}", other),
        }
    }

    #[test]
    fn empty_all_of_matches_everything() {
        assert_eq!(Clause::all_of(vec![]), Clause::MatchAll);
    }

    #[test]
    fn range_renders_open_bounds() {
        let clause = Clause::Range {
            field: "price".to_string(),
            gte: Some(Value::from(2.5)),
            lte: None,
            format: None,
        };

        assert_eq!(clause.to_json(), json!({ "range": { "price": { "gte": 2.5 } } }));
    }
}
