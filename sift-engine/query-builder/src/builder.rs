use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::aggregations::Aggregation;
use crate::clauses::{BoolClause, Clause};
use crate::params::Request;
use crate::selection::{Script, Selection};

/// Accumulates everything features contribute to a single search.
///
/// One builder exists per request. Features mutate it in registration
/// order and the backend renders the final state with [`QueryBuilder::build`].
///
/// Aggregation names are unique keys, writing the same name twice replaces
/// the earlier definition.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    request: Request,
    indices: Vec<String>,
    query: BoolClause,
    post_filter: Option<BoolClause>,
    aggregations: BTreeMap<String, Aggregation>,
    selection: Option<Selection>,
    script_fields: BTreeMap<String, Script>,
}

impl QueryBuilder {
    pub fn new(request: Request, indices: Vec<String>) -> Self {
        Self {
            request,
            indices,
            query: BoolClause::default(),
            post_filter: None,
            aggregations: BTreeMap::new(),
            selection: None,
            script_fields: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Mutable access for features that consume parameters,
    /// later features will no longer see what was removed.
    #[inline]
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    #[inline]
    pub fn indices(&self) -> &[String] {
        &self.indices
    }

    /// Adds a clause every hit must match.
    pub fn with(&mut self, clause: Clause) -> &mut Self {
        self.query.must.push(clause);
        self
    }

    /// Adds a clause no hit may match.
    pub fn without(&mut self, clause: Clause) -> &mut Self {
        self.query.must_not.push(clause);
        self
    }

    /// Adds a clause which raises the score of matching hits.
    pub fn boost(&mut self, clause: Clause) -> &mut Self {
        self.query.should.push(clause);
        self
    }

    pub fn post_filter_with(&mut self, clause: Clause) -> &mut Self {
        self.post_filter.get_or_insert_with(BoolClause::default).must.push(clause);
        self
    }

    pub fn post_filter_without(&mut self, clause: Clause) -> &mut Self {
        self.post_filter
            .get_or_insert_with(BoolClause::default)
            .must_not
            .push(clause);
        self
    }

    pub fn post_filter_boost(&mut self, clause: Clause) -> &mut Self {
        self.post_filter.get_or_insert_with(BoolClause::default).should.push(clause);
        self
    }

    /// Sets the named aggregation, replacing any earlier one with that name.
    pub fn aggregation(&mut self, name: impl Into<String>, aggregation: Aggregation) -> &mut Self {
        self.aggregations.insert(name.into(), aggregation);
        self
    }

    pub fn script_field(&mut self, name: impl Into<String>, script: Script) -> &mut Self {
        self.script_fields.insert(name.into(), script);
        self
    }

    /// The field selection, created on first access.
    pub fn selection(&mut self) -> &mut Selection {
        self.selection.get_or_insert_with(Selection::default)
    }

    #[inline]
    pub fn query(&self) -> &BoolClause {
        &self.query
    }

    #[inline]
    pub fn post_filter(&self) -> Option<&BoolClause> {
        self.post_filter.as_ref()
    }

    #[inline]
    pub fn aggregations(&self) -> &BTreeMap<String, Aggregation> {
        &self.aggregations
    }

    #[inline]
    pub fn get_aggregation(&self, name: &str) -> Option<&Aggregation> {
        self.aggregations.get(name)
    }

    #[inline]
    pub fn script_fields(&self) -> &BTreeMap<String, Script> {
        &self.script_fields
    }

    /// Renders the search body for the engine.
    ///
    /// This has no side effects and can be called at any point.
    pub fn build(&self) -> Value {
        let mut body = Map::new();

        let query = if self.query.is_empty() {
            Clause::MatchAll.to_json()
        } else {
            self.query.to_json()
        };
        body.insert("query".to_string(), query);

        if let Some(post_filter) = self.post_filter.as_ref().filter(|pf| !pf.is_empty()) {
            body.insert("post_filter".to_string(), post_filter.to_json());
        }

        if !self.aggregations.is_empty() {
            let aggs = self
                .aggregations
                .iter()
                .map(|(name, agg)| (name.clone(), agg.to_json()))
                .collect();
            body.insert("aggs".to_string(), Value::Object(aggs));
        }

        if let Some(selection) = self.selection.as_ref() {
            selection.render_into(&mut body);
        }

        if !self.script_fields.is_empty() {
            let fields = self
                .script_fields
                .iter()
                .map(|(name, script)| (name.clone(), script.to_json()))
                .collect();
            body.insert("script_fields".to_string(), Value::Object(fields));

            // Requesting script fields drops `_source` unless asked for.
            body.entry("_source").or_insert(Value::Bool(true));
        }

        body.insert("track_total_hits".to_string(), Value::Bool(true));

        Value::Object(body)
    }
}
