use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Error, Result};
use query_builder::{Script, SortField};
use search_pipeline::{
    Backend,
    BooleanFilter,
    ComputedField,
    DateHistogramFilter,
    DynamicFilter,
    Endpoint,
    Feature,
    FieldSelection,
    FullTextQuery,
    HistogramFilter,
    NestedFilter,
    Paginator,
    SortOption,
    Sorter,
};
use serde::Deserialize;

pub(crate) trait Validate {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// The endpoints file, every endpoint served by this instance.
#[derive(Debug, Deserialize)]
pub struct EndpointDeclarations {
    pub endpoints: BTreeMap<String, EndpointDeclaration>,
}

impl EndpointDeclarations {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read endpoint declarations from {:?}", path))?;

        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let declarations: Self =
            serde_json::from_str(raw).context("failed to parse endpoint declarations")?;
        declarations.validate()?;

        Ok(declarations)
    }

    /// Builds every declared endpoint against the given backend.
    ///
    /// Each endpoint runs at most `max_batch_size` chains of a batch at once.
    pub fn build(
        &self,
        backend: Arc<dyn Backend>,
        max_batch_size: usize,
    ) -> Result<BTreeMap<String, Arc<Endpoint>>> {
        let mut endpoints = BTreeMap::new();

        for (name, declaration) in self.endpoints.iter() {
            let endpoint = declaration
                .build(backend.clone())
                .map(|endpoint| endpoint.with_max_batch_size(max_batch_size))
                .with_context(|| format!("failed to build endpoint {:?}", name))?;

            info!(
                endpoint = %name,
                indices = ?endpoint.indices(),
                features = endpoint.feature_count(),
                "endpoint ready",
            );
            endpoints.insert(name.clone(), Arc::new(endpoint));
        }

        Ok(endpoints)
    }
}

impl Validate for EndpointDeclarations {
    fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(Error::msg("at least one endpoint must be declared."));
        }

        for (name, endpoint) in self.endpoints.iter() {
            endpoint
                .validate()
                .with_context(|| format!("invalid declaration for endpoint {:?}", name))?;
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct EndpointDeclaration {
    /// The engine indices searched by this endpoint.
    pub indices: Vec<String>,

    /// The features in registration order, the first one is outermost.
    #[serde(default)]
    pub features: Vec<FeatureDeclaration>,
}

impl EndpointDeclaration {
    pub fn build(&self, backend: Arc<dyn Backend>) -> Result<Endpoint> {
        let mut endpoint = Endpoint::new(self.indices.clone(), backend);
        for feature in self.features.iter() {
            endpoint.register(feature.build()?);
        }

        Ok(endpoint)
    }
}

impl Validate for EndpointDeclaration {
    fn validate(&self) -> Result<()> {
        if self.indices.is_empty() || self.indices.iter().any(|i| i.trim().is_empty()) {
            return Err(Error::msg("endpoint must search at least one named index."));
        }

        for feature in self.features.iter() {
            feature.validate()?;
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct SortOptionDeclaration {
    pub name: String,

    #[serde(default)]
    pub fields: Vec<SortField>,
}

fn default_calendar_interval() -> String {
    "month".to_string()
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_size_param() -> String {
    "per_page".to_string()
}

fn default_page_size() -> usize {
    20
}

fn default_max_page_size() -> usize {
    100
}

/// A declared feature.
///
/// Each variant maps onto one pipeline feature with the same options.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureDeclaration {
    /// A free text query over the given fields.
    FullText {
        #[serde(default = "FullTextQuery::default_param")]
        param: String,
        fields: Vec<String>,
    },

    /// Field equality with facet counts.
    Filter {
        property: String,
        field: String,
        #[serde(default)]
        missing_label: Option<String>,
        #[serde(default = "DynamicFilter::default_size")]
        size: usize,
        #[serde(default)]
        disjunctive: bool,
    },

    /// Numeric bucketing with a fixed interval.
    Histogram {
        property: String,
        field: String,
        interval: f64,
        #[serde(default)]
        disjunctive: bool,
    },

    /// Date bucketing by calendar interval.
    DateHistogram {
        property: String,
        field: String,
        #[serde(default = "default_calendar_interval")]
        calendar_interval: String,
        #[serde(default)]
        disjunctive: bool,
    },

    Boolean {
        property: String,
        field: String,
    },

    /// Facets over the fields of nested documents.
    ///
    /// Only filter, histogram and date histogram facets take part,
    /// anything else is ignored by the wrapper.
    Nested {
        path: String,
        #[serde(default)]
        disjunctive: bool,
        facets: Vec<FeatureDeclaration>,
    },

    Sort {
        #[serde(default = "Sorter::default_param")]
        param: String,
        default: String,
        options: Vec<SortOptionDeclaration>,
    },

    Paginate {
        #[serde(default = "default_page_param")]
        page_param: String,
        #[serde(default = "default_size_param")]
        size_param: String,
        #[serde(default = "default_page_size")]
        default_page_size: usize,
        #[serde(default = "default_max_page_size")]
        max_page_size: usize,
    },

    Fields {
        #[serde(default)]
        includes: Vec<String>,
        #[serde(default)]
        excludes: Vec<String>,
    },

    Computed {
        name: String,
        script: Script,
    },
}

impl FeatureDeclaration {
    fn is_facet(&self) -> bool {
        matches!(
            self,
            Self::Filter { .. } | Self::Histogram { .. } | Self::DateHistogram { .. }
        )
    }

    pub fn build(&self) -> Result<Arc<dyn Feature>> {
        let feature: Arc<dyn Feature> = match self {
            Self::FullText { param, fields } => {
                Arc::new(FullTextQuery::new(fields.clone()).with_param(param))
            },
            Self::Filter {
                property,
                field,
                missing_label,
                size,
                disjunctive,
            } => {
                let filter = DynamicFilter::new(property, field)
                    .with_size(*size)
                    .disjunctive(*disjunctive);

                match missing_label {
                    Some(label) => Arc::new(filter.with_missing_label(label)),
                    None => Arc::new(filter),
                }
            },
            Self::Histogram {
                property,
                field,
                interval,
                disjunctive,
            } => Arc::new(
                HistogramFilter::new(property, field, *interval).disjunctive(*disjunctive),
            ),
            Self::DateHistogram {
                property,
                field,
                calendar_interval,
                disjunctive,
            } => Arc::new(
                DateHistogramFilter::new(property, field, calendar_interval)
                    .disjunctive(*disjunctive),
            ),
            Self::Boolean { property, field } => Arc::new(BooleanFilter::new(property, field)),
            Self::Nested {
                path,
                disjunctive,
                facets,
            } => {
                let mut nested = NestedFilter::new(path).disjunctive(*disjunctive);
                for facet in facets.iter() {
                    nested = nested.with_child_arc(facet.build()?);
                }

                Arc::new(nested)
            },
            Self::Sort {
                param,
                default,
                options,
            } => {
                let mut sorter = Sorter::new(default).with_param(param);
                for option in options.iter() {
                    sorter = sorter
                        .with_option(SortOption::new(&option.name, option.fields.clone()));
                }

                Arc::new(sorter)
            },
            Self::Paginate {
                page_param,
                size_param,
                default_page_size,
                max_page_size,
            } => Arc::new(
                Paginator::new(*default_page_size, *max_page_size)
                    .with_params(page_param, size_param),
            ),
            Self::Fields { includes, excludes } => {
                Arc::new(FieldSelection::new(includes.clone(), excludes.clone()))
            },
            Self::Computed { name, script } => Arc::new(ComputedField::new(name, script.clone())),
        };

        Ok(feature)
    }
}

impl Validate for FeatureDeclaration {
    fn validate(&self) -> Result<()> {
        match self {
            Self::FullText { fields, .. } if fields.is_empty() => {
                Err(Error::msg("full text query must search at least one field."))
            },
            Self::Histogram { interval, .. } if !(interval.is_finite() && *interval > 0.0) => {
                Err(Error::msg("histogram interval must be a positive number."))
            },
            Self::Filter { size, .. } if *size == 0 => {
                Err(Error::msg("filter bucket size must be positive."))
            },
            Self::Nested { path, facets, .. } => {
                if path.trim().is_empty() {
                    return Err(Error::msg("nested filter must have a document path."));
                }

                for facet in facets.iter() {
                    facet.validate()?;
                    if !facet.is_facet() {
                        warn!(path = %path, "nested filter will ignore a non facet child");
                    }
                }

                Ok(())
            },
            Self::Sort { default, options, .. } => {
                if !options.iter().any(|option| &option.name == default) {
                    return Err(Error::msg(
                        "default sort option must be one of the declared options.",
                    ));
                }

                Ok(())
            },
            Self::Paginate {
                default_page_size,
                max_page_size,
                ..
            } => {
                if *default_page_size == 0 || *max_page_size == 0 {
                    return Err(Error::msg("page sizes must be positive."));
                }

                if default_page_size > max_page_size {
                    return Err(Error::msg("default page size cannot exceed the maximum."));
                }

                Ok(())
            },
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECLARATIONS: &str = r#"{
        "endpoints": {
            "orders": {
                "indices": ["orders"],
                "features": [
                    { "type": "full_text", "fields": ["name^2", "notes"] },
                    {
                        "type": "nested",
                        "path": "items",
                        "disjunctive": true,
                        "facets": [
                            { "type": "filter", "property": "category", "field": "items.category", "missing_label": "(none)" },
                            { "type": "histogram", "property": "price", "field": "items.price", "interval": 10 },
                            { "type": "boolean", "property": "gift", "field": "items.gift" }
                        ]
                    },
                    { "type": "sort", "default": "relevance", "options": [
                        { "name": "relevance" },
                        { "name": "newest", "fields": [ { "field": "created_at", "order": "desc" } ] }
                    ] },
                    { "type": "paginate" },
                    { "type": "computed", "name": "total", "script": { "source": "doc['price'].value * 2" } }
                ]
            }
        }
    }"#;

    #[test]
    fn parses_every_feature_kind() -> Result<()> {
        let declarations = EndpointDeclarations::from_json(DECLARATIONS)?;
        let orders = &declarations.endpoints["orders"];

        assert_eq!(orders.indices, vec!["orders".to_string()]);
        assert_eq!(orders.features.len(), 5);

        match &orders.features[1] {
            FeatureDeclaration::Nested { path, facets, disjunctive } => {
                assert_eq!(path, "items");
                assert!(*disjunctive);
                assert_eq!(facets.len(), 3);
                assert!(facets[0].is_facet());
                assert!(!facets[2].is_facet());
            },
            other => panic!("expected nested declaration, got {:?}", other),
        }

        match &orders.features[3] {
            FeatureDeclaration::Paginate { default_page_size, max_page_size, .. } => {
                assert_eq!((*default_page_size, *max_page_size), (20, 100));
            },
            other => panic!("expected paginate declaration, got {:?}", other),
        }

        Ok(())
    }

    #[test]
    fn rejects_invalid_declarations() {
        let no_indices = r#"{ "endpoints": { "a": { "indices": [] } } }"#;
        assert!(EndpointDeclarations::from_json(no_indices).is_err());

        let bad_interval = r#"{ "endpoints": { "a": { "indices": ["a"], "features": [
            { "type": "histogram", "property": "p", "field": "p", "interval": 0 }
        ] } } }"#;
        assert!(EndpointDeclarations::from_json(bad_interval).is_err());

        let empty_path = r#"{ "endpoints": { "a": { "indices": ["a"], "features": [
            { "type": "nested", "path": " ", "facets": [] }
        ] } } }"#;
        assert!(EndpointDeclarations::from_json(empty_path).is_err());

        let bad_pages = r#"{ "endpoints": { "a": { "indices": ["a"], "features": [
            { "type": "paginate", "default_page_size": 50, "max_page_size": 10 }
        ] } } }"#;
        assert!(EndpointDeclarations::from_json(bad_pages).is_err());

        let unknown = r#"{ "endpoints": { "a": { "indices": ["a"], "features": [
            { "type": "teleport" }
        ] } } }"#;
        assert!(EndpointDeclarations::from_json(unknown).is_err());
    }
}
