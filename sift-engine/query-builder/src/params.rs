use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

static MIN_SUFFIX: &str = ".min";
static MAX_SUFFIX: &str = ".max";

/// A single named request parameter.
///
/// A parameter holds an ordered list of raw values, duplicates included.
/// Parameters constructed with a `.min` or `.max` suffix on their name are
/// range parameters, the suffix is stripped and the last given value is kept
/// as the raw bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    name: String,

    #[serde(default)]
    values: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<String>,
}

impl Parameter {
    pub fn new<N, V>(name: N, values: V) -> Self
    where
        N: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let name = name.into();
        let values: Vec<String> = values.into_iter().map(Into::into).collect();

        if let Some(stripped) = name.strip_suffix(MIN_SUFFIX) {
            return Self {
                name: stripped.to_string(),
                values: vec![],
                min: values.last().cloned(),
                max: None,
            };
        }

        if let Some(stripped) = name.strip_suffix(MAX_SUFFIX) {
            return Self {
                name: stripped.to_string(),
                values: vec![],
                min: None,
                max: values.last().cloned(),
            };
        }

        Self {
            name,
            values,
            min: None,
            max: None,
        }
    }

    /// Creates a parameter with a single value.
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, [value.into()])
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// The last inserted value.
    #[inline]
    pub fn value(&self) -> Option<&str> {
        self.values.last().map(String::as_str)
    }

    #[inline]
    pub fn has_value(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// Whether this parameter carries range data at all.
    ///
    /// This is true even when neither bound parses as a number.
    #[inline]
    pub fn is_range_value(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    /// The lower bound, if it was given and parses as a finite float.
    pub fn min(&self) -> Option<f64> {
        parse_bound(self.min.as_deref())
    }

    /// The upper bound, if it was given and parses as a finite float.
    pub fn max(&self) -> Option<f64> {
        parse_bound(self.max.as_deref())
    }

    #[inline]
    pub fn min_raw(&self) -> Option<&str> {
        self.min.as_deref()
    }

    #[inline]
    pub fn max_raw(&self) -> Option<&str> {
        self.max.as_deref()
    }

    /// Interprets the last value as a boolean flag.
    pub fn bool_value(&self) -> Option<bool> {
        let value = self.value()?.trim().to_ascii_lowercase();

        match value.as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        }
    }

    /// Produces a new parameter combining both value sequences.
    ///
    /// Range bounds already present on `self` are kept, missing ones are
    /// taken from `other`.
    pub fn merge(&self, other: &Parameter) -> Parameter {
        let mut values = self.values.clone();
        values.extend(other.values.iter().cloned());

        Parameter {
            name: self.name.clone(),
            values,
            min: self.min.clone().or_else(|| other.min.clone()),
            max: self.max.clone().or_else(|| other.max.clone()),
        }
    }
}

fn parse_bound(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// All parameters of one logical search, keyed by their final name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Request {
    params: HashMap<String, Parameter>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a request from raw `(name, values)` pairs.
    ///
    /// Pairs resolving to the same name are merged in order.
    pub fn from_pairs<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let mut request = Self::new();
        for (name, values) in pairs {
            request.append(Parameter::new(name, values));
        }

        request
    }

    /// Adds the parameter, merging it into any existing one of the same name.
    pub fn append(&mut self, param: Parameter) {
        match self.params.entry(param.name.clone()) {
            Entry::Occupied(mut existing) => {
                let merged = existing.get().merge(&param);
                existing.insert(merged);
            },
            Entry::Vacant(slot) => {
                slot.insert(param);
            },
        }
    }

    /// Replaces any existing parameter with the given values.
    pub fn set<N, V>(&mut self, name: N, values: V)
    where
        N: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        self.set_param(Parameter::new(name, values));
    }

    pub fn set_param(&mut self, param: Parameter) {
        self.params.insert(param.name.clone(), param);
    }

    pub fn del(&mut self, name: &str) -> Option<Parameter> {
        self.params.remove(name)
    }

    /// Looks up a parameter, `None` means the parameter is inactive
    /// for this request.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    /// The last value of the named parameter.
    #[inline]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Parameter::value)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }
}
