//! Named parameter overrides for a single compute call.
//!
//! A [`ParamRegistry`] maps names to a closed set of scalar kinds. The engine
//! reads the keys it knows and ignores the rest, so registries built for
//! other option sets can be passed unchanged.

use crate::util::{CorrFlowError, CorrFlowResult};
use std::collections::BTreeMap;

/// A typed parameter value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    fn kind_name(&self) -> &'static str {
        match self {
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Bool(_) => "bool",
        }
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        ParamValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Float(value.into())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// Name to value mapping of parameter overrides.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamRegistry {
    entries: BTreeMap<String, ParamValue>,
}

impl ParamRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets `name`, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        self.entries.insert(name.into(), value.into())
    }

    /// Removes `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.entries.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ParamValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Reads a non-negative integer override.
    pub(crate) fn usize_param(&self, name: &str) -> CorrFlowResult<Option<usize>> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Int(value)) => usize::try_from(value).map(Some).map_err(|_| {
                CorrFlowError::invalid_parameter(name, format!("{value} is negative"))
            }),
            Some(other) => Err(CorrFlowError::invalid_parameter(
                name,
                format!("expected int, got {}", other.kind_name()),
            )),
        }
    }

    /// Reads a numeric override; integers are widened.
    pub(crate) fn f64_param(&self, name: &str) -> CorrFlowResult<Option<f64>> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Float(value)) => Ok(Some(value)),
            Some(ParamValue::Int(value)) => Ok(Some(value as f64)),
            Some(other) => Err(CorrFlowError::invalid_parameter(
                name,
                format!("expected float, got {}", other.kind_name()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ParamRegistry, ParamValue};
    use crate::util::ErrorKind;

    #[test]
    fn insert_and_lookup() {
        let mut params = ParamRegistry::new().with("offset_radius", 3usize);
        assert_eq!(params.get("offset_radius"), Some(ParamValue::Int(3)));
        assert_eq!(params.insert("offset_radius", 4i64), Some(ParamValue::Int(3)));
        assert_eq!(params.len(), 1);
        assert_eq!(params.remove("offset_radius"), Some(ParamValue::Int(4)));
        assert!(params.is_empty());
    }

    #[test]
    fn usize_param_rejects_wrong_kinds() {
        let params = ParamRegistry::new()
            .with("a", 2i64)
            .with("b", -1i64)
            .with("c", 0.5f64)
            .with("d", true);
        assert_eq!(params.usize_param("a").unwrap(), Some(2));
        assert_eq!(params.usize_param("missing").unwrap(), None);
        assert_eq!(
            params.usize_param("b").unwrap_err().kind(),
            ErrorKind::Configuration
        );
        assert!(params.usize_param("c").is_err());
        assert!(params.usize_param("d").is_err());
    }

    #[test]
    fn f64_param_widens_ints() {
        let params = ParamRegistry::new().with("x", 2i64).with("y", 0.25f32).with("z", false);
        assert_eq!(params.f64_param("x").unwrap(), Some(2.0));
        assert_eq!(params.f64_param("y").unwrap(), Some(0.25));
        assert!(params.f64_param("z").is_err());
    }

    #[test]
    fn iter_is_sorted_by_name() {
        let params = ParamRegistry::new().with("b", 1i64).with("a", 2i64);
        let names: Vec<&str> = params.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
