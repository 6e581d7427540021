use crate::ScanKind;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A single feature value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Num(f64),
    Flag(bool),
    Cat(String),
}

impl FeatureValue {
    /// Numeric view used by linear scorers; flags map to 0/1, categories to 0.
    pub fn as_f64(&self) -> f64 {
        match self {
            FeatureValue::Num(v) => *v,
            FeatureValue::Flag(b) => if *b { 1.0 } else { 0.0 },
            FeatureValue::Cat(_) => 0.0,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self { FeatureValue::Num(v) }
}

impl From<usize> for FeatureValue {
    fn from(v: usize) -> Self { FeatureValue::Num(v as f64) }
}

impl From<u64> for FeatureValue {
    fn from(v: u64) -> Self { FeatureValue::Num(v as f64) }
}

impl From<bool> for FeatureValue {
    fn from(v: bool) -> Self { FeatureValue::Flag(v) }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self { FeatureValue::Cat(v) }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self { FeatureValue::Cat(v.to_string()) }
}

/// Ordered feature name -> value mapping. Each extractor pushes the same
/// keys in the same order for every input of its kind.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    kind: ScanKind,
    entries: Vec<(String, FeatureValue)>,
}

impl FeatureVector {
    pub fn new(kind: ScanKind) -> Self {
        FeatureVector { kind, entries: Vec::new() }
    }

    pub fn with_capacity(kind: ScanKind, n: usize) -> Self {
        FeatureVector { kind, entries: Vec::with_capacity(n) }
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) -> &mut Self {
        self.entries.push((name.into(), value.into()));
        self
    }

    pub fn kind(&self) -> ScanKind { self.kind }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Numeric value of `name`, 0.0 when absent.
    pub fn num(&self, name: &str) -> f64 {
        self.get(name).map(FeatureValue::as_f64).unwrap_or(0.0)
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some(FeatureValue::Flag(true)))
    }

    pub fn cat(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FeatureValue::Cat(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_and_numeric_view() {
        let mut fv = FeatureVector::new(ScanKind::Url);
        fv.push("len", 12usize).push("https", true).push("tld", "xyz");
        assert_eq!(fv.num("len"), 12.0);
        assert_eq!(fv.num("https"), 1.0);
        assert_eq!(fv.num("tld"), 0.0);
        assert_eq!(fv.num("missing"), 0.0);
        assert!(fv.flag("https"));
        assert_eq!(fv.cat("tld"), Some("xyz"));
        assert_eq!(fv.keys().collect::<Vec<_>>(), vec!["len", "https", "tld"]);
    }

    #[test]
    fn serializes_as_ordered_map() {
        let mut fv = FeatureVector::new(ScanKind::Profile);
        fv.push("b", 1.5).push("a", false);
        assert_eq!(serde_json::to_string(&fv).unwrap(), r#"{"b":1.5,"a":false}"#);
    }
}
