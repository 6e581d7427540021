use serde::Deserialize;
use shield_core::{FeatureVector, Result, ScanError};
use std::collections::BTreeMap;
use std::path::Path;

use crate::FEATURE_NAMES;

/// Pinned URL classifier: probability of the malicious class given features.
pub trait UrlModel: Send + Sync {
    fn predict_proba(&self, features: &FeatureVector) -> Result<f64>;
    /// Per-feature contribution to the decision for this one vector.
    fn contributions(&self, features: &FeatureVector) -> Result<Vec<(String, f64)>>;
    fn threshold(&self) -> f64 { 0.5 }
}

#[derive(Debug, Clone, Deserialize)]
struct Artifact {
    name: String,
    version: String,
    #[serde(default = "default_threshold")]
    threshold: f64,
    bias: f64,
    weights: BTreeMap<String, f64>,
}

fn default_threshold() -> f64 { 0.5 }

/// Logistic regression over the lexical features, loaded from a JSON artifact.
#[derive(Debug, Clone)]
pub struct LogisticUrlModel {
    pub name: String,
    pub version: String,
    threshold: f64,
    bias: f64,
    weights: BTreeMap<String, f64>,
}

impl LogisticUrlModel {
    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| ScanError::model(format!("{}: {e}", path.display())))?;
        Self::from_json(&s).map_err(|e| ScanError::model(format!("{}: {e}", path.display())))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let a: Artifact = serde_json::from_str(s).map_err(|e| ScanError::model(format!("url model: {e}")))?;
        if let Some(k) = a.weights.keys().find(|k| !FEATURE_NAMES.contains(&k.as_str())) {
            return Err(ScanError::model(format!("url model weights unknown feature {k}")));
        }
        if !a.bias.is_finite() || a.weights.values().any(|w| !w.is_finite()) {
            return Err(ScanError::model("url model has non-finite coefficients"));
        }
        if !(a.threshold > 0.0 && a.threshold < 1.0) {
            return Err(ScanError::model(format!("url model threshold {} outside (0,1)", a.threshold)));
        }
        Ok(LogisticUrlModel { name: a.name, version: a.version, threshold: a.threshold, bias: a.bias, weights: a.weights })
    }

    fn logit(&self, features: &FeatureVector) -> f64 {
        self.bias + self.weights.iter().map(|(k, w)| w * features.num(k)).sum::<f64>()
    }
}

impl UrlModel for LogisticUrlModel {
    fn predict_proba(&self, features: &FeatureVector) -> Result<f64> {
        let z = self.logit(features);
        if !z.is_finite() {
            return Err(ScanError::scorer("url model produced a non-finite score"));
        }
        Ok(1.0 / (1.0 + (-z).exp()))
    }

    fn contributions(&self, features: &FeatureVector) -> Result<Vec<(String, f64)>> {
        Ok(self.weights.iter().map(|(k, w)| (k.clone(), w * features.num(k))).collect())
    }

    fn threshold(&self) -> f64 { self.threshold }
}
