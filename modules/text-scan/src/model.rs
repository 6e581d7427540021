use serde::Deserialize;
use shield_core::{FeatureVector, Result, ScanError};
use std::path::Path;

/// Pinned text classifier: a discrete label for a vectorised message.
pub trait TextModel: Send + Sync {
    fn predict_label(&self, features: &FeatureVector) -> Result<String>;
    /// Per-token weight towards `label`, only for tokens present in the vector.
    fn token_contributions(&self, features: &FeatureVector, label: &str) -> Result<Vec<(String, f64)>>;
    fn n_features(&self) -> usize;
    fn safe_label(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct Artifact {
    name: String,
    version: String,
    classes: Vec<String>,
    #[serde(default = "default_safe")]
    safe_class: String,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

fn default_safe() -> String { "Safe".to_string() }

/// One-vs-rest linear classifier. A two-class artifact may carry a single
/// coefficient row, in which case a positive margin selects `classes[1]`.
#[derive(Debug, Clone)]
pub struct LinearTextModel {
    pub name: String,
    pub version: String,
    classes: Vec<String>,
    safe_class: String,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    n_features: usize,
}

impl LinearTextModel {
    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| ScanError::model(format!("{}: {e}", path.display())))?;
        Self::from_json(&s).map_err(|e| ScanError::model(format!("{}: {e}", path.display())))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let a: Artifact = serde_json::from_str(s).map_err(|e| ScanError::model(format!("text model: {e}")))?;
        let binary = a.classes.len() == 2 && a.coef.len() == 1;
        if a.classes.len() < 2 || (!binary && a.coef.len() != a.classes.len()) {
            return Err(ScanError::model(format!(
                "text model has {} coefficient rows for {} classes",
                a.coef.len(),
                a.classes.len()
            )));
        }
        if a.intercept.len() != a.coef.len() {
            return Err(ScanError::model("text model intercept/coef row mismatch"));
        }
        let n_features = a.coef[0].len();
        if a.coef.iter().any(|row| row.len() != n_features) {
            return Err(ScanError::model("text model coefficient rows differ in width"));
        }
        if !a.classes.contains(&a.safe_class) {
            return Err(ScanError::model(format!("text model has no {:?} class", a.safe_class)));
        }
        Ok(LinearTextModel {
            name: a.name,
            version: a.version,
            classes: a.classes,
            safe_class: a.safe_class,
            coef: a.coef,
            intercept: a.intercept,
            n_features,
        })
    }

    fn check_width(&self, features: &FeatureVector) -> Result<()> {
        if features.len() != self.n_features {
            return Err(ScanError::scorer(format!(
                "text model expects {} features, got {}",
                self.n_features,
                features.len()
            )));
        }
        Ok(())
    }

    fn margin(&self, row: usize, features: &FeatureVector) -> f64 {
        self.intercept[row]
            + self.coef[row].iter().zip(features.iter()).map(|(c, (_, v))| c * v.as_f64()).sum::<f64>()
    }

    fn is_binary(&self) -> bool { self.coef.len() == 1 }
}

impl TextModel for LinearTextModel {
    fn predict_label(&self, features: &FeatureVector) -> Result<String> {
        self.check_width(features)?;
        if self.is_binary() {
            let idx = if self.margin(0, features) > 0.0 { 1 } else { 0 };
            return Ok(self.classes[idx].clone());
        }
        // first maximum wins on ties
        let mut best = 0;
        let mut best_m = f64::NEG_INFINITY;
        for row in 0..self.coef.len() {
            let m = self.margin(row, features);
            if m > best_m {
                best = row;
                best_m = m;
            }
        }
        Ok(self.classes[best].clone())
    }

    fn token_contributions(&self, features: &FeatureVector, label: &str) -> Result<Vec<(String, f64)>> {
        self.check_width(features)?;
        let (row, sign) = match self.classes.iter().position(|c| c == label) {
            Some(i) if self.is_binary() => (0, if i == 1 { 1.0 } else { -1.0 }),
            Some(i) => (i, 1.0),
            None => return Err(ScanError::explanation(format!("unknown text class {label:?}"))),
        };
        Ok(features
            .iter()
            .zip(&self.coef[row])
            .filter(|((_, v), _)| v.as_f64() != 0.0)
            .map(|((term, v), c)| (term.to_string(), sign * c * v.as_f64()))
            .collect())
    }

    fn n_features(&self) -> usize { self.n_features }

    fn safe_label(&self) -> &str { &self.safe_class }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shield_core::ScanKind;

    fn fv(values: &[(&str, f64)]) -> FeatureVector {
        let mut fv = FeatureVector::new(ScanKind::Text);
        for (k, v) in values {
            fv.push(*k, *v);
        }
        fv
    }

    #[test]
    fn binary_artifact_uses_sign_of_margin() {
        let m = LinearTextModel::from_json(
            r#"{"name":"b","version":"1","classes":["Safe","Toxic"],"coef":[[2.0,-1.0]],"intercept":[-0.5]}"#,
        )
        .unwrap();
        assert_eq!(m.predict_label(&fv(&[("bad", 1.0), ("nice", 0.0)])).unwrap(), "Toxic");
        assert_eq!(m.predict_label(&fv(&[("bad", 0.0), ("nice", 1.0)])).unwrap(), "Safe");
        let c = m.token_contributions(&fv(&[("bad", 0.0), ("nice", 1.0)]), "Safe").unwrap();
        assert_eq!(c, vec![("nice".to_string(), 1.0)]);
    }

    #[test]
    fn width_mismatch_is_a_scorer_error() {
        let m = LinearTextModel::from_json(
            r#"{"name":"b","version":"1","classes":["Safe","Toxic"],"coef":[[2.0,-1.0]],"intercept":[0.0]}"#,
        )
        .unwrap();
        assert!(matches!(m.predict_label(&fv(&[("bad", 1.0)])), Err(ScanError::Scorer(_))));
    }

    #[test]
    fn rejects_malformed_artifacts() {
        let no_safe = r#"{"name":"b","version":"1","classes":["A","B"],"coef":[[1.0]],"intercept":[0.0]}"#;
        assert!(matches!(LinearTextModel::from_json(no_safe), Err(ScanError::ModelUnavailable(_))));
        let ragged = r#"{"name":"b","version":"1","classes":["Safe","B","C"],"coef":[[1.0],[1.0,2.0],[0.0]],"intercept":[0,0,0]}"#;
        assert!(LinearTextModel::from_json(ragged).is_err());
    }
}
