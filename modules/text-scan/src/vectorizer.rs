use regex::Regex;
use serde::Deserialize;
use shield_core::{FeatureVector, Result, ScanError, ScanKind};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct Artifact {
    #[serde(default = "default_true")]
    lowercase: bool,
    #[serde(default = "default_pattern")]
    token_pattern: String,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    #[serde(default = "default_norm")]
    norm: String,
}

fn default_true() -> bool { true }
fn default_pattern() -> String { r"(?u)\b\w\w+\b".to_string() }
fn default_norm() -> String { "l2".to_string() }

/// Shared TF-IDF vectorizer: raw term counts times idf, then l2-normalised.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    lowercase: bool,
    token_re: Regex,
    index: HashMap<String, usize>,
    /// Terms in column order.
    terms: Vec<String>,
    idf: Vec<f64>,
    l2: bool,
}

impl TfidfVectorizer {
    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| ScanError::model(format!("{}: {e}", path.display())))?;
        Self::from_json(&s).map_err(|e| ScanError::model(format!("{}: {e}", path.display())))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let a: Artifact = serde_json::from_str(s).map_err(|e| ScanError::model(format!("vectorizer: {e}")))?;
        let n = a.vocabulary.len();
        if a.idf.len() != n {
            return Err(ScanError::model(format!("vectorizer has {} idf values for {n} terms", a.idf.len())));
        }
        let mut terms = vec![String::new(); n];
        for (term, &i) in &a.vocabulary {
            if i >= n || !terms[i].is_empty() {
                return Err(ScanError::model(format!("vectorizer column {i} for {term:?} is out of range or duplicated")));
            }
            terms[i] = term.clone();
        }
        let l2 = match a.norm.as_str() {
            "l2" => true,
            "none" => false,
            other => return Err(ScanError::model(format!("unsupported vectorizer norm {other}"))),
        };
        let token_re = Regex::new(&a.token_pattern)
            .map_err(|e| ScanError::model(format!("vectorizer token pattern: {e}")))?;
        let index = a.vocabulary.into_iter().collect();
        Ok(TfidfVectorizer { lowercase: a.lowercase, token_re, index, terms, idf: a.idf, l2 })
    }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    pub fn tokens(&self, text: &str) -> Vec<String> {
        self.token_re
            .find_iter(text)
            .map(|m| if self.lowercase { m.as_str().to_lowercase() } else { m.as_str().to_string() })
            .collect()
    }

    /// Dense vector over the whole vocabulary, in column order.
    pub fn transform(&self, text: &str) -> FeatureVector {
        let mut weights = vec![0.0f64; self.terms.len()];
        for tok in self.tokens(text) {
            if let Some(&i) = self.index.get(&tok) {
                weights[i] += 1.0;
            }
        }
        for (w, idf) in weights.iter_mut().zip(&self.idf) {
            *w *= idf;
        }
        if self.l2 {
            let norm = weights.iter().map(|w| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                weights.iter_mut().for_each(|w| *w /= norm);
            }
        }
        let mut fv = FeatureVector::with_capacity(ScanKind::Text, self.terms.len());
        for (term, w) in self.terms.iter().zip(weights) {
            fv.push(term.as_str(), w);
        }
        fv
    }
}
