use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub factor: String,
    pub value: f64,
}

/// Ranked per-factor contributions for a single decision. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Explanation(Vec<Contribution>);

impl Explanation {
    /// Rank by absolute contribution, largest first; ties break on factor name.
    /// Zero and non-finite contributions are dropped.
    pub fn ranked<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut v: Vec<Contribution> = items
            .into_iter()
            .filter(|(_, c)| c.is_finite() && *c != 0.0)
            .map(|(f, c)| Contribution { factor: f.into(), value: c })
            .collect();
        v.sort_by(|a, b| {
            b.value.abs()
                .partial_cmp(&a.value.abs())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.factor.cmp(&b.factor))
        });
        Explanation(v)
    }

    pub fn top(&self, n: usize) -> &[Contribution] {
        &self.0[..n.min(self.0.len())]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Contribution> { self.0.iter() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}
