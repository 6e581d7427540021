use crate::ScanKind;
use serde::{Deserialize, Serialize};

/// Scorer output: a per-kind label, a confidence in [0,1] and display reasons.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub label: String,
    pub confidence: f64,
    /// Fired rules or lookup details. Shown to the caller, never persisted.
    pub reasons: Vec<String>,
}

impl Verdict {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };
        Verdict { label: label.into(), confidence, reasons: Vec::new() }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }

    pub fn with_reasons(mut self, reasons: impl IntoIterator<Item = String>) -> Self {
        self.reasons.extend(reasons);
        self
    }
}

/// A scan outcome before the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScan {
    pub kind: ScanKind,
    pub input: String,
    pub result: String,
    pub confidence: f64,
}

impl NewScan {
    pub fn new(kind: ScanKind, input: impl Into<String>, result: impl Into<String>, confidence: f64) -> Self {
        NewScan { kind, input: input.into(), result: result.into(), confidence }
    }
}

/// One immutable row of the scan log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: i64,
    /// Stored type string. Older logs carry types outside `ScanKind`.
    #[serde(rename = "type")]
    pub kind: String,
    pub input: String,
    /// Classification label; vocabulary is owned by each kind.
    pub result: String,
    pub confidence: f64,
    pub timestamp: String,
}

impl ScanRecord {
    /// The scan kind, if the stored type is one this build knows.
    pub fn scan_kind(&self) -> Option<ScanKind> {
        self.kind.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_confidence_is_clamped() {
        assert_eq!(Verdict::new("x", 1.7).confidence, 1.0);
        assert_eq!(Verdict::new("x", -0.2).confidence, 0.0);
        assert_eq!(Verdict::new("x", f64::NAN).confidence, 0.0);
    }

    #[test]
    fn stored_type_maps_back_to_kind() {
        let mut r = ScanRecord {
            id: 1,
            kind: "IDS".into(),
            input: "GET /".into(),
            result: "No Threat Detected".into(),
            confidence: 0.0,
            timestamp: "2025-01-01 10:00:00".into(),
        };
        assert_eq!(r.scan_kind(), Some(ScanKind::IdsEvent));
        r.kind = "PortScan".into();
        assert_eq!(r.scan_kind(), None);
    }
}
