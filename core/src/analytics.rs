//! Read-side projection over the scan log. Pure: callers fetch the records.

use crate::ScanRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Labels containing any of these (case-insensitive) count as malicious.
pub const MALICIOUS_KEYWORDS: &[&str] = &["malicious", "cyberbullying"];
/// Labels containing any of these count as safe, unless already malicious.
pub const SAFE_KEYWORDS: &[&str] = &["safe"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryStats {
    pub total: usize,
    pub malicious: usize,
    pub safe: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub by_result: BTreeMap<String, usize>,
    /// Keyed by the `YYYY-MM-DD` prefix of the timestamp.
    pub by_day: BTreeMap<String, usize>,
}

impl SummaryStats {
    /// Records matching neither keyword set (e.g. "Suspicious IP", "High Risk").
    pub fn unclassified(&self) -> usize {
        self.total - self.malicious - self.safe
    }
}

fn matches_any(label: &str, keywords: &[&str]) -> bool {
    let l = label.to_lowercase();
    keywords.iter().any(|k| l.contains(k))
}

pub fn is_malicious_label(label: &str) -> bool { matches_any(label, MALICIOUS_KEYWORDS) }

pub fn is_safe_label(label: &str) -> bool {
    !is_malicious_label(label) && matches_any(label, SAFE_KEYWORDS)
}

pub fn summarize(records: &[ScanRecord]) -> SummaryStats {
    let mut s = SummaryStats { total: records.len(), ..Default::default() };
    for r in records {
        if is_malicious_label(&r.result) {
            s.malicious += 1;
        } else if is_safe_label(&r.result) {
            s.safe += 1;
        }
        *s.by_kind.entry(r.kind.clone()).or_default() += 1;
        *s.by_result.entry(r.result.clone()).or_default() += 1;
        let day = r.timestamp.get(..10).unwrap_or(&r.timestamp);
        *s.by_day.entry(day.to_string()).or_default() += 1;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScanKind;

    fn rec(id: i64, kind: ScanKind, result: &str, ts: &str) -> ScanRecord {
        ScanRecord { id, kind: kind.as_str().to_string(), input: format!("input-{id}"), result: result.into(), confidence: 0.5, timestamp: ts.into() }
    }

    #[test]
    fn empty_collection_is_all_zero() {
        let s = summarize(&[]);
        assert_eq!((s.total, s.malicious, s.safe), (0, 0, 0));
        assert!(s.by_kind.is_empty() && s.by_result.is_empty() && s.by_day.is_empty());
    }

    #[test]
    fn counts_and_breakdowns() {
        let rs = vec![
            rec(1, ScanKind::Url, "Malicious", "2026-10-01T10:00:00.000000Z"),
            rec(2, ScanKind::Url, "Safe", "2026-10-01T11:00:00.000000Z"),
            rec(3, ScanKind::Text, "Cyberbullying: Insult", "2026-10-02T09:00:00.000000Z"),
            rec(4, ScanKind::Text, "safe", "2026-10-02T09:30:00.000000Z"),
            rec(5, ScanKind::IpReputation, "Suspicious IP", "2026-10-02T10:00:00.000000Z"),
            rec(6, ScanKind::Profile, "High Risk", "2026-10-03T10:00:00.000000Z"),
        ];
        let s = summarize(&rs);
        assert_eq!(s.total, 6);
        assert_eq!(s.malicious, 2);
        assert_eq!(s.safe, 2);
        assert_eq!(s.unclassified(), 2);
        assert_eq!(s.by_kind["URL"], 2);
        assert_eq!(s.by_kind["Text"], 2);
        assert_eq!(s.by_result["Suspicious IP"], 1);
        assert_eq!(s.by_day["2026-10-02"], 3);
    }

    #[test]
    fn partition_never_exceeds_total() {
        let labels = ["Malicious but Safe-listed", "Unsafe", "Clean IP", "Safe", "MALICIOUS", "", "No Threat"];
        let rs: Vec<_> = labels.iter().enumerate().map(|(i, l)| rec(i as i64, ScanKind::Url, l, "short")).collect();
        let s = summarize(&rs);
        assert!(s.malicious + s.safe <= s.total);
        assert_eq!(s.malicious, 2);
        assert_eq!(s.by_day["short"], 7);
    }

    #[test]
    fn summarize_is_idempotent() {
        let rs = vec![rec(1, ScanKind::Url, "Malicious", "2026-10-01T10:00:00Z")];
        assert_eq!(summarize(&rs), summarize(&rs));
    }
}
