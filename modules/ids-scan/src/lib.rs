//! Rule-based detection over single IDS log lines.

mod simulate;

pub use simulate::{simulate, simulate_at, AttackKind, SimulatedEvent, ATTACKS};

use regex::Regex;
use shield_core::{FeatureVector, Result, ScanError, ScanKind, Verdict};
use std::sync::OnceLock;

pub const FEATURE_NAMES: [&str; 5] = ["port_count", "failed_login_count", "sqli_markers", "malware_marker", "failed_password"];

pub const PORT_SCAN_MIN: usize = 5;
pub const BRUTE_FORCE_MIN: u64 = 5;

/// Matched case-insensitively anywhere in the line.
pub const SQLI_PAYLOADS: [&str; 5] = ["' or 1=1 --", "' OR '1'='1", "UNION SELECT", "<script>", "DROP TABLE"];

pub const NO_THREAT: &str = "No Threat";

fn port_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"PORT=(.*)").expect("static regex"))
}

fn failed_login_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"FAILED LOGIN.*count=(\d+)").expect("static regex"))
}

fn port_count(line: &str) -> usize {
    port_re()
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().split(',').filter(|p| !p.trim().is_empty()).count())
        .unwrap_or(0)
}

fn failed_login_count(line: &str) -> u64 {
    failed_login_re()
        .captures(line)
        .and_then(|c| c.get(1))
        // a count too large for u64 is still a brute force
        .map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
        .unwrap_or(0)
}

pub fn extract(raw: &str) -> Result<FeatureVector> {
    if raw.trim().is_empty() {
        return Err(ScanError::invalid("empty log line"));
    }
    let lower = raw.to_lowercase();
    let sqli = SQLI_PAYLOADS.iter().filter(|p| lower.contains(&p.to_lowercase())).count();
    let mut fv = FeatureVector::with_capacity(ScanKind::IdsEvent, FEATURE_NAMES.len());
    fv.push("port_count", port_count(raw))
        .push("failed_login_count", failed_login_count(raw))
        .push("sqli_markers", sqli)
        .push("malware_marker", lower.contains("exe") || lower.contains("malware"))
        .push("failed_password", lower.contains("failed password"));
    Ok(fv)
}

/// Detection rules in descending weight, so the first that fires names the event.
pub fn fired(features: &FeatureVector) -> Vec<AttackKind> {
    let mut out = Vec::new();
    if features.num("sqli_markers") > 0.0 {
        out.push(AttackKind::SqliAttempt);
    }
    if features.flag("malware_marker") {
        out.push(AttackKind::MalwareDownload);
    }
    if features.num("failed_login_count") >= BRUTE_FORCE_MIN as f64 {
        out.push(AttackKind::BruteForce);
    }
    if features.num("port_count") >= PORT_SCAN_MIN as f64 {
        out.push(AttackKind::PortScan);
    }
    if features.flag("failed_password") {
        out.push(AttackKind::FailedLogin);
    }
    out
}

pub fn score(features: &FeatureVector) -> Result<Verdict> {
    if features.kind() != ScanKind::IdsEvent {
        return Err(ScanError::scorer(format!("IDS scorer got {} features", features.kind())));
    }
    let hits = fired(features);
    let Some(strongest) = hits.first() else {
        return Ok(Verdict::new(NO_THREAT, 0.0).with_reason("no detection rule fired"));
    };
    let total: f64 = hits.iter().map(|k| k.weight()).sum();
    Ok(Verdict::new(strongest.label(), total.min(1.0)).with_reasons(hits.iter().map(|k| k.reason().to_string())))
}
