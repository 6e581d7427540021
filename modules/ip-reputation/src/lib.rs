//! IP reputation: address features plus a remote abuse-score lookup.

mod client;

pub use client::{parse_response, AbuseIpDbClient, ReputationConfig, DEFAULT_BASE_URL};

use async_trait::async_trait;
use serde::Serialize;
use shield_core::{FeatureVector, Result, ScanError, ScanKind, Verdict};
use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpReport {
    /// 0..=100
    pub abuse_score: u8,
    pub total_reports: u64,
    pub country: Option<String>,
    pub last_reported: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReputationError {
    #[error("reputation API key is not configured (set ABUSEIPDB_API_KEY)")]
    MissingApiKey,
    #[error("reputation lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error("reputation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("reputation service returned HTTP {0}")]
    Status(u16),
    #[error("malformed reputation response: {0}")]
    Malformed(String),
}

impl From<ReputationError> for ScanError {
    fn from(e: ReputationError) -> Self {
        ScanError::scorer(e.to_string())
    }
}

#[async_trait]
pub trait ReputationLookup: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> std::result::Result<IpReport, ReputationError>;
}

pub const FEATURE_NAMES: [&str; 3] = ["address", "ipv6", "private_range"];

pub const HIGH_RISK_SCORE: u8 = 70;
pub const SUSPICIOUS_SCORE: u8 = 30;

pub fn parse_ip(raw: &str) -> Result<IpAddr> {
    let t = raw.trim();
    if t.is_empty() {
        return Err(ScanError::invalid("empty IP address"));
    }
    t.parse().map_err(|_| ScanError::invalid(format!("not an IP address: {t}")))
}

fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback() || v6.is_unspecified() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
        }
    }
}

pub fn extract(raw: &str) -> Result<FeatureVector> {
    let ip = parse_ip(raw)?;
    let mut fv = FeatureVector::with_capacity(ScanKind::IpReputation, FEATURE_NAMES.len());
    fv.push("address", ip.to_string())
        .push("ipv6", ip.is_ipv6())
        .push("private_range", is_private(ip));
    Ok(fv)
}

pub fn tier(abuse_score: u8) -> &'static str {
    if abuse_score >= HIGH_RISK_SCORE {
        "High-Risk IP"
    } else if abuse_score >= SUSPICIOUS_SCORE {
        "Suspicious IP"
    } else {
        "Clean IP"
    }
}

pub fn classify(report: &IpReport) -> Verdict {
    let score = report.abuse_score.min(100);
    let mut reasons = vec![
        format!("abuse confidence score {score}/100"),
        format!("{} reports", report.total_reports),
    ];
    if let Some(c) = &report.country {
        reasons.push(format!("country {c}"));
    }
    if let Some(at) = &report.last_reported {
        reasons.push(format!("last reported {at}"));
    }
    Verdict::new(tier(score), f64::from(score) / 100.0).with_reasons(reasons)
}

/// Look up the extracted address. Lookup failures surface as scorer errors.
pub async fn score(lookup: &dyn ReputationLookup, features: &FeatureVector) -> Result<Verdict> {
    if features.kind() != ScanKind::IpReputation {
        return Err(ScanError::scorer(format!("IP scorer got {} features", features.kind())));
    }
    let ip: IpAddr = features
        .cat("address")
        .and_then(|a| a.parse().ok())
        .ok_or_else(|| ScanError::scorer("IP features carry no address"))?;
    let report = lookup.lookup(ip).await?;
    let mut verdict = classify(&report);
    if features.flag("private_range") {
        verdict.reasons.push("private or local address".to_string());
    }
    Ok(verdict)
}
