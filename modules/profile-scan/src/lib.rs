//! Fake-profile heuristics: additive fixed-weight rules over account metadata.

use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use shield_core::{FeatureVector, Result, ScanError, ScanKind, Verdict};
use std::sync::OnceLock;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime};

/// Account metadata as submitted. Every field is optional; an absent field
/// fires no rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "whole_count", skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
    #[serde(default, deserialize_with = "whole_count", skip_serializing_if = "Option::is_none")]
    pub following: Option<u64>,
    #[serde(default)]
    pub profile_image_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// Counts arrive as integers or as integral floats (`50.0`).
fn whole_count<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<u64>, D::Error> {
    let Some(n) = Option::<serde_json::Number>::deserialize(d)? else {
        return Ok(None);
    };
    if let Some(v) = n.as_u64() {
        return Ok(Some(v));
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 => Ok(Some(f as u64)),
        _ => Err(D::Error::custom(format!("expected a non-negative whole number, got {n}"))),
    }
}

impl ProfileRecord {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| ScanError::invalid(format!("profile record: {e}")))
    }

    /// Canonical form stored as the scan input.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

pub const FEATURE_NAMES: [&str; 11] = [
    "account_age_days",
    "created_at_known",
    "new_account",
    "followers",
    "following",
    "low_followers",
    "following_far_exceeds",
    "default_avatar",
    "username_digit_run",
    "username_digit_density",
    "bio_length",
];

pub const NEW_ACCOUNT_DAYS: i64 = 30;
pub const LOW_FOLLOWERS: u64 = 10;
pub const FOLLOWING_FACTOR: u64 = 5;

/// One additive rule. Weights are in hundredths so tiers compare exactly.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub feature: &'static str,
    pub points: u32,
    pub reason: &'static str,
}

pub const RULES: [Rule; 5] = [
    Rule { feature: "new_account", points: 30, reason: "account younger than 30 days" },
    Rule { feature: "low_followers", points: 20, reason: "fewer than 10 followers" },
    Rule { feature: "following_far_exceeds", points: 15, reason: "follows more than 5x its followers" },
    Rule { feature: "default_avatar", points: 20, reason: "default profile image" },
    Rule { feature: "username_digit_run", points: 15, reason: "username has a run of 4+ digits" },
];

pub const HIGH_RISK_POINTS: u32 = 70;
pub const SUSPICIOUS_POINTS: u32 = 40;

fn digit_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4,}").expect("static regex"))
}

fn parse_created(s: &str) -> Option<OffsetDateTime> {
    if let Ok(t) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(t);
    }
    let naive = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    ];
    for f in naive {
        if let Ok(t) = PrimitiveDateTime::parse(s, f) {
            return Some(t.assume_utc());
        }
    }
    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|d| d.midnight().assume_utc())
}

/// Extract features relative to `now`.
pub fn extract_at(raw: &str, now: OffsetDateTime) -> Result<FeatureVector> {
    if raw.trim().is_empty() {
        return Err(ScanError::invalid("empty profile record"));
    }
    let p = ProfileRecord::parse(raw)?;
    let created = match p.created_at.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Some(parse_created(s).ok_or_else(|| ScanError::invalid(format!("unparseable created_at: {s}")))?),
        None => None,
    };
    let age = created.map(|c| now - c);
    let username = p.username.as_deref().unwrap_or("");
    let name_len = username.chars().count();
    let name_digits = username.chars().filter(|c| c.is_ascii_digit()).count();
    let far_exceeds = match (p.followers, p.following) {
        (Some(ers), Some(ing)) => ing > ers.saturating_mul(FOLLOWING_FACTOR),
        _ => false,
    };

    let mut fv = FeatureVector::with_capacity(ScanKind::Profile, FEATURE_NAMES.len());
    fv.push("account_age_days", age.map(|a| a.as_seconds_f64() / 86_400.0).unwrap_or(0.0))
        .push("created_at_known", created.is_some())
        .push("new_account", age.is_some_and(|a| a < Duration::days(NEW_ACCOUNT_DAYS)))
        .push("followers", p.followers.unwrap_or(0))
        .push("following", p.following.unwrap_or(0))
        .push("low_followers", p.followers.is_some_and(|n| n < LOW_FOLLOWERS))
        .push("following_far_exceeds", far_exceeds)
        .push("default_avatar", p.profile_image_default)
        .push("username_digit_run", digit_run().is_match(username))
        .push("username_digit_density", if name_len == 0 { 0.0 } else { name_digits as f64 / name_len as f64 })
        .push("bio_length", p.bio.as_deref().map(|b| b.trim().chars().count()).unwrap_or(0));
    Ok(fv)
}

pub fn extract(raw: &str) -> Result<FeatureVector> {
    extract_at(raw, OffsetDateTime::now_utc())
}

/// Sum of fired rule points, capped at 100, with the rules that fired.
pub fn risk_points(features: &FeatureVector) -> (u32, Vec<&'static Rule>) {
    let fired: Vec<&'static Rule> = RULES.iter().filter(|r| features.flag(r.feature)).collect();
    let points = fired.iter().map(|r| r.points).sum::<u32>().min(100);
    (points, fired)
}

pub fn tier(points: u32) -> &'static str {
    if points >= HIGH_RISK_POINTS {
        "High Risk"
    } else if points >= SUSPICIOUS_POINTS {
        "Suspicious"
    } else {
        "Likely Genuine"
    }
}

pub fn score(features: &FeatureVector) -> Result<Verdict> {
    if features.kind() != ScanKind::Profile {
        return Err(ScanError::scorer(format!("profile scorer got {} features", features.kind())));
    }
    let (points, fired) = risk_points(features);
    Ok(Verdict::new(tier(points), f64::from(points) / 100.0)
        .with_reasons(fired.iter().map(|r| r.reason.to_string())))
}
