//! Lexical URL features and the URL scorer/explainer built on a pinned model.
//!
//! Extraction never touches the network: everything is derived from the
//! string itself, so the same URL always yields the same vector.

mod model;

pub use model::{LogisticUrlModel, UrlModel};

use shield_core::{Explanation, FeatureVector, Result, ScanError, ScanKind, Verdict};
use std::net::IpAddr;

/// Feature names in vector order.
pub const FEATURE_NAMES: [&str; 15] = [
    "url_length",
    "host_length",
    "path_length",
    "digit_count",
    "digit_ratio",
    "special_ratio",
    "dot_count",
    "hyphen_count",
    "has_at",
    "has_ip_host",
    "uses_https",
    "subdomain_depth",
    "query_params",
    "suspicious_keywords",
    "suspicious_tld",
];

const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "login", "signin", "verify", "update", "secure", "account", "banking", "confirm", "password",
    "webscr", "free", "bonus", "lucky", "wallet", "unlock",
];

const SUSPICIOUS_TLDS: &[&str] = &[
    "xyz", "top", "tk", "ml", "ga", "cf", "gq", "zip", "click", "country", "kim", "loan", "work",
    "support", "buzz",
];

struct Parts {
    scheme: String,
    host: String,
    path: String,
    query: String,
}

/// True when `raw` opens with `scheme://`, scheme being ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ).
fn has_scheme(raw: &str) -> bool {
    let Some((scheme, _)) = raw.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn split_url(raw: &str) -> Parts {
    let with_scheme = if has_scheme(raw) { raw.to_string() } else { format!("http://{raw}") };
    if let Ok(u) = url::Url::parse(&with_scheme) {
        if let Some(host) = u.host_str() {
            return Parts {
                scheme: u.scheme().to_string(),
                host: host.trim_start_matches('[').trim_end_matches(']').to_lowercase(),
                path: u.path().to_string(),
                query: u.query().unwrap_or("").to_string(),
            };
        }
    }
    // Not parseable as a URL: split by hand so odd strings still get features.
    let (scheme, rest) = with_scheme.split_once("://").unwrap_or(("http", with_scheme.as_str()));
    let (authority, tail) = match rest.find(['/', '?', '#']) {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let host = host.split(':').next().unwrap_or(host).to_lowercase();
    let (path, query) = match tail.split_once('?') {
        Some((p, q)) => (p, q.split('#').next().unwrap_or("")),
        None => (tail.split('#').next().unwrap_or(""), ""),
    };
    Parts { scheme: scheme.to_lowercase(), host, path: path.to_string(), query: query.to_string() }
}

fn is_ip_host(host: &str) -> bool {
    if host.parse::<IpAddr>().is_ok() {
        return true;
    }
    // dotted numeric forms the url crate normalises away, e.g. 0x7f.1
    let labels: Vec<&str> = host.split('.').collect();
    labels.len() == 4 && labels.iter().all(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_digit()))
}

fn keyword_hits(lower: &str) -> usize {
    SUSPICIOUS_KEYWORDS.iter().filter(|k| lower.contains(*k)).count()
}

fn tld(host: &str) -> &str {
    host.trim_end_matches('.').rsplit('.').next().unwrap_or("")
}

/// Extract the fixed URL feature vector. Empty input is the only rejection.
pub fn extract(raw: &str) -> Result<FeatureVector> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ScanError::invalid("empty URL"));
    }
    let parts = split_url(raw);
    let len = raw.chars().count();
    let digits = raw.chars().filter(|c| c.is_ascii_digit()).count();
    let special = raw.chars().filter(|c| !c.is_alphanumeric() && !matches!(c, ':' | '/' | '.')).count();
    let ip_host = is_ip_host(&parts.host);
    let labels = parts.host.trim_end_matches('.').split('.').filter(|l| !l.is_empty()).count();
    let depth = if ip_host { 0 } else { labels.saturating_sub(2) };
    let query_params = parts.query.split('&').filter(|p| !p.is_empty()).count();
    let ratio = |n: usize| if len == 0 { 0.0 } else { n as f64 / len as f64 };

    let mut fv = FeatureVector::with_capacity(ScanKind::Url, FEATURE_NAMES.len());
    fv.push("url_length", len)
        .push("host_length", parts.host.chars().count())
        .push("path_length", parts.path.trim_start_matches('/').chars().count())
        .push("digit_count", digits)
        .push("digit_ratio", ratio(digits))
        .push("special_ratio", ratio(special))
        .push("dot_count", raw.matches('.').count())
        .push("hyphen_count", raw.matches('-').count())
        .push("has_at", raw.contains('@'))
        .push("has_ip_host", ip_host)
        .push("uses_https", parts.scheme == "https")
        .push("subdomain_depth", depth)
        .push("query_params", query_params)
        .push("suspicious_keywords", keyword_hits(&raw.to_lowercase()))
        .push("suspicious_tld", !ip_host && SUSPICIOUS_TLDS.contains(&tld(&parts.host)));
    Ok(fv)
}

fn expect_url(features: &FeatureVector) -> Result<()> {
    if features.kind() != ScanKind::Url {
        return Err(ScanError::scorer(format!("URL scorer got {} features", features.kind())));
    }
    Ok(())
}

/// Classify with the pinned model: `Malicious` above the model threshold, else `Safe`.
/// Confidence is the probability of the emitted label.
pub fn score(model: &dyn UrlModel, features: &FeatureVector) -> Result<Verdict> {
    expect_url(features)?;
    let p = model.predict_proba(features)?;
    let verdict = if p > model.threshold() {
        Verdict::new("Malicious", p)
    } else {
        Verdict::new("Safe", 1.0 - p)
    };
    let mut reasons = Vec::new();
    if !features.flag("uses_https") { reasons.push("no HTTPS".to_string()); }
    if features.flag("has_ip_host") { reasons.push("IP address used as host".to_string()); }
    if features.flag("has_at") { reasons.push("'@' in URL".to_string()); }
    if features.flag("suspicious_tld") { reasons.push("suspicious top-level domain".to_string()); }
    let kw = features.num("suspicious_keywords");
    if kw > 0.0 { reasons.push(format!("{kw} phishing keyword(s)")); }
    Ok(verdict.with_reasons(reasons))
}

pub fn explain(model: &dyn UrlModel, features: &FeatureVector) -> Result<Explanation> {
    expect_url(features).map_err(|e| ScanError::explanation(e.to_string()))?;
    Ok(Explanation::ranked(model.contributions(features)?))
}
