use crate::{IpReport, ReputationError, ReputationLookup};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.abuseipdb.com";

#[derive(Debug, Clone)]
pub struct ReputationConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_age_days: u32,
    pub use_system_proxy: bool,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        ReputationConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
            max_age_days: 90,
            use_system_proxy: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<CheckData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckData {
    abuse_confidence_score: Option<i64>,
    #[serde(default)]
    total_reports: Option<u64>,
    country_code: Option<String>,
    last_reported_at: Option<String>,
}

/// Parse a `/api/v2/check` body.
pub fn parse_response(body: &str) -> Result<IpReport, ReputationError> {
    let env: Envelope = serde_json::from_str(body).map_err(|e| ReputationError::Malformed(e.to_string()))?;
    let data = env.data.ok_or_else(|| ReputationError::Malformed("missing data object".into()))?;
    let raw = data
        .abuse_confidence_score
        .ok_or_else(|| ReputationError::Malformed("missing abuseConfidenceScore".into()))?;
    let abuse_score = u8::try_from(raw)
        .ok()
        .filter(|s| *s <= 100)
        .ok_or_else(|| ReputationError::Malformed(format!("abuseConfidenceScore {raw} out of range")))?;
    Ok(IpReport {
        abuse_score,
        total_reports: data.total_reports.unwrap_or(0),
        country: data.country_code.filter(|c| !c.is_empty()),
        last_reported: data.last_reported_at.filter(|s| !s.is_empty()),
    })
}

/// AbuseIPDB-compatible check client. Each lookup is bounded by `timeout`.
pub struct AbuseIpDbClient {
    http: Client,
    cfg: ReputationConfig,
}

impl AbuseIpDbClient {
    pub fn new(cfg: ReputationConfig) -> Result<Self, ReputationError> {
        let mut builder = Client::builder()
            .connect_timeout(cfg.timeout)
            .user_agent(concat!("shield/", env!("CARGO_PKG_VERSION")))
            .gzip(true);
        if !cfg.use_system_proxy {
            builder = builder.no_proxy();
        }
        Ok(AbuseIpDbClient { http: builder.build()?, cfg })
    }

    pub fn config(&self) -> &ReputationConfig {
        &self.cfg
    }

    async fn check(&self, key: &str, ip: IpAddr) -> Result<IpReport, ReputationError> {
        let url = format!("{}/api/v2/check", self.cfg.base_url.trim_end_matches('/'));
        let resp = self
            .http
            .get(url)
            .query(&[("ipAddress", ip.to_string()), ("maxAgeInDays", self.cfg.max_age_days.to_string())])
            .header("Key", key)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ReputationError::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        parse_response(&body)
    }
}

#[async_trait]
impl ReputationLookup for AbuseIpDbClient {
    async fn lookup(&self, ip: IpAddr) -> Result<IpReport, ReputationError> {
        let key = self
            .cfg
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ReputationError::MissingApiKey)?;
        tracing::debug!(%ip, "reputation lookup");
        match tokio::time::timeout(self.cfg.timeout, self.check(key, ip)).await {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(e)) => {
                tracing::warn!(%ip, error = %e, "reputation lookup failed");
                Err(e)
            }
            Err(_) => {
                tracing::warn!(%ip, timeout = ?self.cfg.timeout, "reputation lookup timed out");
                Err(ReputationError::Timeout(self.cfg.timeout))
            }
        }
    }
}
