use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use shield_core::{ScanKind, Verdict};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Delivery channel for threat notifications.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, alert: &Alert) -> Result<()>;
}

/// Posts each alert as JSON to a relay that owns the mail transport.
pub struct WebhookAlertSink {
    http: Client,
    url: String,
    timeout: Duration,
}

impl WebhookAlertSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::build(url.into(), timeout, true)
    }

    /// Same as `new` but ignores proxy environment variables.
    #[cfg(test)]
    fn direct(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::build(url.into(), timeout, false)
    }

    fn build(url: String, timeout: Duration, system_proxy: bool) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("shield/", env!("CARGO_PKG_VERSION")));
        if !system_proxy {
            builder = builder.no_proxy();
        }
        Ok(WebhookAlertSink { http: builder.build()?, url, timeout })
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let req = self.http.post(&self.url).json(alert).send();
        let resp = tokio::time::timeout(self.timeout, req)
            .await
            .map_err(|_| anyhow!("alert relay timed out after {:?}", self.timeout))??;
        if !resp.status().is_success() {
            return Err(anyhow!("alert relay returned HTTP {}", resp.status().as_u16()));
        }
        Ok(())
    }
}

/// Writes alerts to the tracing log only.
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn send(&self, alert: &Alert) -> Result<()> {
        tracing::warn!(recipient = %alert.recipient, subject = %alert.subject, "{}", alert.body);
        Ok(())
    }
}

/// Results worth notifying someone about.
pub fn is_high_severity(kind: ScanKind, verdict: &Verdict) -> bool {
    match kind {
        ScanKind::Url => verdict.label == "Malicious",
        ScanKind::Text => verdict.label.starts_with(text_scan::FLAGGED_PREFIX),
        ScanKind::Profile => verdict.label == "High Risk",
        ScanKind::IdsEvent => verdict.label != ids_scan::NO_THREAT && verdict.confidence >= 0.6,
        ScanKind::IpReputation => verdict.label == "High-Risk IP",
    }
}

pub fn compose(recipient: &str, kind: ScanKind, input: &str, verdict: &Verdict) -> Alert {
    let mut body = format!(
        "{kind} scan flagged: {}\nconfidence: {:.2}\ninput: {input}\n",
        verdict.label, verdict.confidence
    );
    for r in &verdict.reasons {
        body.push_str("- ");
        body.push_str(r);
        body.push('\n');
    }
    Alert {
        recipient: recipient.to_string(),
        subject: format!("[shield] {kind}: {}", verdict.label),
        body,
    }
}

/// Fire and forget: delivery failures are logged and never surface to the scan.
pub async fn dispatch(sink: &dyn AlertSink, alert: Alert) {
    match sink.send(&alert).await {
        Ok(()) => tracing::info!(recipient = %alert.recipient, subject = %alert.subject, "alert sent"),
        Err(e) => tracing::warn!(recipient = %alert.recipient, error = %e, "alert delivery failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn severity_per_kind() {
        assert!(is_high_severity(ScanKind::Url, &Verdict::new("Malicious", 0.9)));
        assert!(!is_high_severity(ScanKind::Url, &Verdict::new("Safe", 0.9)));
        assert!(is_high_severity(ScanKind::Text, &Verdict::new("Cyberbullying: Threat", 0.0)));
        assert!(is_high_severity(ScanKind::IdsEvent, &Verdict::new("SQLiAttempt", 0.9)));
        assert!(!is_high_severity(ScanKind::IdsEvent, &Verdict::new("FailedLogin", 0.3)));
        assert!(!is_high_severity(ScanKind::IpReputation, &Verdict::new("Suspicious IP", 0.5)));
    }

    #[test]
    fn compose_lists_reasons() {
        let v = Verdict::new("High Risk", 0.85).with_reason("default profile image");
        let a = compose("soc@example.org", ScanKind::Profile, "{}", &v);
        assert_eq!(a.subject, "[shield] Profile: High Risk");
        assert!(a.body.contains("confidence: 0.85"));
        assert!(a.body.contains("- default profile image"));
    }

    #[tokio::test]
    async fn webhook_posts_json_and_reports_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 2048];
            loop {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some((head, body)) = text.split_once("\r\n\r\n") {
                    let len = head
                        .lines()
                        .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().to_string()))
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0);
                    if body.len() >= len {
                        break;
                    }
                }
            }
            sock.write_all(b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            String::from_utf8_lossy(&buf).to_string()
        });
        let sink = WebhookAlertSink::direct(format!("http://{addr}/notify"), Duration::from_secs(5)).unwrap();
        let alert = Alert { recipient: "a@b.c".into(), subject: "s".into(), body: "b".into() };
        let err = sink.send(&alert).await.unwrap_err();
        assert!(err.to_string().contains("503"));
        let req = server.await.unwrap();
        assert!(req.starts_with("POST /notify"));
        assert!(req.contains(r#""recipient":"a@b.c""#));
    }

    #[tokio::test]
    async fn dispatch_swallows_failures() {
        struct Broken;
        #[async_trait]
        impl AlertSink for Broken {
            async fn send(&self, _alert: &Alert) -> Result<()> {
                Err(anyhow!("smtp down"))
            }
        }
        dispatch(&Broken, Alert { recipient: "x".into(), subject: "y".into(), body: "z".into() }).await;
        dispatch(&LogAlertSink, Alert { recipient: "x".into(), subject: "y".into(), body: "z".into() }).await;
    }
}
