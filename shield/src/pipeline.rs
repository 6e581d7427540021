use crate::alert::{self, AlertSink};
use crate::context::ScoringContext;
use ip_reputation::ReputationLookup;
use serde::Serialize;
use shield_core::{Explanation, FeatureVector, NewScan, Result, ScanError, ScanKind, ScanLog, ScanRecord, Verdict};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "factors", rename_all = "snake_case")]
pub enum ExplanationState {
    /// The kind has no explainer.
    NotApplicable,
    Available(Explanation),
    Unavailable(String),
}

/// Whether the verdict reached the scan log.
#[derive(Debug)]
pub enum Logged {
    Stored(ScanRecord),
    Failed(ScanError),
}

impl Logged {
    pub fn record(&self) -> Option<&ScanRecord> {
        match self {
            Logged::Stored(r) => Some(r),
            Logged::Failed(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub kind: ScanKind,
    pub verdict: Verdict,
    pub explanation: ExplanationState,
    pub logged: Logged,
}

impl ScanOutcome {
    /// Scored but not recorded.
    pub fn is_partial(&self) -> bool {
        matches!(self.logged, Logged::Failed(_))
    }
}

struct AlertRoute {
    sink: Box<dyn AlertSink>,
    recipient: String,
}

/// extract, score, explain when supported, append to the log, alert.
pub struct Pipeline<L: ScanLog> {
    ctx: Arc<ScoringContext>,
    log: Arc<L>,
    reputation: Arc<dyn ReputationLookup>,
    alerts: Option<AlertRoute>,
}

impl<L: ScanLog + 'static> Pipeline<L> {
    pub fn new(ctx: Arc<ScoringContext>, log: L, reputation: Arc<dyn ReputationLookup>) -> Self {
        Pipeline { ctx, log: Arc::new(log), reputation, alerts: None }
    }

    pub fn with_alerts(mut self, sink: Box<dyn AlertSink>, recipient: impl Into<String>) -> Self {
        self.alerts = Some(AlertRoute { sink, recipient: recipient.into() });
        self
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn extract(&self, kind: ScanKind, raw: &str) -> Result<FeatureVector> {
        match kind {
            ScanKind::Url => url_scan::extract(raw),
            ScanKind::Text => text_scan::extract(self.ctx.vectorizer(), raw),
            ScanKind::Profile => profile_scan::extract(raw),
            ScanKind::IdsEvent => ids_scan::extract(raw),
            ScanKind::IpReputation => ip_reputation::extract(raw),
        }
    }

    pub async fn score(&self, kind: ScanKind, features: &FeatureVector) -> Result<Verdict> {
        match kind {
            ScanKind::Url => url_scan::score(self.ctx.url_model(), features),
            ScanKind::Text => text_scan::score(self.ctx.text_model(), features),
            ScanKind::Profile => profile_scan::score(features),
            ScanKind::IdsEvent => ids_scan::score(features),
            ScanKind::IpReputation => ip_reputation::score(self.reputation.as_ref(), features).await,
        }
    }

    pub fn explain(&self, kind: ScanKind, features: &FeatureVector) -> Result<Explanation> {
        match kind {
            ScanKind::Url => url_scan::explain(self.ctx.url_model(), features),
            ScanKind::Text => text_scan::explain(self.ctx.text_model(), features),
            other => Err(ScanError::explanation(format!("no explainer for {other}"))),
        }
    }

    /// What gets persisted as the scan input.
    fn stored_input(kind: ScanKind, raw: &str) -> Result<String> {
        Ok(match kind {
            ScanKind::Profile => profile_scan::ProfileRecord::parse(raw)?.to_json(),
            ScanKind::IpReputation => raw.trim().to_string(),
            _ => raw.to_string(),
        })
    }

    /// SQLite writes block (busy timeout, fsync), so they run on the blocking pool.
    async fn append(&self, scan: NewScan) -> Result<ScanRecord> {
        let log = Arc::clone(&self.log);
        tokio::task::spawn_blocking(move || log.append(scan))
            .await
            .map_err(|e| ScanError::store(format!("scan log writer stopped: {e}")))?
    }

    /// Errors before scoring completes abort the scan and nothing is logged.
    pub async fn run(&self, kind: ScanKind, raw: &str) -> Result<ScanOutcome> {
        let features = self.extract(kind, raw).map_err(|e| {
            tracing::debug!(%kind, error = %e, "extraction failed");
            e
        })?;
        let verdict = self.score(kind, &features).await.map_err(|e| {
            tracing::warn!(%kind, error = %e, "scoring failed");
            e
        })?;

        let explanation = if kind.has_explainer() {
            match self.explain(kind, &features) {
                Ok(e) => ExplanationState::Available(e),
                Err(e) => {
                    tracing::warn!(%kind, error = %e, "explanation unavailable");
                    ExplanationState::Unavailable(e.to_string())
                }
            }
        } else {
            ExplanationState::NotApplicable
        };

        let input = Self::stored_input(kind, raw)?;
        let logged = match self.append(NewScan::new(kind, input.clone(), verdict.label.clone(), verdict.confidence)).await {
            Ok(rec) => {
                tracing::info!(%kind, id = rec.id, result = %rec.result, confidence = rec.confidence, "scan logged");
                Logged::Stored(rec)
            }
            Err(e) => {
                tracing::error!(%kind, error = %e, "scan log write failed; returning unlogged verdict");
                Logged::Failed(e)
            }
        };

        if let Some(route) = &self.alerts {
            if alert::is_high_severity(kind, &verdict) {
                let msg = alert::compose(&route.recipient, kind, &input, &verdict);
                alert::dispatch(route.sink.as_ref(), msg).await;
            }
        }

        Ok(ScanOutcome { kind, verdict, explanation, logged })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Alert;
    use async_trait::async_trait;
    use ip_reputation::{IpReport, ReputationError};
    use scanlog_sqlite::Db;
    use shield_core::ScanFilter;
    use std::net::IpAddr;
    use std::sync::Mutex;
    use text_scan::TextModel;
    use url_scan::UrlModel;

    struct FixedReputation(Option<u8>);

    #[async_trait]
    impl ReputationLookup for FixedReputation {
        async fn lookup(&self, _ip: IpAddr) -> std::result::Result<IpReport, ReputationError> {
            match self.0 {
                Some(s) => Ok(IpReport { abuse_score: s, total_reports: 7, country: None, last_reported: None }),
                None => Err(ReputationError::MissingApiKey),
            }
        }
    }

    #[derive(Default, Clone)]
    struct Recorder(Arc<Mutex<Vec<Alert>>>);

    #[async_trait]
    impl AlertSink for Recorder {
        async fn send(&self, alert: &Alert) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }

    fn pipeline(rep: Option<u8>) -> Pipeline<Db> {
        Pipeline::new(Arc::new(crate::context::shipped()), Db::open_in_memory().unwrap(), Arc::new(FixedReputation(rep)))
    }

    #[tokio::test]
    async fn malicious_url_is_scored_explained_and_logged() {
        let p = pipeline(None);
        let out = p.run(ScanKind::Url, "http://malicious-update.xyz").await.unwrap();
        assert_eq!(out.verdict.label, "Malicious");
        assert!(out.verdict.confidence > 0.5);
        let ExplanationState::Available(e) = &out.explanation else { panic!("expected explanation") };
        assert_eq!(e.top(1)[0].factor, "suspicious_tld");
        let rec = out.logged.record().unwrap();
        assert_eq!(rec.scan_kind(), Some(ScanKind::Url));
        assert_eq!(rec.input, "http://malicious-update.xyz");
        assert_eq!(p.log().fetch_recent(10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failures_before_scoring_log_nothing() {
        let p = pipeline(None);
        assert!(matches!(p.run(ScanKind::Url, "   ").await, Err(ScanError::InvalidInput(_))));
        assert!(matches!(p.run(ScanKind::Profile, "{bad").await, Err(ScanError::InvalidInput(_))));
        assert!(matches!(p.run(ScanKind::IpReputation, "8.8.8.8").await, Err(ScanError::Scorer(_))));
        assert!(p.log().fetch_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_a_partial_success() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let db = Db::deferred(blocker.join("scan_logs.db"));
        let p = Pipeline::new(Arc::new(crate::context::shipped()), db, Arc::new(FixedReputation(Some(85))));
        let out = p.run(ScanKind::IpReputation, "185.220.101.1").await.unwrap();
        assert_eq!(out.verdict.label, "High-Risk IP");
        assert!(out.is_partial());
        assert!(matches!(out.logged, Logged::Failed(ScanError::StoreUnavailable(_))));
        assert_eq!(out.explanation, ExplanationState::NotApplicable);
    }

    #[tokio::test]
    async fn profile_input_is_stored_canonically() {
        let p = pipeline(None);
        let raw = r#"{ "following": 3, "username": "amira", "followers": 120 }"#;
        let out = p.run(ScanKind::Profile, raw).await.unwrap();
        let rec = out.logged.record().unwrap();
        assert_eq!(rec.input, r#"{"username":"amira","followers":120,"following":3,"profile_image_default":false}"#);
        assert_eq!(rec.result, "Likely Genuine");
    }

    #[tokio::test]
    async fn text_scan_logs_prefixed_category() {
        let p = pipeline(None);
        let out = p.run(ScanKind::Text, "Everyone hates you.").await.unwrap();
        assert!(out.verdict.label.starts_with("Cyberbullying: "));
        assert_eq!(out.verdict.confidence, 0.0);
        let hits = p
            .log()
            .fetch_filtered(&ScanFilter { result_contains: Some("cyberbullying".into()), ..Default::default() })
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn explain_failure_degrades() {
        struct NoExplain(url_scan::LogisticUrlModel);
        impl UrlModel for NoExplain {
            fn predict_proba(&self, f: &FeatureVector) -> Result<f64> { self.0.predict_proba(f) }
            fn contributions(&self, _f: &FeatureVector) -> Result<Vec<(String, f64)>> {
                Err(ScanError::explanation("contributions disabled"))
            }
        }
        let url = url_scan::LogisticUrlModel::from_json(include_str!("../../models/url_model.json")).unwrap();
        let vec = text_scan::TfidfVectorizer::from_json(include_str!("../../models/tfidf_vectorizer.json")).unwrap();
        let text = text_scan::LinearTextModel::from_json(include_str!("../../models/text_model.json")).unwrap();
        assert_eq!(text.n_features(), vec.len());
        let ctx = ScoringContext::from_parts(Box::new(NoExplain(url)), vec, Box::new(text)).unwrap();
        let p = Pipeline::new(Arc::new(ctx), Db::open_in_memory().unwrap(), Arc::new(FixedReputation(None)));
        let out = p.run(ScanKind::Url, "https://google.com").await.unwrap();
        assert_eq!(out.verdict.label, "Safe");
        assert!(matches!(out.explanation, ExplanationState::Unavailable(_)));
        assert!(out.logged.record().is_some());
    }

    #[derive(Default)]
    struct ThreadRecordingLog {
        inner: Mutex<Vec<std::thread::ThreadId>>,
    }

    impl ScanLog for ThreadRecordingLog {
        fn append(&self, scan: NewScan) -> Result<ScanRecord> {
            let mut seen = self.inner.lock().unwrap();
            seen.push(std::thread::current().id());
            Ok(ScanRecord {
                id: seen.len() as i64,
                kind: scan.kind.as_str().to_string(),
                input: scan.input,
                result: scan.result,
                confidence: scan.confidence,
                timestamp: "2025-01-01 00:00:00".into(),
            })
        }
        fn fetch_recent(&self, _limit: usize) -> Result<Vec<ScanRecord>> { Ok(Vec::new()) }
        fn fetch_all(&self) -> Result<Vec<ScanRecord>> { Ok(Vec::new()) }
        fn fetch_filtered(&self, _filter: &ScanFilter) -> Result<Vec<ScanRecord>> { Ok(Vec::new()) }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn log_writes_run_off_the_runtime_thread() {
        let p = Pipeline::new(Arc::new(crate::context::shipped()), ThreadRecordingLog::default(), Arc::new(FixedReputation(None)));
        let out = p.run(ScanKind::IdsEvent, "GET /index.html 200").await.unwrap();
        assert_eq!(out.logged.record().unwrap().id, 1);
        let seen = p.log().inner.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_ne!(seen[0], std::thread::current().id());
    }

    #[tokio::test]
    async fn high_severity_results_alert_after_logging() {
        let rec = Recorder::default();
        let p = pipeline(Some(85)).with_alerts(Box::new(rec.clone()), "soc@example.org");
        p.run(ScanKind::IpReputation, "185.220.101.1").await.unwrap();
        p.run(ScanKind::IdsEvent, "GET /index.html 200").await.unwrap();
        let sent = rec.0.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "soc@example.org");
        assert!(sent[0].subject.contains("High-Risk IP"));
        assert_eq!(p.log().fetch_all().unwrap().len(), 2);
    }
}
