use crate::pipeline::{Pipeline, ScanOutcome};
use shield_core::{Result, ScanKind, ScanLog};

pub const DEMO_URLS: [&str; 6] = [
    "https://google.com",
    "http://phishy-site-login.net",
    "https://secure-payments.co.in",
    "http://malicious-update.xyz",
    "https://youtube.com",
    "https://schoolportal.edu",
];

pub const DEMO_TEXTS: [&str; 6] = [
    "You’re amazing! Keep going.",
    "You are such a loser.",
    "Great job on your project!",
    "Everyone hates you.",
    "This is so cool, I love it!",
    "I will hack your account.",
];

/// Run the demo URLs and texts through the full pipeline, interleaved.
pub async fn seed<L: ScanLog + 'static>(pipeline: &Pipeline<L>) -> Vec<(ScanKind, &'static str, Result<ScanOutcome>)> {
    let mut out = Vec::with_capacity(DEMO_URLS.len() + DEMO_TEXTS.len());
    for (url, text) in DEMO_URLS.iter().zip(DEMO_TEXTS.iter()) {
        out.push((ScanKind::Url, *url, pipeline.run(ScanKind::Url, url).await));
        out.push((ScanKind::Text, *text, pipeline.run(ScanKind::Text, text).await));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ip_reputation::{IpReport, ReputationError, ReputationLookup};
    use scanlog_sqlite::Db;
    use shield_core::summarize;
    use std::net::IpAddr;
    use std::sync::Arc;

    struct Offline;

    #[async_trait::async_trait]
    impl ReputationLookup for Offline {
        async fn lookup(&self, _ip: IpAddr) -> std::result::Result<IpReport, ReputationError> {
            Err(ReputationError::MissingApiKey)
        }
    }

    #[tokio::test]
    async fn seed_fills_the_log() {
        let p = Pipeline::new(Arc::new(crate::context::shipped()), Db::open_in_memory().unwrap(), Arc::new(Offline));
        let results = seed(&p).await;
        assert_eq!(results.len(), 12);
        assert!(results.iter().all(|(_, _, r)| r.is_ok()));
        let all = p.log().fetch_all().unwrap();
        assert_eq!(all.len(), 12);
        let stats = summarize(&all);
        assert_eq!(stats.by_kind.get("URL"), Some(&6));
        assert!(stats.malicious >= 4);
        assert!(stats.malicious + stats.safe <= stats.total);
    }
}
