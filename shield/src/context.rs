use shield_core::{Result, ScanError};
use std::path::Path;
use text_scan::{LinearTextModel, TextModel, TfidfVectorizer};
use url_scan::{LogisticUrlModel, UrlModel};

pub const URL_MODEL_FILE: &str = "url_model.json";
pub const VECTORIZER_FILE: &str = "tfidf_vectorizer.json";
pub const TEXT_MODEL_FILE: &str = "text_model.json";

/// Pinned model artifacts, loaded once and shared read-only by every scan.
pub struct ScoringContext {
    url: Box<dyn UrlModel>,
    vectorizer: TfidfVectorizer,
    text: Box<dyn TextModel>,
}

impl ScoringContext {
    /// Load all artifacts from `dir`. Any failure is `ModelUnavailable`.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(ScanError::model(format!("model directory {} not found", dir.display())));
        }
        let url = LogisticUrlModel::load(&dir.join(URL_MODEL_FILE))?;
        let vectorizer = TfidfVectorizer::load(&dir.join(VECTORIZER_FILE))?;
        let text = LinearTextModel::load(&dir.join(TEXT_MODEL_FILE))?;
        tracing::info!(dir = %dir.display(), url_model = %url.name, text_model = %text.name, "models loaded");
        Self::from_parts(Box::new(url), vectorizer, Box::new(text))
    }

    pub fn from_parts(url: Box<dyn UrlModel>, vectorizer: TfidfVectorizer, text: Box<dyn TextModel>) -> Result<Self> {
        text_scan::check_compatible(&vectorizer, text.as_ref())?;
        Ok(ScoringContext { url, vectorizer, text })
    }

    pub fn url_model(&self) -> &dyn UrlModel { self.url.as_ref() }

    pub fn vectorizer(&self) -> &TfidfVectorizer { &self.vectorizer }

    pub fn text_model(&self) -> &dyn TextModel { self.text.as_ref() }
}

#[cfg(test)]
pub(crate) fn shipped() -> ScoringContext {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../models");
    match ScoringContext::load(&dir) {
        Ok(ctx) => ctx,
        Err(e) => panic!("shipped models: {e}"),
    }
}
