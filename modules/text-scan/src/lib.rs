//! Cyberbullying detection for short messages: a shared TF-IDF vectorizer
//! feeding a pinned linear classifier, plus a per-token explainer.

mod model;
mod vectorizer;

pub use model::{LinearTextModel, TextModel};
pub use vectorizer::TfidfVectorizer;

use shield_core::{Explanation, FeatureVector, Result, ScanError, ScanKind, Verdict};

/// Prefix stored in front of every non-safe category.
pub const FLAGGED_PREFIX: &str = "Cyberbullying";

/// Fail unless the classifier was fitted on this vectorizer's columns.
pub fn check_compatible(vectorizer: &TfidfVectorizer, model: &dyn TextModel) -> Result<()> {
    if vectorizer.len() != model.n_features() {
        return Err(ScanError::model(format!(
            "text model expects {} columns but vectorizer has {}",
            model.n_features(),
            vectorizer.len()
        )));
    }
    Ok(())
}

pub fn extract(vectorizer: &TfidfVectorizer, raw: &str) -> Result<FeatureVector> {
    if raw.trim().is_empty() {
        return Err(ScanError::invalid("empty text"));
    }
    Ok(vectorizer.transform(raw))
}

/// The raw category the model picked, e.g. `Safe` or `Harassment`.
pub fn predict_category(model: &dyn TextModel, features: &FeatureVector) -> Result<String> {
    if features.kind() != ScanKind::Text {
        return Err(ScanError::scorer(format!("text scorer got {} features", features.kind())));
    }
    model.predict_label(features)
}

/// Label-only classifier, so confidence is always 0.0.
pub fn score(model: &dyn TextModel, features: &FeatureVector) -> Result<Verdict> {
    let category = predict_category(model, features)?;
    if category == model.safe_label() {
        return Ok(Verdict::new(category, 0.0).with_reason("no cyberbullying detected"));
    }
    Ok(Verdict::new(format!("{FLAGGED_PREFIX}: {category}"), 0.0)
        .with_reason(format!("predicted category: {category}")))
}

/// Tokens of this message ranked by their weight towards the predicted category.
pub fn explain(model: &dyn TextModel, features: &FeatureVector) -> Result<Explanation> {
    let category = predict_category(model, features).map_err(|e| ScanError::explanation(e.to_string()))?;
    Ok(Explanation::ranked(model.token_contributions(features, &category)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipped() -> (TfidfVectorizer, LinearTextModel) {
        let v = TfidfVectorizer::from_json(include_str!("../../../models/tfidf_vectorizer.json")).unwrap();
        let m = LinearTextModel::from_json(include_str!("../../../models/text_model.json")).unwrap();
        check_compatible(&v, &m).unwrap();
        (v, m)
    }

    fn label(text: &str) -> String {
        let (v, m) = shipped();
        score(&m, &extract(&v, text).unwrap()).unwrap().label
    }

    #[test]
    fn hostile_message_is_flagged() {
        let l = label("Everyone hates you.");
        assert_ne!(l, "Safe");
        assert!(l.starts_with("Cyberbullying: "));
    }

    #[test]
    fn friendly_message_is_safe() {
        assert_eq!(label("Great job on your project!"), "Safe");
        assert_eq!(label("This is so cool, I love it!"), "Safe");
    }

    #[test]
    fn demo_messages_land_in_expected_categories() {
        assert_eq!(label("You are such a loser."), "Cyberbullying: Insult");
        assert_eq!(label("I will hack your account."), "Cyberbullying: Threat");
    }

    #[test]
    fn unknown_words_fall_back_to_safe() {
        assert_eq!(label("zzzz qqqq"), "Safe");
    }

    #[test]
    fn explanation_only_covers_present_tokens() {
        let (v, m) = shipped();
        let fv = extract(&v, "Everyone hates you.").unwrap();
        let e = explain(&m, &fv).unwrap();
        let names: Vec<_> = e.iter().map(|c| c.factor.as_str()).collect();
        assert_eq!(names, vec!["hates", "everyone"]);
        assert_eq!(e, explain(&m, &extract(&v, "Everyone hates you.").unwrap()).unwrap());
    }

    #[test]
    fn empty_text_is_invalid() {
        let (v, _) = shipped();
        assert!(matches!(extract(&v, " \n"), Err(ScanError::InvalidInput(_))));
    }

    #[test]
    fn mismatched_artifacts_are_rejected() {
        let (_, m) = shipped();
        let v = TfidfVectorizer::from_json(r#"{"vocabulary":{"a":0},"idf":[1.0]}"#).unwrap();
        assert!(matches!(check_compatible(&v, &m), Err(ScanError::ModelUnavailable(_))));
    }
}
