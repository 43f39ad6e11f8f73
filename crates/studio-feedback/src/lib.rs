#![deny(warnings)]

//! Boundary with the external generative service.
//!
//! The transport lives outside this workspace; this crate only fixes the
//! request and response shapes and parses narrative-coherence feedback.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use studio_core::ContentType;
use studio_forms::StudioConfig;
use thiserror::Error;
use tracing::debug;

/// Failure reported by the generative service or while reading its output.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("service error: {0}")]
    Service(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Problems found while parsing a feedback record.
#[derive(Debug, Error, PartialEq)]
pub enum FeedbackError {
    #[error("invalid feedback json: {0}")]
    Json(String),
    #[error("score {name} = {value} is outside [0, 100]")]
    ScoreOutOfRange { name: String, value: f32 },
}

impl From<FeedbackError> for ServiceError {
    fn from(e: FeedbackError) -> Self {
        ServiceError::Malformed(e.to_string())
    }
}

/// Structured request submitted to the service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub content_type: ContentType,
    pub fields: BTreeMap<String, String>,
    pub catalog_ids: Vec<String>,
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl GenerationRequest {
    /// Flatten a merged configuration: common fields plus the settings block
    /// of the selected content type.
    pub fn from_config(config: &StudioConfig, catalog_ids: Vec<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), config.title.clone());
        fields.insert("prompt".to_string(), config.prompt.clone());
        fields.insert("tone".to_string(), config.tone.clone());
        if let Some(t) = &config.raw_template {
            fields.insert("rawTemplate".to_string(), t.clone());
        }
        if let Value::Object(map) = config.active_specifics().to_value() {
            for (k, v) in &map {
                fields.insert(k.clone(), value_text(v));
            }
        }
        Self {
            content_type: config.content_type,
            fields,
            catalog_ids,
        }
    }
}

/// Named scores (0-100) with a textual analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoherenceFeedback {
    #[serde(alias = "puntuaciones")]
    pub scores: BTreeMap<String, f32>,
    #[serde(default, alias = "analisis")]
    pub analysis: String,
}

/// Strip a surrounding Markdown code fence, if any.
fn unfence(text: &str) -> &str {
    let t = text.trim();
    let Some(body) = t.strip_prefix("```") else {
        return t;
    };
    // Drop an info string such as "json" on the opening line.
    let body = body.split_once('\n').map_or("", |(_, rest)| rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

impl CoherenceFeedback {
    /// Parse raw or fenced JSON and check that every score is in range.
    pub fn parse(text: &str) -> Result<Self, FeedbackError> {
        let fb: CoherenceFeedback =
            serde_json::from_str(unfence(text)).map_err(|e| FeedbackError::Json(e.to_string()))?;
        for (name, &value) in &fb.scores {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(FeedbackError::ScoreOutOfRange {
                    name: name.clone(),
                    value,
                });
            }
        }
        Ok(fb)
    }

    /// Mean of all scores.
    pub fn overall(&self) -> Option<f32> {
        if self.scores.is_empty() {
            return None;
        }
        Some(self.scores.values().sum::<f32>() / self.scores.len() as f32)
    }

    /// Lowest-scored dimension.
    pub fn weakest(&self) -> Option<(&str, f32)> {
        self.scores
            .iter()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, v)| (k.as_str(), *v))
    }
}

/// What the service can return.
#[derive(Clone, Debug, PartialEq)]
pub enum ServiceOutput {
    Text(String),
    Feedback(CoherenceFeedback),
}

/// External generative service. Implementations own transport, retries and
/// timeouts.
pub trait GenerativeService {
    fn generate(&self, request: &GenerationRequest) -> Result<ServiceOutput, ServiceError>;
}

/// Ask the service for feedback, parsing it when it comes back as text.
pub fn request_feedback<S: GenerativeService + ?Sized>(
    service: &S,
    request: &GenerationRequest,
) -> Result<CoherenceFeedback, ServiceError> {
    match service.generate(request)? {
        ServiceOutput::Feedback(fb) => Ok(fb),
        ServiceOutput::Text(text) => {
            debug!(len = text.len(), "parsing feedback from text response");
            Ok(CoherenceFeedback::parse(&text)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use studio_forms::{merge, ConfigPatch};

    struct Canned(Result<ServiceOutput, ServiceError>);

    impl GenerativeService for Canned {
        fn generate(&self, _request: &GenerationRequest) -> Result<ServiceOutput, ServiceError> {
            self.0.clone()
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::from_config(&StudioConfig::default(), vec![])
    }

    #[test]
    fn request_flattens_active_block() {
        let patch = ConfigPatch::from_json(
            r#"{"contentType": "Imagen", "prompt": "Reactor al amanecer", "specifics": {"Imagen": {"aspectRatio": "16:9"}}}"#,
        )
        .unwrap();
        let cfg = merge(&StudioConfig::default(), &patch, None);
        let req = GenerationRequest::from_config(&cfg, vec!["rapida".into()]);
        assert_eq!(req.content_type, ContentType::Imagen);
        assert_eq!(req.fields["prompt"], "Reactor al amanecer");
        assert_eq!(req.fields["aspectRatio"], "16:9");
        assert_eq!(req.fields["variety"], "50");
        assert!(!req.fields.contains_key("durationS"));
        assert_eq!(req.catalog_ids, vec!["rapida".to_string()]);
    }

    #[test]
    fn parses_fenced_feedback() {
        let text = "```json\n{\"puntuaciones\": {\"coherencia\": 80, \"ritmo\": 60}, \"analisis\": \"Buen arco.\"}\n```";
        let fb = CoherenceFeedback::parse(text).unwrap();
        assert_eq!(fb.analysis, "Buen arco.");
        assert_eq!(fb.overall(), Some(70.0));
        assert_eq!(fb.weakest(), Some(("ritmo", 60.0)));
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        assert!(matches!(
            CoherenceFeedback::parse(r#"{"scores": {"tono": 140}}"#),
            Err(FeedbackError::ScoreOutOfRange { .. })
        ));
        assert!(matches!(
            CoherenceFeedback::parse("the model said no"),
            Err(FeedbackError::Json(_))
        ));
        let empty = CoherenceFeedback::parse(r#"{"scores": {}}"#).unwrap();
        assert_eq!(empty.overall(), None);
        assert_eq!(empty.weakest(), None);
    }

    #[test]
    fn request_feedback_paths() {
        let text = Canned(Ok(ServiceOutput::Text(
            r#"{"scores": {"coherencia": 90}, "analysis": "ok"}"#.into(),
        )));
        assert_eq!(request_feedback(&text, &request()).unwrap().overall(), Some(90.0));

        let garbage = Canned(Ok(ServiceOutput::Text("??".into())));
        assert!(matches!(
            request_feedback(&garbage, &request()),
            Err(ServiceError::Malformed(_))
        ));

        let down = Canned(Err(ServiceError::Transport("timeout".into())));
        assert_eq!(
            request_feedback(&down, &request()).unwrap_err().to_string(),
            "transport error: timeout"
        );
    }

    proptest! {
        #[test]
        fn overall_is_bounded(a in 0.0f32..=100.0, b in 0.0f32..=100.0, c in 0.0f32..=100.0) {
            let json = format!(r#"{{"scores": {{"a": {a}, "b": {b}, "c": {c}}}}}"#);
            let fb = CoherenceFeedback::parse(&json).unwrap();
            let o = fb.overall().unwrap();
            prop_assert!(o >= a.min(b).min(c) - 1e-3 && o <= a.max(b).max(c) + 1e-3);
        }
    }
}
