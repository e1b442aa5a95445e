use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;

use super::config::TranslationConfig;
use super::progress::ProgressSink;
use crate::ui::prelude::Level;

const USER_AGENT: &str = concat!("scriptreel/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;
}

/// Returns the text unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTranslator;

#[async_trait]
impl Translator for NoopTranslator {
    async fn translate(&self, text: &str, _target_language: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

/// Client for the public Google translate endpoint
pub struct HttpTranslator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_language),
                ("dt", "t"),
            ])
            .form(&[("q", text)])
            .send()
            .await
            .context("Translation request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Translation service returned status: {}",
                response.status()
            ));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse translation response")?;
        parse_translation(&body)
    }
}

/// The response is a nested array whose first element lists
/// `[translated, original, ...]` pairs, one per sentence.
fn parse_translation(body: &serde_json::Value) -> Result<String> {
    let sentences = body
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("Unexpected translation response shape"))?;

    let translated: String = sentences
        .iter()
        .filter_map(|sentence| sentence.get(0).and_then(|t| t.as_str()))
        .collect();

    if translated.trim().is_empty() {
        return Err(anyhow!("Translation response was empty"));
    }
    Ok(translated)
}

/// Translate `text`, falling back to the original on any failure.
pub async fn translate_or_original(
    translator: &dyn Translator,
    text: &str,
    target_language: &str,
    sink: &dyn ProgressSink,
) -> String {
    match translator.translate(text, target_language).await {
        Ok(translated) => translated,
        Err(err) => {
            sink.status(
                Level::Warn,
                "reel.translate.fallback",
                &format!("Translation failed, using the original text: {err:#}"),
            );
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reel::progress::{RecordedEvent, RecordingSink};
    use serde_json::json;

    struct FailingTranslator;

    #[async_trait]
    impl Translator for FailingTranslator {
        async fn translate(&self, _text: &str, _target: &str) -> Result<String> {
            Err(anyhow!("service unavailable"))
        }
    }

    #[test]
    fn joins_translated_sentences() {
        let body = json!([
            [["The sea is deep. ", "El mar es profundo. ", null], ["It is blue.", "Es azul.", null]],
            null,
            "es"
        ]);
        assert_eq!(parse_translation(&body).unwrap(), "The sea is deep. It is blue.");
    }

    #[test]
    fn rejects_unexpected_shape() {
        assert!(parse_translation(&json!({"error": "nope"})).is_err());
        assert!(parse_translation(&json!([[]])).is_err());
    }

    #[tokio::test]
    async fn failure_falls_back_to_original_with_warning() {
        let sink = RecordingSink::new();
        let text = translate_or_original(&FailingTranslator, "hola mundo", "en", &sink).await;

        assert_eq!(text, "hola mundo");
        let events = sink.events();
        assert!(matches!(
            &events[0],
            RecordedEvent::Status { level: Level::Warn, code: "reel.translate.fallback", .. }
        ));
    }
}
