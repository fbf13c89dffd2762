use async_trait::async_trait;
use log::{debug, error};
use serde::Deserialize;
use std::time::Duration;

use super::{LanguagePair, Translator};
use crate::config::SharedSettings;
use crate::error::TranslationError;
use crate::model::{Direction, TranslationResult};

const GOOGLE_BASE_URL: &str = "https://translate.googleapis.com";

/// Google's keyless `gtx` endpoint, the one browser extensions use.
pub struct GoogleTranslator {
    client: reqwest::Client,
    base_url: String,
    settings: SharedSettings,
}

#[derive(Deserialize)]
struct GtxResponse {
    src: Option<String>,
    #[serde(default)]
    sentences: Vec<GtxSentence>,
}

#[derive(Deserialize)]
struct GtxSentence {
    trans: Option<String>,
}

impl GoogleTranslator {
    pub fn new(settings: SharedSettings, timeout: Duration) -> Result<Self, TranslationError> {
        Self::with_base_url(settings, timeout, GOOGLE_BASE_URL)
    }

    pub fn with_base_url(
        settings: SharedSettings,
        timeout: Duration,
        base_url: &str,
    ) -> Result<Self, TranslationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslationError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            settings,
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &'static str {
        "Google Translate"
    }

    async fn translate(
        &self,
        direction: Direction,
        text: &str,
    ) -> Result<TranslationResult, TranslationError> {
        let pair = LanguagePair::for_direction(&self.settings, direction);
        let url = format!("{}/translate_a/single", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", pair.source_or_auto()),
                ("tl", pair.target.as_str()),
                ("dt", "t"),
                ("dj", "1"),
                ("source", "input"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let msg = format!(
                "{} -> {} failed with {}",
                pair.source_or_auto(),
                pair.target,
                status
            );
            error!("Google {} translation: {}", direction, msg);
            return Err(TranslationError::Provider(msg));
        }

        let body: GtxResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::Response(e.to_string()))?;

        let translated: String = body
            .sentences
            .iter()
            .filter_map(|s| s.trans.as_deref())
            .collect();
        if translated.is_empty() && !text.trim().is_empty() {
            return Err(TranslationError::Response("No translation returned".into()));
        }

        let source_language = body
            .src
            .unwrap_or_else(|| pair.source_or_auto().to_string());
        debug!(
            "Google {} translation: {} -> {}",
            direction, source_language, pair.target
        );

        Ok(TranslationResult {
            text: translated,
            source_language,
            target_language: pair.target,
        })
    }
}
