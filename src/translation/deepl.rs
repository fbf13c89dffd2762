use async_trait::async_trait;
use log::{debug, error, warn};
use std::str::FromStr;

use super::{LanguagePair, Translator};
use crate::config::SharedSettings;
use crate::error::TranslationError;
use crate::model::{Direction, TranslationResult};

// ─── DeepL translator ────────────────────────────────────────────────

pub struct DeepLTranslator {
    api: deepl::DeepLApi,
    settings: SharedSettings,
}

impl DeepLTranslator {
    pub fn new(api_key: &str, settings: SharedSettings) -> Result<Self, TranslationError> {
        if api_key.trim().is_empty() {
            return Err(TranslationError::Config("DeepL API key is not set".into()));
        }
        let api = deepl::DeepLApi::with(api_key.trim()).new();
        Ok(Self { api, settings })
    }
}

#[async_trait]
impl Translator for DeepLTranslator {
    fn name(&self) -> &'static str {
        "DeepL"
    }

    async fn translate(
        &self,
        direction: Direction,
        text: &str,
    ) -> Result<TranslationResult, TranslationError> {
        let pair = LanguagePair::for_direction(&self.settings, direction);
        let target = parse_lang(&pair.target)?;
        let source = match pair.source.as_deref() {
            Some(code) => Some(parse_lang(code)?),
            None => None,
        };

        let mut builder = self.api.translate_text(text, target);
        if let Some(src) = source {
            builder.source_lang(src);
        }

        match (&mut builder).await {
            Ok(resp) => {
                let sentence = resp.translations.first().ok_or_else(|| {
                    TranslationError::Response("No translation returned".into())
                })?;
                let detected = lang_code(&sentence.detected_source_language);
                debug!("DeepL {} translation: {} -> {}", direction, detected, pair.target);
                Ok(TranslationResult {
                    text: sentence.text.clone(),
                    source_language: detected,
                    target_language: pair.target.clone(),
                })
            }
            Err(e) => {
                let msg = format_deepl_error(&e);
                error!("DeepL {} translation failed: {}", direction, msg);
                Err(TranslationError::Provider(msg))
            }
        }
    }
}

// ─── Language codes ──────────────────────────────────────────────────

/// DeepL wants upper-case codes ("EN-US", "DE").
fn parse_lang(code: &str) -> Result<deepl::Lang, TranslationError> {
    let normalized = code.trim().to_uppercase();
    deepl::Lang::from_str(&normalized).map_err(|_| {
        warn!("DeepL does not know language {:?}", code);
        TranslationError::InvalidLanguage(code.to_string())
    })
}

/// Variant names are the codes with '_' in place of '-'.
fn lang_code(lang: &deepl::Lang) -> String {
    format!("{:?}", lang).replace('_', "-")
}

// ─── Error formatting ────────────────────────────────────────────────

fn format_deepl_error(e: &deepl::Error) -> String {
    let s = format!("{}", e);
    if s.contains("403") {
        "Invalid API key".into()
    } else if s.contains("429") {
        "Rate limit exceeded, please wait".into()
    } else if s.contains("456") {
        "Translation quota exceeded".into()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercase_codes_are_accepted() {
        assert!(parse_lang("de").is_ok());
        assert!(parse_lang("EN-US").is_ok());
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert_eq!(
            parse_lang("klingon").unwrap_err(),
            TranslationError::InvalidLanguage("klingon".into())
        );
    }

    #[test]
    fn codes_use_dashes() {
        let lang = parse_lang("EN-GB").unwrap();
        assert_eq!(lang_code(&lang), "EN-GB");
    }
}
