mod deepl;
mod google;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{self, SharedSettings, TranslationProvider};
use crate::error::TranslationError;
use crate::model::{Direction, TranslationResult};

pub use self::deepl::DeepLTranslator;
pub use self::google::GoogleTranslator;

/// Turns `(direction, text)` into a [`TranslationResult`] with one request
/// to an external provider. The language pair is read from the shared
/// settings at call time, so edits take effect on the next request.
#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &'static str;

    /// One attempt, no retries.
    async fn translate(
        &self,
        direction: Direction,
        text: &str,
    ) -> Result<TranslationResult, TranslationError>;
}

/// Language pair for one request. `source == None` asks the provider to
/// detect the input language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePair {
    pub source: Option<String>,
    pub target: String,
}

impl LanguagePair {
    pub fn for_direction(settings: &SharedSettings, direction: Direction) -> Self {
        let snapshot = config::snapshot(settings);
        let (input, output) = snapshot.languages(direction);
        let input = input.trim();
        let source = if input.is_empty() || input.eq_ignore_ascii_case("auto") {
            None
        } else {
            Some(input.to_string())
        };
        Self {
            source,
            target: output.trim().to_string(),
        }
    }

    pub fn source_or_auto(&self) -> &str {
        self.source.as_deref().unwrap_or("auto")
    }
}

/// Build the translator selected in the settings.
pub fn from_settings(settings: &SharedSettings) -> Result<Arc<dyn Translator>, TranslationError> {
    let snapshot = config::snapshot(settings);
    let timeout = Duration::from_secs(snapshot.request_timeout_secs.max(1));
    let translator: Arc<dyn Translator> = match snapshot.provider {
        TranslationProvider::Google => Arc::new(GoogleTranslator::new(settings.clone(), timeout)?),
        TranslationProvider::DeepL => {
            Arc::new(DeepLTranslator::new(&snapshot.deepl_api_key, settings.clone())?)
        }
    };
    info!("Using {} translator", translator.name());
    Ok(translator)
}
