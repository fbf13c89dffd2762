use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use super::Translator;
use crate::error::TranslationError;
use crate::model::{Direction, TranslationResult};

/// Records every call and answers `"[<target>] <text>"`, or fails for
/// texts registered with `fail_on`.
#[derive(Default)]
pub struct MockTranslator {
    calls: Mutex<Vec<(Direction, String)>>,
    failing: Mutex<HashSet<String>>,
    delay: Option<Duration>,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn fail_on(&self, text: &str) {
        self.failing.lock().unwrap().insert(text.to_string());
    }

    pub fn calls(&self) -> Vec<(Direction, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls().into_iter().map(|(_, text)| text).collect()
    }

    pub fn target_for(direction: Direction) -> &'static str {
        match direction {
            Direction::Sent => "fr",
            Direction::Received => "en",
        }
    }
}

#[async_trait]
impl Translator for MockTranslator {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn translate(
        &self,
        direction: Direction,
        text: &str,
    ) -> Result<TranslationResult, TranslationError> {
        self.calls
            .lock()
            .unwrap()
            .push((direction, text.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(text) {
            return Err(TranslationError::Network(format!("mock failure for {:?}", text)));
        }

        let target = Self::target_for(direction);
        Ok(TranslationResult {
            text: format!("[{}] {}", target, text),
            source_language: "xx".into(),
            target_language: target.into(),
        })
    }
}
