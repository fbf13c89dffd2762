use log::{debug, info};
use std::sync::Arc;

use crate::annotations::Annotations;
use crate::config::{self, SharedSettings};
use crate::error::{BackfillError, TranslationError};
use crate::host::HostSession;
use crate::model::{ChannelId, Direction, Draft, Message, TranslationResult};
use crate::prefs::AutoTranslatePrefs;
use crate::tooltip::TooltipHandle;
use crate::translation::Translator;

// ─── Outcomes ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundOutcome {
    Translated,
    Disabled,
    EmptyDraft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotActiveChannel,
    OwnMessage,
    EmptyContent,
    AutoTranslateOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    Translated,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub translated: usize,
    /// Messages inside the window that had nothing to translate.
    pub skipped: usize,
}

// ─── Pipeline ────────────────────────────────────────────────────────

/// Decides when a message needs translating and applies the result.
///
/// Auto paths (`intercept_outgoing`, `on_message_create`, `backfill`) hand
/// their errors back so the caller can log and drop them; nothing here ever
/// blocks a send or fails the host.
pub struct MessagePipeline {
    translator: Arc<dyn Translator>,
    prefs: AutoTranslatePrefs,
    annotations: Annotations,
    session: Arc<dyn HostSession>,
    settings: SharedSettings,
    tooltip: TooltipHandle,
}

impl MessagePipeline {
    pub fn new(
        translator: Arc<dyn Translator>,
        prefs: AutoTranslatePrefs,
        annotations: Annotations,
        session: Arc<dyn HostSession>,
        settings: SharedSettings,
        tooltip: TooltipHandle,
    ) -> Self {
        Self {
            translator,
            prefs,
            annotations,
            session,
            settings,
            tooltip,
        }
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn prefs(&self) -> &AutoTranslatePrefs {
        &self.prefs
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    pub fn tooltip(&self) -> &TooltipHandle {
        &self.tooltip
    }

    /// Pre-send hook. On success the draft carries the translated text; on
    /// failure it is left as typed and goes out untranslated.
    pub async fn intercept_outgoing(
        &self,
        draft: &mut Draft,
    ) -> Result<OutboundOutcome, TranslationError> {
        let settings = config::snapshot(&self.settings);
        if !settings.auto_translate {
            return Ok(OutboundOutcome::Disabled);
        }
        if draft.content.trim().is_empty() {
            return Ok(OutboundOutcome::EmptyDraft);
        }

        if settings.show_auto_translate_tooltip {
            self.tooltip.flash();
        }

        let result = self.translator.translate(Direction::Sent, &draft.content).await?;
        debug!(
            "Outgoing message in {} translated {} -> {}",
            draft.channel_id, result.source_language, result.target_language
        );
        draft.content = result.text;
        Ok(OutboundOutcome::Translated)
    }

    pub async fn on_message_create(
        &self,
        channel: &ChannelId,
        message: &Message,
    ) -> Result<InboundOutcome, TranslationError> {
        if self.session.current_channel_id().as_ref() != Some(channel) {
            return Ok(InboundOutcome::Skipped(SkipReason::NotActiveChannel));
        }
        if self.session.current_user_id().as_ref() == Some(&message.author.id) {
            return Ok(InboundOutcome::Skipped(SkipReason::OwnMessage));
        }
        if !message.has_content() {
            return Ok(InboundOutcome::Skipped(SkipReason::EmptyContent));
        }
        if !self.prefs.get(channel).await {
            return Ok(InboundOutcome::Skipped(SkipReason::AutoTranslateOff));
        }

        self.translate_and_attach(message).await?;
        Ok(InboundOutcome::Translated)
    }

    /// Backfill for whatever channel the host now shows.
    pub async fn on_channel_select(&self) -> Result<BackfillReport, BackfillError> {
        match self.session.current_channel_id() {
            Some(channel) => self.backfill(&channel).await,
            None => Ok(BackfillReport::default()),
        }
    }

    /// Translate the newest `amount_to_auto_translate` messages of `channel`,
    /// newest first. Stops at the first failed request; annotations attached
    /// before it stay and older messages are not attempted.
    pub async fn backfill(&self, channel: &ChannelId) -> Result<BackfillReport, BackfillError> {
        let mut report = BackfillReport::default();
        if !self.prefs.get(channel).await {
            return Ok(report);
        }

        let limit = config::snapshot(&self.settings).amount_to_auto_translate;
        let history = self.session.channel_messages(channel);

        for message in history.iter().rev().take(limit) {
            if !message.has_content() {
                report.skipped += 1;
                continue;
            }
            if let Err(source) = self.translate_and_attach(message).await {
                return Err(BackfillError {
                    translated: report.translated,
                    source,
                });
            }
            report.translated += 1;
        }

        info!(
            "Backfilled {} message(s) in {}",
            report.translated, channel
        );
        Ok(report)
    }

    /// Context-menu and hover-button action. Errors go back to the caller.
    pub async fn manual_translate(
        &self,
        message: &Message,
    ) -> Result<TranslationResult, TranslationError> {
        self.translate_and_attach(message).await
    }

    async fn translate_and_attach(
        &self,
        message: &Message,
    ) -> Result<TranslationResult, TranslationError> {
        let result = self
            .translator
            .translate(Direction::Received, &message.content)
            .await?;
        self.annotations.attach(&message.id, result.clone());
        Ok(result)
    }
}

// ─── Test fixtures ───────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::config::Settings;
    use crate::model::{Author, MessageId, UserId};
    use crate::prefs::MemoryStore;
    use crate::translation::mock::MockTranslator;
    use std::collections::HashMap;
    use std::sync::RwLock;

    pub const ME: &str = "me";

    #[derive(Default)]
    pub struct FakeSession {
        pub current_channel: RwLock<Option<ChannelId>>,
        pub history: RwLock<HashMap<ChannelId, Vec<Message>>>,
    }

    impl HostSession for FakeSession {
        fn current_user_id(&self) -> Option<UserId> {
            Some(UserId::new(ME))
        }

        fn current_channel_id(&self) -> Option<ChannelId> {
            self.current_channel.read().unwrap().clone()
        }

        fn channel_messages(&self, channel: &ChannelId) -> Vec<Message> {
            self.history
                .read()
                .unwrap()
                .get(channel)
                .cloned()
                .unwrap_or_default()
        }
    }

    pub fn message(id: &str, channel: &str, author: &str, content: &str) -> Message {
        Message {
            id: MessageId::new(id),
            channel_id: ChannelId::new(channel),
            author: Author {
                id: UserId::new(author),
                username: author.to_string(),
            },
            content: content.to_string(),
        }
    }

    pub struct Fixture {
        pub translator: Arc<MockTranslator>,
        pub session: Arc<FakeSession>,
        pub pipeline: MessagePipeline,
    }

    impl Fixture {
        pub fn new(settings: Settings) -> Self {
            Self::with_translator(settings, MockTranslator::new())
        }

        pub fn with_translator(settings: Settings, translator: MockTranslator) -> Self {
            let translator = Arc::new(translator);
            let session = Arc::new(FakeSession::default());
            let pipeline = MessagePipeline::new(
                translator.clone(),
                AutoTranslatePrefs::new(Arc::new(MemoryStore::new())),
                Annotations::new(),
                session.clone(),
                config::shared(settings),
                TooltipHandle::default(),
            );
            Self {
                translator,
                session,
                pipeline,
            }
        }

        pub fn enter(&self, channel: &str) {
            *self.session.current_channel.write().unwrap() = Some(ChannelId::new(channel));
        }

        /// Store `contents` as the channel history (oldest first) and mount
        /// every message. Ids are `<channel>-<index>`.
        pub fn seed(&self, channel: &str, contents: &[&str]) -> Vec<Message> {
            let messages: Vec<Message> = contents
                .iter()
                .enumerate()
                .map(|(i, c)| message(&format!("{}-{}", channel, i), channel, "friend", c))
                .collect();
            for m in &messages {
                self.pipeline.annotations().mount(&m.id);
            }
            self.session
                .history
                .write()
                .unwrap()
                .insert(ChannelId::new(channel), messages.clone());
            messages
        }

        /// Another pipeline over the same translator, session and state.
        pub fn shared_pipeline(&self) -> Arc<MessagePipeline> {
            Arc::new(MessagePipeline::new(
                self.translator.clone(),
                self.pipeline.prefs().clone(),
                self.pipeline.annotations().clone(),
                self.session.clone(),
                self.pipeline.settings().clone(),
                self.pipeline.tooltip().clone(),
            ))
        }

        pub async fn enable(&self, channel: &str) {
            self.pipeline
                .prefs()
                .set(&ChannelId::new(channel), true)
                .await
                .unwrap();
        }
    }
}
