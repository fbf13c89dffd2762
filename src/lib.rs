pub mod annotations;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod model;
pub mod pipeline;
pub mod plugin;
pub mod prefs;
pub mod replay;
pub mod tooltip;
pub mod translation;

pub use annotations::Annotations;
pub use config::{Settings, SharedSettings, TranslationProvider};
pub use dispatch::{EventDispatcher, HostEvent};
pub use error::{BackfillError, ConfigError, PreferenceError, TranslationError};
pub use host::HostSession;
pub use model::{ChannelId, Direction, Draft, Message, MessageId, TranslationResult, UserId};
pub use pipeline::{BackfillReport, InboundOutcome, MessagePipeline, OutboundOutcome, SkipReason};
pub use plugin::{Registrars, TranslatePlugin};
pub use prefs::{AutoTranslatePrefs, JsonFileStore, KeyValueStore, MemoryStore};
pub use tooltip::TooltipHandle;
pub use translation::Translator;
