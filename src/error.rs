use std::fmt;
use std::path::PathBuf;

/// Failure of a single translation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// Transport failure before a response arrived.
    Network(String),
    /// Provider answered with an error status.
    Provider(String),
    /// Provider answered, but the body was unusable.
    Response(String),
    /// Language code the provider does not accept.
    InvalidLanguage(String),
    /// Translator could not be built from the current settings.
    Config(String),
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationError::Network(msg) => write!(f, "Network error: {}", msg),
            TranslationError::Provider(msg) => write!(f, "Provider error: {}", msg),
            TranslationError::Response(msg) => write!(f, "Invalid response: {}", msg),
            TranslationError::InvalidLanguage(code) => {
                write!(f, "Invalid language code: {}", code)
            }
            TranslationError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for TranslationError {}

impl From<reqwest::Error> for TranslationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TranslationError::Response(e.to_string())
        } else if let Some(status) = e.status() {
            TranslationError::Provider(status.to_string())
        } else {
            TranslationError::Network(e.to_string())
        }
    }
}

/// Failure of the persistent key-value store behind the preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceError {
    Read(String),
    Write(String),
}

impl fmt::Display for PreferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreferenceError::Read(msg) => write!(f, "Failed to read preferences: {}", msg),
            PreferenceError::Write(msg) => write!(f, "Failed to write preferences: {}", msg),
        }
    }
}

impl std::error::Error for PreferenceError {}

/// Settings file exists but could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Read { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, message } => {
                write!(f, "Failed to read {}: {}", path.display(), message)
            }
            ConfigError::Parse { path, message } => {
                write!(f, "Failed to parse {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Backfill stopped at its first failed translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillError {
    /// Annotations attached before the failure. They stay attached.
    pub translated: usize,
    pub source: TranslationError,
}

impl fmt::Display for BackfillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Backfill stopped after {} translation(s): {}",
            self.translated, self.source
        )
    }
}

impl std::error::Error for BackfillError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
