use async_trait::async_trait;
use log::{info, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::PreferenceError;
use crate::model::ChannelId;

/// Store key holding the per-channel auto-translate flags.
pub const AUTO_TRANSLATE_KEY: &str = "autoTranslateReceived";

// ─── Key-value collaborators ─────────────────────────────────────────

/// Namespaced persistent key-value store provided by the host.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, PreferenceError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), PreferenceError>;
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, PreferenceError> {
        let values = self
            .values
            .lock()
            .map_err(|e| PreferenceError::Read(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), PreferenceError> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| PreferenceError::Write(e.to_string()))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// All keys live in one pretty-printed JSON object on disk.
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_document(&self) -> Result<Map<String, Value>, PreferenceError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) => Err(PreferenceError::Read(format!(
                    "{} is not a JSON object",
                    self.path.display()
                ))),
                Err(e) => Err(PreferenceError::Read(e.to_string())),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(PreferenceError::Read(e.to_string())),
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, PreferenceError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| PreferenceError::Read(e.to_string()))?;
        Ok(self.read_document()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), PreferenceError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| PreferenceError::Write(e.to_string()))?;
        let mut document = self.read_document()?;
        document.insert(key.to_string(), value);
        let json = serde_json::to_string_pretty(&Value::Object(document))
            .map_err(|e| PreferenceError::Write(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| PreferenceError::Write(e.to_string()))?;
        Ok(())
    }
}

// ─── Auto-translate flags ────────────────────────────────────────────

#[derive(Clone)]
pub struct AutoTranslatePrefs {
    store: Arc<dyn KeyValueStore>,
    // Held across each read-modify-write of the flags object.
    update: Arc<tokio::sync::Mutex<()>>,
}

impl AutoTranslatePrefs {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            update: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Auto-translate flag for a channel. Unset, malformed and unreadable
    /// all count as off.
    pub async fn get(&self, channel: &ChannelId) -> bool {
        match self.try_get(channel).await {
            Ok(enabled) => enabled,
            Err(e) => {
                warn!("Treating auto-translate as off for {}: {}", channel, e);
                false
            }
        }
    }

    pub async fn try_get(&self, channel: &ChannelId) -> Result<bool, PreferenceError> {
        let flags = self.store.get(AUTO_TRANSLATE_KEY).await?;
        Ok(flags
            .as_ref()
            .and_then(|v| v.get(channel.as_str()))
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    pub async fn set(&self, channel: &ChannelId, enabled: bool) -> Result<(), PreferenceError> {
        let _guard = self.update.lock().await;
        self.write_flag(channel, enabled).await
    }

    /// Flip the flag and return the new value.
    pub async fn toggle(&self, channel: &ChannelId) -> Result<bool, PreferenceError> {
        let _guard = self.update.lock().await;
        let enabled = !self.try_get(channel).await?;
        self.write_flag(channel, enabled).await?;
        Ok(enabled)
    }

    async fn write_flag(&self, channel: &ChannelId, enabled: bool) -> Result<(), PreferenceError> {
        let mut flags = match self.store.get(AUTO_TRANSLATE_KEY).await? {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        flags.insert(channel.as_str().to_string(), Value::Bool(enabled));
        self.store.set(AUTO_TRANSLATE_KEY, Value::Object(flags)).await?;
        info!(
            "Auto-translate {} for channel {}",
            if enabled { "enabled" } else { "disabled" },
            channel
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<Value>, PreferenceError> {
            Err(PreferenceError::Read("disk unplugged".into()))
        }

        async fn set(&self, _key: &str, _value: Value) -> Result<(), PreferenceError> {
            Err(PreferenceError::Write("disk unplugged".into()))
        }
    }

    fn memory_prefs() -> AutoTranslatePrefs {
        AutoTranslatePrefs::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn unknown_channels_are_off() {
        let prefs = memory_prefs();
        for id in ["general", "", "12345678901234567890", "ünïcode"] {
            assert!(!prefs.get(&ChannelId::new(id)).await);
        }
    }

    #[tokio::test]
    async fn set_then_get() {
        let prefs = memory_prefs();
        let chan = ChannelId::new("general");
        prefs.set(&chan, true).await.unwrap();
        assert!(prefs.get(&chan).await);
        assert!(!prefs.get(&ChannelId::new("random")).await);

        prefs.set(&chan, false).await.unwrap();
        assert!(!prefs.get(&chan).await);
    }

    #[tokio::test]
    async fn toggle_flips() {
        let prefs = memory_prefs();
        let chan = ChannelId::new("c");
        assert!(prefs.toggle(&chan).await.unwrap());
        assert!(!prefs.toggle(&chan).await.unwrap());
    }

    #[tokio::test]
    async fn non_boolean_values_count_as_off() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(AUTO_TRANSLATE_KEY, json!({ "a": "yes", "b": 1, "c": true }))
            .await
            .unwrap();
        let prefs = AutoTranslatePrefs::new(store);
        assert!(!prefs.get(&"a".into()).await);
        assert!(!prefs.get(&"b".into()).await);
        assert!(prefs.get(&"c".into()).await);
    }

    #[tokio::test]
    async fn read_failure_counts_as_off() {
        let prefs = AutoTranslatePrefs::new(Arc::new(BrokenStore));
        let chan = ChannelId::new("general");
        assert!(!prefs.get(&chan).await);
        assert!(matches!(
            prefs.try_get(&chan).await,
            Err(PreferenceError::Read(_))
        ));
    }

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datastore.json");
        let chan = ChannelId::new("905");

        let prefs = AutoTranslatePrefs::new(Arc::new(JsonFileStore::new(&path)));
        prefs.set(&chan, true).await.unwrap();

        let reopened = AutoTranslatePrefs::new(Arc::new(JsonFileStore::new(&path)));
        assert!(reopened.get(&chan).await);

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[AUTO_TRANSLATE_KEY]["905"], json!(true));
    }

    #[tokio::test]
    async fn file_store_keeps_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datastore.json");
        std::fs::write(&path, r#"{ "pinnedDms": ["a", "b"] }"#).unwrap();

        let store = JsonFileStore::new(&path);
        store.set(AUTO_TRANSLATE_KEY, json!({ "x": true })).await.unwrap();
        assert_eq!(store.get("pinnedDms").await.unwrap(), Some(json!(["a", "b"])));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_sets_keep_every_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datastore.json");
        let prefs = AutoTranslatePrefs::new(Arc::new(JsonFileStore::new(&path)));

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..64 {
            let prefs = prefs.clone();
            tasks.spawn(async move { prefs.set(&ChannelId::new(format!("c{}", i)), true).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        for i in 0..64 {
            assert!(prefs.get(&ChannelId::new(format!("c{}", i))).await, "c{} lost", i);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_toggles_all_land() {
        let prefs = memory_prefs();
        let chan = ChannelId::new("general");

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..10 {
            let prefs = prefs.clone();
            let chan = chan.clone();
            tasks.spawn(async move { prefs.toggle(&chan).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        // An even number of flips ends where it started.
        assert!(!prefs.get(&chan).await);
    }

    #[tokio::test]
    async fn corrupt_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datastore.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let prefs = AutoTranslatePrefs::new(Arc::new(JsonFileStore::new(&path)));
        assert!(prefs.try_get(&"x".into()).await.is_err());
        assert!(!prefs.get(&"x".into()).await);
    }
}
