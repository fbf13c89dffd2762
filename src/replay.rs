use log::{info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::annotations::Annotations;
use crate::config::SharedSettings;
use crate::dispatch::EventDispatcher;
use crate::error::{PreferenceError, TranslationError};
use crate::host::HostSession;
use crate::model::{Author, ChannelId, Draft, Message, MessageId, UserId};
use crate::pipeline::MessagePipeline;
use crate::plugin::{
    AccessoryRenderer, ChatBar, ChatBarButton, ContextMenu, MenuPatch, MessageAccessories,
    MessagePopover, PopoverFactory, Registrars, TranslatePlugin, ACCESSORY_ID, BUTTON_ID,
};
use crate::prefs::{AutoTranslatePrefs, KeyValueStore};
use crate::tooltip::TooltipHandle;
use crate::translation::Translator;

// ─── Transcript ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    Login { user_id: UserId },
    MessageCreate { message: Message },
    ChannelSelect { channel_id: ChannelId },
    Send { content: String },
    Translate { message_id: MessageId },
    AutoTranslate { channel_id: ChannelId, enabled: bool },
    ToggleSendTranslate,
}

pub fn parse_line(line: &str) -> Result<ReplayEvent, serde_json::Error> {
    serde_json::from_str(line)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplayOutput {
    Sent(Draft),
    TranslateFailed {
        message_id: MessageId,
        error: TranslationError,
    },
    SendTranslate(bool),
    Ignored(String),
}

// ─── Host state ──────────────────────────────────────────────────────

#[derive(Default)]
struct HostState {
    user: Option<UserId>,
    channel: Option<ChannelId>,
    history: HashMap<ChannelId, Vec<Message>>,
}

#[derive(Default)]
pub struct ReplayHost {
    state: RwLock<HostState>,
}

impl ReplayHost {
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HostState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HostState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn find(&self, id: &MessageId) -> Option<Message> {
        self.read()
            .history
            .values()
            .flatten()
            .find(|m| &m.id == id)
            .cloned()
    }
}

impl HostSession for ReplayHost {
    fn current_user_id(&self) -> Option<UserId> {
        self.read().user.clone()
    }

    fn current_channel_id(&self) -> Option<ChannelId> {
        self.read().channel.clone()
    }

    fn channel_messages(&self, channel: &ChannelId) -> Vec<Message> {
        self.read().history.get(channel).cloned().unwrap_or_default()
    }
}

// ─── UI registrars ───────────────────────────────────────────────────

#[derive(Default)]
struct ReplayUi {
    chat_bar: Mutex<HashMap<String, ChatBarButton>>,
    popovers: Mutex<HashMap<String, PopoverFactory>>,
    menus: Mutex<HashMap<String, MenuPatch>>,
    accessories: Mutex<HashMap<String, AccessoryRenderer>>,
}

fn locked<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl ChatBar for ReplayUi {
    fn add_button(&self, id: &str, button: ChatBarButton) {
        locked(&self.chat_bar).insert(id.to_string(), button);
    }
    fn remove_button(&self, id: &str) {
        locked(&self.chat_bar).remove(id);
    }
}

impl MessagePopover for ReplayUi {
    fn add_button(&self, id: &str, factory: PopoverFactory) {
        locked(&self.popovers).insert(id.to_string(), factory);
    }
    fn remove_button(&self, id: &str) {
        locked(&self.popovers).remove(id);
    }
}

impl ContextMenu for ReplayUi {
    fn add_patch(&self, menu: &str, patch: MenuPatch) {
        locked(&self.menus).insert(menu.to_string(), patch);
    }
    fn remove_patch(&self, menu: &str) {
        locked(&self.menus).remove(menu);
    }
}

impl MessageAccessories for ReplayUi {
    fn add_accessory(&self, id: &str, renderer: AccessoryRenderer) {
        locked(&self.accessories).insert(id.to_string(), renderer);
    }
    fn remove_accessory(&self, id: &str) {
        locked(&self.accessories).remove(id);
    }
}

// ─── Replay driver ───────────────────────────────────────────────────

/// Stand-in host that replays a JSON-lines transcript of chat events through
/// the plugin. Each event is fully handled before the next is applied, so
/// output is reproducible.
///
/// ```text
/// {"event":"login","user_id":"me"}
/// {"event":"auto_translate","channel_id":"general","enabled":true}
/// {"event":"channel_select","channel_id":"general"}
/// {"event":"message_create","message":{"id":"1","channel_id":"general","author":{"id":"bob"},"content":"hola"}}
/// {"event":"send","content":"see you tomorrow"}
/// {"event":"translate","message_id":"1"}
/// {"event":"toggle_send_translate"}
/// ```
pub struct Replay {
    rt: tokio::runtime::Runtime,
    host: Arc<ReplayHost>,
    ui: Arc<ReplayUi>,
    annotations: Annotations,
    prefs: AutoTranslatePrefs,
    plugin: TranslatePlugin,
    dispatcher: Option<EventDispatcher>,
    next_local_id: u64,
}

impl Replay {
    pub fn new(
        translator: Arc<dyn Translator>,
        store: Arc<dyn KeyValueStore>,
        annotations: Annotations,
        settings: SharedSettings,
    ) -> std::io::Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let host = Arc::new(ReplayHost::default());
        let ui = Arc::new(ReplayUi::default());
        let prefs = AutoTranslatePrefs::new(store);

        let pipeline = Arc::new(MessagePipeline::new(
            translator,
            prefs.clone(),
            annotations.clone(),
            host.clone(),
            settings,
            TooltipHandle::default(),
        ));
        let registrars = Registrars {
            chat_bar: ui.clone(),
            popover: ui.clone(),
            context_menu: ui.clone(),
            accessories: ui.clone(),
        };
        let mut plugin = TranslatePlugin::new(Arc::clone(&pipeline), registrars);
        plugin.activate();
        let dispatcher = EventDispatcher::start(pipeline);

        Ok(Self {
            rt,
            host,
            ui,
            annotations,
            prefs,
            plugin,
            dispatcher: Some(dispatcher),
            next_local_id: 1,
        })
    }

    pub fn apply(&mut self, event: ReplayEvent) -> Option<ReplayOutput> {
        let output = self.handle(event);
        if let Some(dispatcher) = self.dispatcher.as_ref() {
            dispatcher.settle();
        }
        output
    }

    fn handle(&mut self, event: ReplayEvent) -> Option<ReplayOutput> {
        let Some(dispatcher) = self.dispatcher.as_ref() else {
            return Some(ReplayOutput::Ignored("replay already finished".into()));
        };

        match event {
            ReplayEvent::Login { user_id } => {
                info!("Logged in as {}", user_id);
                self.host.write().user = Some(user_id);
                None
            }
            ReplayEvent::MessageCreate { message } => {
                let channel_id = message.channel_id.clone();
                let visible = self.host.current_channel_id().as_ref() == Some(&channel_id);
                if visible {
                    self.annotations.mount(&message.id);
                }
                self.host
                    .write()
                    .history
                    .entry(channel_id.clone())
                    .or_default()
                    .push(message.clone());
                dispatcher.message_create(channel_id, message);
                None
            }
            ReplayEvent::ChannelSelect { channel_id } => {
                let previous = self.host.current_channel_id();
                if let Some(previous) = previous {
                    for m in self.host.channel_messages(&previous) {
                        self.annotations.unmount(&m.id);
                    }
                }
                for m in self.host.channel_messages(&channel_id) {
                    self.annotations.mount(&m.id);
                }
                self.host.write().channel = Some(channel_id);
                dispatcher.channel_select();
                None
            }
            ReplayEvent::Send { content } => {
                let Some(channel_id) = self.host.current_channel_id() else {
                    return Some(ReplayOutput::Ignored("send with no channel selected".into()));
                };
                let draft = dispatcher.pre_send(Draft {
                    channel_id: channel_id.clone(),
                    content,
                });
                let author = Author {
                    id: self
                        .host
                        .current_user_id()
                        .unwrap_or_else(|| UserId::new("local")),
                    username: String::new(),
                };
                let sent = Message {
                    id: MessageId::new(format!("local-{}", self.next_local_id)),
                    channel_id: channel_id.clone(),
                    author,
                    content: draft.content.clone(),
                };
                self.next_local_id += 1;
                self.annotations.mount(&sent.id);
                self.host
                    .write()
                    .history
                    .entry(channel_id)
                    .or_default()
                    .push(sent);
                Some(ReplayOutput::Sent(draft))
            }
            ReplayEvent::Translate { message_id } => {
                let Some(message) = self.host.find(&message_id) else {
                    return Some(ReplayOutput::Ignored(format!("unknown message {}", message_id)));
                };
                let factory = locked(&self.ui.popovers).get(BUTTON_ID).cloned();
                let Some(button) = factory.and_then(|f| f(&message)) else {
                    return Some(ReplayOutput::Ignored(format!(
                        "no translate button for message {}",
                        message_id
                    )));
                };
                match self.rt.block_on((button.on_click)()) {
                    Ok(_) => None,
                    Err(error) => Some(ReplayOutput::TranslateFailed { message_id, error }),
                }
            }
            ReplayEvent::AutoTranslate {
                channel_id,
                enabled,
            } => {
                let prefs = self.prefs.clone();
                let result: Result<(), PreferenceError> =
                    self.rt.block_on(async move { prefs.set(&channel_id, enabled).await });
                match result {
                    Ok(()) => None,
                    Err(e) => {
                        warn!("{}", e);
                        Some(ReplayOutput::Ignored(e.to_string()))
                    }
                }
            }
            ReplayEvent::ToggleSendTranslate => {
                let button = locked(&self.ui.chat_bar).get(BUTTON_ID).cloned();
                match button {
                    Some(button) => Some(ReplayOutput::SendTranslate((button.on_click)())),
                    None => Some(ReplayOutput::Ignored("chat bar button is hidden".into())),
                }
            }
        }
    }

    /// What the translation accessory shows under a message, if anything.
    pub fn render(&self, message_id: &MessageId) -> Option<String> {
        let message = self.host.find(message_id)?;
        let renderer = locked(&self.ui.accessories).get(ACCESSORY_ID).cloned()?;
        renderer(&message)
    }

    /// Wait for every queued event to finish and unregister the UI.
    pub fn finish(&mut self) {
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.shutdown();
        }
        self.plugin.deactivate();
    }
}

impl Drop for Replay {
    fn drop(&mut self) {
        self.finish();
    }
}
