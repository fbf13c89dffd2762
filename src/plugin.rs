use log::info;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::TranslationError;
use crate::model::{Message, TranslationResult};
use crate::pipeline::MessagePipeline;

pub const BUTTON_ID: &str = "vc-translate";
pub const MENU_ITEM_ID: &str = "vc-trans";
pub const ACCESSORY_ID: &str = "vc-translation";
pub const MESSAGE_MENU: &str = "message";
const COPY_TEXT_ID: &str = "copy-text";

// ─── Callback types ──────────────────────────────────────────────────

pub type ActionFuture =
    Pin<Box<dyn Future<Output = Result<TranslationResult, TranslationError>> + Send>>;
pub type Action = Arc<dyn Fn() -> ActionFuture + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatBarView {
    pub label: &'static str,
    pub active: bool,
    pub tooltip_visible: bool,
}

#[derive(Clone)]
pub struct ChatBarButton {
    pub render: Arc<dyn Fn() -> ChatBarView + Send + Sync>,
    /// Toggles translate-on-send, returns the new state.
    pub on_click: Arc<dyn Fn() -> bool + Send + Sync>,
}

#[derive(Clone)]
pub struct PopoverButton {
    pub label: &'static str,
    pub on_click: Action,
}

pub type PopoverFactory = Arc<dyn Fn(&Message) -> Option<PopoverButton> + Send + Sync>;

#[derive(Clone)]
pub struct MenuItem {
    pub id: String,
    pub label: String,
    pub action: Option<Action>,
}

impl MenuItem {
    pub fn plain(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            action: None,
        }
    }
}

pub type MenuPatch = Arc<dyn Fn(&Message, &mut Vec<MenuItem>) + Send + Sync>;
pub type AccessoryRenderer = Arc<dyn Fn(&Message) -> Option<String> + Send + Sync>;

// ─── Host registrars ─────────────────────────────────────────────────

pub trait ChatBar: Send + Sync {
    fn add_button(&self, id: &str, button: ChatBarButton);
    fn remove_button(&self, id: &str);
}

pub trait MessagePopover: Send + Sync {
    fn add_button(&self, id: &str, factory: PopoverFactory);
    fn remove_button(&self, id: &str);
}

pub trait ContextMenu: Send + Sync {
    fn add_patch(&self, menu: &str, patch: MenuPatch);
    fn remove_patch(&self, menu: &str);
}

pub trait MessageAccessories: Send + Sync {
    fn add_accessory(&self, id: &str, renderer: AccessoryRenderer);
    fn remove_accessory(&self, id: &str);
}

#[derive(Clone)]
pub struct Registrars {
    pub chat_bar: Arc<dyn ChatBar>,
    pub popover: Arc<dyn MessagePopover>,
    pub context_menu: Arc<dyn ContextMenu>,
    pub accessories: Arc<dyn MessageAccessories>,
}

// ─── Plugin ──────────────────────────────────────────────────────────

/// Registers the chat-bar button, message hover button, context-menu item
/// and the accessory that renders translations under messages. Host
/// registration APIs come in as traits; callbacks only see plain
/// [`Message`] data.
pub struct TranslatePlugin {
    pipeline: Arc<MessagePipeline>,
    registrars: Registrars,
    active: bool,
    chat_bar_registered: bool,
}

impl TranslatePlugin {
    pub fn new(pipeline: Arc<MessagePipeline>, registrars: Registrars) -> Self {
        Self {
            pipeline,
            registrars,
            active: false,
            chat_bar_registered: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activate(&mut self) {
        if self.active {
            return;
        }

        let accessory_pipeline = Arc::clone(&self.pipeline);
        self.registrars.accessories.add_accessory(
            ACCESSORY_ID,
            Arc::new(move |message: &Message| {
                accessory_pipeline
                    .annotations()
                    .get(&message.id)
                    .map(|result| render_annotation(&result))
            }),
        );

        if crate::config::snapshot(self.pipeline.settings()).show_chat_bar_button {
            self.registrars
                .chat_bar
                .add_button(BUTTON_ID, chat_bar_button(&self.pipeline));
            self.chat_bar_registered = true;
        }

        let popover_pipeline = Arc::clone(&self.pipeline);
        self.registrars.popover.add_button(
            BUTTON_ID,
            Arc::new(move |message: &Message| {
                if !message.has_content() {
                    return None;
                }
                Some(PopoverButton {
                    label: "Translate",
                    on_click: translate_action(&popover_pipeline, message),
                })
            }),
        );

        let menu_pipeline = Arc::clone(&self.pipeline);
        self.registrars.context_menu.add_patch(
            MESSAGE_MENU,
            Arc::new(move |message: &Message, items: &mut Vec<MenuItem>| {
                patch_message_menu(items, message, || {
                    translate_action(&menu_pipeline, message)
                });
            }),
        );

        self.active = true;
        info!("Translate plugin activated");
    }

    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        if self.chat_bar_registered {
            self.registrars.chat_bar.remove_button(BUTTON_ID);
            self.chat_bar_registered = false;
        }
        self.registrars.popover.remove_button(BUTTON_ID);
        self.registrars.context_menu.remove_patch(MESSAGE_MENU);
        self.registrars.accessories.remove_accessory(ACCESSORY_ID);
        self.pipeline.tooltip().cancel();
        self.active = false;
        info!("Translate plugin deactivated");
    }
}

impl Drop for TranslatePlugin {
    fn drop(&mut self) {
        self.deactivate();
    }
}

// ─── Pieces ──────────────────────────────────────────────────────────

fn translate_action(pipeline: &Arc<MessagePipeline>, message: &Message) -> Action {
    let pipeline = Arc::clone(pipeline);
    let message = message.clone();
    Arc::new(move || -> ActionFuture {
        let pipeline = Arc::clone(&pipeline);
        let message = message.clone();
        Box::pin(async move { pipeline.manual_translate(&message).await })
    })
}

fn chat_bar_button(pipeline: &Arc<MessagePipeline>) -> ChatBarButton {
    let render_pipeline = Arc::clone(pipeline);
    let click_pipeline = Arc::clone(pipeline);
    ChatBarButton {
        render: Arc::new(move || {
            let active = crate::config::snapshot(render_pipeline.settings()).auto_translate;
            ChatBarView {
                label: if active {
                    "Disable Auto Translate"
                } else {
                    "Enable Auto Translate"
                },
                active,
                tooltip_visible: render_pipeline.tooltip().is_visible(),
            }
        }),
        on_click: Arc::new(move || {
            let mut settings = match click_pipeline.settings().write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            settings.auto_translate = !settings.auto_translate;
            info!(
                "Translate on send {}",
                if settings.auto_translate { "enabled" } else { "disabled" }
            );
            settings.auto_translate
        }),
    }
}

/// Insert the "Translate" entry right after "Copy Text". Messages without
/// text and menus without a copy entry are left alone.
pub fn patch_message_menu(
    items: &mut Vec<MenuItem>,
    message: &Message,
    action: impl FnOnce() -> Action,
) {
    if !message.has_content() {
        return;
    }
    let Some(pos) = items.iter().position(|item| item.id == COPY_TEXT_ID) else {
        return;
    };
    items.insert(
        pos + 1,
        MenuItem {
            id: MENU_ITEM_ID.to_string(),
            label: "Translate".to_string(),
            action: Some(action()),
        },
    );
}

pub fn render_annotation(result: &TranslationResult) -> String {
    format!("{} (translated from {})", result.text, result.source_language)
}
