use log::{debug, trace};
use std::collections::{HashMap, HashSet};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};

use crate::model::{MessageId, TranslationResult};

// ─── Display state ───────────────────────────────────────────────────

#[derive(Default)]
struct Board {
    mounted: HashSet<MessageId>,
    shown: HashMap<MessageId, TranslationResult>,
}

/// Translations displayed under messages, keyed by message id.
///
/// Only messages the renderer has mounted can carry an annotation; attaching
/// to anything else is a no-op, so late results for messages that scrolled
/// away are dropped quietly. Writes to the same id are last-write-wins.
#[derive(Clone, Default)]
pub struct Annotations {
    board: Arc<Mutex<Board>>,
    listener: Option<mpsc::Sender<(MessageId, TranslationResult)>>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also forward every successful attach to `listener`.
    pub fn with_listener(listener: mpsc::Sender<(MessageId, TranslationResult)>) -> Self {
        Self {
            board: Arc::default(),
            listener: Some(listener),
        }
    }

    fn board(&self) -> MutexGuard<'_, Board> {
        match self.board.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn mount(&self, id: &MessageId) {
        self.board().mounted.insert(id.clone());
    }

    pub fn unmount(&self, id: &MessageId) {
        let mut board = self.board();
        board.mounted.remove(id);
        board.shown.remove(id);
    }

    pub fn is_mounted(&self, id: &MessageId) -> bool {
        self.board().mounted.contains(id)
    }

    /// Returns whether the annotation is now displayed.
    pub fn attach(&self, id: &MessageId, result: TranslationResult) -> bool {
        {
            let mut board = self.board();
            if !board.mounted.contains(id) {
                trace!("Message {} not mounted, dropping translation", id);
                return false;
            }
            board.shown.insert(id.clone(), result.clone());
        }
        debug!("Attached translation to message {}", id);
        if let Some(listener) = &self.listener {
            let _ = listener.send((id.clone(), result));
        }
        true
    }

    pub fn get(&self, id: &MessageId) -> Option<TranslationResult> {
        self.board().shown.get(id).cloned()
    }

    /// User closed the annotation; the message stays mounted.
    pub fn dismiss(&self, id: &MessageId) -> bool {
        self.board().shown.remove(id).is_some()
    }

    pub fn shown_count(&self) -> usize {
        self.board().shown.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(text: &str) -> TranslationResult {
        TranslationResult {
            text: text.into(),
            source_language: "de".into(),
            target_language: "en".into(),
        }
    }

    #[test]
    fn attach_requires_mount() {
        let annotations = Annotations::new();
        let id = MessageId::new("m1");
        assert!(!annotations.attach(&id, result("hi")));
        assert_eq!(annotations.get(&id), None);

        annotations.mount(&id);
        assert!(annotations.attach(&id, result("hi")));
        assert_eq!(annotations.get(&id).unwrap().text, "hi");
    }

    #[test]
    fn last_write_wins() {
        let annotations = Annotations::new();
        let id = MessageId::new("m1");
        annotations.mount(&id);
        annotations.attach(&id, result("first"));
        annotations.attach(&id, result("second"));
        assert_eq!(annotations.get(&id).unwrap().text, "second");
        assert_eq!(annotations.shown_count(), 1);
    }

    #[test]
    fn unmount_and_dismiss_clear() {
        let annotations = Annotations::new();
        let a = MessageId::new("a");
        let b = MessageId::new("b");
        annotations.mount(&a);
        annotations.mount(&b);
        annotations.attach(&a, result("x"));
        annotations.attach(&b, result("y"));

        annotations.unmount(&a);
        assert_eq!(annotations.get(&a), None);
        assert!(!annotations.attach(&a, result("late")));

        assert!(annotations.dismiss(&b));
        assert!(annotations.is_mounted(&b));
        assert_eq!(annotations.get(&b), None);
    }

    #[test]
    fn listener_sees_attaches() {
        let (tx, rx) = mpsc::channel();
        let annotations = Annotations::with_listener(tx);
        let id = MessageId::new("m");
        annotations.attach(&id, result("dropped"));
        annotations.mount(&id);
        annotations.attach(&id, result("kept"));

        let got: Vec<_> = rx.try_iter().collect();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].1.text, "kept");
    }
}
