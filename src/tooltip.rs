use log::trace;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const TOOLTIP_DURATION: Duration = Duration::from_secs(2);

struct TooltipState {
    visible: AtomicBool,
    // Bumped by every flash/cancel; a timer only hides its own flash.
    generation: AtomicU64,
    hide_timer: Mutex<Option<JoinHandle<()>>>,
    duration: Duration,
}

impl TooltipState {
    fn lock_timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.hide_timer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// "Auto-translate is on" indicator next to the chat-bar button.
///
/// Each `flash` shows the tooltip and restarts the hide timer, so a burst of
/// sends keeps it visible until `duration` after the last one.
#[derive(Clone)]
pub struct TooltipHandle {
    state: Arc<TooltipState>,
}

impl Default for TooltipHandle {
    fn default() -> Self {
        Self::new(TOOLTIP_DURATION)
    }
}

impl TooltipHandle {
    pub fn new(duration: Duration) -> Self {
        Self {
            state: Arc::new(TooltipState {
                visible: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                hide_timer: Mutex::new(None),
                duration,
            }),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.state.visible.load(Ordering::SeqCst)
    }

    /// Show now, hide after the configured duration. Must be called from
    /// within a tokio runtime.
    pub fn flash(&self) {
        let mut slot = self.state.lock_timer();
        let generation = self.state.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.visible.store(true, Ordering::SeqCst);

        let state = Arc::clone(&self.state);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(state.duration).await;
            let _slot = state.lock_timer();
            if state.generation.load(Ordering::SeqCst) == generation {
                state.visible.store(false, Ordering::SeqCst);
                trace!("Auto-translate tooltip hidden");
            }
        });
        if let Some(previous) = slot.replace(timer) {
            previous.abort();
        }
    }

    /// Hide immediately and drop any pending timer.
    pub fn cancel(&self) {
        let mut slot = self.state.lock_timer();
        self.state.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(timer) = slot.take() {
            timer.abort();
        }
        self.state.visible.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn hides_after_duration() {
        let tooltip = TooltipHandle::default();
        assert!(!tooltip.is_visible());

        tooltip.flash();
        assert!(tooltip.is_visible());

        sleep(Duration::from_millis(1900)).await;
        assert!(tooltip.is_visible());

        sleep(Duration::from_millis(200)).await;
        assert!(!tooltip.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn second_flash_restarts_timer() {
        let tooltip = TooltipHandle::default();
        tooltip.flash();
        sleep(Duration::from_millis(1500)).await;

        tooltip.flash();
        // 2.5s after the first flash: the first timer would have fired by now.
        sleep(Duration::from_millis(1000)).await;
        assert!(tooltip.is_visible());

        sleep(Duration::from_millis(1100)).await;
        assert!(!tooltip.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_hides_at_once() {
        let tooltip = TooltipHandle::default();
        tooltip.flash();
        tooltip.cancel();
        assert!(!tooltip.is_visible());

        sleep(Duration::from_secs(3)).await;
        assert!(!tooltip.is_visible());
    }
}
