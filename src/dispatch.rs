use log::{debug, error, info, trace, warn};
use std::sync::Arc;
use std::thread;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use crate::model::{ChannelId, Draft, Message};
use crate::pipeline::{InboundOutcome, MessagePipeline};

// ─── Events ──────────────────────────────────────────────────────────

pub enum HostEvent {
    MessageCreate {
        channel_id: ChannelId,
        message: Message,
    },
    ChannelSelect,
    PreSend {
        draft: Draft,
        reply: oneshot::Sender<Draft>,
    },
}

enum WorkItem {
    Event(HostEvent),
    Settle(oneshot::Sender<()>),
    Shutdown,
}

// ─── Dispatcher ──────────────────────────────────────────────────────

/// Adapter between the host's event stream and the pipeline.
///
/// Owns a background thread running a tokio runtime. Every event becomes its
/// own task, so a slow translation never holds up the next event. Errors on
/// automatic paths are logged and dropped here; manual translations hand
/// theirs back to the caller.
pub struct EventDispatcher {
    work_tx: mpsc::UnboundedSender<WorkItem>,
    handle: Option<thread::JoinHandle<()>>,
}

impl EventDispatcher {
    pub fn start(pipeline: Arc<MessagePipeline>) -> Self {
        let (work_tx, mut work_rx) = mpsc::unbounded_channel::<WorkItem>();

        let handle = thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Failed to create tokio runtime: {}", e);
                    return;
                }
            };

            info!("Event dispatcher started");

            rt.block_on(async move {
                let mut tasks = JoinSet::new();
                loop {
                    tokio::select! {
                        item = work_rx.recv() => match item {
                            Some(WorkItem::Event(event)) => {
                                tasks.spawn(handle_event(Arc::clone(&pipeline), event));
                            }
                            Some(WorkItem::Settle(reply)) => {
                                drain(&mut tasks).await;
                                let _ = reply.send(());
                            }
                            Some(WorkItem::Shutdown) | None => break,
                        },
                        Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                            if let Err(e) = joined {
                                error!("Event task failed: {}", e);
                            }
                        }
                    }
                }

                if !tasks.is_empty() {
                    info!("Waiting for {} in-flight event(s)", tasks.len());
                }
                drain(&mut tasks).await;
            });

            info!("Event dispatcher thread exiting");
        });

        Self {
            work_tx,
            handle: Some(handle),
        }
    }

    /// Queue an event. False once the dispatcher has stopped.
    pub fn dispatch(&self, event: HostEvent) -> bool {
        self.work_tx.send(WorkItem::Event(event)).is_ok()
    }

    pub fn message_create(&self, channel_id: ChannelId, message: Message) -> bool {
        self.dispatch(HostEvent::MessageCreate {
            channel_id,
            message,
        })
    }

    pub fn channel_select(&self) -> bool {
        self.dispatch(HostEvent::ChannelSelect)
    }

    /// Run the pre-send hook and wait for it. Any failure yields the draft
    /// as typed, and so does a call from inside a runtime, where blocking
    /// would panic.
    pub fn pre_send(&self, draft: Draft) -> Draft {
        if inside_runtime() {
            warn!("pre_send called from an async context, sending untranslated");
            return draft;
        }
        let (reply, rx) = oneshot::channel();
        if !self.dispatch(HostEvent::PreSend {
            draft: draft.clone(),
            reply,
        }) {
            return draft;
        }
        rx.blocking_recv().unwrap_or(draft)
    }

    /// Wait until every event queued so far has been fully handled. Returns
    /// at once when called from inside a runtime.
    pub fn settle(&self) {
        if inside_runtime() {
            warn!("settle called from an async context, not waiting");
            return;
        }
        let (reply, rx) = oneshot::channel();
        if self.work_tx.send(WorkItem::Settle(reply)).is_ok() {
            let _ = rx.blocking_recv();
        }
    }

    /// Stop accepting events and wait for in-flight ones to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.work_tx.send(WorkItem::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Event dispatcher thread panicked");
            }
        }
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn inside_runtime() -> bool {
    tokio::runtime::Handle::try_current().is_ok()
}

async fn drain(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("Event task failed: {}", e);
        }
    }
}

async fn handle_event(pipeline: Arc<MessagePipeline>, event: HostEvent) {
    match event {
        HostEvent::MessageCreate {
            channel_id,
            message,
        } => match pipeline.on_message_create(&channel_id, &message).await {
            Ok(InboundOutcome::Translated) => debug!("Translated message {}", message.id),
            Ok(InboundOutcome::Skipped(reason)) => {
                trace!("Skipped message {}: {:?}", message.id, reason)
            }
            Err(e) => warn!("Dropping translation of message {}: {}", message.id, e),
        },
        HostEvent::ChannelSelect => match pipeline.on_channel_select().await {
            Ok(report) => debug!("Channel backfill done: {:?}", report),
            Err(e) => warn!("{}", e),
        },
        HostEvent::PreSend { mut draft, reply } => {
            match pipeline.intercept_outgoing(&mut draft).await {
                Ok(outcome) => trace!("Pre-send: {:?}", outcome),
                Err(e) => warn!("Sending message untranslated: {}", e),
            }
            let _ = reply.send(draft);
        }
    }
}
