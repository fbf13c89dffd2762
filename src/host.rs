use crate::model::{ChannelId, Message, UserId};

/// Read-only view of the host client's session state.
pub trait HostSession: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;

    fn current_channel_id(&self) -> Option<ChannelId>;

    /// Cached history of a channel, oldest first.
    fn channel_messages(&self, channel: &ChannelId) -> Vec<Message>;
}
