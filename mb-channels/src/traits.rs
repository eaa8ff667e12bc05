use crate::error::Result;
use crate::types::{OutboundContent, SendAck, SenderId};
use async_trait::async_trait;

#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Unique channel identifier, e.g. "whatsapp".
    fn channel_id(&self) -> &str;

    /// Send one message to a recipient on this platform.
    async fn send(&self, to: &SenderId, content: OutboundContent) -> Result<SendAck>;
}
