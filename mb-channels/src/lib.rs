//! Channel I/O for menubot.
//!
//! The WhatsApp Cloud adapter sends outbound messages; the webhook module
//! turns inbound deliveries into a `CanonicalMessage`. Neither holds state
//! between calls.

mod error;
mod traits;
mod types;
mod webhook;
mod whatsapp;

pub use error::{Result, SendError};
pub use traits::MessageSender;
pub use types::{MenuButton, MessageId, OutboundContent, SendAck, SenderId};
pub use webhook::{
    CanonicalMessage, MalformedEvent, MessageKind, WhatsAppButton, WhatsAppInteractive,
    WhatsAppMessage, WhatsAppReply, WhatsAppText, normalize_event,
};
pub use whatsapp::{
    DEFAULT_GRAPH_API_BASE_URL, DEFAULT_GRAPH_API_VERSION, WhatsAppCloudAdapter,
    build_message_payload,
};
