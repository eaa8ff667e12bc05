//! Intent routing: pick exactly one reply for an inbound message and hand it
//! to the outbound sender.
//!
//! Selection is a pure function of the canonical message. Dispatch is
//! best-effort; send failures are logged and dropped.

use crate::menu::{GREETING, MENU_KEYWORD, MenuOption, UNRECOGNIZED_OPTION, menu_content};
use mb_channels::{
    CanonicalMessage, MessageSender, OutboundContent, SendAck, SenderId, normalize_event,
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyAction {
    SendText { to: SenderId, body: String },
    SendMenu { to: SenderId },
}

impl ReplyAction {
    pub fn recipient(&self) -> &SenderId {
        match self {
            Self::SendText { to, .. } | Self::SendMenu { to } => to,
        }
    }

    pub fn into_outbound(self) -> (SenderId, OutboundContent) {
        match self {
            Self::SendText { to, body } => (to, OutboundContent::Text { body }),
            Self::SendMenu { to } => (to, menu_content()),
        }
    }
}

/// Decide the reply for a canonical message. First match wins:
/// the `menu` keyword (any casing), an exact menu option title, then any
/// other non-empty text. Messages without text get no reply.
pub fn select_reply(message: Option<&CanonicalMessage>) -> Option<ReplyAction> {
    let message = message?;
    let payload = message.payload.as_deref().filter(|p| !p.is_empty())?;
    let to = message.sender_id.clone();

    if payload.to_lowercase() == MENU_KEYWORD {
        return Some(ReplyAction::SendMenu { to });
    }
    if MenuOption::from_title(payload).is_some() {
        return Some(menu_option_reply(to, payload));
    }
    Some(ReplyAction::SendText {
        to,
        body: GREETING.to_string(),
    })
}

/// Reply for a menu selection, matched on the option's display title.
pub fn menu_option_reply(to: SenderId, title: &str) -> ReplyAction {
    let body = match MenuOption::from_title(title) {
        Some(option) => option.response(),
        None => {
            tracing::debug!(sender = %to, title, "unrecognized menu option");
            UNRECOGNIZED_OPTION
        }
    };
    ReplyAction::SendText {
        to,
        body: body.to_string(),
    }
}

/// Normalize a raw delivery and select its reply. Malformed deliveries are
/// logged and produce nothing.
pub fn route_event(event: &serde_json::Value) -> Option<ReplyAction> {
    match normalize_event(event) {
        Ok(message) => select_reply(message.as_ref()),
        Err(error) => {
            tracing::warn!(error = %error, "ignoring malformed webhook event");
            None
        }
    }
}

#[derive(Clone)]
pub struct Responder {
    sender: Arc<dyn MessageSender>,
}

impl Responder {
    pub fn new(sender: Arc<dyn MessageSender>) -> Self {
        Self { sender }
    }

    /// Send the reply. Errors never leave this function.
    pub async fn dispatch(&self, action: ReplyAction) -> Option<SendAck> {
        let (to, content) = action.into_outbound();
        let kind = content.kind();
        match self.sender.send(&to, content).await {
            Ok(ack) => {
                tracing::info!(
                    channel = self.sender.channel_id(),
                    to = %to,
                    kind,
                    message_id = ?ack.message_id,
                    "reply sent"
                );
                Some(ack)
            }
            Err(error) => {
                tracing::error!(
                    channel = self.sender.channel_id(),
                    to = %to,
                    kind,
                    error = %error,
                    "reply send failed"
                );
                None
            }
        }
    }

    /// Fire-and-forget dispatch on the runtime.
    pub fn spawn_dispatch(&self, action: ReplyAction) -> tokio::task::JoinHandle<()> {
        let responder = self.clone();
        tokio::spawn(async move {
            responder.dispatch(action).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ReplyAction, Responder, menu_option_reply, route_event, select_reply};
    use crate::menu::{GREETING, MenuOption, UNRECOGNIZED_OPTION};
    use mb_channels::{
        CanonicalMessage, MessageKind, MessageSender, OutboundContent, SendAck, SendError,
        SenderId,
    };
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingSender {
        fail: bool,
        sent: Mutex<Vec<(SenderId, OutboundContent)>>,
    }

    #[async_trait::async_trait]
    impl MessageSender for RecordingSender {
        fn channel_id(&self) -> &str {
            "test"
        }

        async fn send(
            &self,
            to: &SenderId,
            content: OutboundContent,
        ) -> mb_channels::Result<SendAck> {
            self.sent
                .lock()
                .expect("sent lock")
                .push((to.clone(), content));
            if self.fail {
                return Err(SendError::Api {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(SendAck::default())
        }
    }

    fn message(kind: MessageKind, payload: Option<&str>) -> CanonicalMessage {
        CanonicalMessage {
            sender_id: SenderId::from("57300"),
            kind,
            payload: payload.map(str::to_string),
        }
    }

    fn text(payload: &str) -> CanonicalMessage {
        message(MessageKind::Text, Some(payload))
    }

    fn send_text(body: &str) -> Option<ReplyAction> {
        Some(ReplyAction::SendText {
            to: SenderId::from("57300"),
            body: body.to_string(),
        })
    }

    #[test]
    fn no_message_means_no_reply() {
        assert_eq!(select_reply(None), None);
    }

    #[test]
    fn message_without_text_means_no_reply() {
        assert_eq!(
            select_reply(Some(&message(MessageKind::Unsupported, None))),
            None
        );
        assert_eq!(select_reply(Some(&text(""))), None);
    }

    #[test]
    fn menu_keyword_matches_any_casing() {
        for keyword in ["menu", "Menu", "MENU", "mEnU"] {
            assert_eq!(
                select_reply(Some(&text(keyword))),
                Some(ReplyAction::SendMenu {
                    to: SenderId::from("57300")
                }),
                "keyword {keyword}"
            );
        }
    }

    #[test]
    fn menu_keyword_is_not_trimmed() {
        assert_eq!(select_reply(Some(&text(" menu"))), send_text(GREETING));
        assert_eq!(select_reply(Some(&text("menu please"))), send_text(GREETING));
    }

    #[test]
    fn option_titles_map_to_distinct_fixed_replies() {
        let replies: Vec<_> = MenuOption::ALL
            .iter()
            .map(|option| select_reply(Some(&text(option.title()))))
            .collect();
        for (option, reply) in MenuOption::ALL.iter().zip(&replies) {
            assert_eq!(reply, &send_text(option.response()));
        }
        assert_ne!(replies[0], replies[1]);
        assert_ne!(replies[1], replies[2]);
        assert_ne!(replies[0], replies[2]);
    }

    #[test]
    fn option_titles_are_case_sensitive() {
        assert_eq!(select_reply(Some(&text("🕒 HORARIOS"))), send_text(GREETING));
    }

    #[test]
    fn other_text_gets_the_greeting() {
        for payload in ["hola", "1", "2", "info", "😀"] {
            assert_eq!(select_reply(Some(&text(payload))), send_text(GREETING));
        }
    }

    #[test]
    fn interactive_shapes_route_like_plain_text() {
        for payload in ["💡 Información", "🕒 Horarios", "menu", "otra cosa"] {
            let expected = select_reply(Some(&text(payload)));
            for kind in [MessageKind::Button, MessageKind::List] {
                assert_eq!(
                    select_reply(Some(&message(kind, Some(payload)))),
                    expected,
                    "{kind:?} {payload}"
                );
            }
        }
    }

    #[test]
    fn selection_is_idempotent() {
        let input = text("📞 Contacto");
        let first = select_reply(Some(&input));
        let second = select_reply(Some(&input));
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_option_gets_its_own_fallback() {
        assert_eq!(
            Some(menu_option_reply(SenderId::from("57300"), "🍕 Pizza")),
            send_text(UNRECOGNIZED_OPTION)
        );
        assert_ne!(UNRECOGNIZED_OPTION, GREETING);
    }

    #[test]
    fn route_event_handles_menu_scenario() {
        let event = json!({
            "object": "whatsapp_business_account",
            "entry": [{ "changes": [{ "value": { "messages": [
                { "from": "57300...", "text": { "body": "Menu" } }
            ] } }] }],
        });
        assert_eq!(
            route_event(&event),
            Some(ReplyAction::SendMenu {
                to: SenderId::from("57300...")
            })
        );
    }

    #[test]
    fn route_event_handles_list_reply_scenario() {
        let event = json!({
            "object": "whatsapp_business_account",
            "entry": [{ "changes": [{ "value": { "messages": [{
                "from": "57300",
                "type": "interactive",
                "interactive": {
                    "type": "list_reply",
                    "list_reply": { "id": "2", "title": "🕒 Horarios" }
                }
            }] } }] }],
        });
        assert_eq!(
            route_event(&event),
            send_text("🕓 Atendemos de lunes a viernes, de 8am a 6pm.")
        );
    }

    #[test]
    fn route_event_ignores_numeric_reply_ids() {
        let event = json!({
            "object": "whatsapp_business_account",
            "entry": [{ "changes": [{ "value": { "messages": [{
                "id": 7,
                "from": "57300",
                "type": "interactive",
                "interactive": {
                    "type": "button_reply",
                    "button_reply": { "id": 2, "title": "🕒 Horarios" }
                }
            }] } }] }],
        });
        assert_eq!(
            route_event(&event),
            send_text("🕓 Atendemos de lunes a viernes, de 8am a 6pm.")
        );
    }

    #[test]
    fn route_event_drops_malformed_and_empty_deliveries() {
        assert_eq!(route_event(&json!({ "object": "x", "entry": "nope" })), None);
        assert_eq!(route_event(&json!({ "object": "x", "entry": [] })), None);
    }

    #[tokio::test]
    async fn dispatch_sends_menu_as_interactive_content() {
        let sender = Arc::new(RecordingSender::default());
        let responder = Responder::new(sender.clone());

        let ack = responder
            .dispatch(ReplyAction::SendMenu {
                to: SenderId::from("57300"),
            })
            .await;
        assert!(ack.is_some());

        let sent = sender.sent.lock().expect("sent lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.as_str(), "57300");
        assert!(matches!(
            &sent[0].1,
            OutboundContent::InteractiveMenu { buttons, .. } if buttons.len() == 3
        ));
    }

    #[tokio::test]
    async fn dispatch_swallows_send_failures() {
        let sender = Arc::new(RecordingSender {
            fail: true,
            ..RecordingSender::default()
        });
        let responder = Responder::new(sender.clone());

        let ack = responder
            .dispatch(ReplyAction::SendText {
                to: SenderId::from("57300"),
                body: GREETING.to_string(),
            })
            .await;
        assert!(ack.is_none());
        assert_eq!(sender.sent.lock().expect("sent lock").len(), 1);
    }

    #[tokio::test]
    async fn spawned_dispatch_runs_to_completion() {
        let sender = Arc::new(RecordingSender::default());
        let responder = Responder::new(sender.clone());

        responder
            .spawn_dispatch(ReplyAction::SendText {
                to: SenderId::from("57300"),
                body: "hola".to_string(),
            })
            .await
            .expect("dispatch task");

        let sent = sender.sent.lock().expect("sent lock");
        assert_eq!(
            sent.as_slice(),
            &[(SenderId::from("57300"), OutboundContent::text("hola"))]
        );
    }
}
