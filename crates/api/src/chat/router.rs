//! Message routing
//!
//! Validates, stamps, stores and broadcasts messages. The sender snapshot,
//! timestamp, status and initial read receipt are all set here; nothing
//! client-supplied wins over the live participant record.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use fixchat_shared::{
    ChatError, ChatResult, DeliveryStatus, Message, MessageDraft, MessageKind, MessageMetadata,
    Participant, ReadReceipt,
};

use super::events::ServerEvent;
use super::notify::NotificationDispatcher;
use super::registry::ParticipantRegistry;
use super::rooms::RoomStore;

/// Routes messages into rooms and out to every subscriber with a live
/// connection; offline members are handed to the notification dispatcher
pub struct MessageRouter {
    rooms: Arc<RoomStore>,
    registry: Arc<ParticipantRegistry>,
    notifications: Arc<NotificationDispatcher>,
}

impl MessageRouter {
    pub fn new(
        rooms: Arc<RoomStore>,
        registry: Arc<ParticipantRegistry>,
        notifications: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            rooms,
            registry,
            notifications,
        }
    }

    /// Validate, stamp, store and broadcast one message
    ///
    /// The room must exist and text messages must carry non-empty content.
    /// Message order in the room equals the order `send` calls complete.
    pub async fn send(
        &self,
        room_id: &str,
        draft: MessageDraft,
        sender: &Participant,
    ) -> ChatResult<Message> {
        if draft.kind == MessageKind::Text && draft.content.trim().is_empty() {
            return Err(ChatError::InvalidMessage(
                "text message content must be non-empty".to_string(),
            ));
        }

        let now = OffsetDateTime::now_utc();
        let message = Message {
            id: Uuid::new_v4(),
            room_id: room_id.to_string(),
            sender: sender.clone(),
            content: draft.content,
            timestamp: now,
            kind: draft.kind,
            status: DeliveryStatus::Sent,
            metadata: MessageMetadata {
                // the sender implicitly reads their own message
                read_by: vec![ReadReceipt {
                    participant_id: sender.id,
                    read_at: now,
                }],
                attachments: draft.attachments,
                call: None,
                ai: None,
            },
        };

        self.route(room_id, message).await
    }

    /// Store and broadcast a message that was assembled by a trusted caller
    /// (system notices, advisor replies, call descriptors)
    pub async fn route(&self, room_id: &str, message: Message) -> ChatResult<Message> {
        self.rooms.append_message(room_id, message.clone()).await?;
        self.broadcast(room_id, ServerEvent::Message {
            message: message.clone(),
        })
        .await;

        // Fire-and-forget push to offline members; never blocks the sender.
        let notifications = Arc::clone(&self.notifications);
        let room_id = room_id.to_string();
        let pushed = message.clone();
        tokio::spawn(async move {
            notifications.notify_offline(&room_id, &pushed).await;
        });

        Ok(message)
    }

    /// Record a read receipt and broadcast a lightweight read event
    ///
    /// Silent no-op when the message id is unknown; idempotent per reader.
    pub async fn mark_read(
        &self,
        room_id: &str,
        message_id: &Uuid,
        reader_id: &Uuid,
    ) -> ChatResult<()> {
        let Some(receipt) = self.rooms.mark_read(room_id, message_id, reader_id).await? else {
            return Ok(());
        };

        self.broadcast(
            room_id,
            ServerEvent::MessageRead {
                room_id: room_id.to_string(),
                message_id: *message_id,
                user_id: *reader_id,
                read_at: receipt.read_at,
            },
        )
        .await;
        Ok(())
    }

    /// Send an event to every room member with a live connection
    ///
    /// Silently ignores send errors (closed connections will be cleaned up)
    pub async fn broadcast(&self, room_id: &str, event: ServerEvent) {
        self.fan_out(room_id, None, event).await;
    }

    /// Broadcast to a room, skipping one member (typically the originator)
    pub async fn broadcast_except(&self, room_id: &str, skip: &Uuid, event: ServerEvent) {
        self.fan_out(room_id, Some(*skip), event).await;
    }

    async fn fan_out(&self, room_id: &str, skip: Option<Uuid>, event: ServerEvent) {
        let Ok(room) = self.rooms.get(room_id).await else {
            tracing::warn!(room_id = %room_id, "No room found - no subscribers");
            return;
        };

        let mut success_count = 0;
        let mut failed_count = 0;

        for member in &room.participants {
            if skip == Some(member.id) {
                continue;
            }
            let Some(conn) = self.registry.connection_for(&member.id).await else {
                continue;
            };
            match conn.send(event.clone()) {
                Ok(()) => success_count += 1,
                Err(_) => {
                    failed_count += 1;
                    tracing::warn!(
                        session_id = %conn.session_id,
                        "Failed to send event to connection (likely closed)"
                    );
                }
            }
        }

        tracing::debug!(
            room_id = %room_id,
            recipients = success_count,
            failed = failed_count,
            "Broadcast event to room"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixchat_shared::{ParticipantRole, RoomKind, RoomMetadata, RoomSeed};
    use tokio::sync::{mpsc, Mutex};

    use crate::chat::connection::Connection;
    use crate::chat::notify::PushSender;

    struct RecordingPush {
        calls: Mutex<Vec<Uuid>>,
    }

    #[async_trait::async_trait]
    impl PushSender for RecordingPush {
        async fn send_push(
            &self,
            recipient: &Participant,
            _room_id: &str,
            _preview: &str,
        ) -> Result<(), ChatError> {
            self.calls.lock().await.push(recipient.id);
            Ok(())
        }
    }

    fn seed() -> RoomSeed {
        RoomSeed {
            name: "Repair".to_string(),
            kind: RoomKind::Support,
            ticket_id: None,
            metadata: RoomMetadata::default(),
        }
    }

    struct Fixture {
        rooms: Arc<RoomStore>,
        registry: Arc<ParticipantRegistry>,
        push: Arc<RecordingPush>,
        router: MessageRouter,
    }

    fn fixture() -> Fixture {
        let rooms = Arc::new(RoomStore::new());
        let registry = Arc::new(ParticipantRegistry::new());
        let push = Arc::new(RecordingPush {
            calls: Mutex::new(Vec::new()),
        });
        let notifications = Arc::new(NotificationDispatcher::new(
            Arc::clone(&rooms),
            Arc::clone(&registry),
            Arc::clone(&push) as Arc<dyn PushSender>,
            100,
        ));
        let router = MessageRouter::new(
            Arc::clone(&rooms),
            Arc::clone(&registry),
            notifications,
        );
        Fixture {
            rooms,
            registry,
            push,
            router,
        }
    }

    async fn connect(
        fx: &Fixture,
        participant: &Participant,
    ) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        fx.registry
            .register(Arc::new(Connection::new(tx)), participant.clone())
            .await;
        rx
    }

    #[tokio::test]
    async fn test_send_to_missing_room_fails() {
        let fx = fixture();
        let sender = Participant::new(Uuid::new_v4(), "A", ParticipantRole::Customer);

        let err = fx
            .router
            .send("repair-9", MessageDraft::text("hi"), &sender)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::RoomNotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_text_message_is_rejected() {
        let fx = fixture();
        let sender = Participant::new(Uuid::new_v4(), "A", ParticipantRole::Customer);
        fx.rooms.get_or_create("repair-1", &sender, seed).await;

        let err = fx
            .router
            .send("repair-1", MessageDraft::text("   "), &sender)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::InvalidMessage(_)));
    }

    #[tokio::test]
    async fn test_send_stamps_sender_receipt_and_broadcasts() {
        let fx = fixture();
        let sender = Participant::new(Uuid::new_v4(), "A", ParticipantRole::Customer);
        let peer = Participant::new(Uuid::new_v4(), "B", ParticipantRole::Technician);
        fx.rooms.get_or_create("repair-1", &sender, seed).await;
        fx.rooms.add_participant("repair-1", &peer).await.unwrap();

        let mut sender_rx = connect(&fx, &sender).await;
        let mut peer_rx = connect(&fx, &peer).await;

        let message = fx
            .router
            .send("repair-1", MessageDraft::text("hello"), &sender)
            .await
            .unwrap();

        assert_eq!(message.status, DeliveryStatus::Sent);
        assert_eq!(message.metadata.read_by.len(), 1);
        assert_eq!(message.metadata.read_by[0].participant_id, sender.id);

        // push, not pull - both members received the message event
        assert!(matches!(
            sender_rx.try_recv().unwrap(),
            ServerEvent::Message { .. }
        ));
        assert!(matches!(
            peer_rx.try_recv().unwrap(),
            ServerEvent::Message { .. }
        ));
    }

    #[tokio::test]
    async fn test_send_preserves_order() {
        let fx = fixture();
        let sender = Participant::new(Uuid::new_v4(), "A", ParticipantRole::Customer);
        fx.rooms.get_or_create("repair-1", &sender, seed).await;

        for i in 0..4 {
            fx.router
                .send("repair-1", MessageDraft::text(format!("m{i}")), &sender)
                .await
                .unwrap();
        }

        let history = fx.rooms.history("repair-1", 10).await.unwrap();
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m0", "m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn test_send_notifies_offline_member_exactly_once() {
        let fx = fixture();
        let sender = Participant::new(Uuid::new_v4(), "A", ParticipantRole::Customer);
        let offline = Participant::new(Uuid::new_v4(), "B", ParticipantRole::Technician);
        fx.rooms.get_or_create("repair-1", &sender, seed).await;
        fx.rooms
            .add_participant("repair-1", &offline)
            .await
            .unwrap();

        let _sender_rx = connect(&fx, &sender).await;
        let _offline_rx = connect(&fx, &offline).await;
        fx.registry.mark_offline(&offline.id).await;

        fx.router
            .send("repair-1", MessageDraft::text("anyone there?"), &sender)
            .await
            .unwrap();

        // dispatch is spawned; give it a tick to run
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let calls = fx.push.calls.lock().await;
        assert_eq!(calls.as_slice(), &[offline.id]);
    }

    #[tokio::test]
    async fn test_mark_read_broadcasts_once_per_reader() {
        let fx = fixture();
        let sender = Participant::new(Uuid::new_v4(), "A", ParticipantRole::Customer);
        let reader = Participant::new(Uuid::new_v4(), "B", ParticipantRole::Technician);
        fx.rooms.get_or_create("repair-1", &sender, seed).await;
        fx.rooms.add_participant("repair-1", &reader).await.unwrap();

        let mut sender_rx = connect(&fx, &sender).await;
        let _reader_rx = connect(&fx, &reader).await;

        let message = fx
            .router
            .send("repair-1", MessageDraft::text("hello"), &sender)
            .await
            .unwrap();
        // drain the message event
        let _ = sender_rx.try_recv();

        fx.router
            .mark_read("repair-1", &message.id, &reader.id)
            .await
            .unwrap();
        fx.router
            .mark_read("repair-1", &message.id, &reader.id)
            .await
            .unwrap();

        // exactly one read event despite two calls
        assert!(matches!(
            sender_rx.try_recv().unwrap(),
            ServerEvent::MessageRead { .. }
        ));
        assert!(sender_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_mark_read_unknown_message_is_silent() {
        let fx = fixture();
        let sender = Participant::new(Uuid::new_v4(), "A", ParticipantRole::Customer);
        fx.rooms.get_or_create("repair-1", &sender, seed).await;

        fx.router
            .mark_read("repair-1", &Uuid::new_v4(), &sender.id)
            .await
            .unwrap();
    }
}
