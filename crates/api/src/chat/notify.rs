//! Offline push notification dispatch
//!
//! Identifies room members without a live connection and hands a truncated
//! message preview to an external push collaborator. Fire-and-forget:
//! failures are logged, never retried, never surfaced to the sender.

use std::sync::Arc;

use async_trait::async_trait;
use fixchat_shared::{ChatError, Message, Participant};

use super::registry::ParticipantRegistry;
use super::rooms::RoomStore;

/// External push notification collaborator
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send_push(
        &self,
        recipient: &Participant,
        room_id: &str,
        preview: &str,
    ) -> Result<(), ChatError>;
}

/// Webhook-backed push sender
///
/// Posts a JSON payload to a configured webhook URL. When no URL is
/// configured the sender is a logged no-op.
pub struct WebhookPushSender {
    webhook_url: Option<String>,
    client: reqwest::Client,
}

impl WebhookPushSender {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            webhook_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PushSender for WebhookPushSender {
    async fn send_push(
        &self,
        recipient: &Participant,
        room_id: &str,
        preview: &str,
    ) -> Result<(), ChatError> {
        let Some(ref webhook_url) = self.webhook_url else {
            tracing::warn!("Push webhook URL not configured, skipping notification");
            return Ok(());
        };

        let payload = serde_json::json!({
            "user_id": recipient.id,
            "user_name": recipient.name,
            "room_id": room_id,
            "preview": preview,
        });

        let response = self
            .client
            .post(webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChatError::PushNotificationFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(ChatError::PushNotificationFailed(format!(
                "webhook returned {status}"
            )));
        }

        Ok(())
    }
}

/// Fans a message out to a room's offline members via the push collaborator
pub struct NotificationDispatcher {
    rooms: Arc<RoomStore>,
    registry: Arc<ParticipantRegistry>,
    push: Arc<dyn PushSender>,
    preview_max_chars: usize,
}

impl NotificationDispatcher {
    pub fn new(
        rooms: Arc<RoomStore>,
        registry: Arc<ParticipantRegistry>,
        push: Arc<dyn PushSender>,
        preview_max_chars: usize,
    ) -> Self {
        Self {
            rooms,
            registry,
            push,
            preview_max_chars,
        }
    }

    /// Push a preview of `message` to every room member who is offline or
    /// entirely unregistered; best-effort, errors are logged and swallowed
    pub async fn notify_offline(&self, room_id: &str, message: &Message) {
        let room = match self.rooms.get(room_id).await {
            Ok(room) => room,
            Err(e) => {
                tracing::warn!(room_id = %room_id, error = %e, "Skipping offline notify");
                return;
            }
        };

        let preview = truncate_preview(&message.content, self.preview_max_chars);

        for member in &room.participants {
            if member.id == message.sender.id {
                continue;
            }
            if self.registry.is_online(&member.id).await {
                continue;
            }

            match self.push.send_push(member, room_id, &preview).await {
                Ok(()) => {
                    tracing::debug!(
                        user_id = %member.id,
                        room_id = %room_id,
                        "Push notification sent"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %member.id,
                        room_id = %room_id,
                        error = %e,
                        "Push notification failed"
                    );
                }
            }
        }
    }
}

/// Truncate on a char boundary and append an ellipsis when cut
fn truncate_preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let cut: String = content.chars().take(max_chars).collect();
    format!("{cut}…")
}
