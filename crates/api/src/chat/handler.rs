//! WebSocket handler for Axum
//!
//! The session gateway: upgrades connections, drives the per-connection
//! event loop and wires the stores, router, advisor and dispatcher together.
//! Every component error is reported only to the requesting connection and
//! never terminates it.

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::StreamExt, SinkExt};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use uuid::Uuid;

use fixchat_shared::{
    AiSuggestion, CallSession, ChatError, DeliveryStatus, Message, MessageDraft, MessageKind,
    MessageMetadata, Participant, ParticipantRole, PresenceStatus, ReadReceipt, RoomKind,
    RoomMetadata, RoomSeed,
};

use crate::state::AppState;

use super::{
    connection::Connection,
    events::{ClientEvent, ServerEvent},
    state::ChatState,
};

/// Synthetic participant id for the repair assistant; never registered in
/// the participant registry
const AI_ASSISTANT_ID: Uuid = Uuid::from_u128(0xa1a5_5157_0000_4000_8000_0000_0000_0001);

/// WebSocket handler - upgrades HTTP connection to WebSocket
///
/// Identity arrives in-band via the `authenticate` event, so the upgrade
/// itself is unconditional.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state.chat.clone()))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, chat: ChatState) {
    let (mut sender, mut receiver) = socket.split();

    // Create channel for sending events to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let conn = chat.add_connection(Connection::new(tx)).await;
    let session_id = conn.session_id;

    // Send connection acknowledgment
    let _ = conn.send(ServerEvent::Connected { session_id });

    // Spawn task to send messages to client
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(WsMessage::Text(json)).await.is_err() {
                        break; // Connection closed
                    }
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Failed to serialize WebSocket event");
                }
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = receiver.next().await {
        if let Ok(msg) = msg {
            match msg {
                WsMessage::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => {
                        handle_client_event(event, Arc::clone(&conn), chat.clone()).await;
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = ?e,
                            message = %text,
                            "Failed to parse client event"
                        );
                        let _ = conn.send(ServerEvent::Error {
                            message: "Invalid event format".to_string(),
                        });
                    }
                },
                WsMessage::Close(_) => {
                    tracing::info!(session_id = %session_id, "WebSocket close frame received");
                    break;
                }
                WsMessage::Ping(_) | WsMessage::Pong(_) => {
                    // Axum handles ping/pong automatically
                }
                _ => {} // Ignore binary messages
            }
        }
    }

    // Cleanup on disconnect
    tracing::info!(session_id = %session_id, "WebSocket connection closing");
    cleanup_connection(&conn, &chat).await;

    send_task.abort();
}

/// Terminal transition: mark offline, purge typing entries, broadcast
/// presence
pub(crate) async fn cleanup_connection(conn: &Arc<Connection>, chat: &ChatState) {
    chat.remove_connection(&conn.session_id).await;

    let Some(user) = conn.participant().await else {
        return;
    };

    for room_id in conn.subscriptions().await {
        chat.typing.clear_participant(&room_id, &user.name).await;
    }

    // A newer connection for the same user owns presence (last-connect-wins)
    let still_live = chat
        .registry
        .connection_for(&user.id)
        .await
        .map(|live| live.session_id != conn.session_id)
        .unwrap_or(false);
    if !still_live {
        chat.registry.mark_offline(&user.id).await;
    }

    chat.broadcast_all(ServerEvent::UserStatusUpdate {
        users: chat.registry.all_online().await,
    })
    .await;
}

/// Handle client event
pub(crate) async fn handle_client_event(event: ClientEvent, conn: Arc<Connection>, chat: ChatState) {
    use ClientEvent::*;

    match event {
        Authenticate {
            user_id,
            user_role,
            repair_ticket_id,
        } => {
            authenticate(&chat, &conn, user_id, &user_role, repair_ticket_id).await;
        }

        Ping => {
            let _ = conn.send(ServerEvent::Pong);
            if let Some(user) = conn.participant().await {
                chat.registry
                    .set_status(&user.id, PresenceStatus::Online)
                    .await;
            }
        }

        JoinRepairChat { repair_ticket_id } => {
            let Some(user) = require_participant(&conn).await else {
                return;
            };
            join_repair_room(&chat, &conn, &user, repair_ticket_id).await;
        }

        SendMessage { room_id, message } => {
            let Some(user) = require_participant(&conn).await else {
                return;
            };
            if let Err(e) = chat.router.send(&room_id, message, &user).await {
                report(&conn, e);
            }
        }

        Typing { room_id, is_typing } => {
            let Some(user) = require_participant(&conn).await else {
                return;
            };
            // The disconnect purge walks this connection's subscriptions, so
            // every room a typing entry can land in must be recorded here.
            // Membership via create_room's invite list does not subscribe.
            if is_typing {
                conn.subscribe(&room_id).await;
            }
            chat.typing.set_typing(&room_id, &user.name, is_typing).await;
            chat.router
                .broadcast_except(
                    &room_id,
                    &user.id,
                    ServerEvent::Typing {
                        room_id: room_id.clone(),
                        user_id: user.id,
                        user_name: user.name.clone(),
                        is_typing,
                    },
                )
                .await;
        }

        MarkRead {
            room_id,
            message_id,
        } => {
            let Some(user) = require_participant(&conn).await else {
                return;
            };
            if let Err(e) = chat.router.mark_read(&room_id, &message_id, &user.id).await {
                report(&conn, e);
            }
        }

        RequestAiAssistance {
            room_id,
            repair_ticket_id: _,
            context: _,
            request_type,
        } => {
            let Some(_user) = require_participant(&conn).await else {
                return;
            };
            request_ai_assistance(&chat, &conn, &room_id, &request_type).await;
        }

        StartVideoCall { room_id, call_type } => {
            let Some(user) = require_participant(&conn).await else {
                return;
            };
            start_video_call(&chat, &conn, &user, &room_id, &call_type).await;
        }

        ShareFile { room_id, file } => {
            let Some(user) = require_participant(&conn).await else {
                return;
            };
            let draft = MessageDraft {
                content: file.name.clone(),
                kind: MessageKind::File,
                attachments: vec![file],
            };
            if let Err(e) = chat.router.send(&room_id, draft, &user).await {
                report(&conn, e);
            }
        }

        CreateRoom {
            name,
            kind,
            participants,
        } => {
            let Some(user) = require_participant(&conn).await else {
                return;
            };
            create_room(&chat, &conn, &user, name, kind, participants).await;
        }

        LeaveRoom { room_id } => {
            let Some(user) = require_participant(&conn).await else {
                return;
            };
            leave_room(&chat, &conn, &user, &room_id).await;
        }
    }
}

/// Report a component error to the requesting connection only
fn report(conn: &Arc<Connection>, error: ChatError) {
    let _ = conn.send(ServerEvent::Error {
        message: error.to_string(),
    });
}

/// Require the connection to be authenticated; report otherwise
async fn require_participant(conn: &Arc<Connection>) -> Option<Participant> {
    match conn.participant().await {
        Some(p) => Some(p),
        None => {
            report(conn, ChatError::AuthenticationRequired);
            None
        }
    }
}

fn parse_role(role: &str) -> ParticipantRole {
    match role.to_lowercase().as_str() {
        "technician" => ParticipantRole::Technician,
        "admin" => ParticipantRole::Admin,
        "ai" => ParticipantRole::Ai,
        _ => ParticipantRole::Customer,
    }
}

fn ticket_room_id(ticket_id: &Uuid) -> String {
    format!("repair-{ticket_id}")
}

async fn authenticate(
    chat: &ChatState,
    conn: &Arc<Connection>,
    user_id: Uuid,
    user_role: &str,
    repair_ticket_id: Option<Uuid>,
) {
    let role = parse_role(user_role);
    let profile = chat.identity.resolve(user_id, role).await;

    let mut participant = Participant::new(user_id, profile.display_name, role);
    participant.avatar = profile.avatar;
    participant.expertise = profile.expertise;

    chat.registry
        .register(Arc::clone(conn), participant.clone())
        .await;
    conn.set_participant(participant.clone()).await;

    // Ticket join happens before the authentication ack
    if let Some(ticket_id) = repair_ticket_id {
        join_repair_room(chat, conn, &participant, ticket_id).await;
    }

    let rooms = chat.rooms.rooms_for(&user_id).await;
    let _ = conn.send(ServerEvent::Authenticated {
        user: participant,
        rooms,
    });

    chat.broadcast_all(ServerEvent::UserStatusUpdate {
        users: chat.registry.all_online().await,
    })
    .await;
}

async fn join_repair_room(
    chat: &ChatState,
    conn: &Arc<Connection>,
    user: &Participant,
    ticket_id: Uuid,
) {
    let room_id = ticket_room_id(&ticket_id);
    let room = chat
        .rooms
        .get_or_create(&room_id, user, || RoomSeed {
            name: format!("Repair #{}", &ticket_id.simple().to_string()[..8]),
            kind: RoomKind::Support,
            ticket_id: Some(ticket_id),
            metadata: RoomMetadata::default(),
        })
        .await;
    conn.subscribe(&room_id).await;

    // Existing members learn about the join; history goes to the joiner only
    chat.router
        .broadcast_except(
            &room_id,
            &user.id,
            ServerEvent::UserJoined {
                room: room.clone(),
                user: user.clone(),
            },
        )
        .await;

    let messages = chat
        .rooms
        .history(&room_id, chat.history_limit)
        .await
        .unwrap_or_default();
    let _ = conn.send(ServerEvent::RoomJoined { room, messages });
}

fn ai_participant() -> Participant {
    Participant::new(AI_ASSISTANT_ID, "Repair Assistant", ParticipantRole::Ai)
}

async fn request_ai_assistance(
    chat: &ChatState,
    conn: &Arc<Connection>,
    room_id: &str,
    request_type: &str,
) {
    let response = match chat.advisor.advise(room_id, request_type).await {
        Ok(response) => response,
        Err(e) => {
            report(conn, e);
            return;
        }
    };

    let assistant = ai_participant();
    if let Err(e) = chat.rooms.add_participant(room_id, &assistant).await {
        report(conn, e);
        return;
    }

    let now = OffsetDateTime::now_utc();
    let message = Message {
        id: Uuid::new_v4(),
        room_id: room_id.to_string(),
        sender: assistant.clone(),
        content: response.content.clone(),
        timestamp: now,
        kind: MessageKind::AiSuggestion,
        status: DeliveryStatus::Sent,
        metadata: MessageMetadata {
            read_by: vec![ReadReceipt {
                participant_id: assistant.id,
                read_at: now,
            }],
            attachments: Vec::new(),
            call: None,
            ai: Some(AiSuggestion {
                symptoms: response.symptoms.clone(),
                urgency: response.urgency,
                suggestions: response.suggestions.clone(),
                cost_estimate: response.cost_estimate.clone(),
            }),
        },
    };
    if let Err(e) = chat.router.route(room_id, message).await {
        report(conn, e);
        return;
    }

    if response.escalate {
        let notice = MessageDraft {
            content: "A human technician has been notified and will join this conversation shortly."
                .to_string(),
            kind: MessageKind::System,
            attachments: Vec::new(),
        };
        if let Err(e) = chat.router.send(room_id, notice, &assistant).await {
            report(conn, e);
        }
    }
}

async fn start_video_call(
    chat: &ChatState,
    conn: &Arc<Connection>,
    user: &Participant,
    room_id: &str,
    call_type: &str,
) {
    let call_id = Uuid::new_v4();
    let now = OffsetDateTime::now_utc();
    let message = Message {
        id: Uuid::new_v4(),
        room_id: room_id.to_string(),
        sender: user.clone(),
        content: format!("{} started a video call", user.name),
        timestamp: now,
        kind: MessageKind::VideoCall,
        status: DeliveryStatus::Sent,
        metadata: MessageMetadata {
            read_by: vec![ReadReceipt {
                participant_id: user.id,
                read_at: now,
            }],
            attachments: Vec::new(),
            call: Some(CallSession {
                call_id,
                call_type: call_type.to_string(),
                started_by: user.id,
            }),
            ai: None,
        },
    };

    if let Err(e) = chat.router.route(room_id, message).await {
        report(conn, e);
        return;
    }

    chat.router
        .broadcast_except(
            room_id,
            &user.id,
            ServerEvent::VideoCallInvitation {
                call_id,
                caller: user.clone(),
                call_type: call_type.to_string(),
                room_id: room_id.to_string(),
            },
        )
        .await;
}

async fn create_room(
    chat: &ChatState,
    conn: &Arc<Connection>,
    creator: &Participant,
    name: String,
    kind: RoomKind,
    participants: Vec<Uuid>,
) {
    let room_id = Uuid::new_v4().to_string();
    let mut room = chat
        .rooms
        .get_or_create(&room_id, creator, || RoomSeed {
            name,
            kind,
            ticket_id: None,
            metadata: RoomMetadata::default(),
        })
        .await;
    conn.subscribe(&room_id).await;

    for user_id in participants {
        // Unknown ids are skipped; they can join later by invitation
        if let Some(member) = chat.registry.lookup(&user_id).await {
            match chat.rooms.add_participant(&room_id, &member).await {
                Ok(updated) => room = updated,
                Err(e) => {
                    report(conn, e);
                    return;
                }
            }
        }
    }

    chat.router
        .broadcast(&room_id, ServerEvent::RoomCreated { room })
        .await;
}

async fn leave_room(
    chat: &ChatState,
    conn: &Arc<Connection>,
    user: &Participant,
    room_id: &str,
) {
    let room = match chat.rooms.remove_participant(room_id, &user.id).await {
        Ok(room) => room,
        Err(e) => {
            report(conn, e);
            return;
        }
    };
    conn.unsubscribe(room_id).await;
    chat.typing.clear_participant(room_id, &user.name).await;

    chat.router
        .broadcast(
            room_id,
            ServerEvent::UserLeft {
                room,
                user: user.clone(),
            },
        )
        .await;
}
