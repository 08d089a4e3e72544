//! WebSocket message handlers.
//!
//! Each connection behaves like one browser tab: it has its own chat queue
//! and current view, while the session itself is shared.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::chat::{ChatEvent, MessageQueue};
use crate::error::ServiceError;
use crate::service::GreeniteService;

use super::messages::{ClientMessage, ServerMessage, View};

/// Handle a WebSocket connection
///
/// Manages the connection lifecycle, processes incoming messages, and
/// forwards outgoing messages and chat events.
pub async fn handle_ws_connection(socket: WebSocket, service: Arc<GreeniteService>) {
    let connection_id = uuid::Uuid::new_v4().to_string();
    let ws_manager = service.ws_manager.clone();
    info!(connection_id = %connection_id, "New WebSocket connection");

    // Split the socket into sender and receiver
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Create a channel for sending messages to this connection
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<ServerMessage>();
    ws_manager.add_connection(connection_id.clone(), msg_tx);

    // Spawn task to forward messages from channel to WebSocket
    let send_connection_id = connection_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_tx.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to serialize WebSocket message");
                }
            }
        }
        debug!(connection_id = %send_connection_id, "WebSocket send task ended");
    });

    // Chat events from this connection's queue go out as server messages
    let (chat_tx, mut chat_rx) = mpsc::unbounded_channel::<ChatEvent>();
    let queue = service.open_chat(chat_tx);
    let chat_connection_id = connection_id.clone();
    let chat_manager = ws_manager.clone();
    let chat_task = tokio::spawn(async move {
        while let Some(event) = chat_rx.recv().await {
            chat_manager.send_to(&chat_connection_id, event.into());
        }
    });

    // Process incoming messages
    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_client_message(&connection_id, &text, &service, &queue);
            }
            Ok(Message::Binary(data)) => {
                // Try to parse binary as JSON text
                if let Ok(text) = String::from_utf8(data.to_vec()) {
                    handle_client_message(&connection_id, &text, &service, &queue);
                }
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // axum answers pings itself
            }
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "WebSocket connection closed by client");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Clean up; queued chat messages are dropped with the connection
    queue.cancel();
    ws_manager.remove_connection(&connection_id);
    chat_task.abort();
    send_task.abort();
    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Handle a client message
pub(crate) fn handle_client_message(
    connection_id: &str,
    text: &str,
    service: &Arc<GreeniteService>,
    queue: &Arc<MessageQueue>,
) {
    let ws_manager = &service.ws_manager;

    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(
                connection_id = %connection_id,
                error = %e,
                "Failed to parse client message"
            );
            ws_manager.send_to(
                connection_id,
                ServerMessage::Error {
                    code: "parse_error".to_string(),
                    message: format!("Failed to parse message: {}", e),
                    recoverable: true,
                },
            );
            return;
        }
    };

    let result = match msg {
        ClientMessage::Login { email, password } => {
            service.handle_login(&email, &password).map(|outcome| {
                let success = outcome.success;
                ws_manager.send_to(connection_id, ServerMessage::LoginResponse { outcome });
                if success {
                    ws_manager.redirect(connection_id, View::Chat);
                }
            })
        }
        ClientMessage::Logout => service.sessions.logout().map(|()| {
            ws_manager.send_to(
                connection_id,
                ServerMessage::LoggedOut {
                    message: Some(service.i18n.get("en", "auth-logged-out", None)),
                },
            );
            ws_manager.redirect(connection_id, View::Login);
        }),
        ClientMessage::Navigate { view } => navigate(connection_id, view, service),
        ClientMessage::ChatMessage { message } => {
            service.sessions.is_authenticated().map(|authenticated| {
                if authenticated {
                    queue.enqueue(&message);
                } else {
                    ws_manager.send_to(
                        connection_id,
                        ServerMessage::Error {
                            code: "not_authenticated".to_string(),
                            message: service.i18n.get("en", "error-not-authenticated", None),
                            recoverable: false,
                        },
                    );
                    ws_manager.redirect(connection_id, View::Login);
                }
            })
        }
        ClientMessage::Ping => {
            ws_manager.send_to(
                connection_id,
                ServerMessage::Pong {
                    timestamp: service.clock.now_ms(),
                },
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        send_error(connection_id, service, e);
    }
}

/// Gated views need a live session; anything else goes back to login
fn navigate(
    connection_id: &str,
    view: View,
    service: &GreeniteService,
) -> Result<(), ServiceError> {
    let allowed = !view.is_gated() || service.sessions.is_authenticated()?;
    let target = if allowed { view } else { View::Login };
    service.ws_manager.redirect(connection_id, target);
    Ok(())
}

fn send_error(connection_id: &str, service: &GreeniteService, error: ServiceError) {
    error!(connection_id = %connection_id, error = %error, "WebSocket request failed");
    service.ws_manager.send_to(
        connection_id,
        ServerMessage::Error {
            code: error.error_code().to_string(),
            message: error.user_message(&service.i18n, "en"),
            recoverable: true,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::LoginOutcome;
    use crate::service::test_support::test_service;

    #[test]
    fn test_client_message_deserialization() {
        let login_json = r#"{"type":"login","email":"a@b.co","password":"secret1"}"#;
        let msg: ClientMessage = serde_json::from_str(login_json).unwrap();
        match msg {
            ClientMessage::Login { email, password } => {
                assert_eq!(email, "a@b.co");
                assert_eq!(password, "secret1");
            }
            _ => panic!("Expected Login message"),
        }

        let ping_json = r#"{"type":"ping"}"#;
        let msg: ClientMessage = serde_json::from_str(ping_json).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));

        let logout_json = r#"{"type":"logout"}"#;
        let msg: ClientMessage = serde_json::from_str(logout_json).unwrap();
        assert!(matches!(msg, ClientMessage::Logout));

        let nav_json = r#"{"type":"navigate","view":"badges"}"#;
        let msg: ClientMessage = serde_json::from_str(nav_json).unwrap();
        assert!(matches!(msg, ClientMessage::Navigate { view: View::Badges }));

        let chat_json = r#"{"type":"chat_message","message":"Hello"}"#;
        let msg: ClientMessage = serde_json::from_str(chat_json).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::ChatMessage { message } if message == "Hello"
        ));

        let bad_view = r#"{"type":"navigate","view":"admin"}"#;
        assert!(serde_json::from_str::<ClientMessage>(bad_view).is_err());
    }

    #[test]
    fn test_server_message_serialization() {
        let response = ServerMessage::LoginResponse {
            outcome: LoginOutcome {
                success: false,
                message: Some("Invalid credentials".to_string()),
                code: Some("invalid_credentials"),
                user: None,
                session_id: None,
            },
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""type":"login_response""#));
        assert!(json.contains(r#""success":false"#));
        assert!(json.contains(r#""code":"invalid_credentials""#));
        assert!(!json.contains("sessionId")); // should be skipped when None

        let redirect = ServerMessage::Redirect { view: View::Login };
        let json = serde_json::to_string(&redirect).unwrap();
        assert_eq!(json, r#"{"type":"redirect","view":"login"}"#);

        let thinking: ServerMessage = ChatEvent::ThinkingShown.into();
        let json = serde_json::to_string(&thinking).unwrap();
        assert_eq!(json, r#"{"type":"thinking","visible":true}"#);

        let unlocked: ServerMessage = ChatEvent::InputUnlocked.into();
        let json = serde_json::to_string(&unlocked).unwrap();
        assert_eq!(json, r#"{"type":"input_locked","locked":false}"#);

        let logged_out = ServerMessage::LoggedOut { message: None };
        let json = serde_json::to_string(&logged_out).unwrap();
        assert_eq!(json, r#"{"type":"logged_out"}"#);
    }

    fn connect(
        service: &Arc<GreeniteService>,
    ) -> (
        Arc<MessageQueue>,
        mpsc::UnboundedReceiver<ServerMessage>,
        mpsc::UnboundedReceiver<ChatEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        service.ws_manager.add_connection("conn".to_string(), tx);
        let (chat_tx, chat_rx) = mpsc::unbounded_channel();
        (service.open_chat(chat_tx), rx, chat_rx)
    }

    #[tokio::test]
    async fn test_gated_view_requires_session() {
        let (service, _clock) = test_service();
        let (queue, mut rx, _chat_rx) = connect(&service);

        handle_client_message("conn", r#"{"type":"navigate","view":"play"}"#, &service, &queue);
        assert!(matches!(
            rx.try_recv(),
            Ok(ServerMessage::Redirect { view: View::Login })
        ));

        let login = r#"{"type":"login","email":"adminITE@user.com.sg","password":"admin1234"}"#;
        handle_client_message("conn", login, &service, &queue);
        assert!(matches!(
            rx.try_recv(),
            Ok(ServerMessage::LoginResponse { outcome }) if outcome.success
        ));
        assert!(matches!(
            rx.try_recv(),
            Ok(ServerMessage::Redirect { view: View::Chat })
        ));

        handle_client_message("conn", r#"{"type":"navigate","view":"play"}"#, &service, &queue);
        assert_eq!(service.ws_manager.view_of("conn"), Some(View::Play));
    }

    #[tokio::test]
    async fn test_chat_requires_session() {
        let (service, _clock) = test_service();
        let (queue, mut rx, _chat_rx) = connect(&service);

        handle_client_message("conn", r#"{"type":"chat_message","message":"hi"}"#, &service, &queue);

        assert!(matches!(
            rx.try_recv(),
            Ok(ServerMessage::Error { code, .. }) if code == "not_authenticated"
        ));
        assert!(!queue.is_processing());
    }

    #[tokio::test]
    async fn test_malformed_message_reports_parse_error() {
        let (service, _clock) = test_service();
        let (queue, mut rx, _chat_rx) = connect(&service);

        handle_client_message("conn", "not json", &service, &queue);

        assert!(matches!(
            rx.try_recv(),
            Ok(ServerMessage::Error { code, recoverable: true, .. }) if code == "parse_error"
        ));
    }
}
