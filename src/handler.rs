//! WebSocket connection handler
//!
//! Handles individual client connections: WebSocket handshake, request
//! parsing, and dispatching each request to the shared `Hub`.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, HubError};
use crate::hub::Hub;
use crate::message::{Request, Response};

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake and answers each text frame with one
/// response frame until the peer closes. Sessions are token-based and
/// outlive the connection.
pub async fn handle_connection(stream: TcpStream, hub: Arc<Hub>) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    info!("Connection from {} established", peer_addr);

    while let Some(msg_result) = ws_receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let response = match serde_json::from_str::<Request>(&text) {
                    Ok(request) => handle_request(&hub, request),
                    Err(e) => {
                        warn!("Invalid JSON from {}: {}", peer_addr, e);
                        Response::invalid_message(&e)
                    }
                };
                let json = serde_json::to_string(&response)?;
                ws_sender.send(Message::Text(json.into())).await?;
            }
            Ok(Message::Close(_)) => {
                debug!("{} sent close frame", peer_addr);
                break;
            }
            Ok(Message::Ping(_)) => {
                // Pong is handled automatically by tungstenite
                debug!("Ping from {}", peer_addr);
            }
            Ok(_) => {
                // Binary or other message types - ignore
            }
            Err(e) => {
                error!("WebSocket error for {}: {}", peer_addr, e);
                break;
            }
        }
    }

    let _ = ws_sender.close().await;
    info!("Connection from {} closed", peer_addr);

    Ok(())
}

/// Execute one request against the hub
pub fn handle_request(hub: &Hub, request: Request) -> Response {
    execute(hub, request).unwrap_or_else(Response::from)
}

fn execute(hub: &Hub, request: Request) -> Result<Response, HubError> {
    let response = match request {
        Request::Login { username } => {
            let username = require(username, "username")?;
            let token = hub.login(&username)?;
            Response::LoggedIn { username, token }
        }
        Request::Logout { token } => {
            hub.logout(&require(token, "token")?);
            Response::LoggedOut
        }
        Request::ListUsers => Response::Users {
            usernames: hub.list_users(),
        },
        Request::Send {
            token,
            username,
            chatroom_id,
            text,
        } => {
            let token = require(token, "token")?;
            let text = require(text, "text")?;
            let delivered = match (chatroom_id, username) {
                (Some(chatroom_id), _) => hub.send_group(&token, chatroom_id, &text)?,
                (None, Some(username)) => hub.send_direct(&token, &username, &text)?,
                (None, None) => return Err(HubError::MissingParameter("username or chatroom_id")),
            };
            Response::Sent { delivered }
        }
        Request::Poll { token } => Response::Messages {
            messages: hub.poll(&require(token, "token")?)?,
        },
        Request::ListChatrooms => Response::Chatrooms {
            chatrooms: hub.list_chatrooms(),
        },
        Request::CreateChatroom {
            token,
            name,
            members,
        } => {
            let token = require(token, "token")?;
            let name = require(name, "name")?;
            let members = require(members, "members")?;
            Response::ChatroomCreated {
                chatroom_id: hub.create_chatroom(&token, &name, &members)?,
            }
        }
        Request::JoinChatroom { token, chatroom_id } => {
            let token = require(token, "token")?;
            let chatroom_id = require(chatroom_id, "chatroom_id")?;
            Response::Members {
                chatroom_id,
                members: hub.join_chatroom(&token, chatroom_id)?,
            }
        }
        Request::LeaveChatroom { token, chatroom_id } => {
            let token = require(token, "token")?;
            let chatroom_id = require(chatroom_id, "chatroom_id")?;
            hub.leave_chatroom(&token, chatroom_id)?;
            Response::LeftChatroom { chatroom_id }
        }
        Request::DeleteChatroom { token, chatroom_id } => {
            let token = require(token, "token")?;
            let chatroom_id = require(chatroom_id, "chatroom_id")?;
            hub.delete_chatroom(&token, chatroom_id)?;
            Response::ChatroomDeleted { chatroom_id }
        }
        Request::ListMembers { token, chatroom_id } => {
            let token = require(token, "token")?;
            let chatroom_id = require(chatroom_id, "chatroom_id")?;
            Response::Members {
                chatroom_id,
                members: hub.list_members(&token, chatroom_id)?,
            }
        }
    };
    Ok(response)
}

fn require<T>(value: Option<T>, name: &'static str) -> Result<T, HubError> {
    value.ok_or(HubError::MissingParameter(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ErrorCode;
    use crate::types::{ChatroomId, Token};

    fn parse(json: &str) -> Request {
        serde_json::from_str(json).unwrap()
    }

    fn login(hub: &Hub, username: &str) -> Token {
        match handle_request(hub, Request::Login {
            username: Some(username.to_string()),
        }) {
            Response::LoggedIn { token, .. } => token,
            other => panic!("Unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_missing_parameter() {
        let hub = Hub::new();
        let resp = handle_request(&hub, parse(r#"{"type": "poll"}"#));
        match resp {
            Response::Error { code, message } => {
                assert_eq!(code, ErrorCode::MissingParameter);
                assert!(message.contains("token"));
            }
            other => panic!("Unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_send_without_target() {
        let hub = Hub::new();
        let token = login(&hub, "alice");
        let resp = handle_request(
            &hub,
            Request::Send {
                token: Some(token),
                username: None,
                chatroom_id: None,
                text: Some("hi".to_string()),
            },
        );
        assert!(matches!(
            resp,
            Response::Error {
                code: ErrorCode::MissingParameter,
                ..
            }
        ));
    }

    #[test]
    fn test_send_and_poll() {
        let hub = Hub::new();
        let alice = login(&hub, "alice");
        let bob = login(&hub, "bob");

        let resp = handle_request(
            &hub,
            Request::Send {
                token: Some(alice),
                username: Some("bob".to_string()),
                chatroom_id: None,
                text: Some("hi".to_string()),
            },
        );
        assert!(matches!(resp, Response::Sent { delivered: true }));

        match handle_request(&hub, Request::Poll { token: Some(bob) }) {
            Response::Messages { messages } => {
                assert_eq!(messages.len(), 1);
                assert_eq!(messages[0].from, "alice");
            }
            other => panic!("Unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_chatroom_lifecycle() {
        let hub = Hub::new();
        let alice = login(&hub, "alice");
        login(&hub, "bob");

        let resp = handle_request(
            &hub,
            Request::CreateChatroom {
                token: Some(alice.clone()),
                name: Some("team".to_string()),
                members: Some(vec!["bob".to_string()]),
            },
        );
        let Response::ChatroomCreated { chatroom_id } = resp else {
            panic!("Unexpected response: {:?}", resp);
        };
        assert_eq!(chatroom_id, ChatroomId(1));

        match handle_request(&hub, Request::ListChatrooms) {
            Response::Chatrooms { chatrooms } => {
                assert_eq!(chatrooms.len(), 1);
                assert_eq!(chatrooms[0].members, vec!["bob"]);
                assert_eq!(chatrooms[0].creator, "alice");
            }
            other => panic!("Unexpected response: {:?}", other),
        }

        let resp = handle_request(
            &hub,
            Request::DeleteChatroom {
                token: Some(alice),
                chatroom_id: Some(chatroom_id),
            },
        );
        assert!(matches!(resp, Response::ChatroomDeleted { .. }));
        assert!(hub.list_chatrooms().is_empty());
    }

    #[test]
    fn test_hub_error_mapped() {
        let hub = Hub::new();
        let resp = handle_request(
            &hub,
            Request::JoinChatroom {
                token: Some(Token::from("bogus")),
                chatroom_id: Some(ChatroomId(1)),
            },
        );
        assert!(matches!(
            resp,
            Response::Error {
                code: ErrorCode::InvalidToken,
                ..
            }
        ));
    }
}
