//! WebSocket support for login, navigation and chat.
//!
//! The client keeps one socket open per tab. Login results, chat turns,
//! pending-indicator and input-lock changes, and forced redirects all arrive
//! over it as tagged JSON messages.

mod handlers;
mod manager;
mod messages;

pub use handlers::handle_ws_connection;
pub use manager::WebSocketManager;
pub use messages::{ServerMessage, View};
