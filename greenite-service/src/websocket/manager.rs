//! WebSocket connection manager.
//!
//! Tracks every open connection and the view it is currently showing.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::messages::{ServerMessage, View};

/// State for a single WebSocket connection
pub(crate) struct ConnectionState {
    pub(crate) tx: mpsc::UnboundedSender<ServerMessage>,
    pub(crate) view: View,
}

/// Manager for all WebSocket connections
pub struct WebSocketManager {
    pub(crate) connections: DashMap<String, ConnectionState>,
}

impl Default for WebSocketManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSocketManager {
    /// Create a new WebSocket manager
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Add a new connection, starting on the login view
    pub(crate) fn add_connection(
        &self,
        connection_id: String,
        tx: mpsc::UnboundedSender<ServerMessage>,
    ) {
        debug!(connection_id = %connection_id, "Adding WebSocket connection");
        self.connections.insert(
            connection_id,
            ConnectionState {
                tx,
                view: View::Login,
            },
        );
    }

    /// Remove a connection
    pub(crate) fn remove_connection(&self, connection_id: &str) {
        debug!(connection_id = %connection_id, "Removing WebSocket connection");
        self.connections.remove(connection_id);
    }

    pub(crate) fn set_view(&self, connection_id: &str, view: View) {
        if let Some(mut conn) = self.connections.get_mut(connection_id) {
            conn.view = view;
            debug!(connection_id = %connection_id, view = %view, "Connection changed view");
        }
    }

    #[allow(dead_code)] // Useful for monitoring/debugging
    pub fn view_of(&self, connection_id: &str) -> Option<View> {
        self.connections.get(connection_id).map(|conn| conn.view)
    }

    /// Send a message to a specific connection
    pub fn send_to(&self, connection_id: &str, msg: ServerMessage) {
        if let Some(conn) = self.connections.get(connection_id)
            && conn.tx.send(msg).is_err()
        {
            warn!(connection_id = %connection_id, "Failed to send message to connection");
        }
    }

    /// Send the client to `view` and record the switch
    pub fn redirect(&self, connection_id: &str, view: View) {
        self.set_view(connection_id, view);
        self.send_to(connection_id, ServerMessage::Redirect { view });
    }

    /// Connections currently showing a view that needs a session
    pub fn gated_connections(&self) -> Vec<String> {
        self.connections
            .iter()
            .filter(|entry| entry.value().view.is_gated())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Get the number of active connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
