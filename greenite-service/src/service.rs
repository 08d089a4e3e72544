mod login;
mod workers;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::activity::ActionLog;
use crate::auth::{RateLimiter, SessionManager};
use crate::chat::{ChatEvent, MessageQueue, Responder, TopicResponder};
use crate::clock::{Clock, SystemClock};
use crate::config::RuntimeConfig;
use crate::db::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::i18n::I18n;
use crate::websocket::WebSocketManager;

/// Main service coordinator
///
/// Built once at startup; every component shares the same store and clock.
pub struct GreeniteService {
    pub runtime_config: Arc<RuntimeConfig>,
    pub db: Arc<Database>,
    pub i18n: Arc<I18n>,
    pub clock: Arc<dyn Clock>,
    pub sessions: SessionManager,
    pub rate_limiter: RateLimiter,
    pub actions: ActionLog,
    pub responder: Arc<dyn Responder>,
    pub ws_manager: Arc<WebSocketManager>,
    /// Set once the liveness worker has been spawned
    liveness_started: AtomicBool,
}

impl GreeniteService {
    /// Create a new service instance
    /// Accepts a pre-opened database so that RuntimeConfig can load settings from it
    pub fn new(db: Arc<Database>, runtime_config: Arc<RuntimeConfig>) -> Self {
        Self::with_clock(db, runtime_config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        db: Arc<Database>,
        runtime_config: Arc<RuntimeConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        info!("Initializing GreenITE service");

        let i18n = Arc::new(I18n::new());
        let sessions = SessionManager::new(db.clone(), clock.clone(), runtime_config.clone());
        let rate_limiter = RateLimiter::new(db.clone(), clock.clone());
        let actions = ActionLog::new(db.clone(), clock.clone());
        let responder: Arc<dyn Responder> = Arc::new(TopicResponder::new(i18n.clone(), "en"));

        // A session left over from an earlier run may already be stale
        match sessions.is_authenticated() {
            Ok(true) => info!("Resuming existing session"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Failed to check stored session"),
        }

        Self {
            runtime_config,
            db,
            i18n,
            clock,
            sessions,
            rate_limiter,
            actions,
            responder,
            ws_manager: Arc::new(WebSocketManager::new()),
            liveness_started: AtomicBool::new(false),
        }
    }

    /// Chat queue for one client connection, reporting to `events`
    pub fn open_chat(&self, events: mpsc::UnboundedSender<ChatEvent>) -> Arc<MessageQueue> {
        MessageQueue::new(
            self.responder.clone(),
            self.clock.clone(),
            self.runtime_config.clone(),
            events,
        )
    }

    /// Fail with `NotAuthenticated` unless the session is live
    pub fn require_session(&self) -> ServiceResult<()> {
        if self.sessions.is_authenticated()? {
            Ok(())
        } else {
            Err(ServiceError::NotAuthenticated)
        }
    }

    /// Update settings and hot-reload the dynamic config.
    ///
    /// The store rejects the whole batch if any key is unknown or any value
    /// falls outside its range; nothing is written in that case.
    pub fn update_settings(&self, updates: HashMap<String, serde_json::Value>) -> ServiceResult<()> {
        self.db.set_settings(updates)?;

        // Components read the dynamic config on every operation, so a swap is enough
        self.runtime_config.reload_from_db(&self.db)?;

        info!("Settings updated");
        Ok(())
    }
}
