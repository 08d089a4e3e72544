//! Background session liveness check.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::ServiceResult;
use crate::service::GreeniteService;
use crate::websocket::{ServerMessage, View};

const MIN_LIVENESS_INTERVAL: Duration = Duration::from_secs(1);

impl GreeniteService {
    /// Start the session liveness worker
    /// Only the first call spawns a task; later calls return false
    pub fn start_liveness_worker(service: Arc<GreeniteService>) -> bool {
        if service.liveness_started.swap(true, Ordering::SeqCst) {
            debug!("Session liveness worker already running");
            return false;
        }

        let period = service
            .runtime_config
            .dynamic()
            .auth
            .liveness_interval()
            .max(MIN_LIVENESS_INTERVAL);

        tokio::spawn(async move {
            info!(period_secs = period.as_secs(), "Session liveness worker started");
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = service.check_liveness() {
                    error!(error = %e, "Session liveness check failed");
                }
            }
        });

        true
    }

    /// Force every connection on a gated view back to login when the session
    /// is gone. Returns how many connections were redirected.
    pub fn check_liveness(&self) -> ServiceResult<usize> {
        let gated = self.ws_manager.gated_connections();
        if gated.is_empty() {
            return Ok(0);
        }

        if self.sessions.is_authenticated()? {
            return Ok(0);
        }

        self.sessions.logout()?;
        let message = self.i18n.get("en", "auth-session-expired", None);
        for connection_id in &gated {
            self.ws_manager.send_to(
                connection_id,
                ServerMessage::LoggedOut {
                    message: Some(message.clone()),
                },
            );
            self.ws_manager.redirect(connection_id, View::Login);
        }

        info!(redirected = gated.len(), "Session gone, gated views sent to login");
        Ok(gated.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::test_service;
    use tokio::sync::mpsc;

    const EMAIL: &str = "adminITE@user.com.sg";
    const PASSWORD: &str = "admin1234";

    #[test]
    fn test_login_view_is_not_checked() {
        let (service, clock) = test_service();
        let (tx, _rx) = mpsc::unbounded_channel();
        service.ws_manager.add_connection("conn".to_string(), tx);

        service.handle_login(EMAIL, PASSWORD).unwrap();
        clock.advance(Duration::from_secs(31 * 60));

        assert_eq!(service.check_liveness().unwrap(), 0);
        // Nobody looked, so the stale record is still there
        assert!(service.sessions.current_user().unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_redirects_gated_views_once() {
        let (service, clock) = test_service();
        let (tx, mut rx) = mpsc::unbounded_channel();
        service.ws_manager.add_connection("conn".to_string(), tx);

        service.handle_login(EMAIL, PASSWORD).unwrap();
        service.ws_manager.set_view("conn", View::Chat);

        assert!(GreeniteService::start_liveness_worker(service.clone()));
        assert!(!GreeniteService::start_liveness_worker(service.clone()));

        // Still valid at the first check
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(rx.try_recv().is_err());

        clock.advance(Duration::from_secs(31 * 60));
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(matches!(
            rx.try_recv(),
            Ok(ServerMessage::LoggedOut { message: Some(_) })
        ));
        assert!(matches!(
            rx.try_recv(),
            Ok(ServerMessage::Redirect { view: View::Login })
        ));
        // A second worker would have produced a duplicate pair
        assert!(rx.try_recv().is_err());
        assert!(!service.sessions.is_authenticated().unwrap());
        assert_eq!(service.ws_manager.view_of("conn"), Some(View::Login));
    }
}
