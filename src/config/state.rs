// Application state module
// Shared, read-only request context built once at start-up

use tokio::sync::watch;

use super::types::Config;
use crate::store::SharedStore;
use crate::users::UserRouter;

/// Application state
pub struct AppState {
    pub config: Config,
    pub users: UserRouter,
    access_log: bool,
    shutdown: watch::Sender<bool>,
}

impl AppState {
    /// Create `AppState` routing user requests to `store`
    pub fn new(config: &Config, store: SharedStore) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config: config.clone(),
            users: UserRouter::new(store, config.store.table.clone()),
            access_log: config.logging.access_log,
            shutdown,
        }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.access_log
    }

    /// Tell the accept loop and every open connection to wind down
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Resolves once `begin_shutdown` has been called, including calls
    /// made before this future was created
    pub async fn shutdown_requested(&self) {
        let mut rx = self.shutdown.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|stop| *stop).await;
    }
}
