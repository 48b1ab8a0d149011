use std::sync::Arc;

use crate::services::{store_api::GameStoreApi, viewer::SessionViewer};

/// Handle cloned into every handler.
pub type SharedState = Arc<AppState>;

/// Central application state shared by every request handler.
pub struct AppState {
    store: GameStoreApi,
    viewer: Arc<dyn SessionViewer>,
    admin_token: Option<String>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        store: GameStoreApi,
        viewer: Arc<dyn SessionViewer>,
        admin_token: Option<String>,
    ) -> SharedState {
        Arc::new(Self {
            store,
            viewer,
            admin_token,
        })
    }

    /// Façade over the session storage backends.
    pub fn store(&self) -> &GameStoreApi {
        &self.store
    }

    /// Rules-engine seam used to answer polls.
    pub fn viewer(&self) -> &dyn SessionViewer {
        self.viewer.as_ref()
    }

    /// Token expected on the `/games` routes, if any is configured.
    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref()
    }
}
