use std::sync::Arc;

use crate::{
    config::Config,
    db::{FileTokenStore, TokenStore},
    services::{
        catalog::CatalogApi,
        navigation::NavigationController,
        notifications::Notifier,
        pagination::{CatalogSource, MovieQuery},
        session::SessionManager,
        transport::{HttpTransport, Transport},
    },
};

/// Composition root shared by every view
///
/// Holds the two owned state containers (session and navigation) plus the
/// notification channel. Consumers clone the handle, never the state.
#[derive(Clone)]
pub struct AppState {
    pub app_name: Arc<str>,
    pub api: CatalogApi,
    pub session: Arc<SessionManager>,
    pub navigation: Arc<NavigationController>,
    pub notifier: Notifier,
}

impl AppState {
    /// Wires the HTTP transport and file token store from configuration
    pub fn new(config: &Config) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config.api_base_url.clone()));
        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(config.token_path.clone()));
        Self::with_parts(&config.app_name, transport, store)
    }

    pub fn with_parts(app_name: &str, transport: Arc<dyn Transport>, store: Arc<dyn TokenStore>) -> Self {
        let api = CatalogApi::new(transport);
        let session = Arc::new(SessionManager::new(api.clone(), store));
        Self {
            app_name: Arc::from(app_name),
            api,
            session,
            navigation: Arc::new(NavigationController::new()),
            notifier: Notifier::new(),
        }
    }

    /// A fresh listing query bound to the catalog and the current session token
    pub fn movie_query(&self) -> MovieQuery {
        MovieQuery::new(Arc::new(CatalogSource::new(
            self.api.clone(),
            Arc::clone(&self.session),
        )))
    }
}
