use std::future::Future;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::AppError;
use crate::mailer::Mailer;
use crate::records::ApplicationStore;
use crate::storage::FileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ApplicationStore>,
    pub files: Arc<dyn FileStore>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Config,
}

impl AppState {
    /// Runs a call to an external system under the configured timeout.
    /// `what` names the dependency in the 504 returned on expiry.
    pub async fn bounded<T, E, F>(&self, what: &'static str, call: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, E>>,
        AppError: From<E>,
    {
        match tokio::time::timeout(self.config.external_call_timeout, call).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(AppError::Timeout(what)),
        }
    }
}
