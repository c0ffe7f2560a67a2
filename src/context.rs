use std::sync::Arc;
use tracing::info;

use crate::config::{Config, PageConfig};
use crate::observability::Metrics;
use crate::repositories::{build_repository, SignupRepository};
use crate::services::{build_notifier, NotificationSettings, Notifier, SignupService};

/// Everything a request handler needs, built once at startup
#[derive(Clone)]
pub struct AppContext {
    pub signup_service: Arc<SignupService>,
    pub page: Arc<PageConfig>,
}

impl AppContext {
    pub fn new(signup_service: Arc<SignupService>, page: PageConfig) -> Self {
        Self {
            signup_service,
            page: Arc::new(page),
        }
    }

    /// Assemble the storage and notification backends named by `config`
    pub async fn from_config(config: &Config, metrics: Arc<Metrics>) -> Self {
        let repository: Arc<dyn SignupRepository> = build_repository(&config.storage).await;
        let notifier: Arc<dyn Notifier> = build_notifier(&config.notification).await;

        let settings = NotificationSettings {
            topic: config.notification.signup_topic.clone(),
            subject_field: config.notification.subject_field.clone(),
        };
        let signup_service =
            Arc::new(SignupService::new(repository, notifier, settings).with_metrics(metrics));
        info!("Services initialized successfully");

        Self::new(signup_service, config.page.clone())
    }
}
