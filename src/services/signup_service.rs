use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::models::{RepositoryError, ServiceError, ServiceResult, SignupRecord};
use crate::observability::Metrics;
use crate::repositories::SignupRepository;
use crate::services::{Notifier, NotifierError};

/// Where and how signup notifications are published
#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub topic: String,
    /// Record field whose value becomes the notification subject
    pub subject_field: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            topic: String::new(),
            subject_field: "feedback".to_string(),
        }
    }
}

/// Service handling signup submissions
pub struct SignupService {
    repository: Arc<dyn SignupRepository>,
    notifier: Arc<dyn Notifier>,
    settings: NotificationSettings,
    metrics: Option<Arc<Metrics>>,
}

impl SignupService {
    pub fn new(
        repository: Arc<dyn SignupRepository>,
        notifier: Arc<dyn Notifier>,
        settings: NotificationSettings,
    ) -> Self {
        Self {
            repository,
            notifier,
            settings,
            metrics: None,
        }
    }

    /// Record signup and notification outcomes in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Persist a new signup and announce it.
    ///
    /// The record is stored only if its key is free. Publishing happens
    /// after a successful write and never affects the result.
    #[instrument(skip(self, record), fields(fields = record.len()))]
    pub async fn register(&self, record: SignupRecord) -> ServiceResult<SignupRecord> {
        match self.repository.put_if_absent(&record).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict { attribute, value }) => {
                warn!(attribute = %attribute, "Signup rejected, key already registered");
                self.record_signup("conflict");
                return Err(ServiceError::AlreadyRegistered { attribute, value });
            }
            Err(e) => {
                error!(error = %e, "Failed to store signup");
                self.record_signup("error");
                return Err(e.into());
            }
        }

        self.notify(&record).await;

        self.record_signup("created");
        info!("Signup registered");
        Ok(record)
    }

    async fn notify(&self, record: &SignupRecord) {
        match self.publish(record).await {
            Ok(()) => {
                self.record_notification("success");
                info!(
                    backend = self.notifier.backend(),
                    "Signup notification published"
                );
            }
            Err(e) => {
                self.record_notification("error");
                error!(
                    backend = self.notifier.backend(),
                    error = %e,
                    "Error publishing subscription message"
                );
            }
        }
    }

    async fn publish(&self, record: &SignupRecord) -> Result<(), NotifierError> {
        let subject =
            record
                .get(&self.settings.subject_field)
                .ok_or_else(|| NotifierError::MissingSubject {
                    field: self.settings.subject_field.clone(),
                })?;
        let message = record.notification_message()?;

        self.notifier
            .publish(&self.settings.topic, &message, subject)
            .await
    }

    fn record_signup(&self, outcome: &str) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_signup(outcome);
        }
    }

    fn record_notification(&self, status: &str) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_notification(self.notifier.backend(), status);
        }
    }
}
