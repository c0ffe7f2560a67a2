#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::net::TcpListener;

use signup_rs::config::PageConfig;
use signup_rs::repositories::InMemorySignupRepository;
use signup_rs::services::{NotificationSettings, Notifier, NotifierError, SignupService};
use signup_rs::{create_app, AppContext, Metrics};

pub const TEST_TOPIC: &str = "arn:aws:sns:us-east-1:123456789012:signups";

/// A notification captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedNotification {
    pub topic: String,
    pub message: String,
    pub subject: String,
}

/// Notifier that keeps every publish in memory, optionally failing them
#[derive(Default)]
pub struct RecordingNotifier {
    published: Mutex<Vec<PublishedNotification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn published(&self) -> Vec<PublishedNotification> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(
        &self,
        topic: &str,
        message: &str,
        subject: &str,
    ) -> Result<(), NotifierError> {
        self.published.lock().unwrap().push(PublishedNotification {
            topic: topic.to_string(),
            message: message.to_string(),
            subject: subject.to_string(),
        });

        if self.fail {
            return Err(NotifierError::MissingSubject {
                field: "simulated failure".to_string(),
            });
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "recording"
    }
}

pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    pub repository: Arc<InMemorySignupRepository>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        Self::with_notifier(RecordingNotifier::default()).await
    }

    pub async fn with_notifier(notifier: RecordingNotifier) -> Self {
        let repository = Arc::new(InMemorySignupRepository::new("email"));
        let notifier = Arc::new(notifier);
        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));

        let service = SignupService::new(
            repository.clone(),
            notifier.clone(),
            NotificationSettings {
                topic: TEST_TOPIC.to_string(),
                subject_field: "feedback".to_string(),
            },
        )
        .with_metrics(metrics.clone());
        let context = AppContext::new(
            Arc::new(service),
            PageConfig {
                theme: "default".to_string(),
                debug: false,
            },
        );
        let app = create_app(context, metrics);

        // Start server
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Failed to serve app");
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        Self {
            client: Client::new(),
            base_url,
            repository,
            notifier,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
