use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sns::operation::publish::PublishError;
use aws_sdk_sns::Client as SnsClient;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, Instrument};

use crate::config::{NotificationConfig, NotifierBackend};

/// Errors that can occur while publishing a notification
#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("SNS publish error: {0}")]
    Sns(#[from] SdkError<PublishError, Response>),
    #[error("Record has no subject field: {field}")]
    MissingSubject { field: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Publisher of signup notifications to a pub/sub topic
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, topic: &str, message: &str, subject: &str)
        -> Result<(), NotifierError>;

    /// Short name of the backend, for logs
    fn backend(&self) -> &'static str;
}

/// Publishes notifications to AWS SNS
#[derive(Clone)]
pub struct SnsNotifier {
    client: Arc<SnsClient>,
    region: String,
}

impl SnsNotifier {
    pub fn new(client: SnsClient, region: String) -> Self {
        Self {
            client: Arc::new(client),
            region,
        }
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    #[instrument(skip(self, message, subject), fields(topic = %topic))]
    async fn publish(
        &self,
        topic: &str,
        message: &str,
        subject: &str,
    ) -> Result<(), NotifierError> {
        let publish_span = tracing::info_span!(
            "SNS",
            "aws.service" = "SNS",
            "aws.operation" = "Publish",
            "aws.region" = %self.region,
            "aws.remote.service" = "AWS::SNS",
            "aws.remote.operation" = "Publish",
            "aws.remote.resource.type" = "AWS::SNS::Topic",
            "aws.remote.resource.identifier" = %topic,
            "otel.kind" = "producer",
            "otel.name" = "SNS.Publish",
            "rpc.system" = "aws-api",
            "rpc.service" = "AmazonSNS",
            "rpc.method" = "Publish",
            "messaging.system" = "aws_sns",
            "messaging.destination.name" = %topic,
        );

        let output = self
            .client
            .publish()
            .topic_arn(topic)
            .message(message)
            .subject(subject)
            .send()
            .instrument(publish_span)
            .await?;

        info!(
            message_id = output.message_id().unwrap_or("unknown"),
            "Notification published to SNS"
        );
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sns"
    }
}

/// Local stand-in for SNS that writes each notification to stdout
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }

    pub fn format(topic: &str, message: &str, subject: &str) -> String {
        format!("topic: {}, message: {}, subject {}", topic, message, subject)
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn publish(
        &self,
        topic: &str,
        message: &str,
        subject: &str,
    ) -> Result<(), NotifierError> {
        println!("{}", Self::format(topic, message, subject));
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "console"
    }
}

/// Build the notifier selected by configuration
pub async fn build_notifier(config: &NotificationConfig) -> Arc<dyn Notifier> {
    match config.backend() {
        NotifierBackend::Sns { region } => {
            info!("Publishing signup notifications to SNS in {}", region);
            let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                .region(aws_config::Region::new(region.clone()))
                .load()
                .await;
            Arc::new(SnsNotifier::new(SnsClient::new(&sdk_config), region))
        }
        NotifierBackend::Console => {
            info!("Writing signup notifications to stdout");
            Arc::new(ConsoleNotifier::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_sns::config::Region;

    #[test]
    fn test_sns_notifier_creation() {
        let config = aws_sdk_sns::Config::builder()
            .region(Region::new("us-east-1"))
            .build();
        let notifier = SnsNotifier::new(SnsClient::from_conf(config), "us-east-1".to_string());

        assert_eq!(notifier.region, "us-east-1");
        assert_eq!(notifier.backend(), "sns");
    }

    #[test]
    fn test_console_format() {
        assert_eq!(
            ConsoleNotifier::format("signups", "New signup: {}", "hi"),
            "topic: signups, message: New signup: {}, subject hi"
        );
    }

    #[tokio::test]
    async fn test_console_publish_succeeds() {
        let notifier = ConsoleNotifier::new();

        let result = notifier.publish("signups", "New signup: {}", "hi").await;

        assert!(result.is_ok());
        assert_eq!(notifier.backend(), "console");
    }

    #[tokio::test]
    async fn test_build_notifier_local_uses_console() {
        let config = NotificationConfig {
            sns_region: "LOCAL".to_string(),
            signup_topic: String::new(),
            subject_field: "feedback".to_string(),
        };

        let notifier = build_notifier(&config).await;

        assert_eq!(notifier.backend(), "console");
    }

    #[test]
    fn test_missing_subject_display() {
        let error = NotifierError::MissingSubject {
            field: "feedback".to_string(),
        };

        assert_eq!(error.to_string(), "Record has no subject field: feedback");
    }
}
