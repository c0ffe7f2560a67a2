pub mod memory_repository;
pub mod signup_repository;

pub use memory_repository::InMemorySignupRepository;
pub use signup_repository::{DynamoDbSignupRepository, SignupRepository};

use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Credentials;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};

/// Build the signup store selected by configuration
pub async fn build_repository(config: &StorageConfig) -> Arc<dyn SignupRepository> {
    match config.backend() {
        StorageBackend::Aws { region } => {
            info!("Using DynamoDB table {} in {}", config.signups_table, region);
            let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                .region(aws_config::Region::new(region.clone()))
                .load()
                .await;

            Arc::new(DynamoDbSignupRepository::new(
                Arc::new(DynamoDbClient::new(&sdk_config)),
                config.signups_table.clone(),
                config.key_attribute.clone(),
                region,
            ))
        }
        StorageBackend::LocalDynamoDb {
            endpoint,
            access_key,
        } => {
            info!(
                "Using local DynamoDB table {} at {}",
                config.signups_table, endpoint
            );
            let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                .region(aws_config::Region::new("us-east-1"))
                .endpoint_url(&endpoint)
                .credentials_provider(Credentials::new(
                    access_key.clone(),
                    access_key,
                    None,
                    None,
                    "local",
                ))
                .load()
                .await;

            Arc::new(DynamoDbSignupRepository::new(
                Arc::new(DynamoDbClient::new(&sdk_config)),
                config.signups_table.clone(),
                config.key_attribute.clone(),
                "local".to_string(),
            ))
        }
        StorageBackend::InMemory => {
            info!("Using in-memory signup store");
            Arc::new(InMemorySignupRepository::new(config.key_attribute.clone()))
        }
    }
}
