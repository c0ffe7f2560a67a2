use async_trait::async_trait;
use aws_sdk_dynamodb::error::ProvideErrorMetadata;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, Instrument};

use crate::models::{RepositoryError, RepositoryResult, SignupRecord};

/// Error code DynamoDB returns when throttling outside a modeled error
const THROTTLING_ERROR_CODE: &str = "ThrottlingException";

/// Trait defining the interface for signup storage
#[async_trait]
pub trait SignupRepository: Send + Sync {
    /// Store the record as a new item, failing with
    /// [`RepositoryError::Conflict`] if its key is already taken.
    async fn put_if_absent(&self, record: &SignupRecord) -> RepositoryResult<()>;
}

/// DynamoDB implementation of the SignupRepository trait
pub struct DynamoDbSignupRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    key_attribute: String,
    region: String,
}

impl DynamoDbSignupRepository {
    /// Create a new DynamoDB signup repository
    pub fn new(
        client: Arc<DynamoDbClient>,
        table_name: String,
        key_attribute: String,
        region: String,
    ) -> Self {
        Self {
            client,
            table_name,
            key_attribute,
            region,
        }
    }

    /// Create a DynamoDB client span with X-Ray attributes
    fn create_dynamodb_span(&self, operation: &str) -> tracing::Span {
        tracing::info_span!(
            "DynamoDB",
            "aws.service" = "DynamoDB",
            "aws.operation" = operation,
            "aws.region" = %self.region,
            "aws.dynamodb.table_name" = %self.table_name,
            "aws.remote.service" = "AWS::DynamoDB",
            "aws.remote.operation" = operation,
            "aws.remote.resource.type" = "AWS::DynamoDB::Table",
            "aws.remote.resource.identifier" = %self.table_name,
            "otel.kind" = "client",
            "otel.name" = format!("DynamoDB.{}", operation),
            "rpc.system" = "aws-api",
            "rpc.service" = "AmazonDynamoDBv2",
            "rpc.method" = operation,
            "db.system" = "dynamodb",
            "db.name" = %self.table_name,
            "db.operation" = operation,
        )
    }

    /// Convert a record to DynamoDB attribute values; every field is a string
    pub fn record_to_item(&self, record: &SignupRecord) -> HashMap<String, AttributeValue> {
        record
            .iter()
            .map(|(name, value)| (name.clone(), AttributeValue::S(value.clone())))
            .collect()
    }

    /// Convert a PutItem failure to RepositoryError
    pub fn map_put_item_error(&self, error: PutItemError, record: &SignupRecord) -> RepositoryError {
        match error {
            PutItemError::ConditionalCheckFailedException(_) => RepositoryError::Conflict {
                attribute: self.key_attribute.clone(),
                value: record.get(&self.key_attribute).unwrap_or_default().to_string(),
            },
            PutItemError::ResourceNotFoundException(_) => RepositoryError::TableNotFound {
                table_name: self.table_name.clone(),
            },
            PutItemError::ProvisionedThroughputExceededException(_)
            | PutItemError::RequestLimitExceeded(_) => RepositoryError::RateLimitExceeded,
            // Service-wide throttling has no modeled variant
            err if err.meta().code() == Some(THROTTLING_ERROR_CODE) => {
                RepositoryError::RateLimitExceeded
            }
            err => {
                error!("DynamoDB error: {:?}", err);
                RepositoryError::AwsSdk {
                    message: format!("PutItem failed: {}", err),
                }
            }
        }
    }
}

#[async_trait]
impl SignupRepository for DynamoDbSignupRepository {
    #[instrument(skip(self, record), fields(table = %self.table_name, key_attribute = %self.key_attribute))]
    async fn put_if_absent(&self, record: &SignupRecord) -> RepositoryResult<()> {
        info!("Storing signup record");

        let item = self.record_to_item(record);
        let put_span = self.create_dynamodb_span("PutItem");

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression("attribute_not_exists(#key)")
                .expression_attribute_names("#key", &self.key_attribute)
                .send()
                .await
                .map_err(|e| self.map_put_item_error(e.into_service_error(), record))
        }
        .instrument(put_span)
        .await?;

        info!("Signup record stored successfully");
        Ok(())
    }
}
