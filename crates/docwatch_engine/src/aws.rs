//! DynamoDB fingerprint table and Lambda job invocation.
//!
//! The table is keyed by `id` (the page URL) and stores the hex digest in
//! `hash`. The re-index function is invoked asynchronously with
//! `{"url": ...}` and must answer with status 202.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use docwatch_core::{Fingerprint, FingerprintStore, StoreError};
use docwatch_logging::watch_debug;

use crate::notify::{ChangeNotifier, ChangePayload, DispatchError};

const KEY_ATTR: &str = "id";
const HASH_ATTR: &str = "hash";

/// Loads the shared AWS configuration from the environment.
pub async fn load_sdk_config() -> aws_config::SdkConfig {
    aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await
}

pub struct DynamoFingerprintStore {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoFingerprintStore {
    pub fn new(sdk_config: &aws_config::SdkConfig, table: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_dynamodb::Client::new(sdk_config),
            table: table.into(),
        }
    }
}

#[async_trait]
impl FingerprintStore for DynamoFingerprintStore {
    async fn get(&self, url: &str) -> Result<Option<Fingerprint>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(KEY_ATTR, AttributeValue::S(url.to_string()))
            .send()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        let Some(item) = output.item() else {
            return Ok(None);
        };
        let hash = item
            .get(HASH_ATTR)
            .and_then(|value| value.as_s().ok())
            .ok_or_else(|| StoreError::Malformed(format!("item for {url} has no string hash")))?;
        hash.parse().map(Some)
    }

    async fn put(&self, url: &str, fingerprint: &Fingerprint) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table)
            .item(KEY_ATTR, AttributeValue::S(url.to_string()))
            .item(HASH_ATTR, AttributeValue::S(fingerprint.to_hex()))
            .send()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(())
    }
}

pub struct LambdaJobNotifier {
    client: aws_sdk_lambda::Client,
    function: String,
}

impl LambdaJobNotifier {
    pub fn new(sdk_config: &aws_config::SdkConfig, function: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_lambda::Client::new(sdk_config),
            function: function.into(),
        }
    }
}

#[async_trait]
impl ChangeNotifier for LambdaJobNotifier {
    async fn notify(&self, url: &str) -> Result<(), DispatchError> {
        let payload = ChangePayload { url }.to_json()?;
        let output = self
            .client
            .invoke()
            .function_name(&self.function)
            .invocation_type(InvocationType::Event)
            .payload(Blob::new(payload.into_bytes()))
            .send()
            .await
            .map_err(|err| DispatchError::Transport(err.to_string()))?;

        let status = output.status_code();
        if status != 202 {
            return Err(DispatchError::UnexpectedStatus {
                status: u16::try_from(status).unwrap_or(0),
                body: output.function_error().unwrap_or_default().to_string(),
            });
        }
        watch_debug!("Lambda {} accepted {}", self.function, url);
        Ok(())
    }
}
