//! Builds the scanner's collaborators from a [`WatchConfig`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use docwatch_core::{ContentExtractor, FingerprintStore, MemoryFingerprintStore};
use docwatch_engine::{
    ChangeNotifier, DryRunNotifier, FileFingerprintStore, Fetcher, HttpJobNotifier, NotifierConfig,
    ReqwestFetcher, Retrying, ScanSettings, Scanner, StoreConfig, WatchConfig,
};
use docwatch_logging::watch_info;

pub async fn build_scanner(config: &WatchConfig) -> Result<Scanner> {
    let extractor = ContentExtractor::new(&config.container_class)?;
    let policy = config.retry.policy();
    let fetcher: Arc<dyn Fetcher> = Arc::new(Retrying::new(
        ReqwestFetcher::new(config.fetch.to_settings()),
        policy,
    ));
    let store = build_store(&config.store).await?;
    let notifier: Arc<dyn ChangeNotifier> =
        Arc::new(Retrying::new(build_notifier(&config.notifier).await?, policy));

    Ok(Scanner::new(extractor, fetcher, store, notifier).with_settings(ScanSettings {
        store_error_policy: config.store_error_policy,
        write_back: config.write_back_enabled(),
    }))
}

pub async fn build_store(config: &StoreConfig) -> Result<Arc<dyn FingerprintStore>> {
    match config {
        StoreConfig::Memory => {
            watch_info!("Using in-memory fingerprint store; nothing persists past this run");
            Ok(Arc::new(MemoryFingerprintStore::new()))
        }
        StoreConfig::File { path } => {
            watch_info!("Using fingerprint file {:?}", path);
            Ok(Arc::new(FileFingerprintStore::new(path.clone())))
        }
        StoreConfig::Dynamo { table } => dynamo_store(table).await,
    }
}

pub async fn build_notifier(config: &NotifierConfig) -> Result<Arc<dyn ChangeNotifier>> {
    match config {
        NotifierConfig::DryRun => Ok(Arc::new(DryRunNotifier)),
        NotifierConfig::Http {
            endpoint,
            timeout_secs,
        } => {
            let notifier = HttpJobNotifier::new(endpoint.clone(), Duration::from_secs(*timeout_secs))
                .context("building job notifier")?;
            Ok(Arc::new(notifier))
        }
        NotifierConfig::Lambda { function } => lambda_notifier(function).await,
    }
}

#[cfg(feature = "aws")]
async fn dynamo_store(table: &str) -> Result<Arc<dyn FingerprintStore>> {
    let sdk_config = docwatch_engine::aws::load_sdk_config().await;
    watch_info!("Using DynamoDB table {}", table);
    Ok(Arc::new(docwatch_engine::aws::DynamoFingerprintStore::new(
        &sdk_config,
        table,
    )))
}

#[cfg(not(feature = "aws"))]
async fn dynamo_store(table: &str) -> Result<Arc<dyn FingerprintStore>> {
    bail!("store Dynamo(table: {table:?}) requires a build with the `aws` feature")
}

#[cfg(feature = "aws")]
async fn lambda_notifier(function: &str) -> Result<Arc<dyn ChangeNotifier>> {
    let sdk_config = docwatch_engine::aws::load_sdk_config().await;
    Ok(Arc::new(docwatch_engine::aws::LambdaJobNotifier::new(
        &sdk_config,
        function,
    )))
}

#[cfg(not(feature = "aws"))]
async fn lambda_notifier(function: &str) -> Result<Arc<dyn ChangeNotifier>> {
    bail!("notifier Lambda(function: {function:?}) requires a build with the `aws` feature")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_starts_empty() {
        let store = build_store(&StoreConfig::Memory).await.unwrap();
        assert_eq!(store.get("https://docs.example.com/a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn dry_run_notifier_accepts_everything() {
        let notifier = build_notifier(&NotifierConfig::DryRun).await.unwrap();
        notifier.notify("https://docs.example.com/a").await.unwrap();
    }

    #[cfg(not(feature = "aws"))]
    #[tokio::test]
    async fn aws_backends_need_the_feature() {
        let err = build_store(&StoreConfig::Dynamo {
            table: "hashes".into(),
        })
        .await
        .err()
        .unwrap();
        assert!(err.to_string().contains("aws"));
    }

    #[tokio::test]
    async fn scanner_builds_from_defaults() {
        let config = WatchConfig {
            store: StoreConfig::Memory,
            ..WatchConfig::default()
        };
        assert!(build_scanner(&config).await.is_ok());
    }
}
