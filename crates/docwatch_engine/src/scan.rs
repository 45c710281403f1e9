use std::fmt::Display;
use std::sync::Arc;

use docwatch_core::{
    normalize, ChangeDetector, ContentExtractor, FingerprintStore, StoreErrorPolicy,
};
use docwatch_logging::{watch_debug, watch_error, watch_info, watch_warn};

use crate::decode::{decode_body, DecodeError};
use crate::fetch::Fetcher;
use crate::links::LinkDiscovery;
use crate::notify::ChangeNotifier;
use crate::{FetchError, PageOutcome, RunReport, ScanEvent, Stage};

/// Failures that end a whole run rather than a single page.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed to fetch listing page: {0}")]
    Listing(FetchError),
    #[error("failed to decode listing page: {0}")]
    ListingDecode(#[from] DecodeError),
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ScanEvent);
}

/// Writes scan events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: ScanEvent) {
        match event {
            ScanEvent::Stage { url, stage } => watch_debug!("{} -> {}", url, stage),
            ScanEvent::PageDone { url, outcome } => watch_info!("{}: {}", url, outcome),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    pub store_error_policy: StoreErrorPolicy,
    pub write_back: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            store_error_policy: StoreErrorPolicy::default(),
            write_back: true,
        }
    }
}

/// Runs the per-URL pass: fetch, extract, normalize, hash, compare, dispatch.
///
/// Pages are processed one at a time and share no state besides the store.
pub struct Scanner {
    extractor: ContentExtractor,
    detector: ChangeDetector,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn FingerprintStore>,
    notifier: Arc<dyn ChangeNotifier>,
    settings: ScanSettings,
    sink: Arc<dyn ProgressSink>,
}

impl Scanner {
    pub fn new(
        extractor: ContentExtractor,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn FingerprintStore>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self {
            extractor,
            detector: ChangeDetector,
            fetcher,
            store,
            notifier,
            settings: ScanSettings::default(),
            sink: Arc::new(LogProgressSink),
        }
    }

    pub fn with_settings(mut self, settings: ScanSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Discovers the target pages, then checks each of them.
    pub async fn run_discovered(&self, discovery: &LinkDiscovery) -> Result<RunReport, ScanError> {
        let urls = discovery.discover(self.fetcher.as_ref()).await?;
        Ok(self.run(&urls).await)
    }

    pub async fn run(&self, urls: &[String]) -> RunReport {
        let mut report = RunReport::default();
        for url in urls {
            let outcome = self.check_page(url).await;
            report.record(url.as_str(), outcome);
        }
        watch_info!("{}", report.summary());
        report
    }

    pub async fn check_page(&self, url: &str) -> PageOutcome {
        watch_debug!("Checking {}", url);
        let outcome = self.process(url).await;
        self.sink.emit(ScanEvent::PageDone {
            url: url.to_string(),
            outcome: outcome.clone(),
        });
        outcome
    }

    async fn process(&self, url: &str) -> PageOutcome {
        let page = match self.fetcher.fetch(url).await {
            Ok(page) => page,
            Err(err) => return aborted(url, Stage::Queued, err),
        };
        let html = match decode_body(&page) {
            Ok(html) => html,
            Err(err) => return aborted(url, Stage::Queued, err),
        };
        drop(page);
        self.advance(url, Stage::Fetched);

        let region = match self.extractor.extract(&html) {
            Ok(region) => region,
            Err(err) => return aborted(url, Stage::Fetched, err),
        };
        drop(html);
        self.advance(url, Stage::Extracted);

        let text = match normalize(&region) {
            Ok(text) => text,
            Err(err) => return aborted(url, Stage::Extracted, err),
        };
        drop(region);
        self.advance(url, Stage::Normalized);

        let assessment = match self.detector.assess(url, &text, self.store.as_ref()).await {
            Ok(assessment) => assessment,
            Err(err) => match self.settings.store_error_policy {
                StoreErrorPolicy::FailPage => return aborted(url, Stage::Normalized, err),
                StoreErrorPolicy::TreatAsUnchanged => {
                    watch_warn!(
                        "Fingerprint lookup for {} failed, treating as unchanged: {}",
                        url,
                        err
                    );
                    return PageOutcome::Unchanged;
                }
            },
        };
        self.advance(url, Stage::Hashed);

        if !assessment.changed {
            return PageOutcome::Unchanged;
        }

        watch_info!("Content changed for {}; dispatching re-index job", url);
        if let Err(err) = self.notifier.notify(url).await {
            watch_error!("Failed to dispatch re-index job for {}: {}", url, err);
            return PageOutcome::ChangedDispatchFailed {
                reason: err.to_string(),
            };
        }

        if self.settings.write_back {
            if let Err(err) = self.store.put(url, &assessment.fingerprint).await {
                watch_warn!("Failed to store fingerprint for {}: {}", url, err);
            }
        }
        PageOutcome::ChangedAndDispatched
    }

    fn advance(&self, url: &str, stage: Stage) {
        self.sink.emit(ScanEvent::Stage {
            url: url.to_string(),
            stage,
        });
    }
}

fn aborted(url: &str, stage: Stage, err: impl Display) -> PageOutcome {
    watch_warn!("Skipping {} after {}: {}", url, stage, err);
    PageOutcome::Aborted {
        stage,
        reason: err.to_string(),
    }
}
