//! Docwatch engine: fetching, discovery, persistence and job dispatch around
//! the pure core.
#[cfg(feature = "aws")]
pub mod aws;
pub mod config;
mod decode;
mod fetch;
mod file_store;
mod links;
mod notify;
mod persist;
mod retry;
mod scan;
mod types;

pub use config::{
    load_config, ConfigError, FetchConfig, NotifierConfig, RetryConfig, StoreConfig, WatchConfig,
};
pub use decode::{decode_body, DecodeError};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use file_store::FileFingerprintStore;
pub use links::{discover_links, LinkDiscovery};
pub use notify::{ChangeNotifier, ChangePayload, DispatchError, DryRunNotifier, HttpJobNotifier};
pub use persist::{ensure_state_dir, AtomicFileWriter, PersistError};
pub use retry::{RetryPolicy, Retrying};
pub use scan::{LogProgressSink, ProgressSink, ScanError, ScanSettings, Scanner};
pub use types::{
    FailureKind, FetchError, FetchMetadata, FetchOutput, PageOutcome, RunReport, ScanEvent, Stage,
};
