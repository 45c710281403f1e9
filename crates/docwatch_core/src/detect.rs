use docwatch_logging::watch_debug;
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;
use crate::normalize::CanonicalText;
use crate::store::{FingerprintStore, StoreError};

/// What the caller does when the fingerprint lookup itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreErrorPolicy {
    /// Abort processing of that URL.
    #[default]
    FailPage,
    /// Log the failure and report the page as unchanged.
    TreatAsUnchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub fingerprint: Fingerprint,
    pub previous: Option<Fingerprint>,
    pub changed: bool,
}

/// Compares a page's fingerprint with the stored one. Never writes back.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChangeDetector;

impl ChangeDetector {
    pub async fn assess(
        &self,
        url: &str,
        text: &CanonicalText,
        store: &dyn FingerprintStore,
    ) -> Result<Assessment, StoreError> {
        let fingerprint = Fingerprint::of(text);
        let previous = store.get(url).await?;
        let changed = match previous {
            None => {
                watch_debug!("No stored fingerprint for {}", url);
                true
            }
            Some(stored) => stored != fingerprint,
        };
        watch_debug!(
            "Fingerprint for {} is {} (changed={})",
            url,
            fingerprint,
            changed
        );
        Ok(Assessment {
            fingerprint,
            previous,
            changed,
        })
    }

    pub async fn has_changed(
        &self,
        url: &str,
        text: &CanonicalText,
        store: &dyn FingerprintStore,
    ) -> Result<bool, StoreError> {
        Ok(self.assess(url, text, store).await?.changed)
    }
}
