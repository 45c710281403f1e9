use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failures that may succeed on a second attempt.
    pub fn is_transient(&self) -> bool {
        match self.kind {
            FailureKind::Timeout | FailureKind::Network => true,
            FailureKind::HttpStatus(code) => code >= 500 || code == 429,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Last stage a page reached during one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Queued,
    Fetched,
    Extracted,
    Normalized,
    Hashed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Queued => "queued",
            Stage::Fetched => "fetched",
            Stage::Extracted => "extracted",
            Stage::Normalized => "normalized",
            Stage::Hashed => "hashed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Unchanged,
    ChangedAndDispatched,
    ChangedDispatchFailed { reason: String },
    /// Processing stopped early; `stage` is the last stage completed.
    Aborted { stage: Stage, reason: String },
}

impl PageOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(
            self,
            PageOutcome::ChangedAndDispatched | PageOutcome::ChangedDispatchFailed { .. }
        )
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageOutcome::Unchanged => write!(f, "unchanged"),
            PageOutcome::ChangedAndDispatched => write!(f, "changed, job dispatched"),
            PageOutcome::ChangedDispatchFailed { reason } => {
                write!(f, "changed, dispatch failed: {reason}")
            }
            PageOutcome::Aborted { stage, reason } => {
                write!(f, "aborted after {stage}: {reason}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Stage { url: String, stage: Stage },
    PageDone { url: String, outcome: PageOutcome },
}

/// Per-run tally; per-page failures never fail the run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunReport {
    pub pages: Vec<(String, PageOutcome)>,
    pub unchanged: usize,
    pub dispatched: usize,
    pub dispatch_failed: usize,
    pub aborted: usize,
}

impl RunReport {
    pub fn record(&mut self, url: impl Into<String>, outcome: PageOutcome) {
        match &outcome {
            PageOutcome::Unchanged => self.unchanged += 1,
            PageOutcome::ChangedAndDispatched => self.dispatched += 1,
            PageOutcome::ChangedDispatchFailed { .. } => self.dispatch_failed += 1,
            PageOutcome::Aborted { .. } => self.aborted += 1,
        }
        self.pages.push((url.into(), outcome));
    }

    pub fn total(&self) -> usize {
        self.pages.len()
    }

    pub fn changed_urls(&self) -> impl Iterator<Item = &str> {
        self.pages
            .iter()
            .filter(|(_, outcome)| outcome.is_changed())
            .map(|(url, _)| url.as_str())
    }

    pub fn summary(&self) -> String {
        format!(
            "Scanning completed: {} pages, {} unchanged, {} dispatched, {} dispatch failures, {} aborted",
            self.total(),
            self.unchanged,
            self.dispatched,
            self.dispatch_failed,
            self.aborted
        )
    }
}
