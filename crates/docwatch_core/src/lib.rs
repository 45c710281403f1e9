//! Docwatch core: pure content extraction, normalization and change detection.
mod detect;
mod extract;
mod fingerprint;
mod normalize;
mod region;
mod render;
mod store;

pub use detect::{Assessment, ChangeDetector, StoreErrorPolicy};
pub use extract::{ContentExtractor, ExtractError, DEFAULT_CONTAINER_CLASS};
pub use fingerprint::Fingerprint;
pub use normalize::{
    fence_code_blocks, normalize, rewrite_code_spans, rewrite_images, CanonicalText,
    NormalizeError, DEFAULT_CODE_LANGUAGE, IMAGE_ALT_TEXT, INLINE_MARKER_ATTR,
};
pub use region::{ContentRegion, Element, Literal, Markup};
pub use render::render_markdown;
pub use store::{FingerprintStore, MemoryFingerprintStore, StoreError};
