use scraper::{Html, Selector};

use crate::region::ContentRegion;

/// Class carried by the layout wrapper around the documentation body.
pub const DEFAULT_CONTAINER_CLASS: &str = "basis-full";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("no main container")]
    NoMainContainer,
    #[error("no section")]
    NoSection,
    #[error("invalid container marker {marker:?}: {message}")]
    InvalidMarker { marker: String, message: String },
}

/// Locates the primary content region of a documentation page:
/// - the first (outermost) `div` carrying the container class
/// - the first `section` inside it.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    container: Selector,
    section: Selector,
}

impl ContentExtractor {
    pub fn new(container_class: &str) -> Result<Self, ExtractError> {
        let marker = container_class.trim();
        let invalid = |message: String| ExtractError::InvalidMarker {
            marker: container_class.to_string(),
            message,
        };
        if marker.is_empty() || marker.contains(char::is_whitespace) {
            return Err(invalid("expected a single class name".into()));
        }
        let container =
            Selector::parse(&format!("div.{marker}")).map_err(|err| invalid(err.to_string()))?;
        let section = Selector::parse("section").map_err(|err| invalid(err.to_string()))?;
        Ok(Self { container, section })
    }

    pub fn extract(&self, html: &str) -> Result<ContentRegion, ExtractError> {
        let doc = Html::parse_document(html);
        let container = doc
            .select(&self.container)
            .next()
            .ok_or(ExtractError::NoMainContainer)?;
        let section = container
            .select(&self.section)
            .next()
            .ok_or(ExtractError::NoSection)?;
        Ok(ContentRegion::from_element(section))
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_CONTAINER_CLASS).expect("default container class is a valid selector")
    }
}
