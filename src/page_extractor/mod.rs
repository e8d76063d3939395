//! Page metadata extraction
//!
//! One request drives one browser session through [`PageExtractor`]:
//! launch, navigate (with retries), soft wait for network quiescence,
//! evaluate the metadata query, sanitize, tear down.

pub mod extractors;
pub mod js_scripts;
pub mod navigation;
pub mod pipeline;
pub mod schema;

pub use extractors::{extract_metadata, normalize_whitespace};
pub use navigation::{NavigationError, NavigationPolicy, navigate};
pub use pipeline::{ExtractionSettings, PageExtractor};
pub use schema::{PageMetadata, RawPageFields};
