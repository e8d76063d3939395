//! Read-only DOM queries evaluated inside the page

/// Collects the raw metadata fields in one round trip
///
/// Returns `null` for anything missing so the Rust side decides fallbacks
/// and sanitization.
pub const METADATA_SCRIPT: &str = r#"
    (() => {
        const content = (selector) => {
            const tag = document.querySelector(selector);
            return tag ? tag.getAttribute('content') : null;
        };
        const heading = document.querySelector('h1');

        return {
            title: typeof document.title === 'string' ? document.title : null,
            description: content('meta[name="description"]'),
            og_description: content('meta[property="og:description"]'),
            h1: heading ? heading.textContent : null
        };
    })()
"#;
