//! URL helpers and metadata assembly from parsed head fields.

use url::Url;

use super::head_parser::HeadFields;
use crate::domain::entities::UrlMetadata;

/// Rewrites `http://` URLs to `https://` before fetching. Idempotent on
/// already-https inputs; anything else passes through untouched.
pub fn upgrade_to_https(raw: &str) -> String {
    match raw.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => raw.to_string(),
    }
}

/// Resolves `href` against `base`, turning relative paths into absolute
/// URLs. Empty input maps to empty output; absolute URLs pass through;
/// unresolvable references collapse to empty rather than guessing.
pub fn resolve_url(href: &str, base: &str) -> String {
    if href.is_empty() {
        return String::new();
    }

    if Url::parse(href).is_ok() {
        return href.to_string();
    }

    match Url::parse(base).and_then(|b| b.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => String::new(),
    }
}

/// Builds the stored metadata from the effective URL and the parsed head.
///
/// Open Graph values win over their plain-HTML counterparts; image and
/// favicon are made absolute against the effective URL. Empty inputs map to
/// empty outputs.
pub fn build_metadata(final_url: &str, head: &HeadFields) -> UrlMetadata {
    let title = if !head.og_title.is_empty() {
        head.og_title.clone()
    } else {
        head.title.clone()
    };

    let description = if !head.og_description.is_empty() {
        head.og_description.clone()
    } else {
        head.description.clone()
    };

    UrlMetadata {
        final_url: final_url.to_string(),
        title,
        description,
        image: resolve_url(&head.og_image, final_url),
        favicon: resolve_url(&head.favicon, final_url),
    }
}
