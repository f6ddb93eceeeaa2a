//! Head-only HTML parsing for page metadata.

use std::sync::LazyLock;

use scraper::{Html, Selector};

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("static selector"));
static META: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").expect("static selector"));
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link").expect("static selector"));

/// Raw fields collected from a document's `<head>`.
///
/// Values are taken as-is from the page; resolution and Open Graph
/// preference happen later in [`super::metadata::build_metadata`].
#[derive(Debug, Clone, Default)]
pub struct HeadFields {
    pub title: String,
    pub description: String,
    pub og_title: String,
    pub og_description: String,
    pub og_image: String,
    pub favicon: String,
}

/// Truncates the document at the closing `</head>` tag (case-insensitive),
/// so the body is never tokenized. Documents without an explicit `</head>`
/// are parsed whole; the byte cap upstream already bounds that case.
fn head_slice(html: &str) -> &str {
    let lowered = html.to_ascii_lowercase();
    match lowered.find("</head") {
        Some(end) => &html[..end],
        None => html,
    }
}

/// Extracts metadata fields from the head of an HTML document.
///
/// Records the first non-empty `<title>`, `<meta name="description">`,
/// the `og:title` / `og:description` / `og:image` properties, and the
/// `<link rel="icon">` / `<link rel="shortcut icon">` href. Attribute keys
/// are matched case-insensitively (the parser lowercases attribute names);
/// values are kept verbatim.
pub fn parse_head(html: &str) -> HeadFields {
    let doc = Html::parse_document(head_slice(html));
    let mut fields = HeadFields::default();

    for title in doc.select(&TITLE) {
        let text = title.text().collect::<String>().trim().to_string();
        if !text.is_empty() {
            fields.title = text;
            break;
        }
    }

    for meta in doc.select(&META) {
        let content = meta.value().attr("content").unwrap_or_default();
        if content.is_empty() {
            continue;
        }

        if let Some(name) = meta.value().attr("name")
            && name.eq_ignore_ascii_case("description")
            && fields.description.is_empty()
        {
            fields.description = content.to_string();
        }

        if let Some(property) = meta.value().attr("property") {
            if property.eq_ignore_ascii_case("og:title") && fields.og_title.is_empty() {
                fields.og_title = content.to_string();
            } else if property.eq_ignore_ascii_case("og:description")
                && fields.og_description.is_empty()
            {
                fields.og_description = content.to_string();
            } else if property.eq_ignore_ascii_case("og:image") && fields.og_image.is_empty() {
                fields.og_image = content.to_string();
            }
        }
    }

    for link in doc.select(&LINK) {
        let rel = link.value().attr("rel").unwrap_or_default();
        let is_icon =
            rel.eq_ignore_ascii_case("icon") || rel.eq_ignore_ascii_case("shortcut icon");

        if is_icon
            && fields.favicon.is_empty()
            && let Some(href) = link.value().attr("href")
            && !href.is_empty()
        {
            fields.favicon = href.to_string();
        }
    }

    fields
}
