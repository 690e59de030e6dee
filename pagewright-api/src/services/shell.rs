//! Page shell for generated service pages.
//!
//! Service templates hold only the page body. [`wrap`] places that body in a
//! full document with SEO tags, theme variables, an embedded copy of the page
//! metadata and the behavior script. [`extract`] reverses it so API callers
//! can be served the fragment and metadata of a persisted render without
//! recompiling.

use pagewright_core::DataBag;
use pagewright_template::inject_behavior_script;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{CONTENT_END_MARKER, CONTENT_START_MARKER, PAGE_DATA_SCRIPT_ID};

/// Metadata extracted from one render, returned to API callers as
/// `pageData`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    pub url_path: String,
    pub business_name: String,
    pub service_name: String,
    pub area_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// CSS custom properties, without the leading `--`.
    #[serde(default)]
    pub theme: BTreeMap<String, String>,
}

fn leaf(bag: &DataBag, path: &str) -> String {
    bag.get_path(path)
        .map(|v| v.render_leaf().into_owned())
        .unwrap_or_default()
}

impl PageMeta {
    /// Read the page metadata out of an assembled data bag.
    pub fn from_bag(bag: &DataBag) -> Self {
        let mut theme = BTreeMap::new();
        for (group, prefix) in [("colors", "color"), ("radius", "radius")] {
            if let Some(tokens) = bag.get(group).and_then(|v| v.as_nested()) {
                for (name, value) in tokens.iter() {
                    theme.insert(
                        format!("{}-{}", prefix, name),
                        value.render_leaf().into_owned(),
                    );
                }
            }
        }
        let stroke = leaf(bag, "icon_stroke_width");
        if !stroke.is_empty() {
            theme.insert("icon-stroke-width".to_string(), stroke);
        }

        let phone = leaf(bag, "phone");
        Self {
            title: leaf(bag, "meta_title"),
            description: leaf(bag, "meta_description"),
            canonical_url: leaf(bag, "canonical_url"),
            url_path: leaf(bag, "url_path"),
            business_name: leaf(bag, "business_name"),
            service_name: leaf(bag, "service_name"),
            area_name: leaf(bag, "area_name"),
            phone: (!phone.is_empty()).then_some(phone),
            theme,
        }
    }
}

// ============================================================================
// ESCAPING
// ============================================================================

/// Escape text for an HTML attribute or text node.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn css_name(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

fn css_value(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '{' | '}' | ';' | '"' | '\\'))
        .collect()
}

/// JSON that is safe inside a `<script>` element.
fn script_json(meta: &PageMeta) -> String {
    serde_json::to_string(meta)
        .unwrap_or_else(|_| "{}".to_string())
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

// ============================================================================
// WRAP / EXTRACT
// ============================================================================

/// Wrap compiled page content in the full page document.
pub fn wrap(content: &str, meta: &PageMeta) -> String {
    let title = escape_html(&meta.title);
    let description = escape_html(&meta.description);
    let canonical = escape_html(&meta.canonical_url);

    let mut doc = String::with_capacity(content.len() + 2048);
    doc.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    doc.push_str("<meta charset=\"utf-8\">\n");
    doc.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    doc.push_str(&format!("<title>{}</title>\n", title));
    doc.push_str(&format!("<meta name=\"description\" content=\"{}\">\n", description));
    doc.push_str(&format!("<meta property=\"og:title\" content=\"{}\">\n", title));
    doc.push_str(&format!(
        "<meta property=\"og:description\" content=\"{}\">\n",
        description
    ));
    doc.push_str("<meta property=\"og:type\" content=\"website\">\n");
    if !canonical.is_empty() {
        doc.push_str(&format!("<meta property=\"og:url\" content=\"{}\">\n", canonical));
        doc.push_str(&format!("<link rel=\"canonical\" href=\"{}\">\n", canonical));
    }
    if !meta.theme.is_empty() {
        doc.push_str("<style>:root{");
        for (name, value) in &meta.theme {
            doc.push_str(&format!("--{}:{};", css_name(name), css_value(value)));
        }
        doc.push_str("}</style>\n");
    }
    doc.push_str(&format!(
        "<script type=\"application/json\" id=\"{}\">{}</script>\n",
        PAGE_DATA_SCRIPT_ID,
        script_json(meta)
    ));
    doc.push_str("</head>\n<body>\n");
    doc.push_str(CONTENT_START_MARKER);
    doc.push('\n');
    doc.push_str(content);
    doc.push('\n');
    doc.push_str(CONTENT_END_MARKER);
    doc.push_str("\n</body>\n</html>\n");

    inject_behavior_script(&doc)
}

/// Recover the content fragment and metadata from a document produced by
/// [`wrap`]. Returns `None` for documents without the shell's markers.
pub fn extract(html: &str) -> Option<(String, PageMeta)> {
    let open = format!(
        "<script type=\"application/json\" id=\"{}\">",
        PAGE_DATA_SCRIPT_ID
    );
    let data_start = html.find(&open)? + open.len();
    let data_len = html[data_start..].find("</script>")?;
    let meta: PageMeta = serde_json::from_str(&html[data_start..data_start + data_len]).ok()?;

    // The start marker is the first one after the head; the end marker is
    // the last one in the document. Content may contain either string.
    let body_from = data_start + data_len;
    let content_start = body_from + html[body_from..].find(CONTENT_START_MARKER)? + CONTENT_START_MARKER.len();
    let content_end = html.rfind(CONTENT_END_MARKER)?;
    if content_end < content_start {
        return None;
    }
    let content = &html[content_start..content_end];
    let content = content.strip_prefix('\n').unwrap_or(content);
    let content = content.strip_suffix('\n').unwrap_or(content);

    Some((content.to_string(), meta))
}
