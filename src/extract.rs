use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::models::{ImageInfo, LinkInfo};

// ── Constants ────────────────────────────────────────────────────────────────

const SKIPPED_LINK_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "#"];

// ── Lazy static regexes ──────────────────────────────────────────────────────

static IMG_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<img[^>]+>").unwrap());

static SRC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"src=["']([^"']+)["']"#).unwrap());

static ALT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"alt=["']([^"']*)["']"#).unwrap());

static WIDTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"width=["'](\d+)["']"#).unwrap());

static HEIGHT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"height=["'](\d+)["']"#).unwrap());

static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<a[^>]+>(.*?)</a>").unwrap());

static HREF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"href=["']([^"']+)["']"#).unwrap());

static TITLE_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"title=["']([^"']*)["']"#).unwrap());

static MARKUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

// ── Image scan ───────────────────────────────────────────────────────────────

/// Collect `<img>` tags in document order. Tags without a usable `src`,
/// inline `data:` sources, and sources that cannot be resolved are skipped.
pub fn extract_images(html: &str, base_url: &Url) -> Vec<ImageInfo> {
    IMG_TAG_RE
        .find_iter(html)
        .filter_map(|m| parse_img_tag(m.as_str(), base_url))
        .collect()
}

fn parse_img_tag(tag: &str, base_url: &Url) -> Option<ImageInfo> {
    let src = first_capture(&SRC_RE, tag)?;
    if src.is_empty() || src.starts_with("data:") {
        return None;
    }
    let resolved = base_url.join(src).ok()?;

    Some(ImageInfo {
        original_url: resolved.to_string(),
        data_url: None,
        alt: first_capture(&ALT_RE, tag).unwrap_or_default().to_string(),
        width: dimension(&WIDTH_RE, tag),
        height: dimension(&HEIGHT_RE, tag),
        size_bytes: 0,
    })
}

fn dimension(re: &Regex, tag: &str) -> u32 {
    first_capture(re, tag)
        .and_then(|d| d.parse().ok())
        .unwrap_or(0)
}

// ── Link scan ────────────────────────────────────────────────────────────────

/// Collect anchors with their visible text, resolved and deduplicated by
/// absolute URL. The first occurrence of a URL wins.
pub fn extract_links(html: &str, base_url: &Url) -> Vec<LinkInfo> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut links = Vec::new();

    for caps in ANCHOR_RE.captures_iter(html) {
        let tag = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();

        let Some(href) = first_capture(&HREF_RE, tag) else {
            continue;
        };
        if SKIPPED_LINK_PREFIXES.iter().any(|p| href.starts_with(p)) {
            continue;
        }
        let Ok(resolved) = base_url.join(href) else {
            continue;
        };

        let url = resolved.to_string();
        if !seen.insert(url.clone()) {
            continue;
        }

        links.push(LinkInfo {
            url,
            text: strip_markup(inner),
            title: first_capture(&TITLE_ATTR_RE, tag)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        });
    }

    links
}

fn strip_markup(text: &str) -> String {
    MARKUP_RE.replace_all(text.trim(), "").trim().to_string()
}

// ── Page title ───────────────────────────────────────────────────────────────

pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let title_sel = Selector::parse("title").ok()?;
    document
        .select(&title_sel)
        .next()
        .map(|el| normalize_text(el.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn first_capture<'t>(re: &Regex, haystack: &'t str) -> Option<&'t str> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn normalize_text(text: String) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
