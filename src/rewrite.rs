use url::Url;

use crate::models::ImageInfo;

/// Replace image URLs in generated Markdown with their inlined data URIs.
///
/// Each inlined image is substituted twice: by its URL as extracted, and by
/// the same URL without query or fragment. Plain text replacement, no
/// escaping.
pub fn inline_image_references(markdown: &str, images: &[ImageInfo]) -> String {
    let mut markdown = markdown.to_string();
    for image in images {
        let Some(data_url) = image.data_url.as_deref() else {
            continue;
        };
        markdown = markdown.replace(&image.original_url, data_url);
        let stripped = strip_query_and_fragment(&image.original_url);
        if !stripped.is_empty() {
            markdown = markdown.replace(&stripped, data_url);
        }
    }
    markdown
}

fn strip_query_and_fragment(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw.to_string(),
    }
}
