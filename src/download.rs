use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::stream::{self, StreamExt};
use reqwest::header::CONTENT_TYPE;

use crate::error::AssetError;
use crate::models::ImageInfo;

pub const IMAGE_TIMEOUT: Duration = Duration::from_secs(15);

/// Hard ceiling for a single inlined image (5 MiB).
pub const MAX_IMAGE_SIZE: u64 = 5 * 1024 * 1024;

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub data_url: String,
    pub size_bytes: u64,
}

/// Download one image and encode it as a base64 data URI.
///
/// The size ceiling is checked against the declared `Content-Length` first
/// and then against the bytes actually read; partial bodies are dropped.
pub async fn download_image(client: &reqwest::Client, url: &str) -> Result<InlineImage, AssetError> {
    let mut response = client.get(url).timeout(IMAGE_TIMEOUT).send().await?;

    if !response.status().is_success() {
        return Err(AssetError::Status(response.status().as_u16()));
    }

    if let Some(declared) = response.content_length() {
        if declared > MAX_IMAGE_SIZE {
            return Err(AssetError::Oversized { size: declared });
        }
    }

    let declared_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let mut data: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let read = (data.len() + chunk.len()) as u64;
        if read > MAX_IMAGE_SIZE {
            return Err(AssetError::Oversized { size: read });
        }
        data.extend_from_slice(&chunk);
    }

    let mime = declared_type.unwrap_or_else(|| sniff_mime(&data).to_string());

    Ok(InlineImage {
        data_url: format!("data:{};base64,{}", mime, BASE64.encode(&data)),
        size_bytes: data.len() as u64,
    })
}

/// Inline every image, at most `concurrency` downloads at a time. Failures
/// leave the image as metadata only. Order of `images` is unchanged.
pub async fn embed_images(client: &reqwest::Client, images: &mut [ImageInfo], concurrency: usize) {
    let urls: Vec<String> = images.iter().map(|i| i.original_url.clone()).collect();

    let results: Vec<Result<InlineImage, AssetError>> = stream::iter(urls)
        .map(|url| async move {
            let result = download_image(client, &url).await;
            if let Err(e) = &result {
                tracing::debug!(url = %url, error = %e, "image download failed");
            }
            result
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    for (image, result) in images.iter_mut().zip(results) {
        if let Ok(inline) = result {
            image.data_url = Some(inline.data_url);
            image.size_bytes = inline.size_bytes;
        }
    }
}

// ── Content sniffing ─────────────────────────────────────────────────────────

/// Guess a MIME type from leading magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x47, 0x49, 0x46, 0x38, x, 0x61, ..] if *x == 0x37 || *x == 0x39 => "image/gif",
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => "image/webp",
        [0x42, 0x4D, ..] => "image/bmp",
        [0x00, 0x00, 0x01, 0x00, ..] => "image/x-icon",
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => "image/tiff",
        _ if looks_like_svg(bytes) => "image/svg+xml",
        _ => FALLBACK_MIME,
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    #[rstest]
    #[case(PNG_HEADER, "image/png")]
    #[case(&[0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg")]
    #[case(b"GIF89a....", "image/gif")]
    #[case(b"RIFF\x00\x00\x00\x00WEBPVP8 ", "image/webp")]
    #[case(b"  <svg xmlns=\"http://www.w3.org/2000/svg\"></svg>", "image/svg+xml")]
    #[case(b"<?xml version=\"1.0\"?><svg></svg>", "image/svg+xml")]
    #[case(b"plain bytes", "application/octet-stream")]
    #[case(b"", "application/octet-stream")]
    fn sniffs_common_image_types(#[case] bytes: &[u8], #[case] expected: &str) {
        assert_eq!(sniff_mime(bytes), expected);
    }

    #[tokio::test]
    async fn encodes_with_declared_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(b"abc".to_vec()),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let inline = download_image(&client, &format!("{}/a.png", server.uri()))
            .await
            .unwrap();
        assert_eq!(inline.data_url, "data:image/png;base64,YWJj");
        assert_eq!(inline.size_bytes, 3);
    }

    #[tokio::test]
    async fn falls_back_to_sniffing_without_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG_HEADER.to_vec()))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let inline = download_image(&client, &server.uri()).await.unwrap();
        assert!(inline.data_url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let server = MockServer::start().await;
        let body = vec![0u8; MAX_IMAGE_SIZE as usize + 1];
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = download_image(&client, &server.uri()).await.unwrap_err();
        assert!(matches!(err, AssetError::Oversized { .. }));
    }

    /// Serve one chunked response of `chunks` x 1 MiB with no `Content-Length`.
    async fn chunked_origin(chunks: usize) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;

            let head = "HTTP/1.1 200 OK\r\ncontent-type: image/png\r\ntransfer-encoding: chunked\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            let chunk = vec![0u8; 1024 * 1024];
            for _ in 0..chunks {
                let size_line = format!("{:x}\r\n", chunk.len());
                let frame = [size_line.as_bytes(), &chunk[..], &b"\r\n"[..]].concat();
                if socket.write_all(&frame).await.is_err() {
                    return;
                }
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        });
        format!("http://{}/big.png", addr)
    }

    #[tokio::test]
    async fn undeclared_oversized_stream_is_rejected() {
        let url = chunked_origin(6).await;

        let client = reqwest::Client::new();
        let err = download_image(&client, &url).await.unwrap_err();
        match err {
            AssetError::Oversized { size } => assert!(size > MAX_IMAGE_SIZE),
            other => panic!("expected Oversized, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undeclared_stream_within_ceiling_is_accepted() {
        let url = chunked_origin(2).await;

        let client = reqwest::Client::new();
        let inline = download_image(&client, &url).await.unwrap();
        assert_eq!(inline.size_bytes, 2 * 1024 * 1024);
        assert!(inline.data_url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn image_at_the_ceiling_is_accepted() {
        let server = MockServer::start().await;
        let body = vec![0u8; MAX_IMAGE_SIZE as usize];
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let inline = download_image(&client, &server.uri()).await.unwrap();
        assert_eq!(inline.size_bytes, MAX_IMAGE_SIZE);
    }

    #[tokio::test]
    async fn failed_downloads_leave_images_untouched_and_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok.gif"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/gif")
                    .set_body_bytes(b"GIF89a".to_vec()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.gif"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut images = vec![
            ImageInfo {
                original_url: format!("{}/missing.gif", server.uri()),
                ..ImageInfo::default()
            },
            ImageInfo {
                original_url: format!("{}/ok.gif", server.uri()),
                ..ImageInfo::default()
            },
        ];

        let client = reqwest::Client::new();
        embed_images(&client, &mut images, 4).await;

        assert!(images[0].original_url.ends_with("/missing.gif"));
        assert_eq!(images[0].data_url, None);
        assert_eq!(images[0].size_bytes, 0);
        assert_eq!(
            images[1].data_url.as_deref(),
            Some("data:image/gif;base64,R0lGODlh")
        );
        assert_eq!(images[1].size_bytes, 6);
    }
}
