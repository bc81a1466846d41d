//! Content-based media type detection for downloaded bodies.
//!
//! The declared `Content-Type` of a response is not trusted; only the bytes
//! decide whether a download is a plain-text price list.

pub const TEXT_PLAIN: &str = "text/plain";

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
];

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

pub fn detect_media_type(body: &[u8]) -> &'static str {
    if let Some(&(_, media_type)) = SIGNATURES
        .iter()
        .find(|(magic, _)| body.starts_with(magic))
    {
        return media_type;
    }

    if body.contains(&0) {
        return "application/octet-stream";
    }

    let text = match std::str::from_utf8(body.strip_prefix(UTF8_BOM).unwrap_or(body)) {
        Ok(text) => text,
        Err(_) => return "application/octet-stream",
    };

    if looks_like_html(text) {
        return "text/html";
    }

    TEXT_PLAIN
}

fn looks_like_html(text: &str) -> bool {
    let head = text
        .trim_start()
        .chars()
        .take(14)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}
