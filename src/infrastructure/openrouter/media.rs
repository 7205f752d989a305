//! Inline media as base64 data URLs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const SUPPORTED_IMAGE_MIMES: [&str; 6] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
];

pub const PDF_MIME: &str = "application/pdf";

pub fn encode_image_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

pub fn encode_pdf_data_url(bytes: &[u8]) -> String {
    format!("data:{PDF_MIME};base64,{}", STANDARD.encode(bytes))
}

pub fn is_supported_image_mime(mime: &str) -> bool {
    let mime = mime.to_ascii_lowercase();
    SUPPORTED_IMAGE_MIMES.contains(&mime.as_str())
}

pub fn is_pdf_mime(mime: &str) -> bool {
    mime.eq_ignore_ascii_case(PDF_MIME)
}

/// MIME type for a file extension, if it is an image or a PDF.
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "pdf" => Some(PDF_MIME),
        _ => None,
    }
}
