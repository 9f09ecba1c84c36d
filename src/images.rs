use base64ct::{Base64, Encoding};
use bytes::Bytes;

/// Image bytes ready to be sent inline to the analyzer.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Bytes,
}

impl ImagePayload {
    pub fn new(data: Bytes, declared_mime: Option<&str>, file_path: &str) -> Self {
        Self {
            mime_type: resolve_mime(declared_mime, file_path),
            data,
        }
    }

    pub fn to_base64(&self) -> String {
        Base64::encode_string(&self.data)
    }
}

fn mime_from_ext(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

fn mime_from_path(path: &str) -> Option<&'static str> {
    let (_, ext) = path.rsplit_once('.')?;
    mime_from_ext(ext)
}

/// Telegram recompresses native photos to JPEG, hence the fallback.
pub fn resolve_mime(declared: Option<&str>, file_path: &str) -> String {
    declared
        .filter(|m| m.starts_with("image/"))
        .or_else(|| mime_from_path(file_path))
        .unwrap_or("image/jpeg")
        .to_string()
}
