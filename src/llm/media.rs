use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;

pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Decoded photo bytes plus the MIME type used for the model call and the object key.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" | "image/heif" => "heic",
        _ => "bin",
    }
}

/// Splits `data:image/png;base64,AAAA` into its declared MIME type and the payload.
fn split_data_url(input: &str) -> (Option<String>, &str) {
    let Some(rest) = input.strip_prefix("data:") else {
        return (None, input);
    };
    let Some((header, payload)) = rest.split_once(',') else {
        return (None, input);
    };
    let mime = header
        .split(';')
        .next()
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty());
    (mime, payload)
}

pub fn decode_image(input: &str) -> Result<ImagePayload, ValidationError> {
    let (declared_mime, payload) = split_data_url(input.trim());
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(ValidationError::new("image must not be empty"));
    }

    let bytes = STANDARD
        .decode(&cleaned)
        .or_else(|_| STANDARD_NO_PAD.decode(&cleaned))
        .map_err(|_| ValidationError::new("image is not valid base64"))?;
    if bytes.is_empty() {
        return Err(ValidationError::new("image must not be empty"));
    }

    let mime_type = detect_mime_type(&bytes)
        .or(declared_mime)
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
    if !mime_type.starts_with("image/") {
        return Err(ValidationError::new(format!(
            "unsupported content type {mime_type}; expected an image"
        )));
    }

    Ok(ImagePayload { bytes, mime_type })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    // Smallest valid PNG header followed by an IHDR chunk start.
    pub(crate) const PNG_BYTES: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];

    pub(crate) fn png_base64() -> String {
        STANDARD.encode(PNG_BYTES)
    }

    #[test]
    fn decodes_plain_base64_and_sniffs_png() {
        let payload = decode_image(&png_base64()).unwrap();
        assert_eq!(payload.bytes, PNG_BYTES);
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.extension(), "png");
    }

    #[test]
    fn strips_data_url_header() {
        let input = format!("data:image/png;base64,{}", png_base64());
        let payload = decode_image(&input).unwrap();
        assert_eq!(payload.bytes, PNG_BYTES);
    }

    #[test]
    fn unknown_bytes_use_declared_type_then_default() {
        let raw = STANDARD.encode(b"not really an image");
        let declared = decode_image(&format!("data:image/webp;base64,{raw}")).unwrap();
        assert_eq!(declared.mime_type, "image/webp");

        let fallback = decode_image(&raw).unwrap();
        assert_eq!(fallback.mime_type, DEFAULT_IMAGE_MIME);
        assert_eq!(fallback.extension(), "jpg");
    }

    #[test]
    fn accepts_unpadded_and_wrapped_base64() {
        let padded = STANDARD.encode(b"abcd1");
        let unpadded = padded.trim_end_matches('=');
        assert!(decode_image(unpadded).is_ok());

        let wrapped = format!("{}\n{}", &padded[..4], &padded[4..]);
        assert!(decode_image(&wrapped).is_ok());
    }

    #[test]
    fn rejects_empty_and_invalid_input() {
        assert!(decode_image("").is_err());
        assert!(decode_image("data:image/png;base64,").is_err());
        assert!(decode_image("%%%not-base64%%%").is_err());
    }

    #[test]
    fn rejects_non_image_declared_type() {
        let raw = STANDARD.encode(b"plain text body");
        let err = decode_image(&format!("data:text/plain;base64,{raw}")).unwrap_err();
        assert!(err.to_string().contains("text/plain"));
    }
}
