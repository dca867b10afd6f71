//! 上传图片：校验、MIME 嗅探与 data URL 编码

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::core::AgentError;

/// 默认单张图片上限（字节）
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

const ALLOWED_MIME: [&str; 4] = ["image/png", "image/jpeg", "image/webp", "image/gif"];

/// 已校验的图片载荷
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageInput {
    bytes: Vec<u8>,
    mime: String,
}

impl ImageInput {
    /// 校验图片；mime 为 None 时按魔数推断
    pub fn new(bytes: Vec<u8>, mime: Option<&str>, max_bytes: usize) -> Result<Self, AgentError> {
        if bytes.is_empty() {
            return Err(AgentError::InputValidation("image payload is empty".to_string()));
        }
        if bytes.len() > max_bytes {
            return Err(AgentError::InputValidation(format!(
                "image is {} bytes, limit is {}",
                bytes.len(),
                max_bytes
            )));
        }
        let mime = match mime {
            Some(m) => m.trim().to_ascii_lowercase(),
            None => sniff_mime(&bytes)
                .ok_or_else(|| {
                    AgentError::InputValidation("unrecognized image format".to_string())
                })?
                .to_string(),
        };
        let mime = if mime == "image/jpg" { "image/jpeg".to_string() } else { mime };
        if !ALLOWED_MIME.contains(&mime.as_str()) {
            return Err(AgentError::InputValidation(format!(
                "unsupported image type: {}",
                mime
            )));
        }
        Ok(Self { bytes, mime })
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF8") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_sniff_and_data_url() {
        let img = ImageInput::new(PNG_HEADER.to_vec(), None, DEFAULT_MAX_IMAGE_BYTES).unwrap();
        assert_eq!(img.mime(), "image/png");
        assert!(img.to_data_url().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_rejects_bad_payloads() {
        assert!(matches!(
            ImageInput::new(vec![], None, 10),
            Err(AgentError::InputValidation(_))
        ));
        assert!(matches!(
            ImageInput::new(b"plain text".to_vec(), None, 100),
            Err(AgentError::InputValidation(_))
        ));
        assert!(matches!(
            ImageInput::new(PNG_HEADER.to_vec(), None, 4),
            Err(AgentError::InputValidation(_))
        ));
        assert!(matches!(
            ImageInput::new(PNG_HEADER.to_vec(), Some("application/pdf"), 100),
            Err(AgentError::InputValidation(_))
        ));
    }

    #[test]
    fn test_jpg_alias() {
        let img = ImageInput::new(vec![0xFF, 0xD8, 0xFF, 0xE0], Some("image/JPG"), 100).unwrap();
        assert_eq!(img.mime(), "image/jpeg");
    }
}
