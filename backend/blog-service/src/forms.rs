//! Typed request payloads for post and comment submissions.
//!
//! `clean()` normalizes a payload and either returns the values ready for the
//! service layer or the per-field messages to re-render the form with.

use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::FieldErrors;

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_IMAGE_MESSAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const EMPTY_FILE_MESSAGE: &str = "The submitted file is empty.";

/// An uploaded file carried inline as base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUpload {
    pub name: String,
    pub data: String,
}

/// Image bytes that decoded to a supported format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub file_name: String,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn decode(&self) -> Result<DecodedImage, &'static str> {
        let bytes = general_purpose::STANDARD
            .decode(self.data.trim())
            .map_err(|_| INVALID_IMAGE_MESSAGE)?;

        if bytes.is_empty() {
            return Err(EMPTY_FILE_MESSAGE);
        }

        let format = image::guess_format(&bytes).map_err(|_| INVALID_IMAGE_MESSAGE)?;
        if !matches!(
            format,
            ImageFormat::Gif | ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP
        ) {
            return Err(INVALID_IMAGE_MESSAGE);
        }

        Ok(DecodedImage {
            file_name: sanitize_file_name(&self.name, format),
            format,
            bytes,
        })
    }
}

/// Keep the basename's safe characters and make the extension match the content.
fn sanitize_file_name(name: &str, format: ImageFormat) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let stem = base.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(base);
    let stem: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .take(64)
        .collect();
    let stem = if stem.is_empty() { "image".to_string() } else { stem };
    let extension = format.extensions_str().first().copied().unwrap_or("img");
    format!("{}.{}", stem, extension)
}

/// Create/edit post payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PostForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub text: String,
    #[serde(default)]
    pub group: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedPost {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<DecodedImage>,
}

impl PostForm {
    /// Form prefilled from an existing post, as shown on the edit page.
    pub fn prefilled(text: &str, group_id: Option<i64>) -> Self {
        Self {
            text: text.to_string(),
            group: group_id,
            image: None,
        }
    }

    pub fn clean(&self) -> Result<CleanedPost, FieldErrors> {
        let normalized = PostForm {
            text: self.text.trim().to_string(),
            ..self.clone()
        };

        let mut errors = match normalized.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => FieldErrors::from(e),
        };

        let image = match &self.image {
            Some(upload) => match upload.decode() {
                Ok(decoded) => Some(decoded),
                Err(message) => {
                    errors.add("image", message);
                    None
                }
            },
            None => None,
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CleanedPost {
            text: normalized.text,
            group_id: normalized.group,
            image,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub text: String,
}

impl CommentForm {
    pub fn clean(&self) -> Result<String, FieldErrors> {
        let text = self.text.trim().to_string();
        CommentForm { text: text.clone() }
            .validate()
            .map_err(FieldErrors::from)?;
        Ok(text)
    }
}
