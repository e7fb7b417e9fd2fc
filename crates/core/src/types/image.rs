//! Product image references.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`ImageRef`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// The reference is empty.
    #[error("image reference cannot be empty")]
    Empty,
    /// The reference is neither an http(s) URL nor a data URI.
    #[error("image reference must be an http(s) URL or a data URI")]
    UnsupportedScheme,
    /// The URL could not be parsed.
    #[error("invalid image URL: {0}")]
    InvalidUrl(String),
    /// The data URI is malformed or its payload is not valid base64.
    #[error("invalid inline image: {0}")]
    InvalidInline(String),
}

/// A reference to a product image: a remote URL or an inline data URI
/// (`data:image/png;base64,...`) produced by an admin upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageRef(String);

impl ImageRef {
    /// Parse an image reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, uses an unsupported scheme,
    /// or is a malformed URL / data URI.
    pub fn parse(s: &str) -> Result<Self, ImageError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ImageError::Empty);
        }

        if let Some(rest) = trimmed.strip_prefix("data:") {
            validate_data_uri(rest)?;
            return Ok(Self(trimmed.to_owned()));
        }

        let url = url::Url::parse(trimmed).map_err(|e| ImageError::InvalidUrl(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(Self(trimmed.to_owned())),
            _ => Err(ImageError::UnsupportedScheme),
        }
    }

    /// Whether the image is embedded inline rather than linked.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.0.starts_with("data:")
    }

    /// The reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_data_uri(rest: &str) -> Result<(), ImageError> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ImageError::InvalidInline("missing ',' separator".to_owned()))?;

    let mime = meta.strip_suffix(";base64").ok_or_else(|| {
        ImageError::InvalidInline("only base64-encoded data URIs are supported".to_owned())
    })?;
    if !mime.starts_with("image/") {
        return Err(ImageError::InvalidInline(format!(
            "unsupported media type '{mime}'"
        )));
    }

    STANDARD
        .decode(payload)
        .map_err(|e| ImageError::InvalidInline(e.to_string()))?;
    Ok(())
}

impl TryFrom<String> for ImageRef {
    type Error = ImageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ImageRef> for String {
    fn from(image: ImageRef) -> Self {
        image.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_url() {
        let image = ImageRef::parse("https://picsum.photos/seed/prod1/600/900").expect("valid");
        assert!(!image.is_inline());
    }

    #[test]
    fn test_inline_png() {
        let image = ImageRef::parse("data:image/png;base64,iVBORw0KGgo=").expect("valid");
        assert!(image.is_inline());
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert_eq!(ImageRef::parse("  "), Err(ImageError::Empty));
        assert_eq!(
            ImageRef::parse("ftp://example.com/a.png"),
            Err(ImageError::UnsupportedScheme)
        );
        assert!(matches!(
            ImageRef::parse("data:text/plain;base64,aGk="),
            Err(ImageError::InvalidInline(_))
        ));
        assert!(matches!(
            ImageRef::parse("data:image/png;base64,@@@"),
            Err(ImageError::InvalidInline(_))
        ));
        assert!(matches!(
            ImageRef::parse("not a url"),
            Err(ImageError::InvalidUrl(_))
        ));
    }
}
