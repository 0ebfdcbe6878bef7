//! Binary asset handling: multipart upload collection and data-URI encoding.
//!
//! Avatars and post images are stored as raw bytes next to the row they belong to.
//! Clients always receive them as `data:image/png;base64,...` strings.

use std::collections::HashMap;

use axum::extract::Multipart;
use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::{AppError, AppResult};

const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Encodes raw image bytes as a PNG data-URI.
pub fn data_uri(bytes: &[u8]) -> String {
    format!("{}{}", DATA_URI_PREFIX, STANDARD.encode(bytes))
}

pub fn optional_data_uri(bytes: Option<&[u8]>) -> Option<String> {
    bytes.map(data_uri)
}

/// UploadForm
///
/// A fully-buffered multipart body. Text parts land in `fields`, parts that carry a
/// filename land in `files`. Empty file parts (a browser submitting an untouched file
/// input) are dropped so they read as "not provided".
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
}

impl UploadForm {
    /// Drains a multipart stream. This is done before any storage call so no
    /// transaction is held open while the client uploads.
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if field.file_name().is_some() {
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    form.files.insert(name, bytes.to_vec());
                }
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Optional text field. Blank values count as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn required(&self, name: &str) -> AppResult<String> {
        self.text(name)
            .ok_or_else(|| AppError::BadRequest(format!("Field '{}' is required", name)))
    }

    /// Optional boolean field, accepting the spellings HTML forms produce.
    pub fn flag(&self, name: &str) -> AppResult<Option<bool>> {
        match self.text(name) {
            None => Ok(None),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "on" | "yes" => Ok(Some(true)),
                "false" | "0" | "off" | "no" => Ok(Some(false)),
                _ => Err(AppError::BadRequest(format!(
                    "Field '{}' must be a boolean",
                    name
                ))),
            },
        }
    }

    pub fn take_file(&mut self, name: &str) -> Option<Vec<u8>> {
        self.files.remove(name)
    }

    #[cfg(test)]
    fn with(fields: &[(&str, &str)]) -> Self {
        UploadForm {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_uses_png_prefix() {
        assert_eq!(data_uri(b"abc"), "data:image/png;base64,YWJj");
        assert_eq!(optional_data_uri(None), None);
    }

    #[test]
    fn blank_fields_read_as_absent() {
        let form = UploadForm::with(&[("name", "   "), ("description", " hi ")]);
        assert_eq!(form.text("name"), None);
        assert_eq!(form.text("description").as_deref(), Some("hi"));
        assert!(matches!(form.required("name"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn flags_parse_form_spellings() {
        let form = UploadForm::with(&[("a", "true"), ("b", "off"), ("c", "maybe")]);
        assert_eq!(form.flag("a"), Ok(Some(true)));
        assert_eq!(form.flag("b"), Ok(Some(false)));
        assert_eq!(form.flag("missing"), Ok(None));
        assert!(form.flag("c").is_err());
    }
}
