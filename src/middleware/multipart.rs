//! Multipart form reading: text fields are collected, file parts are
//! streamed straight into [`FileStorage`].

use axum::extract::Multipart;
use std::collections::HashMap;

use crate::error::ApiError;
use crate::files::{FileStorage, FileStorageError};
use crate::services::FormFields;

/// A file part the handler is willing to store.
#[derive(Debug, Clone, Copy)]
pub struct UploadedFile {
    pub field: &'static str,
    pub prefix: &'static str,
    pub subdir: Option<&'static str>,
    /// Accepted content types; `None` accepts anything.
    pub content_types: Option<&'static [&'static str]>,
}

impl UploadedFile {
    pub const fn new(field: &'static str, prefix: &'static str) -> Self {
        Self { field, prefix, subdir: None, content_types: None }
    }

    pub const fn in_subdir(mut self, subdir: &'static str) -> Self {
        self.subdir = Some(subdir);
        self
    }

    pub const fn only(mut self, content_types: &'static [&'static str]) -> Self {
        self.content_types = Some(content_types);
        self
    }
}

#[derive(Debug, Default)]
pub struct FormUpload {
    pub fields: FormFields,
    /// Stored public path per file field.
    pub files: HashMap<&'static str, String>,
}

impl FormUpload {
    /// Drain `multipart`. File parts for unknown fields are rejected; an
    /// empty optional file input (no filename) is ignored.
    pub async fn read(
        mut multipart: Multipart,
        storage: &FileStorage,
        accepted: &[UploadedFile],
    ) -> Result<Self, ApiError> {
        let mut upload = FormUpload::default();

        let result: Result<(), ApiError> = async {
            while let Some(field) = multipart.next_field().await? {
                let name = field.name().unwrap_or_default().to_string();
                let file_name = field.file_name().map(str::to_string);

                let Some(file_name) = file_name else {
                    let value = field.text().await?;
                    upload.fields.insert(name, value);
                    continue;
                };
                if file_name.is_empty() {
                    continue;
                }

                let rule = accepted
                    .iter()
                    .find(|rule| rule.field == name)
                    .ok_or_else(|| ApiError::bad_request(format!("Unexpected file field '{}'", name)))?;
                if let Some(allowed) = rule.content_types {
                    let content_type = field.content_type().unwrap_or_default().to_string();
                    if !allowed.contains(&content_type.as_str()) {
                        return Err(FileStorageError::UnsupportedType(content_type).into());
                    }
                }

                let path = storage
                    .save_stream(rule.subdir, rule.prefix, &file_name, Box::pin(field))
                    .await?;
                if let Some(previous) = upload.files.insert(rule.field, path) {
                    storage.discard(&previous).await;
                }
            }
            Ok(())
        }
        .await;

        if let Err(err) = result {
            upload.discard(storage).await;
            return Err(err);
        }
        Ok(upload)
    }

    pub fn file(&self, field: &str) -> Option<String> {
        self.files.get(field).cloned()
    }

    /// Remove every stored file, used when the form is rejected after upload.
    pub async fn discard(&self, storage: &FileStorage) {
        for path in self.files.values() {
            storage.discard(path).await;
        }
    }
}
