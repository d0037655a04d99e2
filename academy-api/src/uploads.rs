/// File uploads: multipart parsing and on-disk storage
///
/// Files are written under
/// `<UPLOAD_DIR>/<category>/<tenant>/<subcategory>/<user>/<prefix>_<uuid>.<ext>`
/// and served back by the router under `/uploads`. Records store the path as
/// written; clients get [`UploadStore::public_url`] of it.
///
/// Path segments coming from clients (e.g. the payment type) are reduced to
/// `[A-Za-z0-9_-]` so a segment can never climb out of the upload root.

use axum::{body::Bytes, extract::Multipart};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ApiError, ApiResult};

const MAX_EXTENSION_LEN: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Failed to store upload at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A file part of a multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

/// Where an upload belongs
#[derive(Debug, Clone)]
pub struct UploadTarget {
    pub category: String,
    pub tenant: String,
    pub subcategory: String,
    pub user: String,
}

impl UploadTarget {
    pub fn new(
        category: impl Into<String>,
        tenant: impl ToString,
        subcategory: impl Into<String>,
        user: impl ToString,
    ) -> Self {
        Self {
            category: category.into(),
            tenant: tenant.to_string(),
            subcategory: subcategory.into(),
            user: user.to_string(),
        }
    }

    fn segments(&self) -> [String; 4] {
        [
            sanitize_segment(&self.category),
            sanitize_segment(&self.tenant),
            sanitize_segment(&self.subcategory),
            sanitize_segment(&self.user),
        ]
    }
}

/// Writes uploads below a root directory and builds their public links
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: String,
    public_base_url: String,
}

impl UploadStore {
    pub fn new(root: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into().trim_end_matches('/').to_string(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Path a file would be stored at, without touching the disk
    pub fn path_for(&self, target: &UploadTarget, prefix: &str, file_name: Option<&str>) -> String {
        let [category, tenant, subcategory, user] = target.segments();
        let name = format!(
            "{}_{}.{}",
            sanitize_segment(prefix),
            uuid::Uuid::new_v4(),
            sanitize_extension(file_name.unwrap_or_default())
        );

        format!(
            "{}/{}/{}/{}/{}/{}",
            self.root, category, tenant, subcategory, user, name
        )
    }

    /// Saves a file and returns its stored path
    pub async fn save(
        &self,
        target: &UploadTarget,
        prefix: &str,
        file: &UploadedFile,
    ) -> Result<String, UploadError> {
        let path = self.path_for(target, prefix, file.file_name.as_deref());
        let full = PathBuf::from(&path);

        if let Some(dir) = full.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| UploadError::Io {
                    path: dir.display().to_string(),
                    source,
                })?;
        }

        tokio::fs::write(&full, &file.bytes)
            .await
            .map_err(|source| UploadError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path, bytes = file.bytes.len(), "Stored upload");

        Ok(path)
    }

    /// Link for a stored path: base URL plus the path without a leading `./`
    pub fn public_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        let relative = path.trim_start_matches("./").trim_start_matches('/');
        format!("{}/{}", self.public_base_url, relative)
    }

    /// Same as [`Self::public_url`] for optional paths
    pub fn public_url_opt(&self, path: Option<&str>) -> Option<String> {
        path.filter(|p| !p.is_empty()).map(|p| self.public_url(p))
    }
}

/// Keeps `[A-Za-z0-9_-]`, replaces anything else with `_`
pub fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Lowercase alphanumeric extension of a client file name, `bin` if none
pub fn sanitize_extension(file_name: &str) -> String {
    let ext: String = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_EXTENSION_LEN)
        .collect::<String>()
        .to_ascii_lowercase();

    if ext.is_empty() {
        "bin".to_string()
    } else {
        ext
    }
}

/// Text fields and files of a multipart body
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Reads every part; parts with a file name are files
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    if !bytes.is_empty() {
                        form.files.insert(
                            name,
                            UploadedFile {
                                file_name: Some(file_name),
                                bytes,
                            },
                        );
                    }
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// Non-empty text field
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn required(&self, name: &str) -> ApiResult<&str> {
        self.text(name)
            .ok_or_else(|| ApiError::invalid(name, format!("{} is required", name)))
    }

    /// Parsed optional field
    pub fn parse<T: FromStr>(&self, name: &str) -> ApiResult<Option<T>> {
        self.text(name)
            .map(|v| {
                v.parse::<T>()
                    .map_err(|_| ApiError::invalid(name, format!("{} is invalid", name)))
            })
            .transpose()
    }

    /// Parsed required field
    pub fn parse_required<T: FromStr>(&self, name: &str) -> ApiResult<T> {
        self.parse(name)?
            .ok_or_else(|| ApiError::invalid(name, format!("{} is required", name)))
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    pub fn required_file(&self, name: &str) -> ApiResult<&UploadedFile> {
        self.file(name)
            .ok_or_else(|| ApiError::invalid(name, format!("{} file is required", name)))
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        fields: &[(&str, &str)],
        files: Vec<(&str, UploadedFile)>,
    ) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: files
                .into_iter()
                .map(|(k, f)| (k.to_string(), f))
                .collect(),
        }
    }
}
