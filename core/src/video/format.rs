use crate::prelude::{VarError, VarResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Container types accepted by the upload interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Mp4,
    Avi,
    Mov,
}

impl ContainerFormat {
    pub const ALLOWED: [ContainerFormat; 3] =
        [ContainerFormat::Mp4, ContainerFormat::Avi, ContainerFormat::Mov];

    /// Resolves the container from the uploaded file name, case-insensitively.
    pub fn from_filename(filename: &str) -> VarResult<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .ok_or_else(|| {
                VarError::UnsupportedFormat(format!("{} has no file extension", filename))
            })?;

        Self::ALLOWED
            .into_iter()
            .find(|format| format.extension() == extension)
            .ok_or_else(|| {
                VarError::UnsupportedFormat(format!(
                    "{} (expected one of mp4, avi, mov)",
                    extension
                ))
            })
    }

    pub fn extension(self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Avi => "avi",
            ContainerFormat::Mov => "mov",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "video/mp4",
            ContainerFormat::Avi => "video/x-msvideo",
            ContainerFormat::Mov => "video/quicktime",
        }
    }
}
