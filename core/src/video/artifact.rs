use crate::prelude::VarResult;
use crate::video::format::ContainerFormat;
use std::io::Write;
use std::path::Path;
use tempfile::{Builder, NamedTempFile};

/// Uploaded bytes persisted for playback; the file is removed when the
/// artifact is closed or dropped.
#[derive(Debug)]
pub struct VideoArtifact {
    file: NamedTempFile,
    format: ContainerFormat,
}

impl VideoArtifact {
    pub fn persist(bytes: &[u8], format: ContainerFormat, dir: Option<&Path>) -> VarResult<Self> {
        let suffix = format!(".{}", format.extension());
        let mut builder = Builder::new();
        builder.prefix("var_upload_").suffix(&suffix);
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self { file, format })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn format(&self) -> ContainerFormat {
        self.format
    }

    pub fn close(self) -> VarResult<()> {
        self.file.close()?;
        Ok(())
    }
}
