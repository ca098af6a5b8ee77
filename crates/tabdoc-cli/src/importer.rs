//! Filesystem import collaborator
//!
//! Targets resolve relative to the directory of the importing file. A
//! nested document gets its own importer rooted at its own directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tabdoc_core::import::{parse_json_source, records_from_document};
use tabdoc_core::{Config, Engine, Error, ImportFormat, ImportRequest, ImportedRecord, Importer, Result};

#[derive(Debug, Clone)]
pub struct FsImporter {
    base_dir: PathBuf,
    config: Config,
}

impl FsImporter {
    pub fn new(base_dir: impl Into<PathBuf>, config: Config) -> Self {
        FsImporter {
            base_dir: base_dir.into(),
            config,
        }
    }

    /// Importer for a document read from `file`
    pub fn for_file(file: &Path, config: Config) -> Self {
        let base_dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::new(base_dir, config)
    }
}

impl Importer for FsImporter {
    fn import(&self, request: &ImportRequest) -> Result<Vec<ImportedRecord>> {
        let path = self.base_dir.join(&request.target);
        tracing::debug!(path = %path.display(), depth = request.depth, "reading import");
        let text = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::FileNotFound(request.target.clone()),
            _ => Error::Io(format!("{}: {}", path.display(), e)),
        })?;
        match request.format {
            ImportFormat::Json => parse_json_source(&request.target, &text),
            ImportFormat::Document => {
                let nested = FsImporter::for_file(&path, self.config.clone());
                let document = Engine::new(self.config.clone())
                    .with_importer(Box::new(nested))
                    .with_depth(request.depth)
                    .parse_str(&text)?;
                Ok(records_from_document(&document))
            }
        }
    }
}
