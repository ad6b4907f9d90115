//! Records from a directory of License XML files.
//!
//! Each file is processed on its own. A file that cannot be read, parsed,
//! validated or extracted is skipped with a warning, and the remaining files
//! are still processed.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::document::{LicenseXmlDocument, LicenseXmlSource};
use crate::error::{LicenseXmlError, Result};
use crate::schema::SchemaProvider;
use crate::types::{ExceptionRecord, LicenseRecord, LicenseXmlContents};

/// Provides licenses and exceptions from every `*.xml` file below a directory.
pub struct XmlLicenseProvider<'s> {
    files: Vec<PathBuf>,
    schemas: &'s SchemaProvider,
    warnings: Vec<String>,
}

impl<'s> XmlLicenseProvider<'s> {
    /// Collect the XML files below `dir`, recursively, sorted by path.
    ///
    /// # Returns
    /// An error if `dir` is not a directory.
    pub fn from_dir(dir: impl AsRef<Path>, schemas: &'s SchemaProvider) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(LicenseXmlError::Io(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("License XML directory does not exist: {}", dir.display()),
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| LicenseXmlError::Io(std::io::Error::other(e)))?;
            if entry.file_type().is_file() && is_xml_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
        tracing::debug!(dir = %dir.display(), count = files.len(), "Found license XML files");

        Ok(Self {
            files,
            schemas,
            warnings: Vec::new(),
        })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Warnings for skipped files, oldest first.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Licenses from all readable files.
    pub fn licenses(&mut self) -> Vec<LicenseRecord> {
        self.collect(|document| document.licenses())
    }

    /// Exceptions from all readable files.
    pub fn exceptions(&mut self) -> Vec<ExceptionRecord> {
        self.collect(|document| document.exceptions())
    }

    /// Licenses and exceptions in one pass over the files.
    ///
    /// `on_file` is called before each file is processed.
    pub fn contents(&mut self, mut on_file: impl FnMut(&Path)) -> LicenseXmlContents {
        let mut contents = LicenseXmlContents::default();
        let files = self.files.clone();
        for path in &files {
            on_file(path);
            if let Some(file_contents) = self.process(path, |document| document.contents()) {
                contents.licenses.extend(file_contents.licenses);
                contents.exceptions.extend(file_contents.exceptions);
            }
        }
        contents
    }

    fn collect<T>(
        &mut self,
        extract: impl Fn(&LicenseXmlDocument<'_>) -> Result<Vec<T>>,
    ) -> Vec<T> {
        let files = self.files.clone();
        files
            .iter()
            .filter_map(|path| self.process(path, &extract))
            .flatten()
            .collect()
    }

    fn process<T>(
        &mut self,
        path: &Path,
        extract: impl Fn(&LicenseXmlDocument<'_>) -> Result<T>,
    ) -> Option<T> {
        let result = LicenseXmlSource::read(path).and_then(|source| {
            let document = LicenseXmlDocument::parse(&source, self.schemas)?;
            extract(&document)
        });
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                let file_name = match path.file_name() {
                    Some(name) => name.to_string_lossy().into_owned(),
                    None => path.display().to_string(),
                };
                let warning = format!("{e}, Skipping file {file_name}");
                tracing::warn!("{warning}");
                self.warnings.push(warning);
                None
            }
        }
    }
}

fn is_xml_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}
