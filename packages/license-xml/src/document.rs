//! Loading License XML documents.
//!
//! Reading and parsing are split: [`LicenseXmlSource`] owns the file text,
//! [`LicenseXmlDocument`] borrows it as a parsed and validated tree.
//!
//! # Example
//!
//! ```
//! use spdx_license_xml::document::{LicenseXmlDocument, LicenseXmlSource};
//! use spdx_license_xml::schema::SchemaProvider;
//!
//! let source = LicenseXmlSource::from_text(
//!     "MIT.xml",
//!     r#"<SPDXLicenseCollection xmlns="http://www.spdx.org/license">
//!          <license licenseId="MIT" name="MIT License"><text><p>Permission</p></text></license>
//!        </SPDXLicenseCollection>"#,
//! );
//! let schemas = SchemaProvider::packaged();
//! let document = LicenseXmlDocument::parse(&source, &schemas).unwrap();
//!
//! let licenses = document.licenses().unwrap();
//! assert_eq!(licenses[0].id, "MIT");
//! assert_eq!(licenses[0].license_text, "Permission\n\n");
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node, ParsingOptions};

use crate::error::Result;
use crate::extract::{extract_exceptions, extract_licenses};
use crate::schema::{global_schema_provider, SchemaProvider, Validator};
use crate::types::{ExceptionRecord, LicenseRecord, LicenseXmlContents};

/// The text of a License XML file.
#[derive(Debug, Clone)]
pub struct LicenseXmlSource {
    path: PathBuf,
    text: String,
}

impl LicenseXmlSource {
    /// Read a file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            text,
        })
    }

    /// Source held in memory; `path` only names it in error messages.
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used in error messages.
    pub fn file_name(&self) -> String {
        match self.path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => self.path.display().to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A parsed License XML document.
///
/// Created once per file and read-only afterwards.
pub struct LicenseXmlDocument<'input> {
    file_name: String,
    document: Document<'input>,
    validated: bool,
}

impl<'input> LicenseXmlDocument<'input> {
    /// Parse and validate against the provider's schema.
    ///
    /// DTDs are rejected, so no external entity or DTD is ever resolved.
    pub fn parse(source: &'input LicenseXmlSource, schemas: &SchemaProvider) -> Result<Self> {
        let mut document = Self::parse_unvalidated(source)?;
        let schema = schemas.get_or_load()?;
        Validator::new(&schema, document.file_name.clone()).validate(&document.document)?;
        document.validated = true;
        Ok(document)
    }

    /// Parse without schema validation.
    ///
    /// Text derivation still rejects unknown markup, but attribute values and
    /// element placement are not checked up front.
    pub fn parse_unvalidated(source: &'input LicenseXmlSource) -> Result<Self> {
        let file_name = source.file_name();
        tracing::debug!(file = %file_name, "Parsing license XML");
        let document = Document::parse_with_options(
            source.text(),
            ParsingOptions {
                allow_dtd: false,
                ..ParsingOptions::default()
            },
        )?;
        Ok(Self {
            file_name,
            document,
            validated: false,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// True when the document passed schema validation.
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub fn root(&self) -> Node<'_, 'input> {
        self.document.root_element()
    }

    /// All licenses, in document order.
    pub fn licenses(&self) -> Result<Vec<LicenseRecord>> {
        extract_licenses(self.root())
    }

    /// All exceptions, in document order.
    pub fn exceptions(&self) -> Result<Vec<ExceptionRecord>> {
        extract_exceptions(self.root())
    }

    /// Licenses and exceptions together.
    pub fn contents(&self) -> Result<LicenseXmlContents> {
        Ok(LicenseXmlContents {
            licenses: self.licenses()?,
            exceptions: self.exceptions()?,
        })
    }
}

/// Read, validate and extract one file.
///
/// # Arguments
/// * `path` - The License XML file
/// * `schemas` - Schema provider to validate with
pub fn load_file_with(
    path: impl AsRef<Path>,
    schemas: &SchemaProvider,
) -> Result<LicenseXmlContents> {
    let source = LicenseXmlSource::read(path)?;
    LicenseXmlDocument::parse(&source, schemas)?.contents()
}

/// Read, validate and extract one file with the process-wide schema.
pub fn load_file(path: impl AsRef<Path>) -> Result<LicenseXmlContents> {
    load_file_with(path, global_schema_provider())
}
