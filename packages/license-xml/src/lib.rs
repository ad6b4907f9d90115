//! SPDX License XML - load, validate and render SPDX License XML.
//!
//! License XML is the markup the SPDX license list is maintained in. Each
//! `<license>` or `<exception>` carries its legal text annotated with optional
//! regions and replaceable (regex-matchable) regions. This crate validates
//! License XML documents against the Listed License schema and derives three
//! artifacts from every text block: plain text, template text and an HTML
//! fragment.
//!
//! # Example
//!
//! ```
//! use spdx_license_xml::{LicenseXmlDocument, LicenseXmlSource, SchemaProvider};
//!
//! let source = LicenseXmlSource::from_text(
//!     "Example.xml",
//!     r#"<SPDXLicenseCollection xmlns="http://www.spdx.org/license">
//!          <license licenseId="Example" name="Example License">
//!            <text>Copyright <alt name="holder" match=".+">the author</alt></text>
//!          </license>
//!        </SPDXLicenseCollection>"#,
//! );
//! let schemas = SchemaProvider::packaged();
//! let document = LicenseXmlDocument::parse(&source, &schemas).unwrap();
//! let licenses = document.licenses().unwrap();
//! let license = &licenses[0];
//!
//! assert_eq!(license.license_text, "Copyright the author");
//! assert_eq!(
//!     license.license_template,
//!     r#"Copyright <<var;name="holder";original="the author";match=".+">>"#
//! );
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Constants, element names and schema source configuration
//! - [`error`]: Error types and Result alias
//! - [`xml`]: XML navigation utilities
//! - [`http`]: HTTP client for fetching the schema
//! - [`schema`]: XSD compilation, validation and the cached schema provider
//! - [`document`]: Reading and parsing License XML files
//! - [`text`]: Plain, template and HTML text derivation
//! - [`extract`]: License and exception record extraction
//! - [`types`]: Record types
//! - [`provider`]: Records from a directory of files
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod http;
pub mod provider;
pub mod schema;
pub mod text;
pub mod types;
pub mod xml;

// Re-export main functions
pub use document::{load_file, load_file_with, LicenseXmlDocument, LicenseXmlSource};

// Re-export commonly used items
pub use config::SchemaConfig;
pub use error::{LicenseXmlError, Result};
pub use provider::XmlLicenseProvider;
pub use schema::{global_schema_provider, SchemaProvider};
pub use text::{derive, DerivedText, RenderMode, Spacing, Traversal};
pub use types::{CrossRef, ExceptionRecord, LicenseRecord, LicenseXmlContents};
