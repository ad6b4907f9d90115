//! Error types for License XML processing.
//!
//! Every failure surfaces as one `LicenseXmlError` at the document boundary.
//! Variants are partitioned so that problems with the document itself
//! (parse, schema, structure) can be told apart from infrastructure failures
//! (I/O, fetching or compiling the schema).

use thiserror::Error;

/// Main error type for the library.
#[derive(Debug, Error)]
pub enum LicenseXmlError {
    /// The file is not well-formed XML.
    #[error("Unable to parse license XML file: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// The document does not conform to the License XML schema.
    #[error("Parsing error in XML file {file} at line {line}, column {column}: {message}")]
    SchemaViolation {
        file: String,
        line: u32,
        column: u32,
        message: String,
    },

    /// Wrong element cardinality or an element used in an invalid shape.
    #[error("Invalid license XML structure: {0}")]
    Structural(String),

    /// Element outside the License XML markup grammar.
    #[error("Unknown license element tag name <{tag_name}>{}", .context.as_ref().map(|c| format!(" in {c}")).unwrap_or_default())]
    UnknownElement {
        tag_name: String,
        context: Option<String>,
    },

    /// Attribute that is missing or carries an invalid value.
    #[error("Invalid attribute '{attribute}' on <{element}>: {message}")]
    MalformedAttribute {
        element: String,
        attribute: String,
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The schema could not be read or compiled.
    #[error("Invalid License XML schema: {0}")]
    SchemaLoad(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to download the schema.
    #[error("Failed to download License XML schema from {url}: {source}")]
    SchemaFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// All retry attempts exhausted.
    #[error("Request failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// Output serialization failed.
    #[error("YAML serialization failed: {0}")]
    YamlSerialization(#[from] serde_yaml_ng::Error),

    /// Output serialization failed.
    #[error("JSON serialization failed: {0}")]
    JsonSerialization(#[from] serde_json::Error),
}

impl LicenseXmlError {
    /// True for errors caused by the document content rather than by the
    /// environment it was loaded in.
    #[must_use]
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            Self::XmlParse(_)
                | Self::SchemaViolation { .. }
                | Self::Structural(_)
                | Self::UnknownElement { .. }
                | Self::MalformedAttribute { .. }
        )
    }
}

/// Result type alias for License XML operations.
pub type Result<T> = std::result::Result<T, LicenseXmlError>;
