//! Configuration constants and schema source configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Canonical location of the Listed License XML schema.
pub const LICENSE_XML_SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/spdx/license-list-XML/master/schema/ListedLicense.xsd";

/// Environment variable holding an explicit schema file path.
///
/// When set, neither the network nor the packaged copy is consulted.
pub const SCHEMA_PATH_ENV: &str = "LISTED_LICENSE_SCHEMA";

/// Environment variable that disables the network schema fetch.
pub const SCHEMA_OFFLINE_ENV: &str = "LISTED_LICENSE_SCHEMA_OFFLINE";

/// HTTP timeout in seconds for the schema download.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Indentation emitted per list nesting level in text and template output.
pub const INDENT_STRING: &str = "   ";

/// Maximum number of characters matched by an implicit copyright alternative.
pub const MAX_COPYRIGHT_LENGTH: usize = 5000;

/// Maximum number of characters matched by an implicit bullet alternative.
pub const MAX_BULLET_LENGTH: usize = 20;

/// Name of the implicit alternative produced by `<copyrightText>`.
pub const COPYRIGHT_ALT_NAME: &str = "copyright";

/// Name of the implicit alternative produced by `<bullet>`.
pub const BULLET_ALT_NAME: &str = "bullet";

/// CSS class wrapping optional regions in the HTML fragment.
pub const OPTIONAL_TEXT_CLASS: &str = "optional-license-text";

/// CSS class wrapping replaceable regions in the HTML fragment.
pub const REPLACEABLE_TEXT_CLASS: &str = "replaceable-license-text";

/// Match pattern of the implicit copyright alternative.
#[must_use]
pub fn copyright_alt_match() -> String {
    format!(".{{0,{MAX_COPYRIGHT_LENGTH}}}")
}

/// Match pattern of the implicit bullet alternative.
#[must_use]
pub fn bullet_alt_match() -> String {
    format!(".{{0,{MAX_BULLET_LENGTH}}}")
}

/// Element and attribute names of the License XML format.
pub mod names {
    pub const LICENSE: &str = "license";
    pub const EXCEPTION: &str = "exception";
    pub const TEXT: &str = "text";
    pub const NOTES: &str = "notes";
    pub const CROSS_REF: &str = "crossRef";
    pub const STANDARD_LICENSE_HEADER: &str = "standardLicenseHeader";
    pub const COPYRIGHT_TEXT: &str = "copyrightText";
    pub const TITLE_TEXT: &str = "titleText";
    pub const OPTIONAL: &str = "optional";
    pub const ALT: &str = "alt";
    pub const BREAK: &str = "br";
    pub const PARAGRAPH: &str = "p";
    pub const LIST: &str = "list";
    pub const ITEM: &str = "item";
    pub const BULLET: &str = "bullet";

    pub const ATTR_ID: &str = "licenseId";
    pub const ATTR_NAME: &str = "name";
    pub const ATTR_DEPRECATED_VERSION: &str = "deprecatedVersion";
    pub const ATTR_OSI_APPROVED: &str = "isOsiApproved";
    pub const ATTR_FSF_LIBRE: &str = "isFsfLibre";
    pub const ATTR_ALT_NAME: &str = "name";
    pub const ATTR_ALT_MATCH: &str = "match";
    pub const ATTR_SPACING: &str = "spacing";
}

/// Where the License XML schema is loaded from.
///
/// Sources are tried in priority order: explicit override path, network URL,
/// packaged copy.
#[derive(Debug, Clone)]
pub struct SchemaConfig {
    pub override_path: Option<PathBuf>,
    pub url: Option<String>,
    pub timeout: Duration,
}

impl SchemaConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Self {
        let override_path = std::env::var_os(SCHEMA_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let offline = std::env::var(SCHEMA_OFFLINE_ENV)
            .ok()
            .map(|v| v != "false" && v != "0" && !v.is_empty())
            .unwrap_or(false);

        Self {
            override_path,
            url: (!offline).then(|| LICENSE_XML_SCHEMA_URL.to_string()),
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
        }
    }

    /// Configuration that only uses the packaged schema.
    pub fn offline() -> Self {
        Self {
            override_path: None,
            url: None,
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
        }
    }

    pub fn with_override_path(mut self, path: impl AsRef<Path>) -> Self {
        self.override_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn without_url(mut self) -> Self {
        self.url = None;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            override_path: None,
            url: Some(LICENSE_XML_SCHEMA_URL.to_string()),
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implicit_alt_patterns() {
        assert_eq!(copyright_alt_match(), ".{0,5000}");
        assert_eq!(bullet_alt_match(), ".{0,20}");
    }

    #[test]
    fn test_offline_config_has_no_url() {
        let config = SchemaConfig::offline();
        assert!(config.url.is_none());
        assert!(config.override_path.is_none());
    }

    #[test]
    fn test_default_config_uses_canonical_url() {
        let config = SchemaConfig::default();
        assert_eq!(config.url.as_deref(), Some(LICENSE_XML_SCHEMA_URL));
        assert_eq!(config.timeout, Duration::from_secs(HTTP_TIMEOUT_SECS));
    }

    #[test]
    fn test_builder_overrides() {
        let config = SchemaConfig::offline()
            .with_override_path("/tmp/ListedLicense.xsd")
            .with_url("http://localhost/schema.xsd")
            .with_timeout(Duration::from_secs(2));
        assert_eq!(
            config.override_path.as_deref(),
            Some(Path::new("/tmp/ListedLicense.xsd"))
        );
        assert_eq!(config.url.as_deref(), Some("http://localhost/schema.xsd"));
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert!(config.without_url().url.is_none());
    }
}
