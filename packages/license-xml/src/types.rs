//! Records extracted from License XML documents.
//!
//! Field names serialize in camelCase to match the SPDX license list data
//! model (`licenseText`, `seeAlso`, ...).

use serde::{Deserialize, Serialize};

use crate::text::DerivedText;

/// A license with its three derived text artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    /// SPDX identifier (e.g., "MIT").
    pub id: String,

    /// Display name.
    pub name: String,

    /// Notes joined with `"; "`, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Cross-reference URLs in document order.
    #[serde(default)]
    pub see_also: Vec<String>,

    pub deprecated: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated_version: Option<String>,

    pub osi_approved: bool,

    pub fsf_libre: bool,

    pub license_text: String,

    pub license_template: String,

    pub license_text_html: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_license_header: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_license_header_template: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_license_header_html: Option<String>,
}

impl LicenseRecord {
    /// Cross references with their stable display order.
    pub fn cross_refs(&self) -> impl Iterator<Item = CrossRef<'_>> {
        cross_refs(&self.see_also)
    }

    /// Set the body artifacts.
    pub fn set_text(&mut self, derived: DerivedText) {
        self.license_text = derived.text;
        self.license_template = derived.template;
        self.license_text_html = derived.html;
    }

    /// Set the header artifacts.
    pub fn set_header(&mut self, derived: DerivedText) {
        self.standard_license_header = Some(derived.text);
        self.standard_license_header_template = Some(derived.template);
        self.standard_license_header_html = Some(derived.html);
    }
}

/// A license exception with its three derived text artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionRecord {
    pub id: String,

    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(default)]
    pub see_also: Vec<String>,

    pub deprecated: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated_version: Option<String>,

    pub license_exception_text: String,

    pub license_exception_template: String,

    pub exception_text_html: String,
}

impl ExceptionRecord {
    /// Cross references with their stable display order.
    pub fn cross_refs(&self) -> impl Iterator<Item = CrossRef<'_>> {
        cross_refs(&self.see_also)
    }

    /// Set the body artifacts.
    pub fn set_text(&mut self, derived: DerivedText) {
        self.license_exception_text = derived.text;
        self.license_exception_template = derived.template;
        self.exception_text_html = derived.html;
    }
}

/// A cross-reference URL and its position among the record's references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossRef<'a> {
    pub url: &'a str,
    pub order: usize,
}

fn cross_refs(urls: &[String]) -> impl Iterator<Item = CrossRef<'_>> {
    urls.iter()
        .enumerate()
        .map(|(order, url)| CrossRef { url, order })
}

/// All records from one document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LicenseXmlContents {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<LicenseRecord>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<ExceptionRecord>,
}

impl LicenseXmlContents {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.licenses.is_empty() && self.exceptions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cross_ref_order() {
        let record = LicenseRecord {
            see_also: vec!["https://a.example".to_string(), "https://b.example".to_string()],
            ..LicenseRecord::default()
        };
        let refs: Vec<_> = record.cross_refs().collect();
        assert_eq!(
            refs,
            vec![
                CrossRef {
                    url: "https://a.example",
                    order: 0
                },
                CrossRef {
                    url: "https://b.example",
                    order: 1
                },
            ]
        );
    }

    #[test]
    fn test_license_serializes_camel_case() {
        let mut record = LicenseRecord {
            id: "MIT".to_string(),
            name: "MIT License".to_string(),
            osi_approved: true,
            ..LicenseRecord::default()
        };
        record.set_text(DerivedText {
            text: "text".to_string(),
            template: "template".to_string(),
            html: "<p>html</p>".to_string(),
        });

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "MIT");
        assert_eq!(json["osiApproved"], true);
        assert_eq!(json["licenseTextHtml"], "<p>html</p>");
        assert_eq!(json["seeAlso"], serde_json::json!([]));
        assert!(json.get("comment").is_none());
        assert!(json.get("standardLicenseHeader").is_none());
    }

    #[test]
    fn test_exception_has_no_license_only_fields() {
        let record = ExceptionRecord {
            id: "Classpath-exception-2.0".to_string(),
            ..ExceptionRecord::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("osiApproved").is_none());
        assert!(json.get("fsfLibre").is_none());
        assert!(json.get("licenseExceptionText").is_some());
    }
}
