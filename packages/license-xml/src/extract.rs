//! Extraction of license and exception records from a document tree.

use roxmltree::Node;

use crate::config::names::{
    ATTR_DEPRECATED_VERSION, ATTR_FSF_LIBRE, ATTR_ID, ATTR_NAME, ATTR_OSI_APPROVED, CROSS_REF,
    EXCEPTION, LICENSE, NOTES, STANDARD_LICENSE_HEADER, TEXT,
};
use crate::error::{LicenseXmlError, Result};
use crate::text::{derive, DerivedText, Traversal};
use crate::types::{ExceptionRecord, LicenseRecord};
use crate::xml::{find_descendants, get_attribute};

/// Separator between notes in a record comment.
const NOTES_SEPARATOR: &str = "; ";

/// Separator between header blocks in the HTML header.
const HTML_HEADER_SEPARATOR: &str = "<br />\n";

/// Extract every `<license>` below `root`, in document order.
pub fn extract_licenses(root: Node<'_, '_>) -> Result<Vec<LicenseRecord>> {
    find_descendants(root, LICENSE).map(extract_license).collect()
}

/// Extract every `<exception>` below `root`, in document order.
pub fn extract_exceptions(root: Node<'_, '_>) -> Result<Vec<ExceptionRecord>> {
    find_descendants(root, EXCEPTION)
        .map(extract_exception)
        .collect()
}

/// Extract one `<license>` element.
pub fn extract_license(element: Node<'_, '_>) -> Result<LicenseRecord> {
    let common = CommonFields::read(element)?;
    tracing::debug!(id = %common.id, "Extracting license");

    let mut record = LicenseRecord {
        id: common.id,
        name: common.name,
        comment: common.comment,
        see_also: common.see_also,
        deprecated: common.deprecated_version.is_some(),
        deprecated_version: common.deprecated_version,
        osi_approved: flag(element, ATTR_OSI_APPROVED),
        fsf_libre: flag(element, ATTR_FSF_LIBRE),
        ..LicenseRecord::default()
    };
    record.set_text(DerivedText::derive(common.text, Traversal::license_body)?);
    if let Some(header) = license_header(element)? {
        record.set_header(header);
    }
    Ok(record)
}

/// Extract one `<exception>` element.
pub fn extract_exception(element: Node<'_, '_>) -> Result<ExceptionRecord> {
    let common = CommonFields::read(element)?;
    tracing::debug!(id = %common.id, "Extracting exception");

    let mut record = ExceptionRecord {
        id: common.id,
        name: common.name,
        comment: common.comment,
        see_also: common.see_also,
        deprecated: common.deprecated_version.is_some(),
        deprecated_version: common.deprecated_version,
        ..ExceptionRecord::default()
    };
    record.set_text(DerivedText::derive(common.text, Traversal::license_body)?);
    Ok(record)
}

/// Fields shared by licenses and exceptions.
struct CommonFields<'a, 'input> {
    id: String,
    name: String,
    deprecated_version: Option<String>,
    comment: Option<String>,
    see_also: Vec<String>,
    text: Node<'a, 'input>,
}

impl<'a, 'input> CommonFields<'a, 'input> {
    fn read(element: Node<'a, 'input>) -> Result<Self> {
        Ok(Self {
            id: get_attribute(element, ATTR_ID)
                .unwrap_or_default()
                .to_string(),
            name: get_attribute(element, ATTR_NAME)
                .unwrap_or_default()
                .to_string(),
            deprecated_version: get_attribute(element, ATTR_DEPRECATED_VERSION)
                .map(str::to_string),
            comment: comment(element)?,
            see_also: find_descendants(element, CROSS_REF)
                .map(|node| node.text().unwrap_or_default().trim().to_string())
                .collect(),
            text: single_text_element(element)?,
        })
    }
}

/// The record's one `<text>` element.
fn single_text_element<'a, 'input>(element: Node<'a, 'input>) -> Result<Node<'a, 'input>> {
    let texts: Vec<_> = find_descendants(element, TEXT).collect();
    match texts.as_slice() {
        [text] => Ok(*text),
        _ => Err(LicenseXmlError::Structural(format!(
            "Invalid license XML - expected 1, found {} <{TEXT}> elements in <{}> {}",
            texts.len(),
            element.tag_name().name(),
            get_attribute(element, ATTR_ID).unwrap_or_default()
        ))),
    }
}

/// Notes joined in document order, or `None` without notes.
fn comment(element: Node<'_, '_>) -> Result<Option<String>> {
    let notes = find_descendants(element, NOTES)
        .map(|note| derive(note, &Traversal::notes()))
        .collect::<Result<Vec<_>>>()?;
    Ok((!notes.is_empty()).then(|| notes.join(NOTES_SEPARATOR)))
}

/// All header blocks joined, or `None` without headers.
fn license_header(element: Node<'_, '_>) -> Result<Option<DerivedText>> {
    let headers = find_descendants(element, STANDARD_LICENSE_HEADER)
        .map(|header| DerivedText::derive(header, Traversal::header))
        .collect::<Result<Vec<_>>>()?;
    if headers.is_empty() {
        return Ok(None);
    }

    Ok(Some(DerivedText {
        text: join_headers(&headers, |h| h.text.as_str(), "\n"),
        template: join_headers(&headers, |h| h.template.as_str(), "\n"),
        html: join_headers(&headers, |h| h.html.as_str(), HTML_HEADER_SEPARATOR),
    }))
}

fn join_headers(
    headers: &[DerivedText],
    pick: fn(&DerivedText) -> &str,
    separator: &str,
) -> String {
    headers.iter().map(pick).collect::<Vec<_>>().join(separator)
}

/// Boolean attribute; only a case-insensitive `"true"` counts as set.
fn flag(element: Node<'_, '_>, attribute: &str) -> bool {
    get_attribute(element, attribute).is_some_and(|value| value.eq_ignore_ascii_case("true"))
}
