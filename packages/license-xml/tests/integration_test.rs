//! End-to-end tests: License XML files through validation, extraction and
//! text derivation, using the fixtures in `tests/fixtures`.

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use regex::Regex;

use spdx_license_xml::document::{LicenseXmlDocument, LicenseXmlSource};
use spdx_license_xml::{
    load_file_with, LicenseRecord, LicenseXmlContents, LicenseXmlError, SchemaProvider,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load(name: &str) -> LicenseXmlContents {
    let schemas = SchemaProvider::packaged();
    load_file_with(fixture(name), &schemas)
        .unwrap_or_else(|e| panic!("Failed to load {name}: {e}"))
}

fn license<'a>(contents: &'a LicenseXmlContents, id: &str) -> &'a LicenseRecord {
    contents
        .licenses
        .iter()
        .find(|l| l.id == id)
        .unwrap_or_else(|| panic!("license {id} not found"))
}

/// Replace variable tokens by their original text and drop optional markers.
fn strip_template(template: &str) -> String {
    let var = Regex::new(r#"<<var;name="[^"]*";original="([^"]*)";match="[^"]*">>"#).unwrap();
    var.replace_all(template, "$1")
        .replace("<<beginOptional>>", "")
        .replace("<<endOptional>>", "")
}

#[test]
fn test_license_records() {
    let contents = load("test-license.xml");
    assert_eq!(contents.licenses.len(), 2);
    assert_eq!(contents.exceptions.len(), 1);

    let test = license(&contents, "test");
    assert_eq!(test.name, "Test License");
    assert!(test.osi_approved);
    assert!(!test.fsf_libre);
    assert!(!test.deprecated);
    assert_eq!(test.comment, None);
    assert_eq!(
        test.see_also,
        vec![
            "https://example.org/test-license",
            "https://example.org/test-license-2"
        ]
    );

    let deprecated = license(&contents, "test-dep");
    assert!(deprecated.deprecated);
    assert_eq!(deprecated.deprecated_version.as_deref(), Some("2.2"));
    assert_eq!(deprecated.comment.as_deref(), Some("Test dep note"));
    assert_eq!(deprecated.license_text, "Deprecated text\n\n");
    assert_eq!(deprecated.standard_license_header, None);
}

#[test]
fn test_license_text() {
    let contents = load("test-license.xml");
    let test = license(&contents, "test");
    assert_eq!(
        test.license_text,
        "Test Copyright\n\nparagraph 1\n\n   1.\n   List item 1\n\n   2.\n   List item 2\n\n\
         Last Paragraph Alternate Text Non matching line. Optional text\n\n"
    );
}

#[test]
fn test_license_template() {
    let contents = load("test-license.xml");
    let template = &license(&contents, "test").license_template;
    assert_eq!(
        template.as_str(),
        concat!(
            r#"<<var;name="copyright";original="Test Copyright  ";match=".{0,5000}">>"#,
            "\nparagraph 1\n\n   ",
            r#"<<var;name="bullet";original="1.";match=".{0,20}">>"#,
            "\n   List item 1\n\n   ",
            r#"<<var;name="bullet";original="2.";match=".{0,20}">>"#,
            "\n   List item 2\n\nLast Paragraph ",
            r#"<<var;name="alttest";original="Alternate Text";match=".+">>"#,
            " Non matching line.<<beginOptional>> Optional text<<endOptional>>\n\n",
        )
    );
}

#[test]
fn test_license_html() {
    let contents = load("test-license.xml");
    let html = &license(&contents, "test").license_text_html;
    assert!(html.contains("<p>paragraph 1</p>"));
    assert!(html.contains("<ul style=\"list-style:none\">"));
    assert!(html.contains(
        "<var class=\"replaceable-license-text\"><span title=\"can be replaced with the pattern .+\">Alternate Text</span></var>"
    ));
    assert!(html.contains("<span class=\"optional-license-text\">Optional text</span>"));
    assert!(
        html.contains("<div class=\"replaceable-license-text\">"),
        "copyright region holding a paragraph renders as a block"
    );
}

#[test]
fn test_license_header() {
    let contents = load("test-license.xml");
    let test = license(&contents, "test");
    assert_eq!(
        test.standard_license_header.as_deref(),
        Some("Copyright [yyyy] Test header")
    );
    assert_eq!(
        test.standard_license_header_template.as_deref(),
        Some(r#"Copyright <<var;name="copyrightHolder";original="[yyyy]";match=".+">> Test header"#)
    );
    assert_eq!(
        test.standard_license_header_html.as_deref(),
        Some(
            "Copyright <var class=\"replaceable-license-text\"><span title=\"can be replaced with the pattern .+\">[yyyy]</span></var> Test header"
        )
    );
}

#[test]
fn test_exception_record() {
    let contents = load("test-license.xml");
    let exception = &contents.exceptions[0];
    assert_eq!(exception.id, "test-ex");
    assert_eq!(exception.name, "Test Exception");
    assert_eq!(exception.comment.as_deref(), Some("Test note exception"));
    assert_eq!(exception.see_also, vec!["https://example.org/test-exception"]);
    assert_eq!(exception.license_exception_text, "Exception text\n\n");
    assert_eq!(exception.license_exception_template, "Exception text\n\n");
    assert_eq!(exception.exception_text_html, "<p>Exception text</p>\n");
}

#[test]
fn test_optional_annotations() {
    let contents = load("optional-annotations.xml");
    let record = &contents.licenses[0];
    assert_eq!(
        record.license_text,
        "before optionalNone optional textafter optional.\n\n\
         before optional Before optional textafter optional.\n\n\
         before optionalAfter optional text after optional.\n\n\
         before optional Both optional text after optional.\n\n\
         before optional Default optional text after optional.\n\n\
         Version 1.0, final.\n\n\
         Version 2.0, or later.\n\n\
         Release 1.5, stable.\n\n"
    );

    let template = &record.license_template;
    for line in [
        "before optional<<beginOptional>>None optional text<<endOptional>>after optional.",
        "before optional<<beginOptional>> Before optional text<<endOptional>>after optional.",
        "before optional<<beginOptional>>After optional text <<endOptional>>after optional.",
        "before optional<<beginOptional>> Both optional text <<endOptional>>after optional.",
        "before optional<<beginOptional>> Default optional text<<endOptional>> after optional.",
        r#"Version 1.<<var;name="minor";original="0";match="\d+">>, final."#,
        "Version<<beginOptional>> 2<<endOptional>><<beginOptional>>.0<<endOptional>>, or later.",
        r#"Release<<beginOptional>> 1<<endOptional>><<var;name="patch";original=".5";match="\.\d+">>, stable."#,
    ] {
        assert!(template.contains(line), "missing {line:?} in {template:?}");
    }
}

#[test]
fn test_nested_lists() {
    let contents = load("nested-lists.xml");
    let record = &contents.licenses[0];
    assert_eq!(
        record.license_text,
        "TEST PUBLIC LICENSE\n\nTerms and Conditions.\n\n\
         \x20  0. Definitions.\n\
         \x20     a) The \"Program\" means the work.\n\
         \x20     b) A covered work.\n\
         \x20  1. Source Code.\n\
         END OF TERMS AND CONDITIONS\n\n"
    );

    let html = &record.license_text_html;
    assert_eq!(html.matches("<ul style=\"list-style:none\">").count(), 2);
    assert_eq!(html.matches("</ul>").count(), 2);
    assert_eq!(html.matches("<li>").count(), 4);
    assert!(html.contains(
        "<var class=\"replaceable-license-text\"><span title=\"can be replaced with the pattern .{0,20}\">0.</span></var>"
    ));
    assert!(html.contains("A <span class=\"optional-license-text\">covered</span> work."));
    assert!(html.contains("The &quot;Program&quot; means the work."));
}

#[test]
fn test_dashed_title_lines_are_optional() {
    let contents = load("dashed-title.xml");
    let record = &contents.licenses[0];
    let dashes = "-".repeat(64);
    assert_eq!(
        record.license_text,
        format!("{dashes} TEST PROTECTION LICENSE {dashes}\n\nTerms follow.\n\n")
    );

    let modification_line = Regex::new(r"<<beginOptional>>\s?-{64}<<endOptional>>").unwrap();
    assert_eq!(
        modification_line
            .find_iter(&record.license_template)
            .count(),
        2
    );
    let html = &record.license_text_html;
    assert_eq!(html.matches("<div class=\"optional-license-text\">").count(), 1);
    assert_eq!(html.matches("<span class=\"optional-license-text\">").count(), 2);
}

#[test]
fn test_optional_markers_are_paired() {
    for name in [
        "test-license.xml",
        "optional-annotations.xml",
        "nested-lists.xml",
        "dashed-title.xml",
    ] {
        let contents = load(name);
        for record in &contents.licenses {
            let template = &record.license_template;
            assert_eq!(
                template.matches("<<beginOptional>>").count(),
                template.matches("<<endOptional>>").count(),
                "unbalanced optional markers in {}",
                record.id
            );
        }
    }

    let contents = load("nested-lists.xml");
    assert_eq!(
        contents.licenses[0]
            .license_template
            .matches("<<beginOptional>>")
            .count(),
        3
    );
}

#[test]
fn test_template_round_trips_to_plain_text() {
    for name in ["optional-annotations.xml", "nested-lists.xml"] {
        let contents = load(name);
        let record = &contents.licenses[0];
        assert_eq!(
            strip_template(&record.license_template),
            record.license_text,
            "round trip of {name}"
        );
    }
}

#[test]
fn test_variable_names_in_template() {
    let contents = load("test-license.xml");
    let template = &license(&contents, "test").license_template;
    let names: Vec<_> = Regex::new(r#"<<var;name="([^"]*)""#)
        .unwrap()
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .collect();
    assert_eq!(names, vec!["copyright", "bullet", "bullet", "alttest"]);
}

#[test]
fn test_non_empty_break_fails_derivation() {
    let schemas = SchemaProvider::packaged();
    let err = load_file_with(fixture("invalid/non-empty-break.xml"), &schemas).unwrap_err();
    assert!(matches!(
        err,
        LicenseXmlError::Structural(ref message) if message.contains("non-empty break element <br>")
    ));
    assert!(err.is_document_error());
}

#[test]
fn test_derivation_is_idempotent() {
    let source = LicenseXmlSource::read(fixture("nested-lists.xml")).unwrap();
    let schemas = SchemaProvider::packaged();
    let document = LicenseXmlDocument::parse(&source, &schemas).unwrap();
    assert_eq!(document.licenses().unwrap(), document.licenses().unwrap());
}

#[test]
fn test_missing_text_is_structural_error() {
    let schemas = SchemaProvider::packaged();
    let err = load_file_with(fixture("invalid/missing-text.xml"), &schemas).unwrap_err();
    assert!(matches!(err, LicenseXmlError::Structural(_)));
    assert_eq!(
        err.to_string(),
        "Invalid license XML structure: Invalid license XML - expected 1, found 0 <text> elements in <license> no-text"
    );
}

#[test]
fn test_bad_spacing_fails_validation() {
    let schemas = SchemaProvider::packaged();
    let err = load_file_with(fixture("invalid/bad-spacing.xml"), &schemas).unwrap_err();
    assert!(matches!(
        err,
        LicenseXmlError::SchemaViolation { ref file, line: 5, .. } if file == "bad-spacing.xml"
    ));

    // Without the schema the deriver still rejects the value.
    let source = LicenseXmlSource::read(fixture("invalid/bad-spacing.xml")).unwrap();
    let document = LicenseXmlDocument::parse_unvalidated(&source).unwrap();
    assert!(!document.is_validated());
    let err = document.licenses().unwrap_err();
    assert!(matches!(
        err,
        LicenseXmlError::MalformedAttribute { ref attribute, .. } if attribute == "spacing"
    ));
}

#[test]
fn test_unknown_element() {
    let schemas = SchemaProvider::packaged();
    let err = load_file_with(fixture("invalid/unknown-element.xml"), &schemas).unwrap_err();
    assert!(matches!(err, LicenseXmlError::SchemaViolation { .. }));

    let source = LicenseXmlSource::read(fixture("invalid/unknown-element.xml")).unwrap();
    let document = LicenseXmlDocument::parse_unvalidated(&source).unwrap();
    let err = document.licenses().unwrap_err();
    assert_eq!(err.to_string(), "Unknown license element tag name <bold> in <p>");
}

#[test]
fn test_malformed_xml() {
    let schemas = SchemaProvider::packaged();
    let err = load_file_with(fixture("invalid/malformed.xml"), &schemas).unwrap_err();
    assert!(matches!(err, LicenseXmlError::XmlParse(_)));
    assert!(err.is_document_error());
}

#[test]
fn test_json_output_shape() {
    let contents = load("test-license.xml");
    let json = serde_json::to_value(&contents).unwrap();
    let test = &json["licenses"][0];
    assert_eq!(test["id"], "test");
    assert_eq!(test["osiApproved"], true);
    assert_eq!(test["seeAlso"][1], "https://example.org/test-license-2");
    assert!(test.get("comment").is_none());
    assert_eq!(json["exceptions"][0]["licenseExceptionText"], "Exception text\n\n");
}
