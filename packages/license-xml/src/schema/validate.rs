//! Validate a parsed document against a compiled [`Schema`].
//!
//! Content models are matched by tracking the set of child positions a
//! particle can end at, which handles optional and repeated particles
//! without committing early to one interpretation. The first violation stops
//! validation and is reported with its source position.

use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};

use roxmltree::{Document, Node};

use super::model::{
    Builtin, ComplexType, ElementDecl, Particle, ResolvedType, Schema, Term, TypeRef,
    XML_NAMESPACE, XSI_NAMESPACE,
};
use crate::error::{LicenseXmlError, Result};
use crate::xml::{get_tag_name, text_position};

/// Validates documents against one schema, reporting errors for one file.
pub struct Validator<'s> {
    schema: &'s Schema,
    file_name: String,
}

impl<'s> Validator<'s> {
    pub fn new(schema: &'s Schema, file_name: impl Into<String>) -> Self {
        Self {
            schema,
            file_name: file_name.into(),
        }
    }

    /// Validate the whole document.
    ///
    /// # Returns
    /// `Ok(())` when the document conforms, otherwise the first
    /// [`LicenseXmlError::SchemaViolation`] found in document order.
    pub fn validate(&self, doc: &Document<'_>) -> Result<()> {
        let root = doc.root_element();
        let name = get_tag_name(root);
        let decl = self.schema.element(name).ok_or_else(|| {
            self.violation(
                root,
                format!("Cannot find the declaration of element '{name}'."),
            )
        })?;
        self.check_namespace(root)?;
        self.validate_element(root, &decl.type_ref)?;
        tracing::debug!(file = %self.file_name, "Document conforms to schema");
        Ok(())
    }

    fn violation(&self, node: Node<'_, '_>, message: impl Into<String>) -> LicenseXmlError {
        let position = text_position(node);
        LicenseXmlError::SchemaViolation {
            file: self.file_name.clone(),
            line: position.line,
            column: position.column,
            message: message.into(),
        }
    }

    fn check_namespace(&self, node: Node<'_, '_>) -> Result<()> {
        let expected = if self.schema.qualified || node.parent_element().is_none() {
            self.schema.target_namespace()
        } else {
            None
        };
        let actual = node.tag_name().namespace();
        if actual != expected {
            return Err(self.violation(
                node,
                format!(
                    "Element '{}' is in namespace '{}', expected '{}'.",
                    get_tag_name(node),
                    actual.unwrap_or_default(),
                    expected.unwrap_or_default()
                ),
            ));
        }
        Ok(())
    }

    fn validate_element(&self, node: Node<'_, '_>, type_ref: &TypeRef) -> Result<()> {
        let resolved = self.schema.resolve(type_ref).ok_or_else(|| {
            self.violation(
                node,
                format!("Element '{}' has an undefined type.", get_tag_name(node)),
            )
        })?;

        match resolved {
            ResolvedType::Builtin(Builtin::AnyType) => Ok(()),
            ResolvedType::Builtin(_) | ResolvedType::Simple(_) => {
                self.validate_simple_element(node, type_ref)
            }
            ResolvedType::Complex(complex) => self.validate_complex_element(node, complex),
        }
    }

    fn validate_simple_element(&self, node: Node<'_, '_>, type_ref: &TypeRef) -> Result<()> {
        let name = get_tag_name(node);
        if let Some(child) = node.children().find(Node::is_element) {
            return Err(self.violation(
                child,
                format!("Element '{name}' is a simple type, so it must have no element children."),
            ));
        }
        if let Some(attribute) = node
            .attributes()
            .find(|a| !is_ignorable_attribute(a.namespace()))
        {
            return Err(self.violation(
                node,
                format!(
                    "Attribute '{}' is not allowed to appear in element '{name}'.",
                    attribute.name()
                ),
            ));
        }
        let value = text_content(node);
        self.schema
            .check_simple_value(type_ref, &value)
            .map_err(|message| {
                self.violation(node, format!("{message} (element '{name}')."))
            })
    }

    fn validate_complex_element(&self, node: Node<'_, '_>, complex: &ComplexType) -> Result<()> {
        self.validate_attributes(node, complex)?;
        let name = get_tag_name(node);

        if let Some(simple) = &complex.simple_content {
            if let Some(child) = node.children().find(Node::is_element) {
                return Err(self.violation(
                    child,
                    format!("Element '{name}' must have no element children."),
                ));
            }
            let value = text_content(node);
            return self
                .schema
                .check_simple_value(simple, &value)
                .map_err(|message| {
                    self.violation(node, format!("{message} (element '{name}')."))
                });
        }

        if !complex.mixed {
            if let Some(text) = node
                .children()
                .find(|c| c.is_text() && !c.text().unwrap_or_default().trim().is_empty())
            {
                return Err(self.violation(
                    text,
                    format!(
                        "Element '{name}' cannot have character children, because the type's \
                         content type is element-only."
                    ),
                ));
            }
        }

        let children: Vec<Node<'_, '_>> = node.children().filter(Node::is_element).collect();
        let Some(particle) = &complex.content else {
            if let Some(child) = children.first() {
                return Err(self.violation(
                    *child,
                    format!(
                        "Element '{name}' must have no element children, found '{}'.",
                        get_tag_name(*child)
                    ),
                ));
            }
            return Ok(());
        };

        let names: Vec<&str> = children.iter().map(|c| get_tag_name(*c)).collect();
        let matcher = ContentMatcher::new(&names);
        if !matcher.particle_ends(particle, 0).contains(&names.len()) {
            let furthest = matcher.furthest.get();
            return Err(match children.get(furthest) {
                Some(child) => self.violation(
                    *child,
                    format!(
                        "Invalid content was found starting with element '{}' in element '{name}'.",
                        names[furthest]
                    ),
                ),
                None => self.violation(
                    node,
                    format!("The content of element '{name}' is not complete."),
                ),
            });
        }

        let mut decls = HashMap::new();
        collect_decls(particle, &mut decls);
        for child in children {
            self.check_namespace(child)?;
            // Children matched by a wildcard are not validated.
            if let Some(decl) = decls.get(get_tag_name(child)) {
                self.validate_element(child, &decl.type_ref)?;
            }
        }
        Ok(())
    }

    fn validate_attributes(&self, node: Node<'_, '_>, complex: &ComplexType) -> Result<()> {
        let name = get_tag_name(node);
        for attribute in node.attributes() {
            if is_ignorable_attribute(attribute.namespace()) {
                continue;
            }
            let Some(decl) = complex
                .attributes
                .iter()
                .find(|decl| decl.name == attribute.name())
            else {
                if complex.any_attribute {
                    continue;
                }
                return Err(self.violation(
                    node,
                    format!(
                        "Attribute '{}' is not allowed to appear in element '{name}'.",
                        attribute.name()
                    ),
                ));
            };

            if let Some(fixed) = &decl.fixed {
                if attribute.value() != fixed {
                    return Err(self.violation(
                        node,
                        format!(
                            "Value '{}' of attribute '{}' on element '{name}' must be '{fixed}'.",
                            attribute.value(),
                            decl.name
                        ),
                    ));
                }
            }
            self.schema
                .check_simple_value(&decl.type_ref, attribute.value())
                .map_err(|message| {
                    self.violation(
                        node,
                        format!("{message} (attribute '{}' on element '{name}').", decl.name),
                    )
                })?;
        }

        if let Some(missing) = complex
            .attributes
            .iter()
            .find(|decl| decl.required && node.attribute(decl.name.as_str()).is_none())
        {
            return Err(self.violation(
                node,
                format!(
                    "Attribute '{}' must appear on element '{name}'.",
                    missing.name
                ),
            ));
        }
        Ok(())
    }
}

fn is_ignorable_attribute(namespace: Option<&str>) -> bool {
    matches!(namespace, Some(XSI_NAMESPACE | XML_NAMESPACE))
}

fn text_content(node: Node<'_, '_>) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

fn collect_decls<'p>(particle: &'p Particle, decls: &mut HashMap<&'p str, &'p ElementDecl>) {
    match &particle.term {
        Term::Element(decl) => {
            decls.entry(decl.name.as_str()).or_insert(decl);
        }
        Term::Sequence(parts) | Term::Choice(parts) | Term::All(parts) => {
            for part in parts {
                collect_decls(part, decls);
            }
        }
        Term::Any => {}
    }
}

/// Matches a sequence of child element names against a content model.
struct ContentMatcher<'n> {
    names: &'n [&'n str],
    /// Index of the first child no attempted match got past.
    furthest: Cell<usize>,
}

impl<'n> ContentMatcher<'n> {
    fn new(names: &'n [&'n str]) -> Self {
        Self {
            names,
            furthest: Cell::new(0),
        }
    }

    fn consume(&self, start: usize) -> BTreeSet<usize> {
        let end = start + 1;
        if end > self.furthest.get() {
            self.furthest.set(end);
        }
        BTreeSet::from([end])
    }

    /// All positions at which `particle` can stop when started at `start`.
    fn particle_ends(&self, particle: &Particle, start: usize) -> BTreeSet<usize> {
        let mut ends = BTreeSet::new();
        let mut frontier = BTreeSet::from([start]);
        let mut count: u32 = 0;
        loop {
            if count >= particle.min {
                ends.extend(frontier.iter().copied());
            }
            if frontier.is_empty() || particle.max.reached(count) {
                break;
            }
            let mut next = BTreeSet::new();
            for &position in &frontier {
                for end in self.term_ends(&particle.term, position) {
                    // Past the minimum, an occurrence has to consume something.
                    if count >= particle.min && end == position {
                        continue;
                    }
                    next.insert(end);
                }
            }
            frontier = next;
            count = count.saturating_add(1);
        }
        ends
    }

    fn term_ends(&self, term: &Term, start: usize) -> BTreeSet<usize> {
        match term {
            Term::Element(decl) => match self.names.get(start) {
                Some(name) if *name == decl.name => self.consume(start),
                _ => BTreeSet::new(),
            },
            Term::Any => {
                if start < self.names.len() {
                    self.consume(start)
                } else {
                    BTreeSet::new()
                }
            }
            Term::Sequence(parts) => {
                let mut positions = BTreeSet::from([start]);
                for part in parts {
                    positions = positions
                        .iter()
                        .flat_map(|&position| self.particle_ends(part, position))
                        .collect();
                    if positions.is_empty() {
                        break;
                    }
                }
                positions
            }
            Term::Choice(parts) => parts
                .iter()
                .flat_map(|part| self.particle_ends(part, start))
                .collect(),
            Term::All(parts) => {
                let mut ends = BTreeSet::new();
                let mut used = vec![false; parts.len()];
                self.all_ends(parts, &mut used, start, &mut ends);
                ends
            }
        }
    }

    fn all_ends(
        &self,
        parts: &[Particle],
        used: &mut [bool],
        position: usize,
        ends: &mut BTreeSet<usize>,
    ) {
        if parts
            .iter()
            .zip(used.iter())
            .all(|(part, used)| *used || part.min == 0)
        {
            ends.insert(position);
        }
        for index in 0..parts.len() {
            if used[index] {
                continue;
            }
            for end in self.particle_ends(&parts[index], position) {
                if end == position {
                    continue;
                }
                used[index] = true;
                self.all_ends(parts, used, end, ends);
                used[index] = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn packaged() -> Schema {
        Schema::compile(include_str!("../../resources/ListedLicense.xsd")).unwrap()
    }

    fn validate(xml: &str) -> Result<()> {
        let schema = packaged();
        let doc = Document::parse(xml).unwrap();
        Validator::new(&schema, "test.xml").validate(&doc)
    }

    fn violation_message(xml: &str) -> (u32, u32, String) {
        match validate(xml) {
            Err(LicenseXmlError::SchemaViolation {
                line,
                column,
                message,
                ..
            }) => (line, column, message),
            other => unreachable!("expected schema violation, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_license() {
        let xml = r#"<SPDXLicenseCollection xmlns="http://www.spdx.org/license">
  <license licenseId="MIT" name="MIT License" isOsiApproved="true">
    <crossRefs><crossRef>https://opensource.org/licenses/MIT</crossRef></crossRefs>
    <notes>A note</notes>
    <text><p>Permission is <optional spacing="after">hereby</optional> granted
      <alt name="x" match=".+">free</alt><br/></p>
      <list><item><bullet>1.</bullet> First</item><list><item>Nested</item></list></list>
    </text>
  </license>
</SPDXLicenseCollection>"#;
        assert!(validate(xml).is_ok());
    }

    #[test]
    fn test_unknown_element_position() {
        let xml = "<SPDXLicenseCollection xmlns=\"http://www.spdx.org/license\">\n  <license licenseId=\"a\" name=\"b\">\n    <text><bogus/></text>\n  </license>\n</SPDXLicenseCollection>";
        let (line, column, message) = violation_message(xml);
        assert_eq!((line, column), (3, 11));
        assert!(message.contains("'bogus'"));
    }

    #[test]
    fn test_missing_required_attribute() {
        let xml = r#"<SPDXLicenseCollection xmlns="http://www.spdx.org/license"><license name="b"><text>x</text></license></SPDXLicenseCollection>"#;
        let (_, _, message) = violation_message(xml);
        assert_eq!(message, "Attribute 'licenseId' must appear on element 'license'.");
    }

    #[test]
    fn test_invalid_spacing_value() {
        let xml = r#"<SPDXLicenseCollection xmlns="http://www.spdx.org/license"><license licenseId="a" name="b"><text><optional spacing="sideways">x</optional></text></license></SPDXLicenseCollection>"#;
        let (_, _, message) = violation_message(xml);
        assert!(message.contains("sideways"));
        assert!(message.contains("enumeration"));
    }

    #[test]
    fn test_alt_requires_match() {
        let xml = r#"<SPDXLicenseCollection xmlns="http://www.spdx.org/license"><license licenseId="a" name="b"><text><alt name="x">y</alt></text></license></SPDXLicenseCollection>"#;
        let (_, _, message) = violation_message(xml);
        assert!(message.contains("'match'"));
    }

    #[test]
    fn test_list_rejects_text_and_paragraphs() {
        let xml = r#"<SPDXLicenseCollection xmlns="http://www.spdx.org/license"><license licenseId="a" name="b"><text><list><p>x</p></list></text></license></SPDXLicenseCollection>"#;
        let (_, _, message) = violation_message(xml);
        assert!(message.contains("'p'"));

        let xml = r#"<SPDXLicenseCollection xmlns="http://www.spdx.org/license"><license licenseId="a" name="b"><text><list>loose<item>x</item></list></text></license></SPDXLicenseCollection>"#;
        let (_, _, message) = violation_message(xml);
        assert!(message.contains("element-only"));
    }

    #[test]
    fn test_empty_list_is_valid() {
        let xml = r#"<SPDXLicenseCollection xmlns="http://www.spdx.org/license"><license licenseId="a" name="b"><text><list></list></text></license></SPDXLicenseCollection>"#;
        assert!(validate(xml).is_ok());
    }

    #[test]
    fn test_wrong_namespace() {
        let xml = r#"<SPDXLicenseCollection><license licenseId="a" name="b"/></SPDXLicenseCollection>"#;
        let (_, _, message) = violation_message(xml);
        assert!(message.contains("namespace"));
    }

    #[test]
    fn test_unknown_root() {
        let xml = r#"<licenses xmlns="http://www.spdx.org/license"/>"#;
        let (_, _, message) = violation_message(xml);
        assert_eq!(message, "Cannot find the declaration of element 'licenses'.");
    }

    #[test]
    fn test_exception_has_no_header() {
        let xml = r#"<SPDXLicenseCollection xmlns="http://www.spdx.org/license"><exception licenseId="a" name="b"><standardLicenseHeader>h</standardLicenseHeader><text>x</text></exception></SPDXLicenseCollection>"#;
        let (_, _, message) = violation_message(xml);
        assert!(message.contains("'standardLicenseHeader'"));
    }

    #[test]
    fn test_break_content_is_left_to_derivation() {
        let xml = r#"<SPDXLicenseCollection xmlns="http://www.spdx.org/license"><license licenseId="a" name="b"><text>x<br>y</br></text></license></SPDXLicenseCollection>"#;
        assert!(validate(xml).is_ok());
    }

    fn matcher_schema(model: &str) -> Schema {
        let xsd = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="r"><xs:complexType>{model}</xs:complexType></xs:element>
</xs:schema>"#
        );
        Schema::compile(&xsd).unwrap()
    }

    fn accepts(schema: &Schema, xml: &str) -> bool {
        let doc = Document::parse(xml).unwrap();
        Validator::new(schema, "t.xml").validate(&doc).is_ok()
    }

    #[test]
    fn test_sequence_with_optional_repeat() {
        let schema = matcher_schema(
            r#"<xs:sequence>
                 <xs:element name="a" type="xs:string" minOccurs="0" maxOccurs="unbounded"/>
                 <xs:element name="b" type="xs:string"/>
               </xs:sequence>"#,
        );
        assert!(accepts(&schema, "<r><b/></r>"));
        assert!(accepts(&schema, "<r><a/><a/><b/></r>"));
        assert!(!accepts(&schema, "<r><a/></r>"));
        assert!(!accepts(&schema, "<r><b/><a/></r>"));
    }

    #[test]
    fn test_incomplete_content() {
        let schema = matcher_schema(
            r#"<xs:sequence><xs:element name="a" type="xs:string"/></xs:sequence>"#,
        );
        let doc = Document::parse("<r></r>").unwrap();
        let err = Validator::new(&schema, "t.xml").validate(&doc).unwrap_err();
        assert!(matches!(
            err,
            LicenseXmlError::SchemaViolation { ref message, .. }
                if message == "The content of element 'r' is not complete."
        ));
    }

    #[test]
    fn test_all_group_any_order() {
        let schema = matcher_schema(
            r#"<xs:all>
                 <xs:element name="a" type="xs:string"/>
                 <xs:element name="b" type="xs:string" minOccurs="0"/>
               </xs:all>"#,
        );
        assert!(accepts(&schema, "<r><b/><a/></r>"));
        assert!(accepts(&schema, "<r><a/></r>"));
        assert!(!accepts(&schema, "<r><b/></r>"));
        assert!(!accepts(&schema, "<r><a/><a/></r>"));
    }

    #[test]
    fn test_bounded_choice() {
        let schema = matcher_schema(
            r#"<xs:choice minOccurs="2" maxOccurs="3">
                 <xs:element name="a" type="xs:string"/>
                 <xs:element name="b" type="xs:integer"/>
               </xs:choice>"#,
        );
        assert!(accepts(&schema, "<r><a/><b>4</b></r>"));
        assert!(!accepts(&schema, "<r><a/></r>"));
        assert!(!accepts(&schema, "<r><a/><a/><a/><a/></r>"));
        assert!(!accepts(&schema, "<r><a/><b>four</b></r>"));
    }

    #[test]
    fn test_wildcard_children_are_not_validated() {
        let schema = matcher_schema(
            r#"<xs:sequence><xs:any minOccurs="0" maxOccurs="unbounded"/></xs:sequence>"#,
        );
        assert!(accepts(&schema, "<r><anything x=\"1\"><deep/></anything></r>"));
    }
}
