//! XML utility functions for navigating roxmltree DOM trees.

use roxmltree::Node;

/// Get the tag name without namespace prefix.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use spdx_license_xml::xml::get_tag_name;
///
/// let xml = r#"<SPDXLicenseCollection xmlns="http://www.spdx.org/license"><license/></SPDXLicenseCollection>"#;
/// let doc = Document::parse(xml).unwrap();
/// let license = doc.root_element().first_element_child().unwrap();
/// assert_eq!(get_tag_name(license), "license");
/// ```
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Check if a node is an element with a specific tag name.
pub fn has_tag(node: Node<'_, '_>, tag: &str) -> bool {
    node.is_element() && get_tag_name(node) == tag
}

/// Get an attribute value from a node.
pub fn get_attribute<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute(name)
}

/// Get all element children of a node (excludes text nodes, comments, etc.).
pub fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

/// Find all descendant elements with the given tag name, in document order.
///
/// The node itself is never included.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use spdx_license_xml::xml::find_descendants;
///
/// let xml = r#"<license><crossRefs><crossRef>a</crossRef><crossRef>b</crossRef></crossRefs></license>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(find_descendants(doc.root_element(), "crossRef").count(), 2);
/// ```
pub fn find_descendants<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.descendants()
        .skip(1)
        .filter(move |n| has_tag(*n, tag))
}

/// Describe the parent element of a node for error messages, e.g. `<text>`.
pub fn node_context(node: Node<'_, '_>) -> Option<String> {
    node.parent_element()
        .map(|p| format!("<{}>", get_tag_name(p)))
}

/// A 1-based line and column inside the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlPosition {
    pub line: u32,
    pub column: u32,
}

/// Source position where a node starts.
pub fn text_position(node: Node<'_, '_>) -> XmlPosition {
    let pos = node.document().text_pos_at(node.range().start);
    XmlPosition {
        line: pos.row,
        column: pos.col,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    #[test]
    fn test_get_tag_name_with_namespace() {
        let xml = r#"<ns:root xmlns:ns="http://www.spdx.org/license"><ns:child/></ns:root>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(get_tag_name(doc.root_element()), "root");
    }

    #[test]
    fn test_has_tag() {
        let xml = r#"<optional/>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element();

        assert!(has_tag(root, "optional"));
        assert!(!has_tag(root, "alt"));
    }

    #[test]
    fn test_get_attribute() {
        let xml = r#"<alt name="copyright" match=".+"/>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element();

        assert_eq!(get_attribute(root, "name"), Some("copyright"));
        assert_eq!(get_attribute(root, "spacing"), None);
    }

    #[test]
    fn test_element_children() {
        let xml = r#"<list>text<item/>more<item/><!-- c --></list>"#;
        let doc = Document::parse(xml).unwrap();

        let children: Vec<_> = element_children(doc.root_element()).collect();
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_find_descendants_excludes_self_and_keeps_order() {
        let xml = r#"<notes><p><notes>inner</notes></p><notes>second</notes></notes>"#;
        let doc = Document::parse(xml).unwrap();

        let found: Vec<_> = find_descendants(doc.root_element(), "notes")
            .map(|n| n.text().unwrap_or_default())
            .collect();
        assert_eq!(found, vec!["inner", "second"]);
    }

    #[test]
    fn test_node_context() {
        let xml = r#"<text><p><bogus/></p></text>"#;
        let doc = Document::parse(xml).unwrap();
        let bogus = doc
            .descendants()
            .find(|n| has_tag(*n, "bogus"))
            .unwrap();

        assert_eq!(node_context(bogus), Some("<p>".to_string()));
        assert_eq!(node_context(doc.root_element()), None);
    }

    #[test]
    fn test_text_position() {
        let xml = "<text>\n  <p>x</p>\n</text>";
        let doc = Document::parse(xml).unwrap();
        let p = doc.descendants().find(|n| has_tag(*n, "p")).unwrap();

        assert_eq!(text_position(p), XmlPosition { line: 2, column: 3 });
    }
}
