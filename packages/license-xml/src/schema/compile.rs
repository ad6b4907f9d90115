//! Compile an XSD document into a [`Schema`].
//!
//! Only the subset of XML Schema needed for document-shape validation is
//! understood: element declarations, named and anonymous complex and simple
//! types, sequence/choice/all/any particles with occurrence bounds, model and
//! attribute groups, simple and complex content derivation, and the
//! enumeration and pattern facets. Other facets are accepted and ignored.

use std::collections::HashMap;

use regex::Regex;
use roxmltree::{Document, Node, ParsingOptions};

use super::model::{
    AttributeDecl, Builtin, ComplexType, Derivation, ElementDecl, MaxOccurs, Particle, Schema,
    SimpleType, Term, TypeDef, TypeRef, XSD_NAMESPACE,
};
use crate::error::{LicenseXmlError, Result};
use crate::xml::{element_children, get_attribute, get_tag_name};

/// Nesting limit for group and type derivation chains.
const MAX_DEPTH: usize = 64;

impl Schema {
    /// Compile schema source text.
    pub fn compile(xsd: &str) -> Result<Self> {
        let doc = Document::parse_with_options(
            xsd,
            ParsingOptions {
                allow_dtd: true,
                ..ParsingOptions::default()
            },
        )
        .map_err(|e| LicenseXmlError::SchemaLoad(format!("schema is not well-formed XML: {e}")))?;

        let root = doc.root_element();
        if !is_xsd(root, "schema") {
            return Err(LicenseXmlError::SchemaLoad(format!(
                "expected <xs:schema> root element, found <{}>",
                get_tag_name(root)
            )));
        }

        let mut compiler = Compiler::new(root)?;
        compiler.compile_all()?;
        Ok(compiler.schema)
    }
}

fn is_xsd(node: Node<'_, '_>, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(XSD_NAMESPACE)
        && get_tag_name(node) == local_name
}

fn unsupported(node: Node<'_, '_>, what: &str) -> LicenseXmlError {
    LicenseXmlError::SchemaLoad(format!(
        "unsupported schema construct <xs:{}> in {what}",
        get_tag_name(node)
    ))
}

fn required<'a>(node: Node<'a, '_>, attribute: &str) -> Result<&'a str> {
    get_attribute(node, attribute).ok_or_else(|| {
        LicenseXmlError::SchemaLoad(format!(
            "<xs:{}> is missing the '{attribute}' attribute",
            get_tag_name(node)
        ))
    })
}

/// Strip the namespace prefix from a QName reference.
fn local_part(qname: &str) -> &str {
    qname.split_once(':').map_or(qname, |(_, local)| local)
}

fn parse_occurs(node: Node<'_, '_>) -> Result<(u32, MaxOccurs)> {
    let min = match get_attribute(node, "minOccurs") {
        Some(value) => value.trim().parse::<u32>().map_err(|_| {
            LicenseXmlError::SchemaLoad(format!("invalid minOccurs value '{value}'"))
        })?,
        None => 1,
    };
    let max = match get_attribute(node, "maxOccurs").map(str::trim) {
        Some("unbounded") => MaxOccurs::Unbounded,
        Some(value) => MaxOccurs::Bounded(value.parse::<u32>().map_err(|_| {
            LicenseXmlError::SchemaLoad(format!("invalid maxOccurs value '{value}'"))
        })?),
        None => MaxOccurs::Bounded(1),
    };
    if let MaxOccurs::Bounded(max) = max {
        if max < min {
            return Err(LicenseXmlError::SchemaLoad(format!(
                "maxOccurs {max} is smaller than minOccurs {min}"
            )));
        }
    }
    Ok((min, max))
}

fn is_true(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true" | "1"))
}

struct Compiler<'a, 'input> {
    global_elements: HashMap<&'a str, Node<'a, 'input>>,
    global_attributes: HashMap<&'a str, Node<'a, 'input>>,
    named_type_nodes: Vec<(usize, Node<'a, 'input>)>,
    groups: HashMap<&'a str, Node<'a, 'input>>,
    attribute_groups: HashMap<&'a str, Node<'a, 'input>>,
    schema: Schema,
    depth: usize,
}

impl<'a, 'input> Compiler<'a, 'input> {
    fn new(root: Node<'a, 'input>) -> Result<Self> {
        let mut compiler = Self {
            global_elements: HashMap::new(),
            global_attributes: HashMap::new(),
            named_type_nodes: Vec::new(),
            groups: HashMap::new(),
            attribute_groups: HashMap::new(),
            schema: Schema {
                target_namespace: get_attribute(root, "targetNamespace").map(str::to_string),
                qualified: get_attribute(root, "elementFormDefault") == Some("qualified"),
                ..Schema::default()
            },
            depth: 0,
        };

        for child in element_children(root) {
            if child.tag_name().namespace() != Some(XSD_NAMESPACE) {
                continue;
            }
            match get_tag_name(child) {
                "element" => {
                    compiler
                        .global_elements
                        .insert(required(child, "name")?, child);
                }
                "attribute" => {
                    compiler
                        .global_attributes
                        .insert(required(child, "name")?, child);
                }
                "complexType" | "simpleType" => {
                    let name = required(child, "name")?;
                    let index = compiler.reserve_type();
                    compiler.schema.named_types.insert(name.to_string(), index);
                    compiler.named_type_nodes.push((index, child));
                }
                "group" => {
                    compiler.groups.insert(required(child, "name")?, child);
                }
                "attributeGroup" => {
                    compiler
                        .attribute_groups
                        .insert(required(child, "name")?, child);
                }
                "import" | "include" | "redefine" => {
                    tracing::debug!(
                        construct = get_tag_name(child),
                        "Ignoring external schema reference"
                    );
                }
                "annotation" | "notation" => {}
                _ => return Err(unsupported(child, "schema")),
            }
        }

        Ok(compiler)
    }

    fn compile_all(&mut self) -> Result<()> {
        for (index, node) in std::mem::take(&mut self.named_type_nodes) {
            let def = if is_xsd(node, "complexType") {
                TypeDef::Complex(self.complex_type(node)?)
            } else {
                TypeDef::Simple(self.simple_type(node)?)
            };
            self.schema.types[index] = def;
        }

        let names: Vec<&'a str> = self.global_elements.keys().copied().collect();
        for name in names {
            self.global_element(name)?;
        }

        self.check_type_references()?;
        self.merge_derivations()?;
        Ok(())
    }

    fn reserve_type(&mut self) -> usize {
        self.schema
            .types
            .push(TypeDef::Complex(ComplexType::default()));
        self.schema.types.len() - 1
    }

    fn type_ref(&self, context: Node<'_, '_>, qname: &str) -> Result<TypeRef> {
        let prefix = qname.split_once(':').map(|(prefix, _)| prefix);
        let local = local_part(qname);
        if context.lookup_namespace_uri(prefix) == Some(XSD_NAMESPACE) {
            return Builtin::from_local_name(local)
                .map(TypeRef::Builtin)
                .ok_or_else(|| {
                    LicenseXmlError::SchemaLoad(format!("unsupported builtin type 'xs:{local}'"))
                });
        }
        Ok(TypeRef::Named(local.to_string()))
    }

    /// Compile the global element `name`, caching the declaration.
    ///
    /// The declaration is cached before its anonymous type is compiled so that
    /// recursive references terminate.
    fn global_element(&mut self, name: &str) -> Result<ElementDecl> {
        if let Some(decl) = self.schema.elements.get(name) {
            return Ok(decl.clone());
        }
        let node = *self.global_elements.get(name).ok_or_else(|| {
            LicenseXmlError::SchemaLoad(format!("reference to undeclared element '{name}'"))
        })?;

        let (decl, inline) = self.element_decl_shell(node, name)?;
        self.schema.elements.insert(name.to_string(), decl.clone());
        if let Some((index, type_node)) = inline {
            self.fill_inline_type(index, type_node)?;
        }
        Ok(decl)
    }

    fn element_decl_shell(
        &mut self,
        node: Node<'a, 'input>,
        name: &str,
    ) -> Result<(ElementDecl, Option<(usize, Node<'a, 'input>)>)> {
        if let Some(type_name) = get_attribute(node, "type") {
            let type_ref = self.type_ref(node, type_name)?;
            return Ok((
                ElementDecl {
                    name: name.to_string(),
                    type_ref,
                },
                None,
            ));
        }

        let inline = element_children(node)
            .find(|child| is_xsd(*child, "complexType") || is_xsd(*child, "simpleType"));
        match inline {
            Some(type_node) => {
                let index = self.reserve_type();
                Ok((
                    ElementDecl {
                        name: name.to_string(),
                        type_ref: TypeRef::Inline(index),
                    },
                    Some((index, type_node)),
                ))
            }
            None => Ok((
                ElementDecl {
                    name: name.to_string(),
                    type_ref: TypeRef::Builtin(Builtin::AnyType),
                },
                None,
            )),
        }
    }

    fn fill_inline_type(&mut self, index: usize, node: Node<'a, 'input>) -> Result<()> {
        let def = if is_xsd(node, "complexType") {
            TypeDef::Complex(self.complex_type(node)?)
        } else {
            TypeDef::Simple(self.simple_type(node)?)
        };
        self.schema.types[index] = def;
        Ok(())
    }

    fn local_element(&mut self, node: Node<'a, 'input>) -> Result<ElementDecl> {
        if let Some(reference) = get_attribute(node, "ref") {
            return self.global_element(local_part(reference));
        }
        let name = required(node, "name")?;
        let (decl, inline) = self.element_decl_shell(node, name)?;
        if let Some((index, type_node)) = inline {
            self.fill_inline_type(index, type_node)?;
        }
        Ok(decl)
    }

    /// Compile a particle. Returns `None` for annotations.
    fn particle(&mut self, node: Node<'a, 'input>) -> Result<Option<Particle>> {
        if node.tag_name().namespace() != Some(XSD_NAMESPACE) {
            return Err(unsupported(node, "content model"));
        }
        let (min, max) = parse_occurs(node)?;
        let term = match get_tag_name(node) {
            "annotation" => return Ok(None),
            "element" => Term::Element(self.local_element(node)?),
            "sequence" => Term::Sequence(self.particles(node)?),
            "choice" => Term::Choice(self.particles(node)?),
            "all" => Term::All(self.particles(node)?),
            "any" => Term::Any,
            "group" => {
                let reference = required(node, "ref")?;
                self.group_term(local_part(reference))?
            }
            _ => return Err(unsupported(node, "content model")),
        };
        Ok(Some(Particle { term, min, max }))
    }

    fn particles(&mut self, node: Node<'a, 'input>) -> Result<Vec<Particle>> {
        let mut particles = Vec::new();
        for child in element_children(node) {
            if let Some(particle) = self.particle(child)? {
                particles.push(particle);
            }
        }
        Ok(particles)
    }

    fn group_term(&mut self, name: &str) -> Result<Term> {
        let node = *self.groups.get(name).ok_or_else(|| {
            LicenseXmlError::SchemaLoad(format!("reference to undeclared group '{name}'"))
        })?;
        self.enter(name)?;
        let compositor = element_children(node).find(|child| !is_xsd(*child, "annotation"));
        let term = match compositor {
            Some(child) => self
                .particle(child)?
                .map_or(Term::Sequence(Vec::new()), |particle| particle.term),
            None => Term::Sequence(Vec::new()),
        };
        self.depth -= 1;
        Ok(term)
    }

    fn enter(&mut self, name: &str) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(LicenseXmlError::SchemaLoad(format!(
                "group or attribute group '{name}' is nested too deeply"
            )));
        }
        Ok(())
    }

    fn complex_type(&mut self, node: Node<'a, 'input>) -> Result<ComplexType> {
        let mut complex = ComplexType {
            mixed: is_true(get_attribute(node, "mixed")),
            ..ComplexType::default()
        };

        for child in element_children(node) {
            match get_tag_name(child) {
                "annotation" => {}
                "sequence" | "choice" | "all" | "group" => {
                    complex.content = self.particle(child)?;
                }
                "attribute" | "attributeGroup" | "anyAttribute" => {
                    self.attribute_use(child, &mut complex)?;
                }
                "simpleContent" => self.simple_content(child, &mut complex)?,
                "complexContent" => self.complex_content(child, &mut complex)?,
                _ => return Err(unsupported(child, "complexType")),
            }
        }
        Ok(complex)
    }

    fn attribute_use(&mut self, node: Node<'a, 'input>, complex: &mut ComplexType) -> Result<()> {
        match get_tag_name(node) {
            "attribute" => {
                if let Some(decl) = self.attribute(node)? {
                    complex.attributes.push(decl);
                }
            }
            "attributeGroup" => {
                let reference = local_part(required(node, "ref")?);
                let group = *self.attribute_groups.get(reference).ok_or_else(|| {
                    LicenseXmlError::SchemaLoad(format!(
                        "reference to undeclared attribute group '{reference}'"
                    ))
                })?;
                self.enter(reference)?;
                for child in element_children(group) {
                    if !is_xsd(child, "annotation") {
                        self.attribute_use(child, complex)?;
                    }
                }
                self.depth -= 1;
            }
            "anyAttribute" => complex.any_attribute = true,
            _ => return Err(unsupported(node, "attribute list")),
        }
        Ok(())
    }

    /// Compile an attribute use; prohibited attributes yield `None`.
    fn attribute(&mut self, node: Node<'a, 'input>) -> Result<Option<AttributeDecl>> {
        let use_ = get_attribute(node, "use").unwrap_or("optional");
        if use_ == "prohibited" {
            return Ok(None);
        }

        let declaration = match get_attribute(node, "ref") {
            Some(reference) => {
                let name = local_part(reference);
                *self.global_attributes.get(name).ok_or_else(|| {
                    LicenseXmlError::SchemaLoad(format!(
                        "reference to undeclared attribute '{name}'"
                    ))
                })?
            }
            None => node,
        };

        let name = required(declaration, "name")?;
        let type_ref = match get_attribute(declaration, "type") {
            Some(type_name) => self.type_ref(declaration, type_name)?,
            None => match element_children(declaration).find(|c| is_xsd(*c, "simpleType")) {
                Some(simple) => {
                    let index = self.reserve_type();
                    let def = TypeDef::Simple(self.simple_type(simple)?);
                    self.schema.types[index] = def;
                    TypeRef::Inline(index)
                }
                None => TypeRef::Builtin(Builtin::AnySimpleType),
            },
        };

        Ok(Some(AttributeDecl {
            name: name.to_string(),
            type_ref,
            required: use_ == "required",
            fixed: get_attribute(node, "fixed")
                .or_else(|| get_attribute(declaration, "fixed"))
                .map(str::to_string),
        }))
    }

    fn derivation_node(node: Node<'a, 'input>) -> Result<Node<'a, 'input>> {
        element_children(node)
            .find(|child| is_xsd(*child, "extension") || is_xsd(*child, "restriction"))
            .ok_or_else(|| unsupported(node, "type definition"))
    }

    fn simple_content(&mut self, node: Node<'a, 'input>, complex: &mut ComplexType) -> Result<()> {
        let derivation = Self::derivation_node(node)?;
        let base = self.type_ref(derivation, required(derivation, "base")?)?;
        complex.simple_content = Some(base);
        for child in element_children(derivation) {
            match get_tag_name(child) {
                "attribute" | "attributeGroup" | "anyAttribute" => {
                    self.attribute_use(child, complex)?;
                }
                // Facets on simple content restrictions are not enforced.
                _ => {}
            }
        }
        Ok(())
    }

    fn complex_content(&mut self, node: Node<'a, 'input>, complex: &mut ComplexType) -> Result<()> {
        if is_true(get_attribute(node, "mixed")) {
            complex.mixed = true;
        }
        let derivation = Self::derivation_node(node)?;
        let kind = if is_xsd(derivation, "extension") {
            Derivation::Extension
        } else {
            Derivation::Restriction
        };
        // Deriving from anyType adds nothing.
        if let TypeRef::Named(base) = self.type_ref(derivation, required(derivation, "base")?)? {
            complex.base = Some((base, kind));
        }

        for child in element_children(derivation) {
            match get_tag_name(child) {
                "annotation" => {}
                "sequence" | "choice" | "all" | "group" => {
                    complex.content = self.particle(child)?;
                }
                "attribute" | "attributeGroup" | "anyAttribute" => {
                    self.attribute_use(child, complex)?;
                }
                _ => return Err(unsupported(child, "complexContent")),
            }
        }
        Ok(())
    }

    fn simple_type(&mut self, node: Node<'a, 'input>) -> Result<SimpleType> {
        let Some(restriction) = element_children(node).find(|c| is_xsd(*c, "restriction")) else {
            // Lists and unions are accepted without further checking.
            return Ok(SimpleType {
                base: TypeRef::Builtin(Builtin::AnySimpleType),
                enumeration: Vec::new(),
                patterns: Vec::new(),
            });
        };

        let base = match get_attribute(restriction, "base") {
            Some(base) => self.type_ref(restriction, base)?,
            None => TypeRef::Builtin(Builtin::AnySimpleType),
        };

        let mut enumeration = Vec::new();
        let mut patterns = Vec::new();
        for facet in element_children(restriction) {
            match get_tag_name(facet) {
                "enumeration" => enumeration.push(required(facet, "value")?.to_string()),
                "pattern" => {
                    let pattern = required(facet, "value")?;
                    let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
                        LicenseXmlError::SchemaLoad(format!("invalid pattern '{pattern}': {e}"))
                    })?;
                    patterns.push(regex);
                }
                _ => {}
            }
        }

        Ok(SimpleType {
            base,
            enumeration,
            patterns,
        })
    }

    fn check_type_references(&self) -> Result<()> {
        let check = |type_ref: &TypeRef| -> Result<()> {
            match type_ref {
                TypeRef::Named(name) if !self.schema.named_types.contains_key(name) => Err(
                    LicenseXmlError::SchemaLoad(format!("reference to undefined type '{name}'")),
                ),
                _ => Ok(()),
            }
        };

        for decl in self.schema.elements.values() {
            check(&decl.type_ref)?;
        }
        for def in &self.schema.types {
            match def {
                TypeDef::Simple(simple) => check(&simple.base)?,
                TypeDef::Complex(complex) => {
                    if let Some(particle) = &complex.content {
                        check_particle(particle, &check)?;
                    }
                    if let Some(inner) = &complex.simple_content {
                        check(inner)?;
                    }
                    for attribute in &complex.attributes {
                        check(&attribute.type_ref)?;
                    }
                    if let Some((base, _)) = &complex.base {
                        check(&TypeRef::Named(base.clone()))?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Fold named complex bases into their derived types.
    fn merge_derivations(&mut self) -> Result<()> {
        for index in 0..self.schema.types.len() {
            self.merge_type(index, 0)?;
        }
        Ok(())
    }

    fn merge_type(&mut self, index: usize, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(LicenseXmlError::SchemaLoad(
                "circular complex type derivation".to_string(),
            ));
        }
        let (base_name, kind) = match &self.schema.types[index] {
            TypeDef::Complex(ComplexType {
                base: Some((name, kind)),
                ..
            }) => (name.clone(), *kind),
            _ => return Ok(()),
        };
        let Some(&base_index) = self.schema.named_types.get(&base_name) else {
            return Ok(());
        };
        self.merge_type(base_index, depth + 1)?;

        let base = match &self.schema.types[base_index] {
            TypeDef::Complex(base) => base.clone(),
            TypeDef::Simple(_) => {
                return Err(LicenseXmlError::SchemaLoad(format!(
                    "complex content cannot derive from simple type '{base_name}'"
                )))
            }
        };

        if let TypeDef::Complex(derived) = &mut self.schema.types[index] {
            derived.base = None;
            derived.any_attribute |= base.any_attribute;
            let own: Vec<String> = derived.attributes.iter().map(|a| a.name.clone()).collect();
            let inherited = base
                .attributes
                .into_iter()
                .filter(|attribute| !own.contains(&attribute.name));
            let mut attributes: Vec<AttributeDecl> = inherited.collect();
            attributes.append(&mut derived.attributes);
            derived.attributes = attributes;

            if kind == Derivation::Extension {
                derived.mixed |= base.mixed;
                derived.simple_content = derived.simple_content.take().or(base.simple_content);
                derived.content = match (base.content, derived.content.take()) {
                    (Some(base_content), Some(own)) => Some(Particle::once(Term::Sequence(vec![
                        base_content,
                        own,
                    ]))),
                    (base_content, own) => own.or(base_content),
                };
            }
        }
        Ok(())
    }
}

fn check_particle(particle: &Particle, check: &impl Fn(&TypeRef) -> Result<()>) -> Result<()> {
    match &particle.term {
        Term::Element(decl) => check(&decl.type_ref),
        Term::Sequence(parts) | Term::Choice(parts) | Term::All(parts) => {
            parts.iter().try_for_each(|part| check_particle(part, check))
        }
        Term::Any => Ok(()),
    }
}
