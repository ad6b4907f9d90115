//! The recursive traversal behind [`derive`].

use std::borrow::Cow;

use roxmltree::Node;

use super::fixup::{escape_xml, fix_up_text, is_break_whitespace, normalize_quotes, words};
use super::spacing::Spacing;
use super::{RenderMode, Traversal};
use crate::config::names::{
    ALT, ATTR_ALT_MATCH, ATTR_ALT_NAME, BREAK, BULLET, COPYRIGHT_TEXT, ITEM, LIST, OPTIONAL,
    PARAGRAPH, TITLE_TEXT,
};
use crate::config::{
    bullet_alt_match, copyright_alt_match, BULLET_ALT_NAME, COPYRIGHT_ALT_NAME, INDENT_STRING,
    OPTIONAL_TEXT_CLASS, REPLACEABLE_TEXT_CLASS,
};
use crate::error::{LicenseXmlError, Result};
use crate::xml::{get_attribute, get_tag_name, has_tag, node_context};

/// Derive one artifact from a text-bearing element.
///
/// # Arguments
/// * `element` - The element to render; its tag must match the traversal's root tag
/// * `traversal` - Output mode and pass-through containers
///
/// # Returns
/// The rendered artifact, cleaned up with [`fix_up_text`] unless the
/// traversal opts out.
pub fn derive(element: Node<'_, '_>, traversal: &Traversal) -> Result<String> {
    if !has_tag(element, traversal.root_tag()) {
        return Err(LicenseXmlError::Structural(format!(
            "Invalid element tag name - expected '{}', found '{}'",
            traversal.root_tag(),
            get_tag_name(element)
        )));
    }

    let mut context = DeriveContext::default();
    Deriver { traversal }.append_node(element, &mut context, Scope::default())?;

    if traversal.post_processes() {
        Ok(fix_up_text(&context.buffer))
    } else {
        Ok(context.buffer)
    }
}

/// Output buffer plus the spacing state carried from one sibling to the next.
#[derive(Debug, Default)]
struct DeriveContext {
    buffer: String,
    /// Last character of rendered text, ignoring template and HTML markup.
    last_text_char: Option<char>,
    /// Set by a region whose spacing forbids a space after it.
    suppress_leading_space: bool,
}

impl DeriveContext {
    fn push_text(&mut self, text: &str) {
        if let Some(last) = text.chars().next_back() {
            self.last_text_char = Some(last);
        }
        self.buffer.push_str(text);
    }

    fn push_markup(&mut self, markup: &str) {
        self.buffer.push_str(markup);
    }

    /// Append a rendered sub-context as is.
    fn append(&mut self, other: DeriveContext) {
        if other.last_text_char.is_some() {
            self.last_text_char = other.last_text_char;
        }
        self.buffer.push_str(&other.buffer);
    }

    /// True when the rendered text so far ends in a word character, so that
    /// following words need a separating space.
    fn needs_separator(&self) -> bool {
        self.last_text_char.is_some_and(|c| !is_break_whitespace(c))
    }

    fn push_line_break(&mut self, depth: usize) {
        self.push_text("\n");
        for _ in 0..depth {
            self.push_text(INDENT_STRING);
        }
    }

    /// Append the words of `raw`, single-space separated.
    fn push_words(&mut self, raw: &str, suppress_leading_space: bool) {
        let mut words = words(raw).peekable();
        if words.peek().is_none() {
            return;
        }
        if self.needs_separator() && !suppress_leading_space {
            self.push_text(" ");
        }
        let joined = words.collect::<Vec<_>>().join(" ");
        self.push_text(&joined);
    }
}

/// Position of a node in the markup tree.
#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    /// List nesting depth.
    depth: usize,
    inside_alt: bool,
}

impl Scope {
    fn nested(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }

    fn within_alt(self) -> Self {
        Self {
            inside_alt: true,
            ..self
        }
    }
}

/// What a node means to the traversal.
enum Markup<'a> {
    Text(&'a str),
    List,
    Optional,
    Alternative {
        name: Cow<'a, str>,
        pattern: Cow<'a, str>,
    },
    Break,
    Paragraph,
    /// Children are emitted without wrapping.
    Container,
    /// Comments and processing instructions.
    Ignored,
}

struct Deriver<'t> {
    traversal: &'t Traversal,
}

impl Deriver<'_> {
    fn classify<'a>(&self, node: Node<'a, '_>, scope: Scope) -> Result<Markup<'a>> {
        if node.is_text() {
            return Ok(Markup::Text(node.text().unwrap_or_default()));
        }
        if !node.is_element() {
            return Ok(Markup::Ignored);
        }

        let markup = match get_tag_name(node) {
            LIST => Markup::List,
            OPTIONAL => Markup::Optional,
            ALT => Markup::Alternative {
                name: Cow::Borrowed(required_attribute(node, ATTR_ALT_NAME)?),
                pattern: Cow::Borrowed(required_attribute(node, ATTR_ALT_MATCH)?),
            },
            BREAK => Markup::Break,
            PARAGRAPH => Markup::Paragraph,
            TITLE_TEXT | COPYRIGHT_TEXT | BULLET if scope.inside_alt => Markup::Container,
            TITLE_TEXT => Markup::Optional,
            COPYRIGHT_TEXT => Markup::Alternative {
                name: Cow::Borrowed(COPYRIGHT_ALT_NAME),
                pattern: Cow::Owned(copyright_alt_match()),
            },
            BULLET => Markup::Alternative {
                name: Cow::Borrowed(BULLET_ALT_NAME),
                pattern: Cow::Owned(bullet_alt_match()),
            },
            tag if self.traversal.is_unprocessed(tag) => Markup::Container,
            tag => {
                return Err(LicenseXmlError::UnknownElement {
                    tag_name: tag.to_string(),
                    context: node_context(node),
                })
            }
        };
        Ok(markup)
    }

    /// Render `node` into `context`.
    ///
    /// Consumes the incoming space suppression and leaves the one the next
    /// sibling must honor.
    fn append_node(
        &self,
        node: Node<'_, '_>,
        context: &mut DeriveContext,
        scope: Scope,
    ) -> Result<()> {
        let suppress = std::mem::take(&mut context.suppress_leading_space);

        match self.classify(node, scope)? {
            Markup::Text(raw) => self.append_text(raw, context, suppress),
            Markup::List => self.append_list(node, context, scope)?,
            Markup::Optional => self.append_optional(node, context, scope, suppress)?,
            Markup::Alternative { name, pattern } => {
                self.append_alternative(node, &name, &pattern, context, scope, suppress)?;
            }
            Markup::Break => self.append_break(node, context, scope)?,
            Markup::Paragraph => self.append_paragraph(node, context, scope)?,
            Markup::Container => self.append_children(node, context, scope)?,
            Markup::Ignored => {}
        }
        Ok(())
    }

    fn append_children(
        &self,
        node: Node<'_, '_>,
        context: &mut DeriveContext,
        scope: Scope,
    ) -> Result<()> {
        context.suppress_leading_space = false;
        for child in node.children() {
            self.append_node(child, context, scope)?;
        }
        context.suppress_leading_space = false;
        Ok(())
    }

    fn append_text(&self, raw: &str, context: &mut DeriveContext, suppress: bool) {
        if words(raw).next().is_none() {
            // Source whitespace between regions does not end the suppression.
            context.suppress_leading_space = suppress;
        }
        match self.traversal.mode() {
            RenderMode::Plain | RenderMode::Template => context.push_words(raw, suppress),
            RenderMode::Html => context.push_text(&escape_xml(&normalize_quotes(raw))),
        }
    }

    fn append_list(
        &self,
        list: Node<'_, '_>,
        context: &mut DeriveContext,
        scope: Scope,
    ) -> Result<()> {
        let html = self.traversal.emits_html();
        let inner = scope.nested();
        if html {
            context.push_markup("\n<ul style=\"list-style:none\">");
        }

        for child in list.children() {
            if !child.is_element() {
                // Whitespace between items; comments are skipped.
                if child.is_text() {
                    self.append_node(child, context, scope)?;
                }
                continue;
            }
            match get_tag_name(child) {
                ITEM if html => {
                    context.push_markup("\n<li>");
                    self.append_node(child, context, inner)?;
                    context.push_markup("</li>");
                }
                ITEM => {
                    context.push_line_break(inner.depth);
                    self.append_node(child, context, inner)?;
                }
                LIST => self.append_list(child, context, inner)?,
                other => {
                    return Err(LicenseXmlError::UnknownElement {
                        tag_name: other.to_string(),
                        context: Some(
                            "<list> (expected only list items ('item') or lists ('list'))"
                                .to_string(),
                        ),
                    })
                }
            }
            context.suppress_leading_space = false;
        }

        if html {
            context.push_markup("\n</ul>");
        }
        Ok(())
    }

    fn append_break(
        &self,
        node: Node<'_, '_>,
        context: &mut DeriveContext,
        scope: Scope,
    ) -> Result<()> {
        if node.has_children() {
            return Err(LicenseXmlError::Structural(format!(
                "Invalid license XML - non-empty break element <{}>",
                get_tag_name(node)
            )));
        }
        if self.traversal.emits_html() {
            context.push_markup("<br />");
        }
        context.push_line_break(scope.depth);
        Ok(())
    }

    fn append_paragraph(
        &self,
        node: Node<'_, '_>,
        context: &mut DeriveContext,
        scope: Scope,
    ) -> Result<()> {
        if self.traversal.emits_html() {
            context.push_markup("<p>");
            self.append_children(node, context, scope)?;
            context.push_markup("</p>\n");
            return Ok(());
        }

        if context.buffer.chars().nth(1).is_some() {
            context.push_line_break(scope.depth);
        }
        self.append_children(node, context, scope)?;
        context.push_line_break(scope.depth);
        context.push_line_break(scope.depth);
        Ok(())
    }

    /// Render a region's children into a fresh context.
    ///
    /// Returns the rendered content with a single leading space split off,
    /// and whether that space was present.
    fn render_region(&self, node: Node<'_, '_>, scope: Scope) -> Result<(DeriveContext, bool)> {
        let mut scratch = DeriveContext::default();
        self.append_children(node, &mut scratch, scope)?;
        let hoisted = scratch.buffer.starts_with(' ');
        if hoisted {
            scratch.buffer.remove(0);
        }
        Ok((scratch, hoisted))
    }

    fn append_optional(
        &self,
        node: Node<'_, '_>,
        context: &mut DeriveContext,
        scope: Scope,
        suppress: bool,
    ) -> Result<()> {
        let spacing = Spacing::of(node)?;
        let (content, hoisted) = self.render_region(node, scope)?;
        let space_before =
            !hoisted && !suppress && spacing.space_before() && context.needs_separator();

        match self.traversal.mode() {
            RenderMode::Plain => {
                if hoisted || space_before {
                    context.push_text(" ");
                }
                context.append(content);
            }
            RenderMode::Template => {
                if hoisted {
                    context.push_text(" ");
                }
                context.push_markup("<<beginOptional>>");
                if space_before {
                    context.push_text(" ");
                }
                context.append(content);
            }
            RenderMode::Html => {
                if hoisted {
                    context.push_text(" ");
                }
                let tag = wrapper_tag(node, "span");
                context.push_markup(&format!("<{tag} class=\"{OPTIONAL_TEXT_CLASS}\">"));
                if space_before {
                    context.push_text(" ");
                }
                context.append(content);
            }
        }

        if spacing.space_after() {
            context.push_text(" ");
        }
        if self.traversal.emits_template_markup() {
            context.push_markup("<<endOptional>>");
        } else if self.traversal.emits_html() {
            context.push_markup(&format!("</{}>", wrapper_tag(node, "span")));
        }

        context.suppress_leading_space = spacing.suppresses_next_space();
        Ok(())
    }

    fn append_alternative(
        &self,
        node: Node<'_, '_>,
        name: &str,
        pattern: &str,
        context: &mut DeriveContext,
        scope: Scope,
        suppress: bool,
    ) -> Result<()> {
        let spacing = Spacing::of(node)?;
        let (content, hoisted) = self.render_region(node, scope.within_alt())?;
        let space_before =
            !hoisted && !suppress && spacing.space_before() && context.needs_separator();

        match self.traversal.mode() {
            RenderMode::Plain => {
                if hoisted || space_before {
                    context.push_text(" ");
                }
                context.append(content);
                if spacing.space_after() {
                    context.push_text(" ");
                }
            }
            RenderMode::Template => {
                if hoisted || space_before {
                    context.push_text(" ");
                }
                let original = content.buffer.replace('\n', " ");
                context.push_markup(&format!(
                    "<<var;name=\"{name}\";original=\"{original}\";match=\"{pattern}\">>"
                ));
                // The token stands for the original text.
                if let Some(last) = content.last_text_char {
                    context.last_text_char = Some(last);
                }
                if spacing.space_after() {
                    context.push_text(" ");
                }
            }
            RenderMode::Html => {
                if hoisted {
                    context.push_text(" ");
                }
                let tag = wrapper_tag(node, "var");
                context.push_markup(&format!(
                    "<{tag} class=\"{REPLACEABLE_TEXT_CLASS}\"><span title=\"can be replaced with the pattern {}\">",
                    escape_xml(pattern)
                ));
                if space_before {
                    context.push_text(" ");
                }
                context.append(content);
                if spacing.space_after() {
                    context.push_text(" ");
                }
                context.push_markup(&format!("</span></{tag}>"));
            }
        }

        context.suppress_leading_space = spacing.suppresses_next_space();
        Ok(())
    }
}

/// `div` when the region holds a block element, otherwise `inline`.
fn wrapper_tag(node: Node<'_, '_>, inline: &'static str) -> &'static str {
    let has_block = node
        .descendants()
        .skip(1)
        .any(|n| has_tag(n, LIST) || has_tag(n, PARAGRAPH));
    if has_block {
        "div"
    } else {
        inline
    }
}

fn required_attribute<'a>(node: Node<'a, '_>, attribute: &str) -> Result<&'a str> {
    get_attribute(node, attribute).ok_or_else(|| LicenseXmlError::MalformedAttribute {
        element: get_tag_name(node).to_string(),
        attribute: attribute.to_string(),
        message: format!("Missing {attribute} attribute for variable text"),
    })
}
