//! Text derivation from License XML markup.
//!
//! One recursive traversal turns a text-bearing element (`<text>`,
//! `<standardLicenseHeader>`, `<notes>`) into one of three artifacts:
//!
//! - plain text, with markup reduced to whitespace and indentation
//! - template text, where optional regions are delimited by
//!   `<<beginOptional>>`/`<<endOptional>>` and replaceable regions become
//!   `<<var;name="N";original="O";match="M">>` tokens
//! - an HTML fragment, where the same regions become classed wrapper tags
//!
//! All three are produced from the same walk, so regions line up one to one
//! across artifacts.
//!
//! # Example
//!
//! ```
//! use roxmltree::Document;
//! use spdx_license_xml::text::{derive, RenderMode, Traversal};
//!
//! let xml = r#"<text>Copyright <alt name="year" match="\d{4}">2024</alt></text>"#;
//! let doc = Document::parse(xml).unwrap();
//! let root = doc.root_element();
//!
//! assert_eq!(
//!     derive(root, &Traversal::license_body(RenderMode::Plain)).unwrap(),
//!     "Copyright 2024"
//! );
//! assert_eq!(
//!     derive(root, &Traversal::license_body(RenderMode::Template)).unwrap(),
//!     r#"Copyright <<var;name="year";original="2024";match="\d{4}">>"#
//! );
//! ```

mod deriver;
mod fixup;
mod spacing;

use roxmltree::Node;

use crate::config::names::{
    BULLET, COPYRIGHT_TEXT, ITEM, NOTES, STANDARD_LICENSE_HEADER, TEXT, TITLE_TEXT,
};
use crate::error::Result;

pub use deriver::derive;
pub use fixup::{escape_xml, fix_up_text, is_break_whitespace, normalize_quotes, words};
pub use spacing::Spacing;

/// Output flavor of a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    Plain,
    Template,
    Html,
}

/// Containers whose children are emitted without wrapping in license bodies.
const LICENSE_BODY_TAGS: &[&str] = &[COPYRIGHT_TEXT, ITEM, TEXT, STANDARD_LICENSE_HEADER];

/// Containers whose children are emitted without wrapping in headers.
const HEADER_TAGS: &[&str] = &[
    COPYRIGHT_TEXT,
    TITLE_TEXT,
    ITEM,
    BULLET,
    STANDARD_LICENSE_HEADER,
];

const NOTES_TAGS: &[&str] = &[NOTES];

/// Profile of one traversal: the artifact to produce, the element it starts
/// from, and the containers it passes through unwrapped.
///
/// Named markup (optional, alt, p, br, list, titleText, copyrightText,
/// bullet) is always interpreted, even when the tag is also in the
/// pass-through list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Traversal {
    mode: RenderMode,
    root_tag: &'static str,
    unprocessed: &'static [&'static str],
    post_process: bool,
}

impl Traversal {
    /// Traversal of a `<text>` block.
    #[must_use]
    pub fn license_body(mode: RenderMode) -> Self {
        Self {
            mode,
            root_tag: TEXT,
            unprocessed: LICENSE_BODY_TAGS,
            post_process: true,
        }
    }

    /// Traversal of a `<standardLicenseHeader>` block.
    #[must_use]
    pub fn header(mode: RenderMode) -> Self {
        Self {
            mode,
            root_tag: STANDARD_LICENSE_HEADER,
            unprocessed: HEADER_TAGS,
            post_process: true,
        }
    }

    /// Plain-text traversal of a `<notes>` block.
    ///
    /// Notes are returned as rendered, without the final clean-up pass.
    #[must_use]
    pub fn notes() -> Self {
        Self {
            mode: RenderMode::Plain,
            root_tag: NOTES,
            unprocessed: NOTES_TAGS,
            post_process: false,
        }
    }

    #[must_use]
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    #[must_use]
    pub fn root_tag(&self) -> &'static str {
        self.root_tag
    }

    /// True when `tag` is passed through without wrapping.
    #[must_use]
    pub fn is_unprocessed(&self, tag: &str) -> bool {
        self.unprocessed.contains(&tag)
    }

    #[must_use]
    pub fn emits_template_markup(&self) -> bool {
        self.mode == RenderMode::Template
    }

    #[must_use]
    pub fn emits_html(&self) -> bool {
        self.mode == RenderMode::Html
    }

    #[must_use]
    pub fn post_processes(&self) -> bool {
        self.post_process
    }
}

/// The three artifacts derived from one text-bearing element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DerivedText {
    pub text: String,
    pub template: String,
    pub html: String,
}

impl DerivedText {
    /// Derive all three artifacts with the traversal profile `profile`.
    ///
    /// # Arguments
    /// * `element` - The text-bearing element
    /// * `profile` - Builds the traversal for each mode, e.g. [`Traversal::header`]
    pub fn derive(element: Node<'_, '_>, profile: fn(RenderMode) -> Traversal) -> Result<Self> {
        Ok(Self {
            text: derive(element, &profile(RenderMode::Plain))?,
            template: derive(element, &profile(RenderMode::Template))?,
            html: derive(element, &profile(RenderMode::Html))?,
        })
    }
}
