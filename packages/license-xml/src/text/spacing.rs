//! The `spacing` attribute of optional and alternative regions.

use std::fmt;
use std::str::FromStr;

use roxmltree::Node;

use crate::config::names::ATTR_SPACING;
use crate::error::{LicenseXmlError, Result};
use crate::xml::{get_attribute, get_tag_name};

/// Whether a space is synthesized before and after a region's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Spacing {
    /// Space before, none after.
    #[default]
    Default,
    Both,
    /// Space before; the following text gets no leading space.
    Before,
    /// Space after, none before.
    After,
    /// No space on either side.
    None,
}

impl Spacing {
    /// Read the spacing of a region element; absent means [`Spacing::Default`].
    pub fn of(element: Node<'_, '_>) -> Result<Self> {
        match get_attribute(element, ATTR_SPACING) {
            Some(value) => value.parse().map_err(|message| LicenseXmlError::MalformedAttribute {
                element: get_tag_name(element).to_string(),
                attribute: ATTR_SPACING.to_string(),
                message,
            }),
            None => Ok(Self::Default),
        }
    }

    /// A leading space may be synthesized before the content.
    #[must_use]
    pub fn space_before(self) -> bool {
        matches!(self, Self::Default | Self::Both | Self::Before)
    }

    /// A trailing space is appended after the content.
    #[must_use]
    pub fn space_after(self) -> bool {
        matches!(self, Self::Both | Self::After)
    }

    /// The next sibling must not add its own leading space.
    #[must_use]
    pub fn suppresses_next_space(self) -> bool {
        matches!(self, Self::Before | Self::None)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Both => "both",
            Self::Before => "before",
            Self::After => "after",
            Self::None => "none",
        }
    }
}

impl FromStr for Spacing {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "both" => Ok(Self::Both),
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            "none" => Ok(Self::None),
            other => Err(format!(
                "Invalid spacing attribute '{other}', expected one of default, both, before, after, none"
            )),
        }
    }
}

impl fmt::Display for Spacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    #[test]
    fn test_parse_all_values() {
        for spacing in [
            Spacing::Default,
            Spacing::Both,
            Spacing::Before,
            Spacing::After,
            Spacing::None,
        ] {
            assert_eq!(spacing.as_str().parse::<Spacing>(), Ok(spacing));
        }
        assert!("Both".parse::<Spacing>().is_err());
    }

    #[test]
    fn test_space_rules() {
        assert!(Spacing::Default.space_before() && !Spacing::Default.space_after());
        assert!(Spacing::Both.space_before() && Spacing::Both.space_after());
        assert!(!Spacing::After.space_before() && Spacing::After.space_after());
        assert!(!Spacing::None.space_before() && !Spacing::None.space_after());
        assert!(Spacing::Before.suppresses_next_space());
        assert!(Spacing::None.suppresses_next_space());
        assert!(!Spacing::Both.suppresses_next_space());
    }

    #[test]
    fn test_of_element() {
        let doc = Document::parse(r#"<optional spacing="after"/>"#).unwrap();
        assert_eq!(Spacing::of(doc.root_element()).unwrap(), Spacing::After);

        let doc = Document::parse("<optional/>").unwrap();
        assert_eq!(Spacing::of(doc.root_element()).unwrap(), Spacing::Default);

        let doc = Document::parse(r#"<alt spacing="sideways"/>"#).unwrap();
        let err = Spacing::of(doc.root_element()).unwrap_err();
        assert!(matches!(
            err,
            LicenseXmlError::MalformedAttribute { ref element, .. } if element == "alt"
        ));
    }
}
