//! XML utilities.

mod utils;

pub use utils::{
    element_children, find_descendants, get_attribute, get_tag_name, has_tag, node_context,
    text_position, XmlPosition,
};
