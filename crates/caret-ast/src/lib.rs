//! Arena-backed document tree shared by the caret renderers.
//!
//! This crate provides the [`Tree`] that every renderer backend walks, the closed
//! [`NodeKind`] enumeration, and two ways of building a tree: from Markdown through
//! [`parse_markdown`] and from the nested JSON form through [`Tree::from_json`].
//!
//! # Architecture
//!
//! - [`Tree`]: node arena with parent/sibling/child links, the registered footnote
//!   definitions and the link reference definitions.
//! - [`Node`]: kind, raw tokens, inline attribute list (IAL) and kind-specific scalars.
//! - [`IdGenerator`]: source of block ids for nodes that carry none.
//!
//! # Example
//!
//! ```
//! use caret_ast::{NodeKind, parse_markdown};
//!
//! let tree = parse_markdown("# Title\n\nText[^1]\n\n[^1]: Note");
//! assert_eq!(tree.footnote_defs().len(), 1);
//! let heading = tree.first_child(tree.root()).unwrap();
//! assert_eq!(tree.kind(heading), NodeKind::Heading);
//! ```

mod id;
mod json;
mod kind;
pub mod markdown;
mod node;
mod tree;

pub use id::{FixedIdGenerator, IdGenerator, TimestampIdGenerator};
pub use json::{JsonNode, TreeError};
pub use kind::NodeKind;
pub use markdown::parse_markdown;
pub use node::{
    Align, LinkType, ListData, ListKind, Node, NodeId, escape_ial_value, sanitize_ial,
};
pub use tree::{Children, Tree};

/// Marks the edit cursor position inside node tokens.
pub const CARET: &str = "‸";
