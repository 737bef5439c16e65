//! The abstract syntax tree of the Rux surface language.
//!
//! Nodes are plain tagged enums wrapped in [AstNode], which couples a
//! body with its source [Span](rux_source::Span) and a parse-time
//! [AstNodeId]. All per-node metadata computed by later stages (owning
//! scope, resolved type, expression category, IR values) lives in
//! dense [AstTable]s keyed by the node id rather than in mutable
//! fields on the nodes themselves.
pub mod ast;
pub mod node;
pub mod table;

pub use ast::*;
pub use node::{AstNode, AstNodeId};
pub use table::AstTable;
