//! The [AstNode] wrapper and parse-time node identity.
use rux_source::Span;
use rux_utils::fresh_id;

fresh_id! {
    /// Identity of an AST node, minted when the parser constructs
    /// it; the key of every semantic and lowering side table.
    pub struct AstNodeId(AST_NODE_IDS);
}

/// A single node in the tree: a body together with the span it was
/// parsed from and its identity. The identity is stable for the
/// lifetime of the process and is what the side tables are keyed by.
#[derive(Debug, Clone, PartialEq)]
pub struct AstNode<T> {
    id: AstNodeId,
    span: Span,
    body: T,
}

impl<T> AstNode<T> {
    /// Create a node with a freshly minted id.
    pub fn new(body: T, span: Span) -> Self {
        Self { id: AstNodeId::fresh(), span, body }
    }

    pub fn id(&self) -> AstNodeId {
        self.id
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn body(&self) -> &T {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut T {
        &mut self.body
    }

    /// Re-wrap the body of this node, keeping its id and span.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AstNode<U> {
        AstNode { id: self.id, span: self.span, body: f(self.body) }
    }
}
