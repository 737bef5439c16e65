//! Node definitions for the Rux surface language.
//!
//! The grammar is a small subset of Rust: primitive integers, `bool`,
//! `char`, unit, references, fixed-size arrays, `struct`/`enum`
//! declarations, `trait`/`impl` blocks, and expression-oriented
//! control flow.
use std::fmt;

use rux_source::Identifier;

use crate::node::AstNode;

/// A parsed name: an identifier with span and node identity.
pub type Name = AstNode<Identifier>;

/// The root of a parsed source: the ordered list of top-level items.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub items: Vec<AstNode<Item>>,
}

// -----------------------------------------------------------------------------
// Items
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Fn(FnDef),
    Struct(StructDef),
    Enum(EnumDef),
    Trait(TraitDef),
    Impl(ImplBlock),
    Const(ConstDef),
}

impl Item {
    /// The declared name of the item, where it has one.
    pub fn name(&self) -> Option<&Name> {
        match self {
            Item::Fn(def) => Some(&def.name),
            Item::Struct(def) => Some(&def.name),
            Item::Enum(def) => Some(&def.name),
            Item::Trait(def) => Some(&def.name),
            Item::Const(def) => Some(&def.name),
            Item::Impl(_) => None,
        }
    }
}

/// A function item. Inside a `trait` block the body may be absent;
/// everywhere else it is required by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct FnDef {
    pub name: Name,
    pub self_param: Option<AstNode<SelfParam>>,
    pub params: Vec<AstNode<Param>>,
    /// Declared return type; `None` means unit.
    pub ret_ty: Option<AstNode<Ty>>,
    pub body: Option<AstNode<Block>>,
}

/// The receiver declaration of a method: `self`, `&self` or
/// `&mut self`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SelfParam {
    Owned,
    Ref,
    RefMut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Name,
    pub ty: AstNode<Ty>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: Name,
    pub fields: Vec<AstNode<FieldDef>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: Name,
    pub ty: AstNode<Ty>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: Name,
    pub variants: Vec<Name>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraitDef {
    pub name: Name,
    /// Required items: function signatures and constants.
    pub items: Vec<AstNode<Item>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImplBlock {
    /// `impl Trait for Ty` carries the trait name; inherent impls do
    /// not.
    pub trait_name: Option<Name>,
    pub self_ty: AstNode<Ty>,
    pub items: Vec<AstNode<Item>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstDef {
    pub name: Name,
    pub ty: AstNode<Ty>,
    pub value: AstNode<Expr>,
}

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// A type as written in the source. Resolution against the scope tree
/// happens in the semantic passes.
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    /// A named type: a primitive name or a user declaration.
    Path(Name),
    /// `&T` or `&mut T`.
    Ref { inner: Box<AstNode<Ty>>, mutable: bool },
    /// `[T; N]`. The length is an expression, restricted by the
    /// semantic passes to a constant.
    Array { element: Box<AstNode<Ty>>, length: Box<AstNode<Expr>> },
    /// `()`.
    Unit,
    /// `Self` inside a `trait` or `impl` block.
    SelfTy,
}

// -----------------------------------------------------------------------------
// Expressions
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Lit),
    Path(PathExpr),
    Unary(UnaryExpr),
    Ref(RefExpr),
    Deref(DerefExpr),
    Binary(BinaryExpr),
    Logical(LogicalExpr),
    Assign(AssignExpr),
    AssignOp(AssignOpExpr),
    Cast(CastExpr),
    Call(CallExpr),
    MethodCall(MethodCallExpr),
    Field(FieldExpr),
    Index(IndexExpr),
    StructLit(StructLitExpr),
    ArrayLit(ArrayLitExpr),
    ArrayRepeat(ArrayRepeatExpr),
    Block(BlockExpr),
    If(IfExpr),
    While(WhileExpr),
    Loop(LoopExpr),
    Break(BreakExpr),
    Continue,
    Return(ReturnExpr),
}

/// A literal token carried into the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Int(IntLit),
    Bool(bool),
    Char(char),
    Str(StrLit),
}

/// An integer literal with its radix stripped and its optional type
/// suffix preserved for inference.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IntLit {
    pub value: u64,
    pub suffix: Option<IntSuffix>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IntSuffix {
    I32,
    U32,
    ISize,
    USize,
}

impl fmt::Display for IntSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntSuffix::I32 => write!(f, "i32"),
            IntSuffix::U32 => write!(f, "u32"),
            IntSuffix::ISize => write!(f, "isize"),
            IntSuffix::USize => write!(f, "usize"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrLit {
    pub value: String,
    /// Whether the literal carried the `c` prefix (NUL-terminated at
    /// emission).
    pub c_str: bool,
}

/// A path of one or two segments: `name` or `Type::item`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    pub segments: Vec<Name>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnOp {
    /// Arithmetic negation `-e`.
    Neg,
    /// Logical / bitwise inversion `!e`.
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnOp,
    pub operand: Box<AstNode<Expr>>,
}

/// `&e` or `&mut e`.
#[derive(Debug, Clone, PartialEq)]
pub struct RefExpr {
    pub mutable: bool,
    pub operand: Box<AstNode<Expr>>,
}

/// `*e`.
#[derive(Debug, Clone, PartialEq)]
pub struct DerefExpr {
    pub operand: Box<AstNode<Expr>>,
}

/// Strict (non-short-circuiting) binary operators, including the
/// comparisons.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinOp {
    /// Comparisons yield `bool`; everything else yields the operand
    /// type.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::NotEq | BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq
        )
    }

    pub fn is_shift(&self) -> bool {
        matches!(self, BinOp::Shl | BinOp::Shr)
    }

    /// The surface spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt => "<",
            BinOp::LtEq => "<=",
            BinOp::Gt => ">",
            BinOp::GtEq => ">=",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinOp,
    pub lhs: Box<AstNode<Expr>>,
    pub rhs: Box<AstNode<Expr>>,
}

/// The short-circuiting `&&`/`||` operators. Kept apart from
/// [BinaryExpr] because they lower to control flow rather than a
/// single instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpr {
    pub op: LogicalOp,
    pub lhs: Box<AstNode<Expr>>,
    pub rhs: Box<AstNode<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignExpr {
    pub lhs: Box<AstNode<Expr>>,
    pub rhs: Box<AstNode<Expr>>,
}

/// `lhs op= rhs` where `op` is an arithmetic, bitwise or shift
/// operator.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignOpExpr {
    pub op: BinOp,
    pub lhs: Box<AstNode<Expr>>,
    pub rhs: Box<AstNode<Expr>>,
}

/// `e as T`.
#[derive(Debug, Clone, PartialEq)]
pub struct CastExpr {
    pub operand: Box<AstNode<Expr>>,
    pub ty: AstNode<Ty>,
}

/// A free or associated function call: the callee is always a path.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: AstNode<PathExpr>,
    pub args: Vec<AstNode<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCallExpr {
    pub receiver: Box<AstNode<Expr>>,
    pub method: Name,
    pub args: Vec<AstNode<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldExpr {
    pub receiver: Box<AstNode<Expr>>,
    pub field: Name,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    pub receiver: Box<AstNode<Expr>>,
    pub index: Box<AstNode<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructLitExpr {
    pub path: Name,
    pub fields: Vec<AstNode<StructLitField>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructLitField {
    pub name: Name,
    pub value: AstNode<Expr>,
}

/// `[a, b, c]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLitExpr {
    pub elements: Vec<AstNode<Expr>>,
}

/// `[e; N]` — `e` is evaluated once and copied `N` times.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayRepeatExpr {
    pub element: Box<AstNode<Expr>>,
    pub length: Box<AstNode<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockExpr {
    pub block: Box<AstNode<Block>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    pub condition: Box<AstNode<Expr>>,
    pub then_block: Box<AstNode<Block>>,
    /// Either another `if` (an `else if` chain) or a block.
    pub else_branch: Option<Box<AstNode<Expr>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileExpr {
    pub condition: Box<AstNode<Expr>>,
    pub body: Box<AstNode<Block>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopExpr {
    pub body: Box<AstNode<Block>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakExpr {
    pub value: Option<Box<AstNode<Expr>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnExpr {
    pub value: Option<Box<AstNode<Expr>>>,
}

// -----------------------------------------------------------------------------
// Statements and blocks
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let(LetStmt),
    /// An expression in statement position. `has_semi` distinguishes
    /// `e;` from a block-like expression used as a statement.
    Expr { expr: AstNode<Expr>, has_semi: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LetStmt {
    pub name: Name,
    pub mutable: bool,
    pub ty: Option<AstNode<Ty>>,
    pub init: Option<AstNode<Expr>>,
}

/// `{ stmts; tail }`. The tail, when present, is the value of the
/// block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<AstNode<Stmt>>,
    pub tail: Option<Box<AstNode<Expr>>>,
}
