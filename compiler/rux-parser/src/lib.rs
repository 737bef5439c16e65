//! Recursive-descent parser for the Rux surface language.
//!
//! Items and statements are parsed by straightforward descent;
//! binary expressions use precedence climbing with the Rust operator
//! table. Struct literals are not permitted in condition position
//! (`if x { … }` always parses `x` as a path), matching Rust.
pub mod error;

pub use error::{ParseError, ParseErrorKind};
use rux_ast::{
    ArrayLitExpr, ArrayRepeatExpr, AssignExpr, AssignOpExpr, AstNode, BinOp, BinaryExpr, Block,
    BlockExpr, BreakExpr, CallExpr, CastExpr, ConstDef, DerefExpr, EnumDef, Expr, FieldDef,
    FieldExpr, FnDef, IfExpr, ImplBlock, IndexExpr, Item, LetStmt, Lit, LogicalExpr, LogicalOp,
    LoopExpr, MethodCallExpr, Module, Name, Param, PathExpr, RefExpr, ReturnExpr, SelfParam, Stmt,
    StrLit, StructDef, StructLitExpr, StructLitField, IntLit, Ty, TraitDef, UnOp, UnaryExpr,
    WhileExpr,
};
use rux_lexer::{Keyword, Token, TokenKind};
use rux_source::Span;

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse a whole token stream into a [Module].
pub fn parse_module(tokens: Vec<Token>) -> ParseResult<Module> {
    Parser::new(tokens).module()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// End offset of the last consumed token; the end of every node
    /// span.
    prev_end: u32,
    /// Cleared while parsing `if`/`while` conditions so that `{`
    /// starts the body rather than a struct literal.
    struct_lit_allowed: bool,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0, prev_end: 0, struct_lit_allowed: true }
    }

    // -------------------------------------------------------------------------
    // Cursor plumbing
    // -------------------------------------------------------------------------

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_second(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    /// Start offset of the token the cursor is on, for node spans.
    fn cursor_start(&self) -> u32 {
        self.tokens.get(self.pos).map(|t| t.span.start()).unwrap_or(self.prev_end)
    }

    fn cursor_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or_else(|| Span::new(self.prev_end, self.prev_end))
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if let Some(token) = &token {
            self.pos += 1;
            self.prev_end = token.span.end();
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.peek(), Some(TokenKind::Keyword(kw)) if *kw == keyword)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.at_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected<T>(&self, expected: &str) -> ParseResult<T> {
        let err = match self.peek() {
            Some(found) => ParseError::new(
                ParseErrorKind::UnexpectedToken {
                    expected: expected.to_string(),
                    found: found.describe(),
                },
                self.cursor_span(),
            ),
            None => ParseError::new(
                ParseErrorKind::UnexpectedEof { expected: expected.to_string() },
                self.cursor_span(),
            ),
        };
        Err(err)
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<()> {
        if self.eat(&kind) {
            Ok(())
        } else {
            self.unexpected(expected)
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword, expected: &str) -> ParseResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            self.unexpected(expected)
        }
    }

    fn expect_ident(&mut self) -> ParseResult<Name> {
        match self.peek() {
            Some(TokenKind::Ident(_)) => {
                let token = self.advance().unwrap();
                let TokenKind::Ident(name) = token.kind else { unreachable!() };
                Ok(AstNode::new(name, token.span))
            }
            _ => self.unexpected("an identifier"),
        }
    }

    fn node<T>(&self, body: T, start: u32) -> AstNode<T> {
        AstNode::new(body, Span::new(start, self.prev_end))
    }

    /// Run `f` with struct literals disabled (condition position).
    fn no_struct_lit<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let prev = std::mem::replace(&mut self.struct_lit_allowed, false);
        let result = f(self);
        self.struct_lit_allowed = prev;
        result
    }

    /// Run `f` with struct literals re-enabled (inside brackets).
    fn with_struct_lit<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let prev = std::mem::replace(&mut self.struct_lit_allowed, true);
        let result = f(self);
        self.struct_lit_allowed = prev;
        result
    }

    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    fn module(&mut self) -> ParseResult<Module> {
        let mut items = Vec::new();
        while self.peek().is_some() {
            items.push(self.item(ItemPosition::Module)?);
        }
        Ok(Module { items })
    }

    fn item(&mut self, position: ItemPosition) -> ParseResult<AstNode<Item>> {
        let start = self.cursor_start();

        let item = match self.peek() {
            Some(TokenKind::Keyword(Keyword::Fn)) => Item::Fn(self.fn_def(position)?),
            Some(TokenKind::Keyword(Keyword::Const)) => Item::Const(self.const_def()?),
            Some(TokenKind::Keyword(Keyword::Struct)) if position == ItemPosition::Module => {
                Item::Struct(self.struct_def()?)
            }
            Some(TokenKind::Keyword(Keyword::Enum)) if position == ItemPosition::Module => {
                Item::Enum(self.enum_def()?)
            }
            Some(TokenKind::Keyword(Keyword::Trait)) if position == ItemPosition::Module => {
                Item::Trait(self.trait_def()?)
            }
            Some(TokenKind::Keyword(Keyword::Impl)) if position == ItemPosition::Module => {
                Item::Impl(self.impl_block()?)
            }
            _ => return self.unexpected(position.expected()),
        };

        Ok(self.node(item, start))
    }

    fn fn_def(&mut self, position: ItemPosition) -> ParseResult<FnDef> {
        self.expect_keyword(Keyword::Fn, "`fn`")?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LParen, "`(`")?;

        let mut self_param = None;
        let mut params = Vec::new();
        let mut first = true;
        while !self.at(&TokenKind::RParen) {
            if !first {
                self.expect(TokenKind::Comma, "`,` or `)`")?;
                // Trailing comma.
                if self.at(&TokenKind::RParen) {
                    break;
                }
            }

            let param_start = self.cursor_start();
            if first && self.at_self_param() {
                self_param = Some(self.self_param(param_start)?);
            } else {
                let name = self.expect_ident()?;
                self.expect(TokenKind::Colon, "`:`")?;
                let ty = self.ty()?;
                params.push(self.node(Param { name, ty }, param_start));
            }
            first = false;
        }
        self.expect(TokenKind::RParen, "`)`")?;

        let ret_ty = if self.eat(&TokenKind::Arrow) { Some(self.ty()?) } else { None };

        let body = if self.at(&TokenKind::LBrace) {
            Some(self.block()?)
        } else if position == ItemPosition::Trait && self.eat(&TokenKind::Semi) {
            None
        } else {
            return self.unexpected("a function body");
        };

        Ok(FnDef { name, self_param, params, ret_ty, body })
    }

    fn at_self_param(&self) -> bool {
        match self.peek() {
            Some(TokenKind::Keyword(Keyword::SelfValue)) => true,
            Some(TokenKind::Amp) => matches!(
                self.peek_second(),
                Some(TokenKind::Keyword(Keyword::SelfValue)) | Some(TokenKind::Keyword(Keyword::Mut))
            ),
            _ => false,
        }
    }

    fn self_param(&mut self, start: u32) -> ParseResult<AstNode<SelfParam>> {
        let kind = if self.eat(&TokenKind::Amp) {
            if self.eat_keyword(Keyword::Mut) {
                SelfParam::RefMut
            } else {
                SelfParam::Ref
            }
        } else {
            SelfParam::Owned
        };
        self.expect_keyword(Keyword::SelfValue, "`self`")?;

        Ok(self.node(kind, start))
    }

    fn struct_def(&mut self) -> ParseResult<StructDef> {
        self.expect_keyword(Keyword::Struct, "`struct`")?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LBrace, "`{`")?;

        let mut fields = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            let start = self.cursor_start();
            let name = self.expect_ident()?;
            self.expect(TokenKind::Colon, "`:`")?;
            let ty = self.ty()?;
            fields.push(self.node(FieldDef { name, ty }, start));

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "`}`")?;

        Ok(StructDef { name, fields })
    }

    fn enum_def(&mut self) -> ParseResult<EnumDef> {
        self.expect_keyword(Keyword::Enum, "`enum`")?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LBrace, "`{`")?;

        let mut variants = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            variants.push(self.expect_ident()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "`}`")?;

        Ok(EnumDef { name, variants })
    }

    fn trait_def(&mut self) -> ParseResult<TraitDef> {
        self.expect_keyword(Keyword::Trait, "`trait`")?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LBrace, "`{`")?;

        let mut items = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            items.push(self.item(ItemPosition::Trait)?);
        }
        self.expect(TokenKind::RBrace, "`}`")?;

        Ok(TraitDef { name, items })
    }

    fn impl_block(&mut self) -> ParseResult<ImplBlock> {
        self.expect_keyword(Keyword::Impl, "`impl`")?;
        let first = self.expect_ident()?;

        let (trait_name, self_ty) = if self.eat_keyword(Keyword::For) {
            (Some(first), self.ty()?)
        } else {
            let span = first.span();
            (None, AstNode::new(Ty::Path(first), span))
        };

        self.expect(TokenKind::LBrace, "`{`")?;
        let mut items = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            items.push(self.item(ItemPosition::Impl)?);
        }
        self.expect(TokenKind::RBrace, "`}`")?;

        Ok(ImplBlock { trait_name, self_ty, items })
    }

    fn const_def(&mut self) -> ParseResult<ConstDef> {
        self.expect_keyword(Keyword::Const, "`const`")?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::Colon, "`:`")?;
        let ty = self.ty()?;
        self.expect(TokenKind::Eq, "`=`")?;
        let value = self.expr()?;
        self.expect(TokenKind::Semi, "`;`")?;

        Ok(ConstDef { name, ty, value })
    }

    // -------------------------------------------------------------------------
    // Types
    // -------------------------------------------------------------------------

    fn ty(&mut self) -> ParseResult<AstNode<Ty>> {
        let start = self.cursor_start();

        let ty = match self.peek() {
            Some(TokenKind::LParen) => {
                self.advance();
                self.expect(TokenKind::RParen, "`)`")?;
                Ty::Unit
            }
            Some(TokenKind::Amp) => {
                self.advance();
                let mutable = self.eat_keyword(Keyword::Mut);
                let inner = self.ty()?;
                Ty::Ref { inner: Box::new(inner), mutable }
            }
            Some(TokenKind::LBracket) => {
                self.advance();
                let element = self.ty()?;
                self.expect(TokenKind::Semi, "`;`")?;
                let length = self.with_struct_lit(|p| p.expr())?;
                self.expect(TokenKind::RBracket, "`]`")?;
                Ty::Array { element: Box::new(element), length: Box::new(length) }
            }
            Some(TokenKind::Keyword(Keyword::SelfType)) => {
                self.advance();
                Ty::SelfTy
            }
            Some(TokenKind::Ident(_)) => Ty::Path(self.expect_ident()?),
            _ => return self.unexpected("a type"),
        };

        Ok(self.node(ty, start))
    }

    // -------------------------------------------------------------------------
    // Statements and blocks
    // -------------------------------------------------------------------------

    fn block(&mut self) -> ParseResult<AstNode<Block>> {
        let start = self.cursor_start();
        self.expect(TokenKind::LBrace, "`{`")?;

        let mut stmts = Vec::new();
        let mut tail = None;

        loop {
            match self.peek() {
                None => return self.unexpected("`}`"),
                Some(TokenKind::RBrace) => {
                    self.advance();
                    break;
                }
                Some(TokenKind::Semi) => {
                    self.advance();
                }
                Some(TokenKind::Keyword(Keyword::Let)) => {
                    stmts.push(self.let_stmt()?);
                }
                _ => {
                    let stmt_start = self.cursor_start();
                    let expr = self.with_struct_lit(|p| p.expr())?;

                    if self.eat(&TokenKind::Semi) {
                        stmts.push(self.node(Stmt::Expr { expr, has_semi: true }, stmt_start));
                    } else if self.at(&TokenKind::RBrace) {
                        tail = Some(Box::new(expr));
                        self.advance();
                        break;
                    } else if is_block_like(expr.body()) {
                        stmts.push(self.node(Stmt::Expr { expr, has_semi: false }, stmt_start));
                    } else {
                        return self.unexpected("`;`");
                    }
                }
            }
        }

        Ok(self.node(Block { stmts, tail }, start))
    }

    fn let_stmt(&mut self) -> ParseResult<AstNode<Stmt>> {
        let start = self.cursor_start();
        self.expect_keyword(Keyword::Let, "`let`")?;
        let mutable = self.eat_keyword(Keyword::Mut);
        let name = self.expect_ident()?;

        let ty = if self.eat(&TokenKind::Colon) { Some(self.ty()?) } else { None };
        let init = if self.eat(&TokenKind::Eq) { Some(self.with_struct_lit(|p| p.expr())?) } else { None };
        self.expect(TokenKind::Semi, "`;`")?;

        Ok(self.node(Stmt::Let(LetStmt { name, mutable, ty, init }), start))
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    fn expr(&mut self) -> ParseResult<AstNode<Expr>> {
        let start = self.cursor_start();
        let lhs = self.binary_expr(0)?;

        // Assignment is right-associative and lowest.
        let op = match self.peek() {
            Some(TokenKind::Eq) => None,
            Some(TokenKind::PlusEq) => Some(BinOp::Add),
            Some(TokenKind::MinusEq) => Some(BinOp::Sub),
            Some(TokenKind::StarEq) => Some(BinOp::Mul),
            Some(TokenKind::SlashEq) => Some(BinOp::Div),
            Some(TokenKind::PercentEq) => Some(BinOp::Rem),
            Some(TokenKind::AmpEq) => Some(BinOp::BitAnd),
            Some(TokenKind::PipeEq) => Some(BinOp::BitOr),
            Some(TokenKind::CaretEq) => Some(BinOp::BitXor),
            Some(TokenKind::ShlEq) => Some(BinOp::Shl),
            Some(TokenKind::ShrEq) => Some(BinOp::Shr),
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.expr()?;

        let expr = match op {
            None => Expr::Assign(AssignExpr { lhs: Box::new(lhs), rhs: Box::new(rhs) }),
            Some(op) => {
                Expr::AssignOp(AssignOpExpr { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
            }
        };
        Ok(self.node(expr, start))
    }

    /// Precedence climbing over the strict and lazy binary operators.
    fn binary_expr(&mut self, min_bp: u8) -> ParseResult<AstNode<Expr>> {
        let start = self.cursor_start();
        let mut lhs = self.cast_expr()?;
        let mut in_comparison = false;

        loop {
            let Some(kind) = self.peek() else { break };
            let Some(op) = BinaryOp::from_token(kind) else { break };

            let (left_bp, right_bp) = op.binding_power();
            if left_bp < min_bp {
                break;
            }

            // Comparisons are non-associative: `a < b < c` needs
            // parentheses.
            if op.is_comparison() {
                if in_comparison {
                    return Err(ParseError::new(
                        ParseErrorKind::ChainedComparison,
                        self.cursor_span(),
                    ));
                }
                in_comparison = true;
            } else {
                in_comparison = false;
            }

            self.advance();
            let rhs = self.binary_expr(right_bp)?;

            let expr = match op {
                BinaryOp::Strict(op) => {
                    Expr::Binary(BinaryExpr { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
                }
                BinaryOp::Lazy(op) => {
                    Expr::Logical(LogicalExpr { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
                }
            };
            lhs = self.node(expr, start);
        }

        Ok(lhs)
    }

    fn cast_expr(&mut self) -> ParseResult<AstNode<Expr>> {
        let start = self.cursor_start();
        let mut expr = self.unary_expr()?;

        while self.eat_keyword(Keyword::As) {
            let ty = self.ty()?;
            expr = self.node(Expr::Cast(CastExpr { operand: Box::new(expr), ty }), start);
        }

        Ok(expr)
    }

    fn unary_expr(&mut self) -> ParseResult<AstNode<Expr>> {
        let start = self.cursor_start();

        let expr = match self.peek() {
            Some(TokenKind::Minus) => {
                self.advance();
                let operand = self.unary_expr()?;
                Expr::Unary(UnaryExpr { op: UnOp::Neg, operand: Box::new(operand) })
            }
            Some(TokenKind::Not) => {
                self.advance();
                let operand = self.unary_expr()?;
                Expr::Unary(UnaryExpr { op: UnOp::Not, operand: Box::new(operand) })
            }
            Some(TokenKind::Star) => {
                self.advance();
                let operand = self.unary_expr()?;
                Expr::Deref(DerefExpr { operand: Box::new(operand) })
            }
            Some(TokenKind::Amp) => {
                self.advance();
                let mutable = self.eat_keyword(Keyword::Mut);
                let operand = self.unary_expr()?;
                Expr::Ref(RefExpr { mutable, operand: Box::new(operand) })
            }
            Some(TokenKind::AmpAmp) => {
                // `&&e` lexes as a single token; it is a double
                // borrow.
                self.advance();
                let mutable = self.eat_keyword(Keyword::Mut);
                let operand = self.unary_expr()?;
                let inner = self.node(
                    Expr::Ref(RefExpr { mutable, operand: Box::new(operand) }),
                    start,
                );
                Expr::Ref(RefExpr { mutable: false, operand: Box::new(inner) })
            }
            _ => return self.postfix_expr(),
        };

        Ok(self.node(expr, start))
    }

    fn postfix_expr(&mut self) -> ParseResult<AstNode<Expr>> {
        let start = self.cursor_start();
        let mut expr = self.primary_expr()?;

        loop {
            match self.peek() {
                Some(TokenKind::Dot) => {
                    self.advance();
                    let name = self.expect_ident()?;

                    if self.at(&TokenKind::LParen) {
                        let args = self.call_args()?;
                        expr = self.node(
                            Expr::MethodCall(MethodCallExpr {
                                receiver: Box::new(expr),
                                method: name,
                                args,
                            }),
                            start,
                        );
                    } else {
                        expr = self.node(
                            Expr::Field(FieldExpr { receiver: Box::new(expr), field: name }),
                            start,
                        );
                    }
                }
                Some(TokenKind::LBracket) => {
                    self.advance();
                    let index = self.with_struct_lit(|p| p.expr())?;
                    self.expect(TokenKind::RBracket, "`]`")?;
                    expr = self.node(
                        Expr::Index(IndexExpr {
                            receiver: Box::new(expr),
                            index: Box::new(index),
                        }),
                        start,
                    );
                }
                Some(TokenKind::LParen) => {
                    // Only paths are callable.
                    let callee_span = expr.span();
                    let callee = match expr.body() {
                        Expr::Path(_) => expr.map(|body| match body {
                            Expr::Path(path) => path,
                            _ => unreachable!(),
                        }),
                        _ => {
                            return Err(ParseError::new(
                                ParseErrorKind::CallOnNonPath,
                                callee_span,
                            ))
                        }
                    };

                    let args = self.call_args()?;
                    expr = self.node(Expr::Call(CallExpr { callee, args }), start);
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn call_args(&mut self) -> ParseResult<Vec<AstNode<Expr>>> {
        self.expect(TokenKind::LParen, "`(`")?;

        let mut args = Vec::new();
        while !self.at(&TokenKind::RParen) {
            args.push(self.with_struct_lit(|p| p.expr())?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "`)`")?;

        Ok(args)
    }

    fn primary_expr(&mut self) -> ParseResult<AstNode<Expr>> {
        let start = self.cursor_start();

        let expr = match self.peek() {
            Some(TokenKind::Int { .. }) => {
                let token = self.advance().unwrap();
                let TokenKind::Int { value, suffix } = token.kind else { unreachable!() };
                Expr::Lit(Lit::Int(IntLit { value, suffix }))
            }
            Some(TokenKind::Char(_)) => {
                let token = self.advance().unwrap();
                let TokenKind::Char(value) = token.kind else { unreachable!() };
                Expr::Lit(Lit::Char(value))
            }
            Some(TokenKind::Str { .. }) => {
                let token = self.advance().unwrap();
                let TokenKind::Str { value, c_str } = token.kind else { unreachable!() };
                Expr::Lit(Lit::Str(StrLit { value, c_str }))
            }
            Some(TokenKind::Keyword(Keyword::True)) => {
                self.advance();
                Expr::Lit(Lit::Bool(true))
            }
            Some(TokenKind::Keyword(Keyword::False)) => {
                self.advance();
                Expr::Lit(Lit::Bool(false))
            }

            Some(TokenKind::LParen) => {
                self.advance();
                let expr = self.with_struct_lit(|p| p.expr())?;
                self.expect(TokenKind::RParen, "`)`")?;
                return Ok(expr);
            }

            Some(TokenKind::LBracket) => return self.array_expr(),
            Some(TokenKind::LBrace) => {
                let block = self.block()?;
                Expr::Block(BlockExpr { block: Box::new(block) })
            }

            Some(TokenKind::Keyword(Keyword::If)) => return self.if_expr(),
            Some(TokenKind::Keyword(Keyword::While)) => {
                self.advance();
                let condition = self.no_struct_lit(|p| p.expr())?;
                let body = self.block()?;
                Expr::While(WhileExpr { condition: Box::new(condition), body: Box::new(body) })
            }
            Some(TokenKind::Keyword(Keyword::Loop)) => {
                self.advance();
                let body = self.block()?;
                Expr::Loop(LoopExpr { body: Box::new(body) })
            }
            Some(TokenKind::Keyword(Keyword::Break)) => {
                self.advance();
                let value = if self.expr_can_start() {
                    Some(Box::new(self.expr()?))
                } else {
                    None
                };
                Expr::Break(BreakExpr { value })
            }
            Some(TokenKind::Keyword(Keyword::Continue)) => {
                self.advance();
                Expr::Continue
            }
            Some(TokenKind::Keyword(Keyword::Return)) => {
                self.advance();
                let value = if self.expr_can_start() {
                    Some(Box::new(self.expr()?))
                } else {
                    None
                };
                Expr::Return(ReturnExpr { value })
            }

            Some(TokenKind::Keyword(Keyword::SelfValue)) => {
                let token = self.advance().unwrap();
                let name = AstNode::new("self".to_string(), token.span);
                Expr::Path(PathExpr { segments: vec![name] })
            }
            Some(TokenKind::Keyword(Keyword::SelfType)) => {
                let token = self.advance().unwrap();
                let name = AstNode::new("Self".to_string(), token.span);
                return self.path_or_struct_lit(name, start);
            }
            Some(TokenKind::Ident(_)) => {
                let name = self.expect_ident()?;
                return self.path_or_struct_lit(name, start);
            }

            _ => return self.unexpected("an expression"),
        };

        Ok(self.node(expr, start))
    }

    /// `true` when the token under the cursor can begin an expression;
    /// decides whether `break`/`return` carry a value.
    fn expr_can_start(&self) -> bool {
        match self.peek() {
            None => false,
            Some(kind) => !matches!(
                kind,
                TokenKind::Semi
                    | TokenKind::RBrace
                    | TokenKind::RParen
                    | TokenKind::RBracket
                    | TokenKind::Comma
            ),
        }
    }

    fn path_or_struct_lit(&mut self, first: Name, start: u32) -> ParseResult<AstNode<Expr>> {
        let mut segments = vec![first];
        while self.eat(&TokenKind::ColonColon) {
            if segments.len() == 2 {
                return Err(ParseError::new(ParseErrorKind::PathTooLong, self.cursor_span()));
            }
            segments.push(self.expect_ident()?);
        }

        if segments.len() == 1 && self.struct_lit_allowed && self.at(&TokenKind::LBrace) {
            let path = segments.pop().unwrap();
            return self.struct_lit(path, start);
        }

        Ok(self.node(Expr::Path(PathExpr { segments }), start))
    }

    fn struct_lit(&mut self, path: Name, start: u32) -> ParseResult<AstNode<Expr>> {
        self.expect(TokenKind::LBrace, "`{`")?;

        let mut fields = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            let field_start = self.cursor_start();
            let name = self.expect_ident()?;
            self.expect(TokenKind::Colon, "`:`")?;
            let value = self.with_struct_lit(|p| p.expr())?;
            fields.push(self.node(StructLitField { name, value }, field_start));

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "`}`")?;

        Ok(self.node(Expr::StructLit(StructLitExpr { path, fields }), start))
    }

    fn array_expr(&mut self) -> ParseResult<AstNode<Expr>> {
        let start = self.cursor_start();
        self.expect(TokenKind::LBracket, "`[`")?;

        if self.eat(&TokenKind::RBracket) {
            return Ok(self.node(Expr::ArrayLit(ArrayLitExpr { elements: Vec::new() }), start));
        }

        let first = self.with_struct_lit(|p| p.expr())?;

        if self.eat(&TokenKind::Semi) {
            let length = self.with_struct_lit(|p| p.expr())?;
            self.expect(TokenKind::RBracket, "`]`")?;
            return Ok(self.node(
                Expr::ArrayRepeat(ArrayRepeatExpr {
                    element: Box::new(first),
                    length: Box::new(length),
                }),
                start,
            ));
        }

        let mut elements = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at(&TokenKind::RBracket) {
                break;
            }
            elements.push(self.with_struct_lit(|p| p.expr())?);
        }
        self.expect(TokenKind::RBracket, "`]`")?;

        Ok(self.node(Expr::ArrayLit(ArrayLitExpr { elements }), start))
    }

    fn if_expr(&mut self) -> ParseResult<AstNode<Expr>> {
        let start = self.cursor_start();
        self.expect_keyword(Keyword::If, "`if`")?;

        let condition = self.no_struct_lit(|p| p.expr())?;
        let then_block = self.block()?;

        let else_branch = if self.eat_keyword(Keyword::Else) {
            if self.at_keyword(Keyword::If) {
                Some(Box::new(self.if_expr()?))
            } else {
                let else_start = self.cursor_start();
                let block = self.block()?;
                Some(Box::new(
                    self.node(Expr::Block(BlockExpr { block: Box::new(block) }), else_start),
                ))
            }
        } else {
            None
        };

        Ok(self.node(
            Expr::If(IfExpr {
                condition: Box::new(condition),
                then_block: Box::new(then_block),
                else_branch,
            }),
            start,
        ))
    }
}

/// Whether an expression may stand as a statement without `;`.
fn is_block_like(expr: &Expr) -> bool {
    matches!(expr, Expr::If(_) | Expr::While(_) | Expr::Loop(_) | Expr::Block(_))
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum ItemPosition {
    Module,
    Trait,
    Impl,
}

impl ItemPosition {
    fn expected(&self) -> &'static str {
        match self {
            ItemPosition::Module => "an item",
            ItemPosition::Trait => "a trait item",
            ItemPosition::Impl => "an `impl` item",
        }
    }
}

/// Strict or lazy binary operator, for the precedence climber.
#[derive(Copy, Clone)]
enum BinaryOp {
    Strict(BinOp),
    Lazy(LogicalOp),
}

impl BinaryOp {
    fn from_token(kind: &TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::PipePipe => BinaryOp::Lazy(LogicalOp::Or),
            TokenKind::AmpAmp => BinaryOp::Lazy(LogicalOp::And),
            TokenKind::EqEq => BinaryOp::Strict(BinOp::Eq),
            TokenKind::NotEq => BinaryOp::Strict(BinOp::NotEq),
            TokenKind::Lt => BinaryOp::Strict(BinOp::Lt),
            TokenKind::LtEq => BinaryOp::Strict(BinOp::LtEq),
            TokenKind::Gt => BinaryOp::Strict(BinOp::Gt),
            TokenKind::GtEq => BinaryOp::Strict(BinOp::GtEq),
            TokenKind::Pipe => BinaryOp::Strict(BinOp::BitOr),
            TokenKind::Caret => BinaryOp::Strict(BinOp::BitXor),
            TokenKind::Amp => BinaryOp::Strict(BinOp::BitAnd),
            TokenKind::Shl => BinaryOp::Strict(BinOp::Shl),
            TokenKind::Shr => BinaryOp::Strict(BinOp::Shr),
            TokenKind::Plus => BinaryOp::Strict(BinOp::Add),
            TokenKind::Minus => BinaryOp::Strict(BinOp::Sub),
            TokenKind::Star => BinaryOp::Strict(BinOp::Mul),
            TokenKind::Slash => BinaryOp::Strict(BinOp::Div),
            TokenKind::Percent => BinaryOp::Strict(BinOp::Rem),
            _ => return None,
        })
    }

    fn is_comparison(&self) -> bool {
        matches!(self, BinaryOp::Strict(op) if op.is_comparison())
    }

    /// `(left, right)` binding powers; left-associative operators have
    /// `left < right`.
    fn binding_power(&self) -> (u8, u8) {
        match self {
            BinaryOp::Lazy(LogicalOp::Or) => (1, 2),
            BinaryOp::Lazy(LogicalOp::And) => (3, 4),
            BinaryOp::Strict(op) if op.is_comparison() => (5, 6),
            BinaryOp::Strict(BinOp::BitOr) => (7, 8),
            BinaryOp::Strict(BinOp::BitXor) => (9, 10),
            BinaryOp::Strict(BinOp::BitAnd) => (11, 12),
            BinaryOp::Strict(BinOp::Shl | BinOp::Shr) => (13, 14),
            BinaryOp::Strict(BinOp::Add | BinOp::Sub) => (15, 16),
            BinaryOp::Strict(BinOp::Mul | BinOp::Div | BinOp::Rem) => (17, 18),
            BinaryOp::Strict(_) => unreachable!("comparisons handled above"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rux_lexer::Lexer;

    use super::*;

    fn parse(src: &str) -> Module {
        let tokens = Lexer::new(src).tokenise().unwrap();
        parse_module(tokens).unwrap()
    }

    fn parse_err(src: &str) -> ParseError {
        let tokens = Lexer::new(src).tokenise().unwrap();
        parse_module(tokens).unwrap_err()
    }

    fn first_fn(module: &Module) -> &FnDef {
        match module.items[0].body() {
            Item::Fn(def) => def,
            other => panic!("expected a function, got {other:?}"),
        }
    }

    #[test]
    fn fn_with_params_and_body() {
        let module = parse("fn add(a: i32, b: i32) -> i32 { a + b }");
        let def = first_fn(&module);

        assert_eq!(def.name.body(), "add");
        assert_eq!(def.params.len(), 2);
        assert!(def.ret_ty.is_some());

        let body = def.body.as_ref().unwrap().body();
        assert!(body.stmts.is_empty());
        assert!(matches!(body.tail.as_deref().unwrap().body(), Expr::Binary(_)));
    }

    #[test]
    fn precedence_and_associativity() {
        let module = parse("fn f() -> i32 { 1 + 2 * 3 }");
        let body = first_fn(&module).body.as_ref().unwrap().body();

        let Expr::Binary(BinaryExpr { op, rhs, .. }) = body.tail.as_deref().unwrap().body() else {
            panic!("expected binary expression");
        };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(rhs.body(), Expr::Binary(BinaryExpr { op: BinOp::Mul, .. })));
    }

    #[test]
    fn comparison_does_not_chain() {
        let err = parse_err("fn f() -> bool { 1 < 2 < 3 }");
        assert_eq!(err.kind, ParseErrorKind::ChainedComparison);
    }

    #[test]
    fn condition_is_not_a_struct_literal() {
        let module = parse("fn f(x: S) { if x { } }");
        let body = first_fn(&module).body.as_ref().unwrap().body();

        let Expr::If(if_expr) = body.tail.as_deref().unwrap().body() else {
            panic!("expected if");
        };
        assert!(matches!(if_expr.condition.body(), Expr::Path(_)));
    }

    #[test]
    fn struct_literal_in_let() {
        let module = parse("fn f() { let p: P = P { x: 1, y: 2 }; }");
        let body = first_fn(&module).body.as_ref().unwrap().body();

        let Stmt::Let(let_stmt) = body.stmts[0].body() else { panic!("expected let") };
        assert!(matches!(let_stmt.init.as_ref().unwrap().body(), Expr::StructLit(_)));
    }

    #[test]
    fn method_calls_and_paths() {
        let module = parse("fn f(p: &P) -> i32 { p.norm() + P::ORIGIN }");
        let body = first_fn(&module).body.as_ref().unwrap().body();

        let Expr::Binary(BinaryExpr { lhs, rhs, .. }) = body.tail.as_deref().unwrap().body()
        else {
            panic!("expected binary expression");
        };
        assert!(matches!(lhs.body(), Expr::MethodCall(_)));
        let Expr::Path(path) = rhs.body() else { panic!("expected path") };
        assert_eq!(path.segments.len(), 2);
    }

    #[test]
    fn impl_blocks() {
        let module = parse(
            "trait Area { fn area(&self) -> i32; }\n\
             impl Area for Rect { fn area(&self) -> i32 { self.w * self.h } }",
        );

        let Item::Trait(trait_def) = module.items[0].body() else { panic!("expected trait") };
        let Item::Fn(sig) = trait_def.items[0].body() else { panic!("expected fn") };
        assert!(sig.body.is_none());

        let Item::Impl(impl_block) = module.items[1].body() else { panic!("expected impl") };
        assert_eq!(impl_block.trait_name.as_ref().unwrap().body(), "Area");
        assert_eq!(impl_block.items.len(), 1);
    }

    #[test]
    fn loops_and_breaks() {
        let module = parse("fn f() -> i32 { let r: i32 = loop { break 42; }; r }");
        let body = first_fn(&module).body.as_ref().unwrap().body();

        let Stmt::Let(let_stmt) = body.stmts[0].body() else { panic!("expected let") };
        let Expr::Loop(loop_expr) = let_stmt.init.as_ref().unwrap().body() else {
            panic!("expected loop");
        };
        let Stmt::Expr { expr, .. } = loop_expr.body.body().stmts[0].body() else {
            panic!("expected stmt");
        };
        assert!(matches!(expr.body(), Expr::Break(BreakExpr { value: Some(_) })));
    }

    #[test]
    fn array_forms() {
        let module = parse("fn f() { let a: [i32; 3] = [1, 2, 3]; let b: [i32; 4] = [0; 4]; }");
        let body = first_fn(&module).body.as_ref().unwrap().body();

        let Stmt::Let(first) = body.stmts[0].body() else { panic!() };
        assert!(matches!(first.init.as_ref().unwrap().body(), Expr::ArrayLit(_)));
        let Stmt::Let(second) = body.stmts[1].body() else { panic!() };
        assert!(matches!(second.init.as_ref().unwrap().body(), Expr::ArrayRepeat(_)));
    }

    #[test]
    fn casts_bind_tighter_than_binary() {
        let module = parse("fn f(x: u32, y: u32) -> i32 { (x / y) as i32 }");
        let body = first_fn(&module).body.as_ref().unwrap().body();
        assert!(matches!(body.tail.as_deref().unwrap().body(), Expr::Cast(_)));
    }
}
