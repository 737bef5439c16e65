//! The semantic passes, one module per traversal, plus the helpers
//! they share: type-node resolution, path resolution and constant
//! evaluation.
pub mod confirm;
pub mod declare;
pub mod paths;
pub mod places;
pub mod resolve;
pub mod typecheck;

use rux_ast::{AstNode, AstNodeId, Expr, Lit, PathExpr, Ty as TyNode, UnOp, BinOp};
use rux_source::Span;

use crate::{
    error::{SemaResult, SemanticError, SemanticErrorKind},
    symbol::{SymbolId, SymbolKind},
    ty::{PrimTy, Ty},
    Analysis,
};

pub(crate) fn err<T>(kind: SemanticErrorKind, span: Span) -> SemaResult<T> {
    Err(SemanticError::new(kind, span))
}

/// Resolve a written type against the scope tree, from the type
/// node's recorded position. The result is also recorded in the
/// `resolved_ty` table.
pub(crate) fn resolve_ty_node(analysis: &mut Analysis, node: &AstNode<TyNode>) -> SemaResult<Ty> {
    let ty = match node.body() {
        TyNode::Unit => Ty::Unit,

        TyNode::Path(name) => {
            if let Some(prim) = PrimTy::from_name(name.body()) {
                Ty::Prim(prim)
            } else {
                let position = analysis.tables.node_position[node.id()];
                let symbol = analysis.scopes.lookup(position, name.body());
                match symbol {
                    Some(id)
                        if matches!(
                            analysis.symbols.get(id).kind,
                            SymbolKind::Struct(_) | SymbolKind::Enum(_)
                        ) =>
                    {
                        Ty::Named { name: name.body().clone(), symbol: id }
                    }
                    _ => {
                        return err(
                            SemanticErrorKind::UnresolvedType { name: name.body().clone() },
                            name.span(),
                        )
                    }
                }
            }
        }

        TyNode::Ref { inner, mutable } => {
            let inner = resolve_ty_node(analysis, inner)?;
            Ty::Ref { inner: Box::new(inner), mutable: *mutable }
        }

        TyNode::Array { element, length } => {
            let element = resolve_ty_node(analysis, element)?;
            let Some(length) = eval_const_expr(analysis, length) else {
                return err(
                    SemanticErrorKind::UnresolvedType { name: "array length".to_string() },
                    length.span(),
                );
            };
            if length < 0 {
                return err(
                    SemanticErrorKind::UnresolvedType { name: "array length".to_string() },
                    node.span(),
                );
            }
            Ty::Array { element: Box::new(element), length }
        }

        TyNode::SelfTy => {
            let position = analysis.tables.node_position[node.id()];
            match analysis.scopes.enclosing_self_ty(position.scope) {
                Some(ty) => ty,
                None => {
                    return err(
                        SemanticErrorKind::InvalidSelf {
                            message: "`Self` outside of an `impl` or `trait` block".to_string(),
                        },
                        node.span(),
                    )
                }
            }
        }
    };

    analysis.tables.resolved_ty.insert(node.id(), ty.clone());
    Ok(ty)
}

/// Best-effort compile-time evaluation of an integer constant
/// expression: literals, negation, the four arithmetic operators and
/// paths to already-evaluated constants.
pub(crate) fn eval_const_expr(analysis: &Analysis, expr: &AstNode<Expr>) -> Option<i64> {
    match expr.body() {
        Expr::Lit(Lit::Int(lit)) => Some(lit.value as i64),

        Expr::Unary(unary) if unary.op == UnOp::Neg => {
            eval_const_expr(analysis, &unary.operand).map(|value| -value)
        }

        Expr::Binary(binary) => {
            let lhs = eval_const_expr(analysis, &binary.lhs)?;
            let rhs = eval_const_expr(analysis, &binary.rhs)?;
            match binary.op {
                BinOp::Add => lhs.checked_add(rhs),
                BinOp::Sub => lhs.checked_sub(rhs),
                BinOp::Mul => lhs.checked_mul(rhs),
                BinOp::Div => lhs.checked_div(rhs),
                BinOp::Rem => lhs.checked_rem(rhs),
                _ => None,
            }
        }

        Expr::Path(path) if path.segments.len() == 1 => {
            let position = analysis.tables.node_position.get_copied(expr.id())?;
            let symbol = analysis.scopes.lookup(position, path.segments[0].body())?;
            match analysis.symbols.get(symbol).kind {
                SymbolKind::Constant { value, .. } => value,
                _ => None,
            }
        }

        _ => None,
    }
}

/// Resolve a path expression to its target symbol using the
/// two-segment grammar. Shared by pass 3 (which needs the symbol to
/// type the expression) and pass 5 (which finalises the binding);
/// both record it in the `node_symbol` table.
pub(crate) fn resolve_path(
    analysis: &mut Analysis,
    id: AstNodeId,
    path: &PathExpr,
    span: Span,
) -> SemaResult<SymbolId> {
    let position = analysis.tables.node_position[id];

    let symbol = match path.segments.as_slice() {
        [single] => {
            let name = single.body();
            match analysis.scopes.lookup(position, name) {
                Some(symbol) => symbol,
                None if name == "self" => {
                    return err(
                        SemanticErrorKind::InvalidSelf {
                            message: "`self` outside of a method".to_string(),
                        },
                        span,
                    )
                }
                None => {
                    return err(SemanticErrorKind::UnresolvedName { name: name.clone() }, span)
                }
            }
        }

        [first, second] => {
            let type_symbol = if first.body() == "Self" {
                match analysis.scopes.enclosing_self_ty(position.scope) {
                    Some(Ty::Named { symbol, .. }) => symbol,
                    _ => {
                        return err(
                            SemanticErrorKind::InvalidSelf {
                                message: "`Self` outside of an `impl` block".to_string(),
                            },
                            first.span(),
                        )
                    }
                }
            } else {
                match analysis.scopes.lookup(position, first.body()) {
                    Some(symbol)
                        if matches!(
                            analysis.symbols.get(symbol).kind,
                            SymbolKind::Struct(_) | SymbolKind::Enum(_)
                        ) =>
                    {
                        symbol
                    }
                    _ => {
                        return err(
                            SemanticErrorKind::UnresolvedType { name: first.body().clone() },
                            first.span(),
                        )
                    }
                }
            };

            let item = second.body();
            let resolved = match &analysis.symbols.get(type_symbol).kind {
                SymbolKind::Enum(def) => def.variants.get(item).copied(),
                SymbolKind::Struct(def) => def
                    .consts
                    .get(item)
                    .or_else(|| def.functions.get(item))
                    .or_else(|| def.methods.get(item))
                    .copied(),
                _ => unreachable!("path base is a struct or enum"),
            };

            match resolved {
                Some(symbol) => symbol,
                None => {
                    return err(
                        SemanticErrorKind::UnresolvedName { name: item.clone() },
                        second.span(),
                    )
                }
            }
        }

        _ => unreachable!("the parser caps paths at two segments"),
    };

    analysis.tables.node_symbol.insert(id, symbol);
    Ok(symbol)
}
