//! Resolved constant expressions.
//!
//! Constant initializers, parameter default values, and annotation values are
//! stored as a small expression tree whose identifiers have been resolved to
//! elements. The linker does not evaluate them; it keeps enough structure for
//! a later constant evaluator and for the bundle.

use elk_ir::{BinaryOp, Name};

use crate::ElementId;

/// A constant expression with names resolved to elements.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstExpr {
    Null,
    Bool(bool),
    Int(i64),
    /// `f64` bits.
    Double(u64),
    String(Name),
    List(Vec<ConstExpr>),
    Set(Vec<ConstExpr>),
    Map(Vec<(ConstExpr, ConstExpr)>),
    /// Reference to a constant variable, field, or enum constant.
    Reference(ElementId),
    /// Reference to a type used as a value.
    TypeLiteral(ElementId),
    Negate(Box<ConstExpr>),
    Not(Box<ConstExpr>),
    Binary {
        op: BinaryOp,
        left: Box<ConstExpr>,
        right: Box<ConstExpr>,
    },
    Conditional {
        condition: Box<ConstExpr>,
        then_expr: Box<ConstExpr>,
        else_expr: Box<ConstExpr>,
    },
    /// `const C.ctor(args)` resolved to the constructor element.
    Construct {
        constructor: ElementId,
        args: Vec<(Option<Name>, ConstExpr)>,
    },
    /// Value of an enum constant.
    EnumValue { index: u32, name: Name },
    /// Not a constant expression, or unresolved.
    Invalid,
}

impl ConstExpr {
    /// Whether the expression, or any sub-expression, is invalid.
    pub fn has_invalid(&self) -> bool {
        match self {
            ConstExpr::Invalid => true,
            ConstExpr::List(items) | ConstExpr::Set(items) => items.iter().any(Self::has_invalid),
            ConstExpr::Map(entries) => entries
                .iter()
                .any(|(k, v)| k.has_invalid() || v.has_invalid()),
            ConstExpr::Negate(inner) | ConstExpr::Not(inner) => inner.has_invalid(),
            ConstExpr::Binary { left, right, .. } => left.has_invalid() || right.has_invalid(),
            ConstExpr::Conditional {
                condition,
                then_expr,
                else_expr,
            } => condition.has_invalid() || then_expr.has_invalid() || else_expr.has_invalid(),
            ConstExpr::Construct { args, .. } => args.iter().any(|(_, arg)| arg.has_invalid()),
            ConstExpr::Null
            | ConstExpr::Bool(_)
            | ConstExpr::Int(_)
            | ConstExpr::Double(_)
            | ConstExpr::String(_)
            | ConstExpr::Reference(_)
            | ConstExpr::TypeLiteral(_)
            | ConstExpr::EnumValue { .. } => false,
        }
    }
}
