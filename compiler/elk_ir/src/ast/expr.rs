//! Flat expression storage.

use std::ops::Index;

use crate::{Name, Span, TypeAnnotation};

/// Index of an expression in its unit's [`ExprArena`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct ExprId(u32);

impl ExprId {
    /// Create from a raw index.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        ExprId(raw)
    }

    /// Raw index.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// An expression node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Expression kinds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Null,
    Bool(bool),
    Int(i64),
    /// Double literal stored as `f64::to_bits` for Hash compatibility.
    Double(u64),
    String(Name),
    /// `'a' 'b'`: adjacent string literals.
    AdjacentStrings(Vec<ExprId>),
    /// `'a$b'`: string with interpolated parts.
    Interpolation(Vec<ExprId>),
    List {
        elements: Vec<ExprId>,
        is_const: bool,
    },
    /// `{...}`: a set or map literal; the parser does not decide which.
    SetOrMap {
        elements: Vec<CollectionElement>,
        is_const: bool,
    },
    /// `-operand`
    Negate(ExprId),
    /// `!operand`
    Not(ExprId),
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    Conditional {
        condition: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },
    Identifier(Name),
    /// `prefix.name` where `prefix` is a simple identifier.
    Prefixed {
        prefix: Name,
        name: Name,
    },
    PropertyAccess {
        target: ExprId,
        name: Name,
    },
    /// `name(args)` or `target.name(args)`.
    Invocation {
        target: Option<ExprId>,
        name: Name,
        args: Vec<Argument>,
    },
    /// `new T.ctor(args)` / `const T(args)`.
    InstanceCreation {
        ty: TypeAnnotation,
        constructor: Option<Name>,
        args: Vec<Argument>,
        is_const: bool,
    },
    /// `super.member(args)`
    SuperInvocation {
        member: Name,
        args: Vec<Argument>,
    },
    /// `super.member`
    SuperPropertyAccess(Name),
    /// `this`
    This,
    /// `{ e1; e2; }`: statement list of a body, reduced to expressions.
    Block(Vec<ExprId>),
}

/// Element of a set-or-map literal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CollectionElement {
    Expr(ExprId),
    MapEntry { key: ExprId, value: ExprId },
}

/// A call argument, positional when `name` is `None`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Argument {
    pub name: Option<Name>,
    pub value: ExprId,
}

impl Argument {
    /// Positional argument.
    pub fn positional(value: ExprId) -> Self {
        Argument { name: None, value }
    }

    /// Named argument.
    pub fn named(name: Name, value: ExprId) -> Self {
        Argument {
            name: Some(name),
            value,
        }
    }
}

/// Binary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    /// `~/`
    IntDiv,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    /// `??`
    IfNull,
}

impl BinaryOp {
    /// Whether the operator always produces a `bool`.
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
                | BinaryOp::And
                | BinaryOp::Or
        )
    }
}

/// Expression storage for one compilation unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExprArena {
    exprs: Vec<Expr>,
}

impl ExprArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an expression with a dummy span.
    pub fn alloc(&mut self, kind: ExprKind) -> ExprId {
        self.alloc_spanned(kind, Span::DUMMY)
    }

    /// Allocate an expression.
    ///
    /// # Panics
    /// Panics if the arena exceeds `u32::MAX` expressions.
    pub fn alloc_spanned(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let raw = u32::try_from(self.exprs.len())
            .unwrap_or_else(|_| panic!("expression arena exceeded u32::MAX entries"));
        self.exprs.push(Expr { kind, span });
        ExprId(raw)
    }

    /// Look up an expression, `None` for ids from another arena.
    pub fn get(&self, id: ExprId) -> Option<&Expr> {
        self.exprs.get(id.0 as usize)
    }

    /// Kind of an expression.
    ///
    /// # Panics
    /// Panics if `id` was not allocated in this arena.
    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self[id].kind
    }

    /// Number of expressions.
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}

impl Index<ExprId> for ExprArena {
    type Output = Expr;

    fn index(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0 as usize]
    }
}

// f64 literals go through bits so `Expr` stays `Eq + Hash`.
impl ExprKind {
    /// Double literal from an `f64`.
    pub fn double(value: f64) -> Self {
        ExprKind::Double(value.to_bits())
    }
}
