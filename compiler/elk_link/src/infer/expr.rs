//! Static types of initializer expressions.

use elk_element::{ConstExpr, ElementId, ElementKind, ElementStore, LinkedType};
use elk_ir::{
    ensure_sufficient_stack, BinaryOp, CollectionElement, ExprArena, ExprId, ExprKind, Name,
};

use super::Inferrer;
use crate::builder::{constructor_named, enclosing_interface, ConstLowering};
use crate::types::{normalize, resolve_annotation};

impl Inferrer<'_> {
    /// Type of expression `id` of the initializer of `context`, declared in
    /// batch library `library`.
    pub(super) fn expr_type(
        &mut self,
        library: usize,
        arena: &ExprArena,
        context: ElementId,
        id: ExprId,
    ) -> LinkedType {
        ensure_sufficient_stack(|| self.expr_type_inner(library, arena, context, id))
    }

    fn expr_type_inner(
        &mut self,
        library: usize,
        arena: &ExprArena,
        context: ElementId,
        id: ExprId,
    ) -> LinkedType {
        let types = &self.cx.types;
        match arena.kind(id) {
            ExprKind::Bool(_) | ExprKind::Not(_) => types.bool_type(),
            ExprKind::Int(_) => types.int_type(),
            ExprKind::Double(_) => types.double_type(),
            ExprKind::String(_) | ExprKind::AdjacentStrings(_) | ExprKind::Interpolation(_) => {
                types.string_type()
            }
            ExprKind::List { elements, .. } => {
                let element = self.common_type(library, arena, context, elements);
                self.cx.types.list_of(element)
            }
            ExprKind::SetOrMap { elements, .. } => {
                self.set_or_map_type(library, arena, context, elements)
            }
            ExprKind::Negate(operand) => {
                let ty = self.expr_type(library, arena, context, *operand);
                if self.cx.types.is_number(&ty) {
                    ty
                } else {
                    LinkedType::Dynamic
                }
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.expr_type(library, arena, context, *left);
                let right = self.expr_type(library, arena, context, *right);
                self.binary_type(*op, left, right)
            }
            ExprKind::Conditional {
                then_expr,
                else_expr,
                ..
            } => {
                let then_type = self.expr_type(library, arena, context, *then_expr);
                let else_type = self.expr_type(library, arena, context, *else_expr);
                if then_type == else_type {
                    then_type
                } else {
                    LinkedType::Dynamic
                }
            }
            ExprKind::Identifier(_) | ExprKind::Prefixed { .. } | ExprKind::PropertyAccess { .. } => {
                match self.lower(library, arena, context, id) {
                    ConstExpr::Reference(element) => self.reference_type(element),
                    _ => LinkedType::Dynamic,
                }
            }
            ExprKind::Invocation { target, name, .. } => {
                self.invocation_type(library, arena, context, id, *target, *name)
            }
            ExprKind::InstanceCreation { ty, .. } => {
                let resolved = resolve_annotation(
                    self.store,
                    &self.scopes[library],
                    self.names,
                    context,
                    ty,
                );
                normalize(self.store, &resolved)
            }
            ExprKind::Null
            | ExprKind::This
            | ExprKind::SuperInvocation { .. }
            | ExprKind::SuperPropertyAccess(_)
            | ExprKind::Block(_) => LinkedType::Dynamic,
        }
    }

    fn lower(&self, library: usize, arena: &ExprArena, context: ElementId, id: ExprId) -> ConstExpr {
        ConstLowering {
            store: &*self.store,
            scope: &self.scopes[library],
            arena,
            interner: self.interner,
            class: enclosing_interface(self.store, context),
        }
        .lower(id)
    }

    /// Type of a variable, field, or getter read, or of a function tear-off.
    fn reference_type(&mut self, element: ElementId) -> LinkedType {
        match self.store.get(element).kind {
            ElementKind::TopLevelVariable | ElementKind::Field | ElementKind::Getter => {
                self.type_of(element)
            }
            ElementKind::Function | ElementKind::Method => {
                let Some(data) = self.store.get(element).executable() else {
                    return LinkedType::Dynamic;
                };
                let params = data.params.clone();
                let return_type = Box::new(data.return_type.clone());
                LinkedType::Function {
                    return_type,
                    params: params.into_iter().map(|p| self.type_of(p)).collect(),
                    nullable: false,
                }
            }
            _ => LinkedType::Dynamic,
        }
    }

    /// `f(..)`, `C(..)`, `C.named(..)`, `prefix.f(..)`, `prefix.C(..)`.
    fn invocation_type(
        &self,
        library: usize,
        arena: &ExprArena,
        context: ElementId,
        id: ExprId,
        target: Option<ExprId>,
        name: Name,
    ) -> LinkedType {
        let scope = &self.scopes[library];
        let callee = match target.map(|t| arena.kind(t)) {
            None => scope.lookup(name),
            Some(ExprKind::Identifier(prefix)) if scope.has_prefix(*prefix) => {
                scope.lookup_prefixed(*prefix, name)
            }
            Some(_) => None,
        };
        if let Some(callee) = callee {
            let callee_entry = self.store.get(callee);
            match callee_entry.kind {
                ElementKind::Function => {
                    return callee_entry
                        .executable()
                        .map_or(LinkedType::Dynamic, |data| data.return_type.clone());
                }
                ElementKind::Class | ElementKind::Enum
                    if constructor_named(self.store, callee, Name::EMPTY).is_some() =>
                {
                    return instantiate_dynamic(self.store, callee);
                }
                _ => {}
            }
        }
        match self.lower(library, arena, context, id) {
            ConstExpr::Construct { constructor, .. } => self
                .store
                .get(constructor)
                .enclosing
                .map_or(LinkedType::Dynamic, |class| instantiate_dynamic(self.store, class)),
            _ => LinkedType::Dynamic,
        }
    }

    /// `T` when every element has type `T`, `dynamic` otherwise or when
    /// there are none.
    fn common_type(
        &mut self,
        library: usize,
        arena: &ExprArena,
        context: ElementId,
        elements: &[ExprId],
    ) -> LinkedType {
        let mut common: Option<LinkedType> = None;
        for &element in elements {
            let ty = self.expr_type(library, arena, context, element);
            match &common {
                None => common = Some(ty),
                Some(existing) if *existing == ty => {}
                Some(_) => return LinkedType::Dynamic,
            }
        }
        common.unwrap_or(LinkedType::Dynamic)
    }

    /// `{}` and all-entry literals are maps; all-element literals are sets.
    fn set_or_map_type(
        &mut self,
        library: usize,
        arena: &ExprArena,
        context: ElementId,
        elements: &[CollectionElement],
    ) -> LinkedType {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        let mut items = Vec::new();
        for element in elements {
            match element {
                CollectionElement::Expr(e) => items.push(*e),
                CollectionElement::MapEntry { key, value } => {
                    keys.push(*key);
                    values.push(*value);
                }
            }
        }
        match (items.is_empty(), keys.is_empty()) {
            (true, _) => {
                let key = self.common_type(library, arena, context, &keys);
                let value = self.common_type(library, arena, context, &values);
                self.cx.types.map_of(key, value)
            }
            (false, true) => {
                let item = self.common_type(library, arena, context, &items);
                self.cx.types.set_of(item)
            }
            (false, false) => LinkedType::Dynamic,
        }
    }

    fn binary_type(&self, op: BinaryOp, left: LinkedType, right: LinkedType) -> LinkedType {
        let types = &self.cx.types;
        if op.is_boolean() {
            return types.bool_type();
        }
        let numbers = types.is_number(&left) && types.is_number(&right);
        let is = |ty: &LinkedType, element: ElementId| ty.interface_element() == Some(element);
        match op {
            BinaryOp::IfNull if left == right => left,
            BinaryOp::Div if numbers => types.double_type(),
            BinaryOp::IntDiv if numbers => types.int_type(),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Mod if numbers => {
                if is(&left, types.int) && is(&right, types.int) {
                    types.int_type()
                } else if is(&left, types.double) || is(&right, types.double) {
                    types.double_type()
                } else {
                    LinkedType::interface(types.num, Vec::new())
                }
            }
            BinaryOp::Add if is(&left, types.string) && is(&right, types.string) => {
                types.string_type()
            }
            _ => LinkedType::Dynamic,
        }
    }
}

/// `C<dynamic, ..>`.
fn instantiate_dynamic(store: &ElementStore, class: ElementId) -> LinkedType {
    let arity = store.get(class).type_params().len();
    LinkedType::interface(class, vec![LinkedType::Dynamic; arity])
}
