//! Names a mixin invokes through `super`.

use elk_element::ElementKind;
use elk_ir::{
    ensure_sufficient_stack, CollectionElement, Declaration, ExprArena, ExprId, ExprKind, Member,
    Name,
};

use crate::linker::Linker;

/// Record, on every mixin of library `lib`, the member names its bodies
/// and initializers reach through `super.name` or `super.name(..)`, in
/// first-occurrence order.
#[tracing::instrument(level = "debug", skip_all, fields(
    library = linker.interner.lookup(linker.builders[lib].uri),
))]
pub(crate) fn collect_mixin_super_invoked_names(linker: &mut Linker<'_>, lib: usize) {
    let library = linker.builders[lib].id;
    let mixins: Vec<_> = linker
        .store
        .library(library)
        .declarations
        .iter()
        .copied()
        .filter(|&id| linker.store.get(id).kind == ElementKind::Mixin)
        .collect();

    for mixin in mixins {
        let Some(located) = linker.node_map.locate(&linker.builders, mixin) else {
            continue;
        };
        let Declaration::Mixin(decl) = located.declaration else {
            continue;
        };
        let arena = &located.unit.arena;
        let mut names = Vec::new();
        for member in &decl.members {
            let roots: Vec<ExprId> = match member {
                Member::Method(method) => method
                    .body
                    .into_iter()
                    .chain(method.params.iter().filter_map(|p| p.default_value))
                    .collect(),
                Member::Field(field) => field.initializer.into_iter().collect(),
                Member::Constructor(_) => Vec::new(),
            };
            for root in roots {
                collect_super_names(arena, root, &mut names);
            }
        }
        tracing::debug!(names = names.len(), "mixin super invocations");
        if let Some(data) = linker.store.get_mut(mixin).interface_mut() {
            data.super_invoked_names = names;
        }
    }
}

fn collect_super_names(arena: &ExprArena, id: ExprId, names: &mut Vec<Name>) {
    ensure_sufficient_stack(|| collect_super_names_inner(arena, id, names));
}

fn collect_super_names_inner(arena: &ExprArena, id: ExprId, names: &mut Vec<Name>) {
    match arena.kind(id) {
        ExprKind::SuperInvocation { member, args } => {
            push_unique(names, *member);
            for arg in args {
                collect_super_names(arena, arg.value, names);
            }
        }
        ExprKind::SuperPropertyAccess(member) => push_unique(names, *member),
        ExprKind::AdjacentStrings(children)
        | ExprKind::Interpolation(children)
        | ExprKind::Block(children)
        | ExprKind::List {
            elements: children, ..
        } => {
            for &child in children {
                collect_super_names(arena, child, names);
            }
        }
        ExprKind::SetOrMap { elements, .. } => {
            for element in elements {
                match element {
                    CollectionElement::Expr(e) => collect_super_names(arena, *e, names),
                    CollectionElement::MapEntry { key, value } => {
                        collect_super_names(arena, *key, names);
                        collect_super_names(arena, *value, names);
                    }
                }
            }
        }
        ExprKind::Negate(operand) | ExprKind::Not(operand) => {
            collect_super_names(arena, *operand, names);
        }
        ExprKind::Binary { left, right, .. } => {
            collect_super_names(arena, *left, names);
            collect_super_names(arena, *right, names);
        }
        ExprKind::Conditional {
            condition,
            then_expr,
            else_expr,
        } => {
            for &child in [condition, then_expr, else_expr] {
                collect_super_names(arena, child, names);
            }
        }
        ExprKind::PropertyAccess { target, .. } => collect_super_names(arena, *target, names),
        ExprKind::Invocation { target, args, .. } => {
            if let Some(target) = target {
                collect_super_names(arena, *target, names);
            }
            for arg in args {
                collect_super_names(arena, arg.value, names);
            }
        }
        ExprKind::InstanceCreation { args, .. } => {
            for arg in args {
                collect_super_names(arena, arg.value, names);
            }
        }
        ExprKind::Null
        | ExprKind::Bool(_)
        | ExprKind::Int(_)
        | ExprKind::Double(_)
        | ExprKind::String(_)
        | ExprKind::Identifier(_)
        | ExprKind::Prefixed { .. }
        | ExprKind::This => {}
    }
}

fn push_unique(names: &mut Vec<Name>, name: Name) {
    if !names.contains(&name) {
        names.push(name);
    }
}
