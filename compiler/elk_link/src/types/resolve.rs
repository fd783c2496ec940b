//! Resolution of type annotations to [`LinkedType`]s.

use elk_element::{ElementId, ElementKind, ElementStore, LinkedType};
use elk_ir::{ensure_sufficient_stack, Declaration, Member, Name, TypeAnnotation};

use crate::builder::LibraryBuilder;
use crate::context::LinkContext;
use crate::linker::Linker;
use crate::names::WellKnownNames;
use crate::node_map::{Node, NodeMap};
use crate::scope::ImportScope;

/// One typed position of an element.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum TypeSlot {
    /// `extends` clause of a class; implied for enums.
    Supertype,
    Mixin,
    Interface,
    /// Mixin `on` clause; `Object` when absent.
    OnConstraint,
    /// Type parameter bound.
    Bound,
    /// Right-hand side of a type alias.
    Aliased,
    /// Return type of a function, method, accessor, or constructor.
    ReturnType,
    /// Type of a variable, field, or parameter.
    Declared,
}

struct PendingType<'a> {
    element: ElementId,
    slot: TypeSlot,
    annotation: Option<&'a TypeAnnotation>,
    library: usize,
}

/// Resolve every pending annotation of the batch.
///
/// All elements of the batch exist before this runs, so a single worklist
/// across libraries resolves forward and cross-library references alike.
#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn resolve_types(linker: &mut Linker<'_>, cx: &LinkContext) {
    let elements = linker.batch_elements();
    let builders = &linker.builders;
    let store = &mut *linker.store;

    let mut worklist = Vec::new();
    for element in elements {
        let Some(library) = builders.iter().position(|b| b.id == store.get(element).library) else {
            continue;
        };
        collect_slots(builders, store, &linker.node_map, element, library, &mut worklist);
    }
    tracing::debug!(slots = worklist.len(), "type worklist");

    for pending in worklist {
        let scope = &linker.scopes[pending.library];
        let ty = pending
            .annotation
            .map(|annotation| resolve_annotation(store, scope, &linker.names, pending.element, annotation));
        apply(store, &linker.names, cx, pending.element, pending.slot, ty);
    }
}

fn collect_slots<'a>(
    builders: &'a [LibraryBuilder],
    store: &ElementStore,
    node_map: &NodeMap,
    element: ElementId,
    library: usize,
    out: &mut Vec<PendingType<'a>>,
) {
    let kind = store.get(element).kind;
    let mut push = |slot: TypeSlot, annotation: Option<&'a TypeAnnotation>| {
        out.push(PendingType {
            element,
            slot,
            annotation,
            library,
        });
    };

    // Enums and constructors take their types from the declaration itself.
    match kind {
        ElementKind::Enum => return push(TypeSlot::Supertype, None),
        ElementKind::Constructor => return push(TypeSlot::ReturnType, None),
        _ => {}
    }

    let Some(located) = node_map.locate(builders, element) else {
        return;
    };
    match (kind, located.node, located.declaration) {
        (ElementKind::Class, Node::Declaration, Declaration::Class(class)) => {
            push(TypeSlot::Supertype, class.superclass.as_ref());
            for mixin in &class.mixins {
                push(TypeSlot::Mixin, Some(mixin));
            }
            for interface in &class.interfaces {
                push(TypeSlot::Interface, Some(interface));
            }
        }
        (ElementKind::Mixin, Node::Declaration, Declaration::Mixin(mixin)) => {
            if mixin.on.is_empty() {
                push(TypeSlot::OnConstraint, None);
            }
            for constraint in &mixin.on {
                push(TypeSlot::OnConstraint, Some(constraint));
            }
            for interface in &mixin.interfaces {
                push(TypeSlot::Interface, Some(interface));
            }
        }
        (ElementKind::TypeAlias, Node::Declaration, Declaration::TypeAlias(alias)) => {
            push(TypeSlot::Aliased, Some(&alias.aliased));
        }
        (ElementKind::Function, Node::Declaration, Declaration::Function(function)) => {
            push(TypeSlot::ReturnType, function.return_type.as_ref());
        }
        (ElementKind::TopLevelVariable, Node::Declaration, Declaration::Variable(variable)) => {
            push(TypeSlot::Declared, variable.ty.as_ref());
        }
        (
            ElementKind::Method | ElementKind::Getter | ElementKind::Setter,
            Node::Member(Member::Method(method)),
            _,
        ) => push(TypeSlot::ReturnType, method.return_type.as_ref()),
        (ElementKind::Field, Node::Member(Member::Field(field)), _) => {
            push(TypeSlot::Declared, field.ty.as_ref());
        }
        (ElementKind::Parameter, Node::Param(param), _) => {
            push(TypeSlot::Declared, param.ty.as_ref());
        }
        (ElementKind::TypeParameter, Node::TypeParam(param), _) => {
            if let Some(bound) = &param.bound {
                push(TypeSlot::Bound, Some(bound));
            }
        }
        _ => {}
    }
}

/// Store a resolved (or defaulted, when `ty` is `None`) type.
fn apply(
    store: &mut ElementStore,
    names: &WellKnownNames,
    cx: &LinkContext,
    element: ElementId,
    slot: TypeSlot,
    ty: Option<LinkedType>,
) {
    let types = &cx.types;
    match slot {
        TypeSlot::Supertype => {
            let supertype = match ty {
                Some(ty @ LinkedType::Interface { .. }) => Some(ty),
                Some(_) | None => default_supertype(store, names, cx, element),
            };
            if let Some(data) = store.get_mut(element).interface_mut() {
                data.supertype = supertype;
            }
        }
        TypeSlot::Mixin | TypeSlot::Interface | TypeSlot::OnConstraint => {
            let ty = match ty {
                Some(ty @ LinkedType::Interface { .. }) => ty,
                None if slot == TypeSlot::OnConstraint => types.object_type(),
                Some(_) | None => return,
            };
            if let Some(data) = store.get_mut(element).interface_mut() {
                match slot {
                    TypeSlot::Mixin => data.mixins.push(ty),
                    TypeSlot::Interface => data.interfaces.push(ty),
                    _ => data.superclass_constraints.push(ty),
                }
            }
        }
        TypeSlot::Bound => {
            if let Some(data) = store.get_mut(element).type_parameter_mut() {
                data.bound = ty;
            }
        }
        TypeSlot::Aliased => {
            if let Some(data) = store.get_mut(element).type_alias_mut() {
                data.aliased = ty.unwrap_or(LinkedType::Invalid);
            }
        }
        TypeSlot::ReturnType => {
            let ty = ty.unwrap_or_else(|| implicit_return_type(store, element));
            if let Some(data) = store.get_mut(element).executable_mut() {
                data.return_type = ty;
            }
        }
        TypeSlot::Declared => {
            let ty = ty.unwrap_or(LinkedType::Dynamic);
            let target = store.get_mut(element);
            if let Some(data) = target.variable_mut() {
                data.ty = ty;
            } else if let Some(data) = target.parameter_mut() {
                data.ty = ty;
            }
        }
    }
}

/// `Object` for classes, `Enum` for enums, nothing for `dart:core`'s
/// `Object` itself.
fn default_supertype(
    store: &ElementStore,
    names: &WellKnownNames,
    cx: &LinkContext,
    element: ElementId,
) -> Option<LinkedType> {
    let class = store.get(element);
    if class.kind == ElementKind::Enum {
        return Some(cx.types.enum_type());
    }
    let is_root = element == cx.types.object
        || (class.name == names.object && store.library(class.library).uri == names.dart_core);
    if is_root {
        None
    } else {
        Some(cx.types.object_type())
    }
}

fn implicit_return_type(store: &ElementStore, element: ElementId) -> LinkedType {
    let executable = store.get(element);
    match executable.kind {
        ElementKind::Setter => LinkedType::Void,
        ElementKind::Constructor => executable
            .enclosing
            .map_or(LinkedType::Dynamic, |class| this_type(store, class)),
        _ => LinkedType::Dynamic,
    }
}

/// `C<T1, .., Tn>` as seen inside `C`.
pub(crate) fn this_type(store: &ElementStore, class: ElementId) -> LinkedType {
    let args = store
        .get(class)
        .type_params()
        .iter()
        .map(|&param| LinkedType::TypeParameter {
            element: param,
            nullable: false,
        })
        .collect();
    LinkedType::interface(class, args)
}

/// Resolve `annotation` as written inside `context`.
///
/// Type parameters of `context` and its enclosing elements shadow library
/// names; `dynamic`, `void`, and `Never` are builtin. Unresolvable names
/// become [`LinkedType::Invalid`]. Generic types written without arguments
/// stay raw (empty `args`) until the type-graph pass instantiates them.
pub(crate) fn resolve_annotation(
    store: &ElementStore,
    scope: &ImportScope,
    names: &WellKnownNames,
    context: ElementId,
    annotation: &TypeAnnotation,
) -> LinkedType {
    ensure_sufficient_stack(|| resolve_annotation_inner(store, scope, names, context, annotation))
}

fn resolve_annotation_inner(
    store: &ElementStore,
    scope: &ImportScope,
    names: &WellKnownNames,
    context: ElementId,
    annotation: &TypeAnnotation,
) -> LinkedType {
    match annotation {
        TypeAnnotation::Function {
            return_type,
            params,
            nullable,
            ..
        } => LinkedType::Function {
            return_type: Box::new(resolve_annotation(store, scope, names, context, return_type)),
            params: params
                .iter()
                .map(|param| resolve_annotation(store, scope, names, context, param))
                .collect(),
            nullable: *nullable,
        },
        TypeAnnotation::Named {
            prefix,
            name,
            args,
            nullable,
            ..
        } => {
            let element = match prefix {
                Some(prefix) => scope.lookup_prefixed(*prefix, *name),
                None => {
                    if let Some(param) = type_parameter_named(store, context, *name) {
                        return LinkedType::TypeParameter {
                            element: param,
                            nullable: *nullable,
                        };
                    }
                    if let Some(builtin) = builtin_type(names, *name) {
                        return builtin;
                    }
                    scope.lookup(*name)
                }
            };
            let Some(element) = element else {
                return LinkedType::Invalid;
            };
            let target = store.get(element);
            let args: Vec<LinkedType> = args
                .iter()
                .map(|arg| resolve_annotation(store, scope, names, context, arg))
                .collect();
            let arity = target.type_params().len();
            let args = if args.is_empty() || args.len() == arity {
                args
            } else {
                vec![LinkedType::Dynamic; arity]
            };
            match target.kind {
                ElementKind::Class | ElementKind::Mixin | ElementKind::Enum => {
                    LinkedType::Interface {
                        element,
                        args,
                        nullable: *nullable,
                    }
                }
                ElementKind::TypeAlias => LinkedType::Alias {
                    element,
                    args,
                    nullable: *nullable,
                },
                ElementKind::TypeParameter => LinkedType::TypeParameter {
                    element,
                    nullable: *nullable,
                },
                _ => LinkedType::Invalid,
            }
        }
    }
}

fn builtin_type(names: &WellKnownNames, name: Name) -> Option<LinkedType> {
    if name == names.dynamic {
        Some(LinkedType::Dynamic)
    } else if name == names.void {
        Some(LinkedType::Void)
    } else if name == names.never {
        Some(LinkedType::Never)
    } else {
        None
    }
}

/// Type parameter `name` declared by `context` or an enclosing element.
fn type_parameter_named(store: &ElementStore, context: ElementId, name: Name) -> Option<ElementId> {
    let mut current = Some(context);
    while let Some(id) = current {
        let element = store.get(id);
        if let Some(&param) = element
            .type_params()
            .iter()
            .find(|&&param| store.get(param).name == name)
        {
            return Some(param);
        }
        current = element.enclosing;
    }
    None
}
