//! Whole-batch analyses over the resolved type graph.
//!
//! ```text
//! 1. self-referential aliases   alias reachable from itself through alias
//!                               references or bounds → `Invalid`
//! 2. simply bounded             least fixed point over raw references in
//!                               bounds
//! 3. raw types + expansion      `C` → `C<bounds..>`, alias references
//!                               replaced by their instantiated right side
//! 4. alias variance             how each alias parameter occurs on the
//!                               expanded right side
//! ```
//!
//! After this pass no batch element stores a [`LinkedType::Alias`].

use elk_element::{ElementFlags, ElementId, ElementKind, ElementStore, LinkedType, Variance};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::context::substitution;
use crate::linker::Linker;

#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn analyze_type_graph(linker: &mut Linker<'_>) {
    let elements = linker.batch_elements();
    let store = &mut *linker.store;

    let aliases: Vec<ElementId> = elements
        .iter()
        .copied()
        .filter(|&id| store.get(id).kind == ElementKind::TypeAlias)
        .collect();

    let self_referential = mark_self_referential_aliases(store, &aliases);
    let simply_bounded = compute_simply_bounded(store, &elements);
    tracing::debug!(self_referential, simply_bounded, "type graph flags");

    for &element in &elements {
        let mut data = store.get(element).data.clone();
        data.for_each_type_mut(&mut |ty| *ty = normalize(store, ty));
        store.get_mut(element).data = data;
    }

    for &alias in &aliases {
        compute_alias_variance(store, alias);
    }
}

/// Aliases referenced by `alias`'s right side or its parameter bounds.
fn alias_dependencies(store: &ElementStore, alias: ElementId) -> Vec<ElementId> {
    let element = store.get(alias);
    let mut deps = Vec::new();
    let mut collect = |ty: &LinkedType| {
        ty.walk(&mut |t| {
            if let LinkedType::Alias { element, .. } = t {
                deps.push(*element);
            }
        });
    };
    if let Some(data) = element.type_alias() {
        collect(&data.aliased);
    }
    for &param in element.type_params() {
        if let Some(bound) = store.get(param).type_parameter().and_then(|d| d.bound.as_ref()) {
            collect(bound);
        }
    }
    deps
}

/// Flag and erase aliases that reach themselves. Returns how many.
fn mark_self_referential_aliases(store: &mut ElementStore, aliases: &[ElementId]) -> usize {
    let deps: FxHashMap<ElementId, Vec<ElementId>> = aliases
        .iter()
        .map(|&alias| (alias, alias_dependencies(store, alias)))
        .collect();

    let cyclic: Vec<ElementId> = aliases
        .iter()
        .copied()
        .filter(|&alias| {
            let mut seen = FxHashSet::default();
            let mut stack: Vec<ElementId> = deps.get(&alias).cloned().unwrap_or_default();
            while let Some(next) = stack.pop() {
                if next == alias {
                    return true;
                }
                if seen.insert(next) {
                    stack.extend(deps.get(&next).into_iter().flatten().copied());
                }
            }
            false
        })
        .collect();

    for &alias in &cyclic {
        let element = store.get_mut(alias);
        element.flags |= ElementFlags::SELF_REFERENTIAL;
        if let Some(data) = element.type_alias_mut() {
            data.aliased = LinkedType::Invalid;
        }
    }
    cyclic.len()
}

/// Set `SIMPLY_BOUNDED` on every batch declaration that is. Returns how
/// many generic declarations qualified.
///
/// A generic declaration is simply bounded when no bound mentions one of its
/// own type parameters and every raw generic type in its bounds refers to a
/// simply bounded declaration. Declarations that depend on each other through
/// raw references are not simply bounded.
fn compute_simply_bounded(store: &mut ElementStore, elements: &[ElementId]) -> usize {
    let mut pending: Vec<(ElementId, Vec<ElementId>)> = Vec::new();
    for &id in elements {
        let element = store.get(id);
        if !matches!(
            element.kind,
            ElementKind::Class | ElementKind::Mixin | ElementKind::Enum | ElementKind::TypeAlias
        ) {
            continue;
        }
        let params = element.type_params().to_vec();
        if params.is_empty() {
            store.get_mut(id).flags |= ElementFlags::SIMPLY_BOUNDED;
            continue;
        }
        let bounds: Vec<LinkedType> = params
            .iter()
            .filter_map(|&p| store.get(p).type_parameter().and_then(|d| d.bound.clone()))
            .collect();
        if bounds.iter().any(|b| params.iter().any(|&p| b.mentions(p))) {
            continue;
        }
        let mut deps = Vec::new();
        for bound in &bounds {
            bound.walk(&mut |ty| {
                if let LinkedType::Interface { element, args, .. } | LinkedType::Alias { element, args, .. } = ty {
                    if args.is_empty() && !store.get(*element).type_params().is_empty() {
                        deps.push(*element);
                    }
                }
            });
        }
        pending.push((id, deps));
    }

    let mut qualified = 0;
    loop {
        let ready: Vec<ElementId> = pending
            .iter()
            .filter(|(_, deps)| {
                deps.iter()
                    .all(|&dep| store.get(dep).flags.contains(ElementFlags::SIMPLY_BOUNDED))
            })
            .map(|(id, _)| *id)
            .collect();
        if ready.is_empty() {
            break;
        }
        for id in &ready {
            store.get_mut(*id).flags |= ElementFlags::SIMPLY_BOUNDED;
        }
        qualified += ready.len();
        pending.retain(|(id, _)| !ready.contains(id));
    }
    qualified
}

/// Instantiate raw types to bounds, then expand alias references.
pub(crate) fn normalize(store: &ElementStore, ty: &LinkedType) -> LinkedType {
    let mut visiting = Vec::new();
    expand(store, &instantiate_raw(store, ty, &mut visiting), &mut Vec::new())
}

/// Replace every raw reference to a generic declaration with its default
/// arguments.
fn instantiate_raw(store: &ElementStore, ty: &LinkedType, visiting: &mut Vec<ElementId>) -> LinkedType {
    match ty {
        LinkedType::Interface {
            element,
            args,
            nullable,
        } => LinkedType::Interface {
            element: *element,
            args: instantiate_args(store, *element, args, visiting),
            nullable: *nullable,
        },
        LinkedType::Alias {
            element,
            args,
            nullable,
        } => LinkedType::Alias {
            element: *element,
            args: instantiate_args(store, *element, args, visiting),
            nullable: *nullable,
        },
        LinkedType::Function {
            return_type,
            params,
            nullable,
        } => LinkedType::Function {
            return_type: Box::new(instantiate_raw(store, return_type, visiting)),
            params: params
                .iter()
                .map(|p| instantiate_raw(store, p, visiting))
                .collect(),
            nullable: *nullable,
        },
        LinkedType::TypeParameter { .. }
        | LinkedType::Dynamic
        | LinkedType::Void
        | LinkedType::Never
        | LinkedType::Invalid => ty.clone(),
    }
}

fn instantiate_args(
    store: &ElementStore,
    element: ElementId,
    args: &[LinkedType],
    visiting: &mut Vec<ElementId>,
) -> Vec<LinkedType> {
    if !args.is_empty() {
        return args
            .iter()
            .map(|arg| instantiate_raw(store, arg, visiting))
            .collect();
    }
    let params = store.get(element).type_params();
    if params.is_empty() {
        return Vec::new();
    }
    if visiting.contains(&element) {
        return vec![LinkedType::Dynamic; params.len()];
    }
    visiting.push(element);
    // Parameters referenced from bounds instantiate to `dynamic`.
    let own: FxHashMap<ElementId, LinkedType> =
        params.iter().map(|&p| (p, LinkedType::Dynamic)).collect();
    let defaults = params
        .iter()
        .map(|&param| match store.get(param).type_parameter().and_then(|d| d.bound.as_ref()) {
            Some(bound) => instantiate_raw(store, &bound.substitute(&own), visiting),
            None => LinkedType::Dynamic,
        })
        .collect();
    visiting.pop();
    defaults
}

/// Replace alias references by their right-hand sides.
fn expand(store: &ElementStore, ty: &LinkedType, visiting: &mut Vec<ElementId>) -> LinkedType {
    match ty {
        LinkedType::Alias {
            element,
            args,
            nullable,
        } => {
            let alias = store.get(*element);
            if alias.flags.contains(ElementFlags::SELF_REFERENTIAL) || visiting.contains(element) {
                return LinkedType::Invalid;
            }
            let Some(data) = alias.type_alias() else {
                return LinkedType::Invalid;
            };
            let args: Vec<LinkedType> = args.iter().map(|a| expand(store, a, visiting)).collect();
            let map = substitution(store, *element, &args);
            let aliased = instantiate_raw(store, &data.aliased, &mut Vec::new()).substitute(&map);
            visiting.push(*element);
            let expanded = expand(store, &aliased, visiting);
            visiting.pop();
            expanded.union_nullable(*nullable)
        }
        LinkedType::Interface {
            element,
            args,
            nullable,
        } => LinkedType::Interface {
            element: *element,
            args: args.iter().map(|a| expand(store, a, visiting)).collect(),
            nullable: *nullable,
        },
        LinkedType::Function {
            return_type,
            params,
            nullable,
        } => LinkedType::Function {
            return_type: Box::new(expand(store, return_type, visiting)),
            params: params.iter().map(|p| expand(store, p, visiting)).collect(),
            nullable: *nullable,
        },
        LinkedType::TypeParameter { .. }
        | LinkedType::Dynamic
        | LinkedType::Void
        | LinkedType::Never
        | LinkedType::Invalid => ty.clone(),
    }
}

fn compute_alias_variance(store: &mut ElementStore, alias: ElementId) {
    let element = store.get(alias);
    let Some(data) = element.type_alias() else {
        return;
    };
    let variances: Vec<(ElementId, Variance)> = element
        .type_params()
        .iter()
        .map(|&param| (param, variance_in(store, &data.aliased, param)))
        .collect();
    for (param, variance) in variances {
        if let Some(data) = store.get_mut(param).type_parameter_mut() {
            data.variance = variance;
        }
    }
}

/// Variance of `param`'s occurrences in `ty`.
pub(crate) fn variance_in(store: &ElementStore, ty: &LinkedType, param: ElementId) -> Variance {
    match ty {
        LinkedType::TypeParameter { element, .. } if *element == param => Variance::Covariant,
        LinkedType::Interface { element, args, .. } | LinkedType::Alias { element, args, .. } => {
            let params = store.get(*element).type_params();
            args.iter()
                .enumerate()
                .fold(Variance::Unrelated, |acc, (i, arg)| {
                    let position = params
                        .get(i)
                        .and_then(|&p| store.get(p).type_parameter())
                        .map_or(Variance::Covariant, |d| match d.variance {
                            Variance::Unrelated => Variance::Covariant,
                            v => v,
                        });
                    acc.meet(position.compose(variance_in(store, arg, param)))
                })
        }
        LinkedType::Function {
            return_type,
            params,
            ..
        } => params.iter().fold(variance_in(store, return_type, param), |acc, p| {
            acc.meet(Variance::Contravariant.compose(variance_in(store, p, param)))
        }),
        LinkedType::TypeParameter { .. }
        | LinkedType::Dynamic
        | LinkedType::Void
        | LinkedType::Never
        | LinkedType::Invalid => Variance::Unrelated,
    }
}
