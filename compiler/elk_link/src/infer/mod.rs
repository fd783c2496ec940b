//! Top-level inference.
//!
//! Fills the types left implicit after declared types are resolved:
//!
//! ```text
//! instance field, no type     type of the overridden getter/field, else
//!                             the initializer's type, else dynamic
//! static field / variable     the initializer's type, else dynamic
//! method/getter, no return    return type of the overridden member
//! method parameter, no type   type of the overridden parameter
//! ```
//!
//! Elements are inferred on demand: an initializer that reads another
//! untyped variable infers that variable first. An element reached again
//! while its own inference is in progress closes a cycle; every element on
//! the cycle is flagged `INFERENCE_CYCLE` and typed `dynamic`.

mod expr;

use elk_element::{
    ElementData, ElementFlags, ElementId, ElementKind, ElementStore, LinkedType, ParameterKind,
};
use elk_ir::{Declaration, Member, StringInterner};
use rustc_hash::FxHashMap;

use crate::builder::LibraryBuilder;
use crate::context::LinkContext;
use crate::linker::Linker;
use crate::names::WellKnownNames;
use crate::node_map::{Node, NodeMap};
use crate::scope::ImportScope;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    InProgress,
    Done,
}

pub(crate) struct Inferrer<'a> {
    store: &'a mut ElementStore,
    builders: &'a [LibraryBuilder],
    node_map: &'a NodeMap,
    scopes: &'a [ImportScope],
    names: &'a WellKnownNames,
    interner: &'a StringInterner,
    cx: &'a LinkContext,
    states: FxHashMap<ElementId, State>,
    /// Elements whose inference is in progress, outermost first.
    stack: Vec<ElementId>,
}

/// Infer every implicit type of the batch.
#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn infer_types(linker: &mut Linker<'_>, cx: &LinkContext) {
    let elements = linker.batch_elements();
    let mut inferrer = Inferrer {
        store: &mut *linker.store,
        builders: &linker.builders,
        node_map: &linker.node_map,
        scopes: &linker.scopes,
        names: &linker.names,
        interner: linker.interner,
        cx,
        states: FxHashMap::default(),
        stack: Vec::new(),
    };
    for element in elements {
        if inferrer.is_pending(element) {
            inferrer.infer(element);
        }
    }
    let cycles = inferrer
        .states
        .keys()
        .filter(|&&id| inferrer.store.get(id).flags.contains(ElementFlags::INFERENCE_CYCLE))
        .count();
    tracing::debug!(inferred = inferrer.states.len(), cycles, "top-level inference");
}

impl Inferrer<'_> {
    /// Whether `element` has a type this pass fills in.
    fn is_pending(&self, element: ElementId) -> bool {
        let entry = self.store.get(element);
        match entry.kind {
            ElementKind::TopLevelVariable | ElementKind::Field => {
                entry.flags.contains(ElementFlags::HAS_IMPLICIT_TYPE)
            }
            ElementKind::Method | ElementKind::Getter => {
                entry.flags.contains(ElementFlags::HAS_IMPLICIT_RETURN_TYPE)
                    && !entry.flags.contains(ElementFlags::STATIC)
            }
            ElementKind::Parameter => {
                entry.flags.contains(ElementFlags::HAS_IMPLICIT_TYPE)
                    && !entry.flags.contains(ElementFlags::FIELD_FORMAL)
                    && entry.enclosing.is_some_and(|executable| {
                        let executable = self.store.get(executable);
                        matches!(executable.kind, ElementKind::Method | ElementKind::Setter)
                            && !executable.flags.contains(ElementFlags::STATIC)
                    })
            }
            _ => false,
        }
    }

    /// Type of `element` after inferring it if necessary.
    pub fn type_of(&mut self, element: ElementId) -> LinkedType {
        if self.is_pending(element) {
            self.infer(element);
        }
        self.store
            .get(element)
            .value_type()
            .cloned()
            .unwrap_or(LinkedType::Dynamic)
    }

    fn infer(&mut self, element: ElementId) {
        match self.states.get(&element) {
            Some(State::Done) => return,
            Some(State::InProgress) => {
                self.mark_cycle(element);
                return;
            }
            None => {}
        }
        self.states.insert(element, State::InProgress);
        self.stack.push(element);

        let inferred = match self.store.get(element).kind {
            ElementKind::TopLevelVariable | ElementKind::Field => self.infer_variable(element),
            ElementKind::Method | ElementKind::Getter => self.infer_return_type(element),
            ElementKind::Parameter => self.infer_parameter(element),
            _ => None,
        };

        self.stack.pop();
        self.states.insert(element, State::Done);
        let target = self.store.get_mut(element);
        let ty = if target.flags.contains(ElementFlags::INFERENCE_CYCLE) {
            LinkedType::Dynamic
        } else {
            inferred.unwrap_or(LinkedType::Dynamic)
        };
        match &mut target.data {
            ElementData::Variable(data) => data.ty = ty,
            ElementData::Parameter(data) => data.ty = ty,
            ElementData::Executable(data) => data.return_type = ty,
            _ => {}
        }
    }

    /// Flag every element from the first occurrence of `element` on the
    /// stack to the top.
    fn mark_cycle(&mut self, element: ElementId) {
        let Some(start) = self.stack.iter().position(|&id| id == element) else {
            return;
        };
        for &id in &self.stack[start..] {
            self.store.get_mut(id).flags |= ElementFlags::INFERENCE_CYCLE;
        }
        tracing::debug!(length = self.stack.len() - start, "inference cycle");
    }

    fn infer_variable(&mut self, element: ElementId) -> Option<LinkedType> {
        let entry = self.store.get(element);
        let is_instance_field =
            entry.kind == ElementKind::Field && !entry.flags.contains(ElementFlags::STATIC);
        if is_instance_field {
            if let Some(ty) = self.overridden_type(element, |kind| {
                matches!(kind, ElementKind::Field | ElementKind::Getter)
            }) {
                return Some(ty);
            }
        }
        self.initializer_type(element)
    }

    fn infer_return_type(&mut self, element: ElementId) -> Option<LinkedType> {
        let kind = self.store.get(element).kind;
        self.overridden_type(element, |candidate| match kind {
            ElementKind::Getter => matches!(candidate, ElementKind::Getter | ElementKind::Field),
            _ => candidate == kind,
        })
    }

    /// Type of the matching parameter of the method the enclosing method
    /// overrides: same position for positional parameters, same name for
    /// named ones.
    fn infer_parameter(&mut self, param: ElementId) -> Option<LinkedType> {
        let entry = self.store.get(param);
        let name = entry.name;
        let method = entry.enclosing?;
        let kind = entry.parameter()?.kind;
        let position = self
            .store
            .get(method)
            .executable()?
            .params
            .iter()
            .position(|&p| p == param)?;

        let method_entry = self.store.get(method);
        let method_kind = method_entry.kind;
        let class = method_entry.enclosing?;
        let inherited = self.cx.inheritance.lookup_inherited(
            self.store,
            class,
            method_entry.name,
            |candidate| candidate.kind == method_kind,
        )?;
        let overridden_params = self.store.get(inherited.member).executable()?.params.clone();
        let overridden = if kind.is_positional() {
            overridden_params
                .get(position)
                .copied()
                .filter(|&p| self.store.get(p).parameter().is_some_and(|d| d.kind.is_positional()))
        } else {
            overridden_params.iter().copied().find(|&p| {
                let p = self.store.get(p);
                p.name == name
                    && p.parameter()
                        .is_some_and(|d| matches!(d.kind, ParameterKind::Named | ParameterKind::RequiredNamed))
            })
        }?;
        Some(self.type_of(overridden).substitute(&inherited.substitution))
    }

    /// Type of the first inherited member with the same name that `accept`s
    /// the candidate kind, seen from the overriding class.
    fn overridden_type(
        &mut self,
        element: ElementId,
        accept: impl Fn(ElementKind) -> bool,
    ) -> Option<LinkedType> {
        let entry = self.store.get(element);
        let class = entry.enclosing?;
        let inherited =
            self.cx
                .inheritance
                .lookup_inherited(self.store, class, entry.name, |candidate| {
                    accept(candidate.kind)
                })?;
        Some(self.type_of(inherited.member).substitute(&inherited.substitution))
    }

    fn initializer_type(&mut self, element: ElementId) -> Option<LinkedType> {
        let located = self.node_map.locate(self.builders, element)?;
        let initializer = match (located.node, located.declaration) {
            (Node::Declaration, Declaration::Variable(variable)) => {
                variable.initializer
            }
            (Node::Member(Member::Field(field)), _) => field.initializer,
            _ => None,
        }?;
        let library = self.node_map.node(element)?.library as usize;
        Some(self.expr_type(library, &located.unit.arena, element, initializer))
    }
}

#[cfg(test)]
mod tests;
