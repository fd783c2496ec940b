//! Shared type system of a link batch.
//!
//! [`LinkContext`] is created once per batch, after library scopes are
//! final, and is read-only afterwards. It bundles the [`TypeProvider`]
//! (elements of the `dart:core` types the linker builds types from) and
//! the [`InheritanceCache`], which fills itself lazily behind a lock the
//! first time a class's supertypes are asked for. The first query
//! must come after type resolution and alias expansion, which is the case
//! for every pass that uses it (inference onwards).

use std::collections::VecDeque;
use std::sync::Arc;

use elk_element::{Element, ElementId, ElementStore, LinkedType};
use elk_ir::{Name, StringInterner};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::names::WellKnownNames;
use crate::LinkError;

/// Elements of the core types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TypeProvider {
    pub object: ElementId,
    pub bool: ElementId,
    pub num: ElementId,
    pub int: ElementId,
    pub double: ElementId,
    pub string: ElementId,
    pub list: ElementId,
    pub set: ElementId,
    pub map: ElementId,
    pub enum_: ElementId,
}

impl TypeProvider {
    /// Read the core types from the export scope of `dart:core`.
    pub fn bootstrap(
        store: &ElementStore,
        interner: &StringInterner,
        names: &WellKnownNames,
    ) -> Result<Self, LinkError> {
        let core = store
            .library_by_uri(names.dart_core)
            .ok_or_else(|| LinkError::missing_core_library(interner.lookup(names.dart_core)))?;
        let scope = &store.library(core).export_scope;
        let require = |name: Name| -> Result<ElementId, LinkError> {
            scope
                .get(name)
                .filter(|&id| store.get(id).kind.is_interface())
                .ok_or_else(|| {
                    LinkError::core_type_missing(
                        interner.lookup(names.dart_core),
                        interner.lookup(name),
                    )
                })
        };

        Ok(TypeProvider {
            object: require(names.object)?,
            bool: require(names.bool)?,
            num: require(names.num)?,
            int: require(names.int)?,
            double: require(names.double)?,
            string: require(names.string)?,
            list: require(names.list)?,
            set: require(names.set)?,
            map: require(names.map)?,
            enum_: require(names.enum_)?,
        })
    }

    pub fn object_type(&self) -> LinkedType {
        LinkedType::interface(self.object, Vec::new())
    }

    pub fn bool_type(&self) -> LinkedType {
        LinkedType::interface(self.bool, Vec::new())
    }

    pub fn int_type(&self) -> LinkedType {
        LinkedType::interface(self.int, Vec::new())
    }

    pub fn double_type(&self) -> LinkedType {
        LinkedType::interface(self.double, Vec::new())
    }

    pub fn string_type(&self) -> LinkedType {
        LinkedType::interface(self.string, Vec::new())
    }

    pub fn enum_type(&self) -> LinkedType {
        LinkedType::interface(self.enum_, Vec::new())
    }

    pub fn list_of(&self, element: LinkedType) -> LinkedType {
        LinkedType::interface(self.list, vec![element])
    }

    pub fn set_of(&self, element: LinkedType) -> LinkedType {
        LinkedType::interface(self.set, vec![element])
    }

    pub fn map_of(&self, key: LinkedType, value: LinkedType) -> LinkedType {
        LinkedType::interface(self.map, vec![key, value])
    }

    /// Whether `ty` is `num`, `int`, or `double`.
    pub fn is_number(&self, ty: &LinkedType) -> bool {
        matches!(ty.interface_element(), Some(e) if e == self.int || e == self.double || e == self.num)
    }
}

/// Lazily computed supertype closures.
#[derive(Default)]
pub(crate) struct InheritanceCache {
    supertypes: RwLock<FxHashMap<ElementId, Arc<[LinkedType]>>>,
}

/// A member found in a supertype, with the substitution from the declaring
/// interface's type parameters to the arguments seen from the subclass.
pub(crate) struct InheritedMember {
    pub member: ElementId,
    pub substitution: FxHashMap<ElementId, LinkedType>,
}

impl InheritanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every supertype of `class`, instantiated as seen from `class`, in
    /// member-lookup order: mixins (last first), superclass, superclass
    /// constraints, interfaces, then their supertypes breadth first.
    pub fn all_supertypes(&self, store: &ElementStore, class: ElementId) -> Arc<[LinkedType]> {
        if let Some(cached) = self.supertypes.read().get(&class) {
            return Arc::clone(cached);
        }
        let computed: Arc<[LinkedType]> = compute_supertypes(store, class).into();
        self.supertypes
            .write()
            .entry(class)
            .or_insert_with(|| Arc::clone(&computed));
        computed
    }

    /// First non-static member named `name` in a supertype of `class` that
    /// satisfies `accept`.
    pub fn lookup_inherited(
        &self,
        store: &ElementStore,
        class: ElementId,
        name: Name,
        accept: impl Fn(&Element) -> bool,
    ) -> Option<InheritedMember> {
        for supertype in self.all_supertypes(store, class).iter() {
            let LinkedType::Interface { element, args, .. } = supertype else {
                continue;
            };
            let Some(data) = store.get(*element).interface() else {
                continue;
            };
            let found = data.members.iter().copied().find(|&member| {
                let member = store.get(member);
                member.name == name
                    && !member.flags.contains(elk_element::ElementFlags::STATIC)
                    && accept(member)
            });
            if let Some(member) = found {
                return Some(InheritedMember {
                    member,
                    substitution: substitution(store, *element, args),
                });
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.supertypes.read().len()
    }
}

/// Map the type parameters of `element` to `args`; missing arguments are
/// `dynamic`.
pub(crate) fn substitution(
    store: &ElementStore,
    element: ElementId,
    args: &[LinkedType],
) -> FxHashMap<ElementId, LinkedType> {
    store
        .get(element)
        .type_params()
        .iter()
        .enumerate()
        .map(|(i, &param)| (param, args.get(i).cloned().unwrap_or(LinkedType::Dynamic)))
        .collect()
}

/// Direct supertypes of an interface element in lookup order.
fn direct_supertypes(store: &ElementStore, element: ElementId) -> Vec<LinkedType> {
    let Some(data) = store.get(element).interface() else {
        return Vec::new();
    };
    data.mixins
        .iter()
        .rev()
        .chain(data.supertype.iter())
        .chain(data.superclass_constraints.iter())
        .chain(data.interfaces.iter())
        .cloned()
        .collect()
}

fn compute_supertypes(store: &ElementStore, class: ElementId) -> Vec<LinkedType> {
    let mut result = Vec::new();
    let mut seen = FxHashSet::default();
    seen.insert(class);
    let mut queue: VecDeque<LinkedType> = direct_supertypes(store, class).into();
    while let Some(ty) = queue.pop_front() {
        let LinkedType::Interface { element, args, .. } = &ty else {
            continue;
        };
        if !seen.insert(*element) {
            continue;
        }
        let map = substitution(store, *element, args);
        queue.extend(
            direct_supertypes(store, *element)
                .iter()
                .map(|supertype| supertype.substitute(&map)),
        );
        result.push(LinkedType::interface(*element, args.clone()));
    }
    result
}

/// Read-only type system shared by the passes after scopes are final.
pub(crate) struct LinkContext {
    pub types: TypeProvider,
    pub inheritance: InheritanceCache,
}

impl LinkContext {
    pub fn new(types: TypeProvider) -> Self {
        LinkContext {
            types,
            inheritance: InheritanceCache::new(),
        }
    }
}
