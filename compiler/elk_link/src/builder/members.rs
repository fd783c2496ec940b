//! Enum members and constructor links.

use elk_element::{
    ConstExpr, Element, ElementFlags, ElementId, ElementKind, ElementStore, LinkedType,
};
use elk_ir::{ConstructorInitializer, Member, Name};

use crate::context::LinkContext;
use crate::linker::{report, Linker};
use crate::node_map::{index_u32, Node};
use crate::types::this_type;
use crate::LibraryErrorKind;

/// Constructor of `class` named `name` (`Name::EMPTY` for the unnamed one).
pub(crate) fn constructor_named(store: &ElementStore, class: ElementId, name: Name) -> Option<ElementId> {
    store
        .get(class)
        .interface()?
        .constructors
        .iter()
        .copied()
        .find(|&constructor| store.get(constructor).name == name)
}

/// Type enum constants, and add the synthetic `values` field and `index`
/// getter to every enum of library `lib`.
#[tracing::instrument(level = "debug", skip_all, fields(
    library = linker.interner.lookup(linker.builders[lib].uri),
))]
pub(crate) fn build_enum_members(linker: &mut Linker<'_>, cx: &LinkContext, lib: usize) {
    let library = linker.builders[lib].id;
    let names = &linker.names;
    let store = &mut *linker.store;
    let enums: Vec<ElementId> = store
        .library(library)
        .declarations
        .iter()
        .copied()
        .filter(|&id| store.get(id).kind == ElementKind::Enum)
        .collect();

    for enum_ in enums {
        let enum_type = this_type(store, enum_);
        let members = store
            .get(enum_)
            .interface()
            .map(|data| data.members.clone())
            .unwrap_or_default();

        let mut constants = Vec::new();
        for member in &members {
            let element = store.get_mut(*member);
            if !element.flags.contains(ElementFlags::ENUM_CONSTANT) {
                continue;
            }
            let index = index_u32(constants.len());
            let name = element.name;
            if let Some(data) = element.variable_mut() {
                data.ty = enum_type.clone();
                data.initializer = Some(ConstExpr::EnumValue { index, name });
            }
            constants.push(*member);
        }

        let has_synthetic = |name: Name| {
            members.iter().any(|&member| {
                let member = store.get(member);
                member.name == name && member.flags.contains(ElementFlags::SYNTHETIC)
            })
        };
        let mut synthetic = Vec::new();
        if !has_synthetic(names.values) {
            let mut values = Element::new(names.values, ElementKind::Field, library, Some(enum_))
                .with_flags(
                    ElementFlags::STATIC
                        | ElementFlags::CONST
                        | ElementFlags::FINAL
                        | ElementFlags::SYNTHETIC,
                );
            if let Some(data) = values.variable_mut() {
                data.ty = cx.types.list_of(enum_type.clone());
                data.initializer = Some(ConstExpr::List(
                    constants.iter().map(|&c| ConstExpr::Reference(c)).collect(),
                ));
            }
            synthetic.push(values);
        }
        if !has_synthetic(names.index) {
            let mut index = Element::new(names.index, ElementKind::Getter, library, Some(enum_))
                .with_flags(ElementFlags::SYNTHETIC);
            if let Some(data) = index.executable_mut() {
                data.return_type = cx.types.int_type();
            }
            synthetic.push(index);
        }

        for element in synthetic {
            let id = store.alloc(element);
            if let Some(data) = store.get_mut(enum_).interface_mut() {
                data.members.push(id);
            }
        }
        tracing::debug!(constants = constants.len(), "enum members");
    }
}

/// Link each generative constructor of the classes of library `lib` to the
/// superclass constructor it invokes: the one named in `super.name(..)`,
/// or the unnamed one.
#[tracing::instrument(level = "debug", skip_all, fields(
    library = linker.interner.lookup(linker.builders[lib].uri),
))]
pub(crate) fn resolve_implicit_super_constructors(linker: &mut Linker<'_>, lib: usize) {
    let builder = &linker.builders[lib];
    let store = &mut *linker.store;
    let interner = linker.interner;
    let classes: Vec<ElementId> = store
        .library(builder.id)
        .declarations
        .iter()
        .copied()
        .filter(|&id| store.get(id).kind == ElementKind::Class)
        .collect();

    let mut linked = 0usize;
    for class in classes {
        let Some(data) = store.get(class).interface() else {
            continue;
        };
        let Some(superclass) = data.supertype.as_ref().and_then(LinkedType::interface_element)
        else {
            continue;
        };
        for constructor in data.constructors.clone() {
            if store.get(constructor).flags.contains(ElementFlags::FACTORY) {
                continue;
            }
            let mut target_name = Name::EMPTY;
            if let Some(located) = linker.node_map.locate(&linker.builders, constructor) {
                if let Node::Member(Member::Constructor(decl)) = located.node {
                    let mut redirects = false;
                    for initializer in &decl.initializers {
                        match initializer {
                            ConstructorInitializer::Super { constructor, .. } => {
                                target_name = constructor.unwrap_or(Name::EMPTY);
                            }
                            ConstructorInitializer::Redirect { .. } => redirects = true,
                            ConstructorInitializer::Field { .. } => {}
                        }
                    }
                    if redirects {
                        continue;
                    }
                }
            }

            match constructor_named(store, superclass, target_name) {
                Some(target) => {
                    if let Some(data) = store.get_mut(constructor).executable_mut() {
                        data.super_constructor = Some(target);
                    }
                    linked += 1;
                }
                None => {
                    let name = interner.lookup(target_name);
                    report(
                        &mut linker.errors,
                        interner,
                        builder.uri,
                        LibraryErrorKind::MalformedDeclaration,
                        format!(
                            "'{}' has no {} invoked from '{}'",
                            interner.lookup(store.get(superclass).name),
                            if name.is_empty() {
                                "unnamed constructor".to_string()
                            } else {
                                format!("constructor '{name}'")
                            },
                            interner.lookup(store.get(class).name),
                        ),
                    );
                }
            }
        }
    }
    tracing::debug!(linked, "super constructors");
}

/// Link `this.x` parameters to their fields and redirecting constructors to
/// their targets in library `lib`.
///
/// An untyped field formal takes the type of its field.
#[tracing::instrument(level = "debug", skip_all, fields(
    library = linker.interner.lookup(linker.builders[lib].uri),
))]
pub(crate) fn resolve_constructors(linker: &mut Linker<'_>, lib: usize) {
    let builder = &linker.builders[lib];
    let store = &mut *linker.store;
    let interner = linker.interner;
    let constructors: Vec<ElementId> = store
        .library(builder.id)
        .elements
        .iter()
        .copied()
        .filter(|&id| store.get(id).kind == ElementKind::Constructor)
        .collect();

    for constructor in constructors {
        let Some(class) = store.get(constructor).enclosing else {
            continue;
        };
        let params = store
            .get(constructor)
            .executable()
            .map(|data| data.params.clone())
            .unwrap_or_default();
        for param in params {
            if !store.get(param).flags.contains(ElementFlags::FIELD_FORMAL) {
                continue;
            }
            let name = store.get(param).name;
            match instance_field(store, class, name) {
                Some(field) => {
                    let field_type = store.get(field).value_type().cloned();
                    let implicit = store.get(param).flags.contains(ElementFlags::HAS_IMPLICIT_TYPE);
                    if let Some(data) = store.get_mut(param).parameter_mut() {
                        data.field = Some(field);
                        if implicit {
                            data.ty = field_type.unwrap_or(LinkedType::Dynamic);
                        }
                    }
                }
                None => report(
                    &mut linker.errors,
                    interner,
                    builder.uri,
                    LibraryErrorKind::MalformedDeclaration,
                    format!(
                        "'this.{}' does not name a field of '{}'",
                        interner.lookup(name),
                        interner.lookup(store.get(class).name)
                    ),
                ),
            }
        }

        let Some(located) = linker.node_map.locate(&linker.builders, constructor) else {
            continue;
        };
        let Node::Member(Member::Constructor(decl)) = located.node else {
            continue;
        };
        let redirect = decl.initializers.iter().find_map(|initializer| match initializer {
            ConstructorInitializer::Redirect { constructor, .. } => {
                Some(constructor.unwrap_or(Name::EMPTY))
            }
            ConstructorInitializer::Field { .. } | ConstructorInitializer::Super { .. } => None,
        });
        let Some(target_name) = redirect else {
            continue;
        };
        match constructor_named(store, class, target_name) {
            Some(target) if target != constructor => {
                if let Some(data) = store.get_mut(constructor).executable_mut() {
                    data.redirected_constructor = Some(target);
                }
            }
            _ => report(
                &mut linker.errors,
                interner,
                builder.uri,
                LibraryErrorKind::MalformedDeclaration,
                format!(
                    "constructor of '{}' redirects to a missing constructor",
                    interner.lookup(store.get(class).name)
                ),
            ),
        }
    }
}

fn instance_field(store: &ElementStore, class: ElementId, name: Name) -> Option<ElementId> {
    store
        .get(class)
        .interface()?
        .members
        .iter()
        .copied()
        .find(|&member| {
            let member = store.get(member);
            member.name == name
                && member.kind == ElementKind::Field
                && !member.flags.contains(ElementFlags::STATIC)
        })
}
