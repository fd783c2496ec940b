use pretty_assertions::assert_eq;

use super::*;
use crate::{ElementFlags, ElementKind};

fn name(raw: u32) -> Name {
    Name::from_raw(raw)
}

#[test]
fn duplicate_library_uri_is_rejected() {
    let mut store = ElementStore::new();
    let first = store.add_library(name(1));
    assert_eq!(first, Some(LibraryId::from_raw(0)));
    assert_eq!(store.add_library(name(1)), None);
    assert_eq!(store.library_by_uri(name(1)), first);
}

#[test]
fn alloc_records_element_in_library() {
    let mut store = ElementStore::new();
    let Some(lib) = store.add_library(name(1)) else {
        panic!("library should register");
    };
    let class = store.alloc(Element::new(name(2), ElementKind::Class, lib, None));
    let field = store.alloc(
        Element::new(name(3), ElementKind::Field, lib, Some(class))
            .with_flags(ElementFlags::FINAL),
    );

    assert_eq!(store.library(lib).elements, vec![class, field]);
    assert_eq!(store.get(field).enclosing, Some(class));
    assert!(store.get(field).flags.contains(ElementFlags::FINAL));
    assert!(store.get(class).interface().is_some());
    assert!(store.get(field).variable().is_some());
}

#[test]
fn dropped_guard_rolls_back_batch() {
    let mut store = ElementStore::new();
    let Some(core) = store.add_library(name(1)) else {
        panic!("library should register");
    };
    let object = store.alloc(Element::new(name(2), ElementKind::Class, core, None));
    store.library_mut(core).state = LibraryState::Linked;

    {
        let mut guard = store.guard();
        let Some(lib) = guard.add_library(name(3)) else {
            panic!("library should register");
        };
        guard.alloc(Element::new(name(4), ElementKind::Class, lib, None));
        assert_eq!(guard.library_count(), 2);
    }

    assert_eq!(store.library_count(), 1);
    assert_eq!(store.element_count(), 1);
    assert_eq!(store.library_by_uri(name(3)), None);
    assert_eq!(store.library(core).elements, vec![object]);
}

#[test]
fn committed_guard_keeps_batch() {
    let mut store = ElementStore::new();
    {
        let mut guard = store.guard();
        let Some(lib) = guard.add_library(name(1)) else {
            panic!("library should register");
        };
        guard.alloc(Element::new(name(2), ElementKind::Function, lib, None));
        guard.commit();
    }
    assert_eq!(store.library_count(), 1);
    assert_eq!(store.element_count(), 1);
}
