use elk_element::{Element, ElementKind, ImportEntry};
use elk_ir::{Combinator, StringInterner};
use pretty_assertions::assert_eq;

use super::*;
use crate::LibraryInput;

#[test]
fn locals_shadow_imports_and_prefixes_stay_apart() {
    let interner = StringInterner::new();
    let mut store = ElementStore::new();
    let name = |s: &str| interner.intern(s);

    let Some(dep) = store.add_library(name("dep.dart")) else {
        panic!("fixture library should register");
    };
    let dep_a = store.alloc(Element::new(name("A"), ElementKind::Class, dep, None));
    let dep_b = store.alloc(Element::new(name("B"), ElementKind::Class, dep, None));
    store.library_mut(dep).export_scope.declare(name("A"), dep_a);
    store.library_mut(dep).export_scope.declare(name("B"), dep_b);

    let Some(user) = store.add_library(name("user.dart")) else {
        panic!("fixture library should register");
    };
    let own_b = store.alloc(Element::new(name("B"), ElementKind::Class, user, None));
    store.library_mut(user).imports = vec![
        ImportEntry {
            uri: name("dep.dart"),
            target: Some(dep),
            prefix: None,
            filters: NameFilter::from_combinators(&[Combinator::Show(vec![name("A"), name("B")])]),
            is_implicit: false,
        },
        ImportEntry {
            uri: name("dep.dart"),
            target: Some(dep),
            prefix: Some(name("d")),
            filters: Vec::new(),
            is_implicit: false,
        },
        ImportEntry {
            uri: name("missing.dart"),
            target: None,
            prefix: None,
            filters: Vec::new(),
            is_implicit: false,
        },
    ];

    let mut builder = LibraryBuilder::new(0, user, LibraryInput::new(name("user.dart"), Vec::new()));
    builder.locals.insert(name("B"), own_b);

    let scope = build_import_scope(&store, &builder);

    assert_eq!(scope.lookup(name("A")), Some(dep_a));
    assert_eq!(scope.lookup(name("B")), Some(own_b));
    assert_eq!(scope.lookup_prefixed(name("d"), name("B")), Some(dep_b));
    assert_eq!(scope.lookup_prefixed(name("e"), name("B")), None);
    assert!(scope.has_prefix(name("d")));
    assert_eq!(scope.lookup(name("C")), None);
}
