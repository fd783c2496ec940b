use std::collections::BTreeMap;

use elk_element::{ElementFlags, LibraryState, MacroApplicationError};
use elk_ir::{Argument, ClassDecl, Declaration};
use pretty_assertions::assert_eq;

use crate::testing::{
    core_library, async_library, gen_annotation, gen_library, macros_library, Harness,
    RecordingExecutor, UnitBuilder, CORE, GEN,
};
use crate::{decode_bundle, ArgValue, LibraryErrorKind, LibraryInput, LinkError};

/// `@Gen(args) class <name> {}`
fn annotated(u: &mut UnitBuilder<'_>, name: &str, args: Vec<Argument>) {
    let mut class = ClassDecl::new(u.name(name));
    class.metadata = vec![gen_annotation(u, args)];
    u.declare(Declaration::Class(class));
}

/// `a.dart` and `b.dart` export each other and declare one class each.
fn cyclic_pair(h: &Harness) -> Vec<LibraryInput> {
    let mut a = h.unit("a.dart");
    a.export("b.dart").class("Foo");
    let mut b = h.unit("b.dart");
    b.export("a.dart").class("Bar");
    vec![a.library(), b.library()]
}

#[tokio::test]
async fn cyclic_exports_reach_both_libraries() {
    let mut h = Harness::with_core().await;
    let inputs = cyclic_pair(&h);
    let output = h.link_ok(inputs).await;

    assert!(output.errors.is_empty(), "{:?}", output.errors);
    for uri in ["a.dart", "b.dart"] {
        let scope = &h.store.library(h.library(uri)).export_scope;
        assert!(scope.contains(h.name("Foo")), "{uri} exports Foo");
        assert!(scope.contains(h.name("Bar")), "{uri} exports Bar");
        assert_eq!(scope.len(), 2);
    }
    assert_eq!(
        h.store.library(h.library("b.dart")).export_scope.get(h.name("Foo")),
        Some(h.declaration("a.dart", "Foo"))
    );

    let bundle = decode_bundle(&output.bundle.bytes).unwrap_or_else(|e| panic!("{e}"));
    let uris: Vec<&str> = bundle.libraries.iter().map(|l| l.uri.as_str()).collect();
    assert_eq!(uris, ["a.dart", "b.dart"]);
    let Some(a) = bundle.library("a.dart") else {
        panic!("a.dart is not in the bundle");
    };
    assert_eq!(a.exported_names(), ["Bar", "Foo"]);
}

#[tokio::test]
async fn linked_libraries_are_detached() {
    let mut h = Harness::with_core().await;
    let inputs = cyclic_pair(&h);
    let output = h.link_ok(inputs).await;

    assert_eq!(output.libraries.len(), 2);
    for id in output.libraries {
        assert_eq!(h.store.library(id).state, LibraryState::Linked);
    }
}

#[tokio::test]
async fn macro_generates_one_augmentation_unit() {
    let mut h = Harness::with_macros().await;
    let mut u = h.unit("package:app/c.dart");
    u.import(GEN);
    let x = u.int(1);
    let y = u.string("s");
    let args = vec![
        Argument::named(u.name("x"), x),
        Argument::named(u.name("y"), y),
    ];
    annotated(&mut u, "C", args);
    let inputs = vec![u.library()];

    let executor = RecordingExecutor::generating_getters();
    let output = h
        .link_with(&executor, true, inputs)
        .await
        .unwrap_or_else(|e| panic!("link failed: {e}"));

    assert!(output.errors.is_empty(), "{:?}", output.errors);
    assert_eq!(output.bundle.macro_units.len(), 1);
    let unit = &output.bundle.macro_units[0];
    assert_eq!(unit.library, "package:app/c.dart");
    assert_eq!(unit.uri, "package:app/c.macro.dart");
    assert_eq!(
        unit.source,
        "augment library 'package:app/c.dart';\n\naugment class C {\n  int get cGenerated => 0;\n}\n"
    );

    let requests = executor.requests.borrow();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.macro_library, GEN);
    assert_eq!(request.macro_class, "Gen");
    assert_eq!(request.constructor, "");
    assert_eq!(request.annotation_index, 0);
    assert_eq!(request.target.name, "C");
    assert_eq!(
        request.arguments.named,
        BTreeMap::from([
            ("x".to_string(), ArgValue::Int(1)),
            ("y".to_string(), ArgValue::String("s".to_string())),
        ])
    );

    let class = h.declaration("package:app/c.dart", "C");
    let Some(data) = h.store.get(class).interface() else {
        panic!("C is not a class");
    };
    assert!(data.macro_errors.is_empty());
    let getter = h.member(class, "cGenerated");
    assert!(h.store.get(getter).flags.contains(ElementFlags::AUGMENTATION));
    assert_eq!(h.type_of(getter), h.core("int"));

    let units = &h.store.library(h.library("package:app/c.dart")).units;
    assert_eq!(units.len(), 2);
    assert!(units[1].is_augmentation);
}

#[tokio::test]
async fn unsupported_argument_is_recorded_on_the_class() {
    let mut h = Harness::with_macros().await;
    let mut u = h.unit("package:app/d.dart");
    u.import(GEN);
    let call = u.call("someFunctionCall", Vec::new());
    let args = vec![Argument::named(u.name("x"), call)];
    annotated(&mut u, "D", args);
    let inputs = vec![u.library()];

    let executor = RecordingExecutor::generating_getters();
    let output = h
        .link_with(&executor, true, inputs)
        .await
        .unwrap_or_else(|e| panic!("link failed: {e}"));

    assert!(output.bundle.macro_units.is_empty());
    assert!(executor.requests.borrow().is_empty());
    let class = h.declaration("package:app/d.dart", "D");
    let Some(data) = h.store.get(class).interface() else {
        panic!("D is not a class");
    };
    assert_eq!(
        data.macro_errors,
        vec![MacroApplicationError::Argument {
            annotation_index: 0,
            argument_index: 0,
            message: "unsupported argument expression".to_string(),
        }]
    );
}

#[tokio::test]
async fn failing_macro_does_not_affect_other_classes() {
    let mut h = Harness::with_macros().await;
    let mut u = h.unit("package:app/e.dart");
    u.import(GEN);
    for name in ["X", "Y", "Z"] {
        annotated(&mut u, name, Vec::new());
    }
    let inputs = vec![u.library()];

    let executor = RecordingExecutor::failing_on(&["X"]);
    let output = h
        .link_with(&executor, true, inputs)
        .await
        .unwrap_or_else(|e| panic!("link failed: {e}"));

    assert_eq!(executor.classes(), ["X", "Y", "Z"]);
    let x = h.declaration("package:app/e.dart", "X");
    let Some(data) = h.store.get(x).interface() else {
        panic!("X is not a class");
    };
    assert_eq!(
        data.macro_errors,
        vec![MacroApplicationError::Execution {
            annotation_index: 0,
            message: "cannot expand X".to_string(),
            stack_trace: "#0 Gen.buildTypesForClass".to_string(),
        }]
    );
    assert!(data.members.is_empty());

    for (class, getter) in [("Y", "yGenerated"), ("Z", "zGenerated")] {
        let class = h.declaration("package:app/e.dart", class);
        let getter = h.member(class, getter);
        assert_eq!(h.type_of(getter), h.core("int"));
    }
    assert_eq!(output.bundle.macro_units.len(), 1);
    let source = &output.bundle.macro_units[0].source;
    assert!(source.contains("augment class Y {"));
    assert!(source.contains("augment class Z {"));
    assert!(!source.contains("augment class X"));
}

#[tokio::test]
async fn generated_units_are_returned_without_a_parser() {
    let mut h = Harness::with_macros().await;
    let mut u = h.unit("package:app/c.dart");
    u.import(GEN);
    annotated(&mut u, "C", Vec::new());
    let inputs = vec![u.library()];

    let executor = RecordingExecutor::generating_getters();
    let output = h
        .link_with(&executor, false, inputs)
        .await
        .unwrap_or_else(|e| panic!("link failed: {e}"));

    assert_eq!(output.bundle.macro_units.len(), 1);
    let class = h.declaration("package:app/c.dart", "C");
    let Some(data) = h.store.get(class).interface() else {
        panic!("C is not a class");
    };
    assert!(data.members.is_empty());
    assert_eq!(h.store.library(h.library("package:app/c.dart")).units.len(), 1);
}

#[tokio::test]
async fn macro_annotations_are_ignored_when_macros_are_off() {
    let mut h = Harness::with_macros().await;
    h.config.run_macros = false;
    let mut u = h.unit("package:app/c.dart");
    u.import(GEN);
    annotated(&mut u, "C", Vec::new());
    let inputs = vec![u.library()];

    let executor = RecordingExecutor::generating_getters();
    let output = h
        .link_with(&executor, true, inputs)
        .await
        .unwrap_or_else(|e| panic!("link failed: {e}"));

    assert!(executor.requests.borrow().is_empty());
    assert!(output.bundle.macro_units.is_empty());
    // The annotation is still ordinary metadata.
    let class = h.declaration("package:app/c.dart", "C");
    let metadata = &h.store.get(class).metadata;
    assert_eq!(metadata.len(), 1);
    let gen = h.declaration(GEN, "Gen");
    assert_eq!(metadata[0].target, Some(h.constructor(gen, "")));
}

#[tokio::test]
async fn macros_declared_in_the_same_batch_are_not_applied() {
    let mut h = Harness::with_core().await;
    let mut u = h.unit("package:app/c.dart");
    u.import(GEN);
    annotated(&mut u, "C", Vec::new());
    let inputs = vec![
        macros_library(&h.interner),
        gen_library(&h.interner),
        u.library(),
    ];

    let executor = RecordingExecutor::generating_getters();
    let output = h
        .link_with(&executor, true, inputs)
        .await
        .unwrap_or_else(|e| panic!("link failed: {e}"));

    assert!(executor.requests.borrow().is_empty());
    assert!(output.bundle.macro_units.is_empty());
}

#[tokio::test]
async fn identical_batches_produce_identical_bundles() {
    async fn bundle() -> Vec<u8> {
        let mut h = Harness::with_core().await;
        let inputs = cyclic_pair(&h);
        h.link_ok(inputs).await.bundle.bytes
    }

    let first = bundle().await;
    let second = bundle().await;
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn missing_core_library_is_fatal_and_rolls_back() {
    let mut h = Harness::new();
    let inputs = vec![h.unit("a.dart").library()];

    let result = h.link(inputs).await;

    assert_eq!(
        result.map(|_| ()),
        Err(LinkError::MissingCoreLibrary {
            uri: CORE.to_string()
        })
    );
    assert_eq!(h.store.library_count(), 0);
    assert_eq!(h.store.element_count(), 0);
}

#[tokio::test]
async fn duplicate_library_is_fatal_and_rolls_back() {
    let mut h = Harness::with_core().await;
    let libraries = h.store.library_count();
    let elements = h.store.element_count();

    let inputs = vec![h.unit("a.dart").library(), h.unit("a.dart").library()];
    let result = h.link(inputs).await;
    assert_eq!(
        result.map(|_| ()),
        Err(LinkError::DuplicateLibrary {
            uri: "a.dart".to_string()
        })
    );

    let inputs = vec![h.unit("b.dart").library(), core_library(&h.interner)];
    let result = h.link(inputs).await;
    assert_eq!(
        result.map(|_| ()),
        Err(LinkError::DuplicateLibrary {
            uri: CORE.to_string()
        })
    );

    assert_eq!(h.store.library_count(), libraries);
    assert_eq!(h.store.element_count(), elements);
    assert!(h.store.library_by_uri(h.name("b.dart")).is_none());
}

#[tokio::test]
async fn core_libraries_can_link_in_the_same_batch() {
    let mut h = Harness::new();
    let mut u = h.unit("a.dart");
    u.class("A");
    let inputs = vec![
        u.library(),
        core_library(&h.interner),
        async_library(&h.interner),
    ];

    let output = h.link_ok(inputs).await;

    assert!(output.errors.is_empty(), "{:?}", output.errors);
    let a = h.declaration("a.dart", "A");
    let Some(data) = h.store.get(a).interface() else {
        panic!("A is not a class");
    };
    assert_eq!(data.supertype, Some(h.core("Object")));
}

#[tokio::test]
async fn library_errors_do_not_fail_the_batch() {
    let mut h = Harness::with_core().await;
    let mut a = h.unit("a.dart");
    a.part("a_part.dart").class("A");
    let mut b = h.unit("b.dart");
    b.class("B");
    let inputs = vec![a.library(), b.library()];

    let output = h.link_ok(inputs).await;

    assert_eq!(output.errors.len(), 1);
    assert_eq!(output.errors[0].library, "a.dart");
    assert_eq!(output.errors[0].kind, LibraryErrorKind::MissingPart);
    h.declaration("a.dart", "A");
    h.declaration("b.dart", "B");
}

#[tokio::test]
async fn dropping_the_link_at_the_macro_await_rolls_back() {
    let mut h = Harness::with_macros().await;
    let libraries = h.store.library_count();
    let elements = h.store.element_count();
    let mut u = h.unit("package:app/c.dart");
    u.import(GEN);
    annotated(&mut u, "C", Vec::new());
    let inputs = vec![u.library()];

    let executor = RecordingExecutor::generating_getters();
    let cancelled = {
        let mut link = std::pin::pin!(h.link_with(&executor, true, inputs));
        tokio::select! {
            biased;
            _ = &mut link => false,
            () = std::future::ready(()) => true,
        }
    };

    assert!(cancelled, "the executor yields before answering");
    assert_eq!(executor.classes(), ["C"]);
    assert_eq!(h.store.library_count(), libraries);
    assert_eq!(h.store.element_count(), elements);
}
