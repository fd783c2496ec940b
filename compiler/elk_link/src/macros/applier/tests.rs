use elk_element::{ElementId, MacroApplicationError};
use elk_ir::{
    Annotation, Argument, ClassDecl, Combinator, Declaration, Directive, ExprArena, ExprKind,
    ImportDirective, StringInterner, TypeAnnotation, TypeParam,
};
use pretty_assertions::assert_eq;

use super::{introspect, merge, type_view, Application, ApplicationState};
use crate::macros::{FieldView, TypeAnnotationView, TypeParameterView};
use crate::testing::{field, gen_annotation, Harness, RecordingExecutor, UnitBuilder, GEN};
use crate::{LibraryErrorKind, LibraryInput, MacroExecution, MacroResult};

fn named(name: &str) -> TypeAnnotationView {
    TypeAnnotationView::Named {
        prefix: None,
        name: name.to_string(),
        args: Vec::new(),
        nullable: false,
    }
}

#[test]
fn merge_indents_class_fragments() {
    let interner = StringInterner::new();
    let source = merge(
        "package:app/c.dart",
        &["class Helper {}".to_string()],
        &[
            (
                interner.intern("C"),
                vec!["int get a => 0;".to_string(), "void f() {\n  g();\n}".to_string()],
            ),
            (interner.intern("D"), vec!["int get d => 0;".to_string()]),
        ],
        &interner,
    );
    assert_eq!(
        source,
        "augment library 'package:app/c.dart';\n\
         \n\
         class Helper {}\n\
         \n\
         augment class C {\n\
         \x20 int get a => 0;\n\
         \x20 void f() {\n\
         \x20   g();\n\
         \x20 }\n\
         }\n\
         \n\
         augment class D {\n\
         \x20 int get d => 0;\n\
         }\n"
    );
}

#[test]
fn merge_without_fragments_is_the_header() {
    let interner = StringInterner::new();
    assert_eq!(
        merge("a.dart", &[], &[], &interner),
        "augment library 'a.dart';\n"
    );
}

#[test]
fn introspection_spells_out_the_class() {
    let interner = StringInterner::new();
    let u = UnitBuilder::new(&interner, "a.dart");
    let mut class = ClassDecl::new(u.name("Box"));
    class.modifiers.is_abstract = true;
    class.type_params = vec![TypeParam::bounded(u.name("T"), u.ty("num"))];
    class.superclass = Some(u.generic("Base", vec![u.ty("T")]));
    class.interfaces = vec![u.ty("Comparable").nullable()];
    class.members = vec![field(u.name("value"), Some(u.ty("T"))), field(u.name("tag"), None)];

    let view = introspect(&interner, "a.dart", &class);

    assert_eq!(view.library, "a.dart");
    assert_eq!(view.name, "Box");
    assert!(view.is_abstract);
    assert_eq!(
        view.type_params,
        vec![TypeParameterView {
            name: "T".to_string(),
            bound: Some(named("num")),
        }]
    );
    assert_eq!(
        view.superclass,
        Some(TypeAnnotationView::Named {
            prefix: None,
            name: "Base".to_string(),
            args: vec![named("T")],
            nullable: false,
        })
    );
    assert_eq!(view.interfaces.len(), 1);
    assert_eq!(view.interfaces[0].to_string(), "Comparable?");
    assert!(view.mixins.is_empty());
    assert_eq!(
        view.fields,
        vec![
            FieldView {
                name: "value".to_string(),
                ty: Some(named("T")),
                is_static: false,
                is_final: true,
                is_const: false,
            },
            FieldView {
                name: "tag".to_string(),
                ty: None,
                is_static: false,
                is_final: true,
                is_const: false,
            },
        ]
    );
}

#[test]
fn type_views_display_as_written() {
    let interner = StringInterner::new();
    let u = UnitBuilder::new(&interner, "a.dart");
    let map = u.generic("Map", vec![u.ty("String"), u.ty("int").nullable()]);
    assert_eq!(type_view(&interner, &map).to_string(), "Map<String, int?>");

    let function = TypeAnnotation::function(u.ty("void"), vec![u.ty("int"), map]);
    assert_eq!(
        type_view(&interner, &function).to_string(),
        "void Function(int, Map<String, int?>)"
    );
    assert_eq!(
        type_view(&interner, &function.nullable()).to_string(),
        "void Function(int, Map<String, int?>)?"
    );
}

#[test]
fn rejected_arguments_finish_the_application() {
    let interner = StringInterner::new();
    let mut arena = ExprArena::new();
    let one = arena.alloc(ExprKind::Int(1));
    let this = arena.alloc(ExprKind::This);
    let rejected = Annotation::call(
        interner.intern("Gen"),
        vec![Argument::positional(one), Argument::positional(this)],
    );
    let accepted = Annotation::call(interner.intern("Gen"), vec![Argument::positional(one)]);
    let application = |annotation_index, annotation| Application {
        annotation_index,
        annotation,
        macro_class: ElementId::from_raw(0),
        state: ApplicationState::Unevaluated,
    };

    let mut failing = application(2, &rejected);
    let expected = MacroApplicationError::Argument {
        annotation_index: 2,
        argument_index: 1,
        message: "unsupported argument expression".to_string(),
    };
    assert_eq!(failing.evaluate(&arena, &interner), Some(&expected));
    assert!(matches!(
        &failing.state,
        ApplicationState::Executed(Err(error)) if *error == expected
    ));
    // A finished application is not evaluated again.
    assert_eq!(failing.evaluate(&arena, &interner), None);

    let mut passing = application(0, &accepted);
    assert_eq!(passing.evaluate(&arena, &interner), None);
    let ApplicationState::ArgumentsEvaluated(arguments) = &passing.state else {
        panic!("literal arguments should evaluate");
    };
    assert_eq!(arguments.positional.len(), 1);
}

/// `class C` carrying `annotations`, in a library with `import`.
fn library_with(
    h: &Harness,
    import: ImportDirective,
    annotations: impl FnOnce(&UnitBuilder<'_>) -> Vec<Annotation>,
) -> LibraryInput {
    let mut u = h.unit("package:app/c.dart");
    u.directive(Directive::Import(import));
    let mut class = ClassDecl::new(u.name("C"));
    class.metadata = annotations(&u);
    u.declare(Declaration::Class(class));
    u.library()
}

async fn applied_classes(h: &mut Harness, input: LibraryInput) -> Vec<String> {
    let executor = RecordingExecutor::generating_getters();
    h.link_with(&executor, true, vec![input])
        .await
        .unwrap_or_else(|e| panic!("link failed: {e}"));
    executor.classes()
}

#[tokio::test]
async fn only_class_types_macros_are_applied() {
    let mut h = Harness::with_macros().await;
    let import = ImportDirective::new(h.name(GEN));
    let input = library_with(&h, import, |u| {
        vec![
            Annotation::call(u.name("OtherMacro"), Vec::new()),
            Annotation::call(u.name("Plain"), Vec::new()),
            Annotation::identifier(u.name("Gen")),
        ]
    });
    assert!(applied_classes(&mut h, input).await.is_empty());
}

#[tokio::test]
async fn prefixed_macro_annotation_is_applied() {
    let mut h = Harness::with_macros().await;
    let mut import = ImportDirective::new(h.name(GEN));
    import.prefix = Some(h.name("g"));
    let input = library_with(&h, import, |u| {
        let mut annotation = gen_annotation(u, Vec::new());
        annotation.prefix = Some(u.name("g"));
        // Unprefixed `@Gen` is not in scope.
        vec![annotation, gen_annotation(u, Vec::new())]
    });

    let executor = RecordingExecutor::generating_getters();
    h.link_with(&executor, true, vec![input])
        .await
        .unwrap_or_else(|e| panic!("link failed: {e}"));

    let requests = executor.requests.borrow();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].annotation_index, 0);
}

#[tokio::test]
async fn hidden_macro_is_not_applied() {
    let mut h = Harness::with_macros().await;
    let mut import = ImportDirective::new(h.name(GEN));
    import.combinators = vec![Combinator::Hide(vec![h.name("Gen")])];
    let input = library_with(&h, import, |u| vec![gen_annotation(u, Vec::new())]);
    assert!(applied_classes(&mut h, input).await.is_empty());
}

#[tokio::test]
async fn macro_reexported_by_a_linked_library_is_applied() {
    let mut h = Harness::with_macros().await;
    let mut r = h.unit("package:gen/all.dart");
    r.export(GEN);
    let inputs = vec![r.library()];
    h.link_ok(inputs).await;

    let import = ImportDirective::new(h.name("package:gen/all.dart"));
    let input = library_with(&h, import, |u| vec![gen_annotation(u, Vec::new())]);

    let executor = RecordingExecutor::generating_getters();
    h.link_with(&executor, true, vec![input])
        .await
        .unwrap_or_else(|e| panic!("link failed: {e}"));

    let requests = executor.requests.borrow();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].macro_library, GEN);
    assert_eq!(requests[0].target.library, "package:app/c.dart");
}

#[tokio::test]
async fn unparsable_output_is_a_library_error() {
    let mut h = Harness::with_macros().await;
    let import = ImportDirective::new(h.name(GEN));
    let input = library_with(&h, import, |u| vec![gen_annotation(u, Vec::new())]);
    let executor = RecordingExecutor::new(|_| {
        MacroExecution::Applied(MacroResult {
            library_fragments: vec!["typedef F = int;".to_string()],
            class_fragments: Vec::new(),
        })
    });

    let output = h
        .link_with(&executor, true, vec![input])
        .await
        .unwrap_or_else(|e| panic!("link failed: {e}"));

    assert_eq!(output.bundle.macro_units.len(), 1);
    assert_eq!(output.errors.len(), 1);
    assert_eq!(output.errors[0].kind, LibraryErrorKind::MalformedDeclaration);
    assert_eq!(
        output.errors[0].message,
        "macro-generated unit 'package:app/c.macro.dart' does not parse: \
         unexpected line 'typedef F = int;'"
    );
}
