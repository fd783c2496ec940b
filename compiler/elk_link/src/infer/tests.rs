use elk_element::{ElementFlags, LinkedType};
use elk_ir::{
    BinaryOp, ClassDecl, CollectionElement, Declaration, ExprKind, FieldDecl, FunctionDecl,
    Member, MethodDecl, Param, TypeParam, VariableDecl,
};
use pretty_assertions::assert_eq;

use crate::testing::{getter, Harness, UnitBuilder, CORE};

const LIB: &str = "package:app/infer.dart";

async fn link_one(build: impl FnOnce(&mut UnitBuilder<'_>)) -> Harness {
    let mut h = Harness::with_core().await;
    let mut u = h.unit(LIB);
    build(&mut u);
    let inputs = vec![u.library()];
    let output = h.link_ok(inputs).await;
    assert!(output.errors.is_empty(), "{:?}", output.errors);
    h
}

/// `var <name> = <initializer>;`
fn var(u: &mut UnitBuilder<'_>, name: &str, initializer: Option<elk_ir::ExprId>) {
    let decl = VariableDecl::new(u.name(name), None, initializer);
    u.declare(Declaration::Variable(decl));
}

#[tokio::test]
async fn variables_take_their_initializer_type() {
    let h = link_one(|u| {
        // `b` reads `a` before `a` is declared.
        let a = u.ident("a");
        let two = u.expr(ExprKind::Double(2.0f64.to_bits()));
        let sum = u.expr(ExprKind::Binary {
            op: BinaryOp::Add,
            left: a,
            right: two,
        });
        var(u, "b", Some(sum));
        let one = u.int(1);
        var(u, "a", Some(one));

        let s = u.string("x");
        var(u, "s", Some(s));
        let (one, two) = (u.int(1), u.int(2));
        let list = u.expr(ExprKind::List {
            elements: vec![one, two],
            is_const: false,
        });
        var(u, "ints", Some(list));
        let (one, s) = (u.int(1), u.string("y"));
        let mixed = u.expr(ExprKind::List {
            elements: vec![one, s],
            is_const: false,
        });
        var(u, "mixed", Some(mixed));
        let (k, v) = (u.string("k"), u.int(0));
        let map = u.expr(ExprKind::SetOrMap {
            elements: vec![CollectionElement::MapEntry { key: k, value: v }],
            is_const: false,
        });
        var(u, "map", Some(map));
        let empty = u.expr(ExprKind::SetOrMap {
            elements: Vec::new(),
            is_const: false,
        });
        var(u, "empty", Some(empty));
        let (one, two) = (u.int(1), u.int(2));
        let less = u.expr(ExprKind::Binary {
            op: BinaryOp::Lt,
            left: one,
            right: two,
        });
        var(u, "less", Some(less));
        var(u, "unset", None);
    })
    .await;

    let int = h.core("int");
    let string = h.core("String");
    let ty = |name: &str| h.type_of(h.declaration(LIB, name));
    assert_eq!(ty("a"), int);
    assert_eq!(ty("b"), h.core("double"));
    assert_eq!(ty("s"), string);
    assert_eq!(ty("ints"), h.interface(CORE, "List", vec![int.clone()]));
    assert_eq!(
        ty("mixed"),
        h.interface(CORE, "List", vec![LinkedType::Dynamic])
    );
    assert_eq!(ty("map"), h.interface(CORE, "Map", vec![string, int]));
    assert_eq!(
        ty("empty"),
        h.interface(CORE, "Map", vec![LinkedType::Dynamic, LinkedType::Dynamic])
    );
    assert_eq!(ty("less"), h.core("bool"));
    assert_eq!(ty("unset"), LinkedType::Dynamic);
}

#[tokio::test]
async fn calls_and_tear_offs_are_typed() {
    let h = link_one(|u| {
        let mut g = FunctionDecl::new(u.name("g"), Some(u.ty("int")));
        g.params = vec![Param::new(u.name("p"), Some(u.ty("String")))];
        u.declare(Declaration::Function(g));
        u.class("C");

        let s = u.string("x");
        let call = u.call("g", vec![elk_ir::Argument::positional(s)]);
        var(u, "called", Some(call));
        let tear_off = u.ident("g");
        var(u, "torn", Some(tear_off));
        let created = u.call("C", Vec::new());
        var(u, "created", Some(created));
    })
    .await;

    let ty = |name: &str| h.type_of(h.declaration(LIB, name));
    assert_eq!(ty("called"), h.core("int"));
    assert_eq!(
        ty("torn"),
        LinkedType::Function {
            return_type: Box::new(h.core("int")),
            params: vec![h.core("String")],
            nullable: false,
        }
    );
    assert_eq!(ty("created"), h.interface(LIB, "C", Vec::new()));
}

#[tokio::test]
async fn overrides_inherit_member_types() {
    let h = link_one(|u| {
        // class A { int x; String m(int p, {num q}); num get g; }
        let mut a = ClassDecl::new(u.name("A"));
        a.members.push(Member::Field(FieldDecl::new(
            u.name("x"),
            Some(u.ty("int")),
            None,
        )));
        let mut m = MethodDecl::new(u.name("m"), Some(u.ty("String")));
        let mut q = Param::new(u.name("q"), Some(u.ty("num")));
        q.kind = elk_ir::ParamKind::Named;
        m.params = vec![Param::new(u.name("p"), Some(u.ty("int"))), q];
        a.members.push(Member::Method(m));
        a.members.push(getter(u.name("g"), Some(u.ty("num"))));
        u.declare(Declaration::Class(a));

        // class B extends A { var x; m(p, {q}); get g; }
        let mut b = ClassDecl::new(u.name("B"));
        b.superclass = Some(u.ty("A"));
        b.members.push(Member::Field(FieldDecl::new(u.name("x"), None, None)));
        let mut m = MethodDecl::new(u.name("m"), None);
        let mut q = Param::new(u.name("q"), None);
        q.kind = elk_ir::ParamKind::Named;
        m.params = vec![Param::new(u.name("p"), None), q];
        b.members.push(Member::Method(m));
        b.members.push(getter(u.name("g"), None));
        // A method with nothing to override stays dynamic.
        b.members.push(Member::Method(MethodDecl::new(u.name("fresh"), None)));
        u.declare(Declaration::Class(b));
    })
    .await;

    let b = h.declaration(LIB, "B");
    assert_eq!(h.type_of(h.member(b, "x")), h.core("int"));
    assert_eq!(h.type_of(h.member(b, "g")), h.core("num"));
    assert_eq!(h.type_of(h.member(b, "fresh")), LinkedType::Dynamic);

    let m = h.member(b, "m");
    assert_eq!(h.type_of(m), h.core("String"));
    let Some(params) = h.store.get(m).executable().map(|d| d.params.clone()) else {
        panic!("m is not executable");
    };
    assert_eq!(h.type_of(params[0]), h.core("int"));
    assert_eq!(h.type_of(params[1]), h.core("num"));
}

#[tokio::test]
async fn inherited_types_are_substituted() {
    let h = link_one(|u| {
        // class Box<T> { T value; }
        let mut boxed = ClassDecl::new(u.name("Box"));
        boxed.type_params = vec![TypeParam::new(u.name("T"))];
        boxed.members.push(Member::Field(FieldDecl::new(
            u.name("value"),
            Some(u.ty("T")),
            None,
        )));
        u.declare(Declaration::Class(boxed));

        // class IntBox extends Box<int> { var value; }
        let mut int_box = ClassDecl::new(u.name("IntBox"));
        int_box.superclass = Some(u.generic("Box", vec![u.ty("int")]));
        int_box
            .members
            .push(Member::Field(FieldDecl::new(u.name("value"), None, None)));
        u.declare(Declaration::Class(int_box));
    })
    .await;

    let int_box = h.declaration(LIB, "IntBox");
    assert_eq!(h.type_of(h.member(int_box, "value")), h.core("int"));
}

#[tokio::test]
async fn initializer_cycles_are_dynamic() {
    let h = link_one(|u| {
        let b = u.ident("b");
        var(u, "a", Some(b));
        let a = u.ident("a");
        var(u, "b", Some(a));
        let a = u.ident("a");
        var(u, "c", Some(a));
        let one = u.int(1);
        var(u, "d", Some(one));
    })
    .await;

    let cyclic = |name: &str| {
        h.store
            .get(h.declaration(LIB, name))
            .flags
            .contains(ElementFlags::INFERENCE_CYCLE)
    };
    assert!(cyclic("a"));
    assert!(cyclic("b"));
    assert!(!cyclic("c"));
    assert!(!cyclic("d"));
    for name in ["a", "b", "c"] {
        assert_eq!(h.type_of(h.declaration(LIB, name)), LinkedType::Dynamic, "{name}");
    }
    assert_eq!(h.type_of(h.declaration(LIB, "d")), h.core("int"));
}

#[tokio::test]
async fn declared_types_are_not_inferred() {
    let h = link_one(|u| {
        let one = u.int(1);
        let decl = VariableDecl::new(u.name("n"), Some(u.ty("num")), Some(one));
        u.declare(Declaration::Variable(decl));
    })
    .await;

    let n = h.declaration(LIB, "n");
    assert_eq!(h.type_of(n), h.core("num"));
    assert!(!h.store.get(n).flags.contains(ElementFlags::HAS_IMPLICIT_TYPE));
}
