//! Constant initializers, default values, and metadata.
//!
//! Expressions are lowered to [`ConstExpr`] with identifiers resolved
//! against the enclosing class's static members, then the library's import
//! scope. Nothing is evaluated; unsupported or unresolved sub-expressions
//! become [`ConstExpr::Invalid`] and the rest of the tree is kept.

use elk_element::{
    ConstExpr, ElementAnnotation, ElementFlags, ElementId, ElementKind, ElementStore,
};
use elk_ir::{
    ensure_sufficient_stack, Annotation, Argument, CollectionElement, Declaration, ExprArena,
    ExprId, ExprKind, Member, Name, StringInterner, TypeAnnotation,
};

use super::members::constructor_named;
use crate::linker::Linker;
use crate::node_map::Node;
use crate::scope::ImportScope;

/// Lowers expressions of one unit.
pub(crate) struct ConstLowering<'a> {
    pub store: &'a ElementStore,
    pub scope: &'a ImportScope,
    pub arena: &'a ExprArena,
    pub interner: &'a StringInterner,
    /// Class whose static members are in scope.
    pub class: Option<ElementId>,
}

impl ConstLowering<'_> {
    pub fn lower(&self, id: ExprId) -> ConstExpr {
        ensure_sufficient_stack(|| self.lower_inner(id))
    }

    fn lower_inner(&self, id: ExprId) -> ConstExpr {
        match self.arena.kind(id) {
            ExprKind::Null => ConstExpr::Null,
            ExprKind::Bool(value) => ConstExpr::Bool(*value),
            ExprKind::Int(value) => ConstExpr::Int(*value),
            ExprKind::Double(bits) => ConstExpr::Double(*bits),
            ExprKind::String(value) => ConstExpr::String(*value),
            ExprKind::AdjacentStrings(parts) => self.concat(parts),
            ExprKind::List { elements, .. } => {
                ConstExpr::List(elements.iter().map(|&e| self.lower(e)).collect())
            }
            ExprKind::SetOrMap { elements, .. } => self.set_or_map(elements),
            ExprKind::Negate(operand) => ConstExpr::Negate(Box::new(self.lower(*operand))),
            ExprKind::Not(operand) => ConstExpr::Not(Box::new(self.lower(*operand))),
            ExprKind::Binary { op, left, right } => ConstExpr::Binary {
                op: *op,
                left: Box::new(self.lower(*left)),
                right: Box::new(self.lower(*right)),
            },
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => ConstExpr::Conditional {
                condition: Box::new(self.lower(*condition)),
                then_expr: Box::new(self.lower(*then_expr)),
                else_expr: Box::new(self.lower(*else_expr)),
            },
            ExprKind::Identifier(name) => self
                .static_member(self.class, *name)
                .or_else(|| self.scope.lookup(*name))
                .map_or(ConstExpr::Invalid, |element| self.reference(element)),
            ExprKind::Prefixed { prefix, name } => self
                .qualified(*prefix, *name)
                .map_or(ConstExpr::Invalid, |element| self.reference(element)),
            ExprKind::PropertyAccess { target, name } => match self.lower(*target) {
                ConstExpr::TypeLiteral(class) => self
                    .static_member(Some(class), *name)
                    .map_or(ConstExpr::Invalid, |element| self.reference(element)),
                _ => ConstExpr::Invalid,
            },
            ExprKind::Invocation { target, name, args } => {
                let constructor = match target {
                    None => self
                        .scope
                        .lookup(*name)
                        .and_then(|class| constructor_named(self.store, class, Name::EMPTY)),
                    Some(target) => self.constructor_via(*target, *name),
                };
                constructor.map_or(ConstExpr::Invalid, |constructor| {
                    self.construct(constructor, args)
                })
            }
            ExprKind::InstanceCreation {
                ty,
                constructor,
                args,
                ..
            } => self
                .class_of(ty)
                .and_then(|class| {
                    constructor_named(self.store, class, constructor.unwrap_or(Name::EMPTY))
                })
                .map_or(ConstExpr::Invalid, |constructor| {
                    self.construct(constructor, args)
                }),
            ExprKind::Interpolation(_)
            | ExprKind::SuperInvocation { .. }
            | ExprKind::SuperPropertyAccess(_)
            | ExprKind::This
            | ExprKind::Block(_) => ConstExpr::Invalid,
        }
    }

    pub fn construct(&self, constructor: ElementId, args: &[Argument]) -> ConstExpr {
        ConstExpr::Construct {
            constructor,
            args: args
                .iter()
                .map(|arg| (arg.name, self.lower(arg.value)))
                .collect(),
        }
    }

    fn concat(&self, parts: &[ExprId]) -> ConstExpr {
        let mut text = String::new();
        for &part in parts {
            match self.arena.kind(part) {
                ExprKind::String(value) => text.push_str(self.interner.lookup(*value)),
                _ => return ConstExpr::Invalid,
            }
        }
        ConstExpr::String(self.interner.intern(&text))
    }

    /// `{}` is a map; otherwise all entries or no entries.
    fn set_or_map(&self, elements: &[CollectionElement]) -> ConstExpr {
        let mut set = Vec::new();
        let mut map = Vec::new();
        for element in elements {
            match element {
                CollectionElement::Expr(e) => set.push(self.lower(*e)),
                CollectionElement::MapEntry { key, value } => {
                    map.push((self.lower(*key), self.lower(*value)));
                }
            }
        }
        match (set.is_empty(), map.is_empty()) {
            (true, _) => ConstExpr::Map(map),
            (false, true) => ConstExpr::Set(set),
            (false, false) => ConstExpr::Invalid,
        }
    }

    fn reference(&self, element: ElementId) -> ConstExpr {
        match self.store.get(element).kind {
            ElementKind::Class | ElementKind::Mixin | ElementKind::Enum | ElementKind::TypeAlias => {
                ConstExpr::TypeLiteral(element)
            }
            ElementKind::TopLevelVariable
            | ElementKind::Field
            | ElementKind::Getter
            | ElementKind::Function
            | ElementKind::Method => ConstExpr::Reference(element),
            ElementKind::Setter
            | ElementKind::Constructor
            | ElementKind::Parameter
            | ElementKind::TypeParameter => ConstExpr::Invalid,
        }
    }

    fn static_member(&self, class: Option<ElementId>, name: Name) -> Option<ElementId> {
        let data = self.store.get(class?).interface()?;
        data.members.iter().copied().find(|&member| {
            let member = self.store.get(member);
            member.name == name
                && member.flags.contains(ElementFlags::STATIC)
                && member.kind != ElementKind::Setter
        })
    }

    /// `prefix.name` as an imported name or as `Class.staticMember`.
    fn qualified(&self, prefix: Name, name: Name) -> Option<ElementId> {
        if self.scope.has_prefix(prefix) {
            return self.scope.lookup_prefixed(prefix, name);
        }
        self.static_member(self.scope.lookup(prefix), name)
    }

    /// Constructor called by `target.name(..)`: `Class.named(..)` or
    /// `prefix.Class(..)`.
    fn constructor_via(&self, target: ExprId, name: Name) -> Option<ElementId> {
        match self.arena.kind(target) {
            ExprKind::Identifier(prefix) if self.scope.has_prefix(*prefix) => {
                let class = self.scope.lookup_prefixed(*prefix, name)?;
                constructor_named(self.store, class, Name::EMPTY)
            }
            ExprKind::Identifier(class) => {
                constructor_named(self.store, self.scope.lookup(*class)?, name)
            }
            ExprKind::Prefixed { prefix, name: class } => {
                let class = self.scope.lookup_prefixed(*prefix, *class)?;
                constructor_named(self.store, class, name)
            }
            _ => None,
        }
    }

    fn class_of(&self, ty: &TypeAnnotation) -> Option<ElementId> {
        let TypeAnnotation::Named { prefix, name, .. } = ty else {
            return None;
        };
        let class = match prefix {
            Some(prefix) => self.scope.lookup_prefixed(*prefix, *name)?,
            None => self.scope.lookup(*name)?,
        };
        self.store.get(class).kind.is_interface().then_some(class)
    }

    /// Resolve an annotation to the constant it denotes.
    pub fn annotation(&self, annotation: &Annotation) -> ElementAnnotation {
        let unresolved = ElementAnnotation {
            target: None,
            value: ConstExpr::Invalid,
        };
        match &annotation.arguments {
            None => {
                let element = match annotation.prefix {
                    Some(prefix) => self.qualified(prefix, annotation.name),
                    None => match annotation.constructor {
                        Some(member) => self.qualified(annotation.name, member),
                        None => self.scope.lookup(annotation.name),
                    },
                };
                match element {
                    Some(element) if self.store.get(element).flags.contains(ElementFlags::CONST) => {
                        ElementAnnotation {
                            target: Some(element),
                            value: ConstExpr::Reference(element),
                        }
                    }
                    _ => unresolved,
                }
            }
            Some(args) => {
                let (class, constructor) = match annotation.prefix {
                    Some(prefix) if self.scope.has_prefix(prefix) => (
                        self.scope.lookup_prefixed(prefix, annotation.name),
                        annotation.constructor,
                    ),
                    // `@Class.named(..)` written as prefix `Class`, name `named`.
                    Some(class) => (self.scope.lookup(class), Some(annotation.name)),
                    None => (self.scope.lookup(annotation.name), annotation.constructor),
                };
                let constructor = class.and_then(|class| {
                    constructor_named(self.store, class, constructor.unwrap_or(Name::EMPTY))
                });
                match constructor {
                    Some(constructor) => ElementAnnotation {
                        target: Some(constructor),
                        value: self.construct(constructor, args),
                    },
                    None => unresolved,
                }
            }
        }
    }
}

/// The nearest class, mixin, or enum at or above `element`.
pub(crate) fn enclosing_interface(store: &ElementStore, element: ElementId) -> Option<ElementId> {
    let mut current = Some(element);
    while let Some(id) = current {
        let element = store.get(id);
        if element.kind.is_interface() {
            return Some(id);
        }
        current = element.enclosing;
    }
    None
}

/// Resolve the initializers of constant variables and fields of library
/// `lib`.
#[tracing::instrument(level = "debug", skip_all, fields(
    library = linker.interner.lookup(linker.builders[lib].uri),
))]
pub(crate) fn resolve_constant_initializers(linker: &mut Linker<'_>, lib: usize) {
    let library = linker.builders[lib].id;
    let elements = linker.store.library(library).elements.clone();
    let mut resolved = 0usize;
    for element in elements {
        let entry = linker.store.get(element);
        if !matches!(entry.kind, ElementKind::TopLevelVariable | ElementKind::Field)
            || !entry.flags.contains(ElementFlags::CONST)
            || entry.flags.contains(ElementFlags::ENUM_CONSTANT)
        {
            continue;
        }
        let Some(located) = linker.node_map.locate(&linker.builders, element) else {
            continue;
        };
        let initializer = match (located.node, located.declaration) {
            (Node::Declaration, Declaration::Variable(variable)) => variable.initializer,
            (Node::Member(Member::Field(field)), _) => field.initializer,
            _ => None,
        };
        let Some(initializer) = initializer else {
            continue;
        };
        let value = ConstLowering {
            store: &*linker.store,
            scope: &linker.scopes[lib],
            arena: &located.unit.arena,
            interner: linker.interner,
            class: entry.enclosing,
        }
        .lower(initializer);
        if let Some(data) = linker.store.get_mut(element).variable_mut() {
            data.initializer = Some(value);
        }
        resolved += 1;
    }
    tracing::debug!(resolved, "constant initializers");
}

/// Resolve parameter default values of library `lib`.
#[tracing::instrument(level = "debug", skip_all, fields(
    library = linker.interner.lookup(linker.builders[lib].uri),
))]
pub(crate) fn resolve_default_values(linker: &mut Linker<'_>, lib: usize) {
    let library = linker.builders[lib].id;
    let elements = linker.store.library(library).elements.clone();
    for element in elements {
        if linker.store.get(element).kind != ElementKind::Parameter {
            continue;
        }
        let Some(located) = linker.node_map.locate(&linker.builders, element) else {
            continue;
        };
        let Node::Param(param) = located.node else {
            continue;
        };
        let Some(default_value) = param.default_value else {
            continue;
        };
        let value = ConstLowering {
            store: &*linker.store,
            scope: &linker.scopes[lib],
            arena: &located.unit.arena,
            interner: linker.interner,
            class: enclosing_interface(linker.store, element),
        }
        .lower(default_value);
        if let Some(data) = linker.store.get_mut(element).parameter_mut() {
            data.default_value = Some(value);
        }
    }
}

/// Resolve the annotations of every declaration, member, enum constant, and
/// parameter of library `lib`.
#[tracing::instrument(level = "debug", skip_all, fields(
    library = linker.interner.lookup(linker.builders[lib].uri),
))]
pub(crate) fn resolve_metadata(linker: &mut Linker<'_>, lib: usize) {
    let library = linker.builders[lib].id;
    let elements = linker.store.library(library).elements.clone();
    let mut annotated = 0usize;
    for element in elements {
        let Some(located) = linker.node_map.locate(&linker.builders, element) else {
            continue;
        };
        let annotations: &[Annotation] = match located.node {
            Node::Declaration => located.declaration.metadata(),
            Node::Member(member) => member.metadata(),
            Node::EnumConstant(constant) => &constant.metadata,
            Node::Param(param) => &param.metadata,
            Node::ImplicitConstructor | Node::TypeParam(_) => &[],
        };
        if annotations.is_empty() {
            continue;
        }
        let lowering = ConstLowering {
            store: &*linker.store,
            scope: &linker.scopes[lib],
            arena: &located.unit.arena,
            interner: linker.interner,
            class: enclosing_interface(linker.store, element),
        };
        let metadata: Vec<ElementAnnotation> =
            annotations.iter().map(|a| lowering.annotation(a)).collect();
        linker.store.get_mut(element).metadata = metadata;
        annotated += 1;
    }
    tracing::debug!(annotated, "metadata");
}
