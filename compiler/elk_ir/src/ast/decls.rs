//! Declarations: top-level and class-body members.

use crate::{Argument, ExprId, Name, Span, TypeAnnotation};

/// `@name`, `@prefix.Name(args)`, `@Name.ctor(args)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    pub prefix: Option<Name>,
    pub name: Name,
    pub constructor: Option<Name>,
    /// `None` for a bare identifier annotation, `Some` for a constructor call.
    pub arguments: Option<Vec<Argument>>,
    pub span: Span,
}

impl Annotation {
    /// `@Name(args)`.
    pub fn call(name: Name, arguments: Vec<Argument>) -> Self {
        Annotation {
            prefix: None,
            name,
            constructor: None,
            arguments: Some(arguments),
            span: Span::DUMMY,
        }
    }

    /// `@name`.
    pub fn identifier(name: Name) -> Self {
        Annotation {
            prefix: None,
            name,
            constructor: None,
            arguments: None,
            span: Span::DUMMY,
        }
    }
}

/// A type parameter with an optional bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeParam {
    pub name: Name,
    pub bound: Option<TypeAnnotation>,
    pub span: Span,
}

impl TypeParam {
    /// Unbounded type parameter.
    pub fn new(name: Name) -> Self {
        TypeParam {
            name,
            bound: None,
            span: Span::DUMMY,
        }
    }

    /// Bounded type parameter.
    pub fn bounded(name: Name, bound: TypeAnnotation) -> Self {
        TypeParam {
            name,
            bound: Some(bound),
            span: Span::DUMMY,
        }
    }
}

/// Top-level declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Declaration {
    Class(ClassDecl),
    Mixin(MixinDecl),
    Enum(EnumDecl),
    TypeAlias(TypeAliasDecl),
    Function(FunctionDecl),
    Variable(VariableDecl),
}

impl Declaration {
    /// Declared name.
    pub fn name(&self) -> Name {
        match self {
            Declaration::Class(d) => d.name,
            Declaration::Mixin(d) => d.name,
            Declaration::Enum(d) => d.name,
            Declaration::TypeAlias(d) => d.name,
            Declaration::Function(d) => d.name,
            Declaration::Variable(d) => d.name,
        }
    }

    /// Source span.
    pub fn span(&self) -> Span {
        match self {
            Declaration::Class(d) => d.span,
            Declaration::Mixin(d) => d.span,
            Declaration::Enum(d) => d.span,
            Declaration::TypeAlias(d) => d.span,
            Declaration::Function(d) => d.span,
            Declaration::Variable(d) => d.span,
        }
    }

    /// Annotations on the declaration.
    pub fn metadata(&self) -> &[Annotation] {
        match self {
            Declaration::Class(d) => &d.metadata,
            Declaration::Mixin(d) => &d.metadata,
            Declaration::Enum(d) => &d.metadata,
            Declaration::TypeAlias(d) => &d.metadata,
            Declaration::Function(d) => &d.metadata,
            Declaration::Variable(d) => &d.metadata,
        }
    }

    /// Body members of classes, mixins, and enums; empty otherwise.
    pub fn members(&self) -> &[Member] {
        match self {
            Declaration::Class(d) => &d.members,
            Declaration::Mixin(d) => &d.members,
            Declaration::Enum(d) => &d.members,
            Declaration::TypeAlias(_) | Declaration::Function(_) | Declaration::Variable(_) => &[],
        }
    }

    /// Declared type parameters.
    pub fn type_params(&self) -> &[TypeParam] {
        match self {
            Declaration::Class(d) => &d.type_params,
            Declaration::Mixin(d) => &d.type_params,
            Declaration::TypeAlias(d) => &d.type_params,
            Declaration::Function(d) => &d.type_params,
            Declaration::Enum(_) | Declaration::Variable(_) => &[],
        }
    }
}

/// Class modifiers relevant to linking.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassModifiers {
    pub is_abstract: bool,
    /// `macro class`
    pub is_macro: bool,
    /// `augment class`: only valid inside macro-generated units.
    pub is_augmentation: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDecl {
    pub name: Name,
    pub modifiers: ClassModifiers,
    pub type_params: Vec<TypeParam>,
    pub superclass: Option<TypeAnnotation>,
    pub mixins: Vec<TypeAnnotation>,
    pub interfaces: Vec<TypeAnnotation>,
    pub members: Vec<Member>,
    pub metadata: Vec<Annotation>,
    pub span: Span,
}

impl ClassDecl {
    /// Empty, non-generic class.
    pub fn new(name: Name) -> Self {
        ClassDecl {
            name,
            modifiers: ClassModifiers::default(),
            type_params: Vec::new(),
            superclass: None,
            mixins: Vec::new(),
            interfaces: Vec::new(),
            members: Vec::new(),
            metadata: Vec::new(),
            span: Span::DUMMY,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MixinDecl {
    pub name: Name,
    pub type_params: Vec<TypeParam>,
    /// `on` clause.
    pub on: Vec<TypeAnnotation>,
    pub interfaces: Vec<TypeAnnotation>,
    pub members: Vec<Member>,
    pub metadata: Vec<Annotation>,
    pub span: Span,
}

impl MixinDecl {
    /// Empty mixin.
    pub fn new(name: Name) -> Self {
        MixinDecl {
            name,
            type_params: Vec::new(),
            on: Vec::new(),
            interfaces: Vec::new(),
            members: Vec::new(),
            metadata: Vec::new(),
            span: Span::DUMMY,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumConstantDecl {
    pub name: Name,
    pub metadata: Vec<Annotation>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumDecl {
    pub name: Name,
    pub constants: Vec<EnumConstantDecl>,
    pub members: Vec<Member>,
    pub metadata: Vec<Annotation>,
    pub span: Span,
}

impl EnumDecl {
    /// Enum with the given constants and no members.
    pub fn new(name: Name, constants: &[Name]) -> Self {
        EnumDecl {
            name,
            constants: constants
                .iter()
                .map(|&name| EnumConstantDecl {
                    name,
                    metadata: Vec::new(),
                    span: Span::DUMMY,
                })
                .collect(),
            members: Vec::new(),
            metadata: Vec::new(),
            span: Span::DUMMY,
        }
    }
}

/// `typedef Name<T> = Type;`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeAliasDecl {
    pub name: Name,
    pub type_params: Vec<TypeParam>,
    pub aliased: TypeAnnotation,
    pub metadata: Vec<Annotation>,
    pub span: Span,
}

impl TypeAliasDecl {
    /// Non-generic alias.
    pub fn new(name: Name, aliased: TypeAnnotation) -> Self {
        TypeAliasDecl {
            name,
            type_params: Vec::new(),
            aliased,
            metadata: Vec::new(),
            span: Span::DUMMY,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: Name,
    pub type_params: Vec<TypeParam>,
    pub return_type: Option<TypeAnnotation>,
    pub params: Vec<Param>,
    pub body: Option<ExprId>,
    pub metadata: Vec<Annotation>,
    pub span: Span,
}

impl FunctionDecl {
    /// Function without parameters or body.
    pub fn new(name: Name, return_type: Option<TypeAnnotation>) -> Self {
        FunctionDecl {
            name,
            type_params: Vec::new(),
            return_type,
            params: Vec::new(),
            body: None,
            metadata: Vec::new(),
            span: Span::DUMMY,
        }
    }
}

/// Top-level variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableDecl {
    pub name: Name,
    pub ty: Option<TypeAnnotation>,
    pub initializer: Option<ExprId>,
    pub is_const: bool,
    pub is_final: bool,
    pub metadata: Vec<Annotation>,
    pub span: Span,
}

impl VariableDecl {
    /// Mutable variable.
    pub fn new(name: Name, ty: Option<TypeAnnotation>, initializer: Option<ExprId>) -> Self {
        VariableDecl {
            name,
            ty,
            initializer,
            is_const: false,
            is_final: false,
            metadata: Vec::new(),
            span: Span::DUMMY,
        }
    }
}

/// Class, mixin, or enum body member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Constructor(ConstructorDecl),
}

impl Member {
    /// Annotations on the member.
    pub fn metadata(&self) -> &[Annotation] {
        match self {
            Member::Field(m) => &m.metadata,
            Member::Method(m) => &m.metadata,
            Member::Constructor(m) => &m.metadata,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: Name,
    pub ty: Option<TypeAnnotation>,
    pub initializer: Option<ExprId>,
    pub is_static: bool,
    pub is_const: bool,
    pub is_final: bool,
    pub metadata: Vec<Annotation>,
    pub span: Span,
}

impl FieldDecl {
    /// Mutable instance field.
    pub fn new(name: Name, ty: Option<TypeAnnotation>, initializer: Option<ExprId>) -> Self {
        FieldDecl {
            name,
            ty,
            initializer,
            is_static: false,
            is_const: false,
            is_final: false,
            metadata: Vec::new(),
            span: Span::DUMMY,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MethodKind {
    #[default]
    Method,
    Getter,
    Setter,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: Name,
    pub kind: MethodKind,
    pub type_params: Vec<TypeParam>,
    pub return_type: Option<TypeAnnotation>,
    pub params: Vec<Param>,
    pub body: Option<ExprId>,
    pub is_static: bool,
    pub metadata: Vec<Annotation>,
    pub span: Span,
}

impl MethodDecl {
    /// Instance method without parameters or body.
    pub fn new(name: Name, return_type: Option<TypeAnnotation>) -> Self {
        MethodDecl {
            name,
            kind: MethodKind::Method,
            type_params: Vec::new(),
            return_type,
            params: Vec::new(),
            body: None,
            is_static: false,
            metadata: Vec::new(),
            span: Span::DUMMY,
        }
    }
}

/// Constructor initializer list entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstructorInitializer {
    /// `field = value`
    Field { name: Name, value: ExprId },
    /// `super(args)` / `super.named(args)`
    Super {
        constructor: Option<Name>,
        args: Vec<Argument>,
    },
    /// `this(args)` / `this.named(args)`
    Redirect {
        constructor: Option<Name>,
        args: Vec<Argument>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructorDecl {
    /// `None` for the unnamed constructor.
    pub name: Option<Name>,
    pub params: Vec<Param>,
    pub initializers: Vec<ConstructorInitializer>,
    pub is_const: bool,
    pub is_factory: bool,
    pub metadata: Vec<Annotation>,
    pub span: Span,
}

impl ConstructorDecl {
    /// Unnamed constructor without parameters.
    pub fn unnamed() -> Self {
        ConstructorDecl {
            name: None,
            params: Vec::new(),
            initializers: Vec::new(),
            is_const: false,
            is_factory: false,
            metadata: Vec::new(),
            span: Span::DUMMY,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ParamKind {
    #[default]
    Required,
    OptionalPositional,
    Named,
    RequiredNamed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: Name,
    pub ty: Option<TypeAnnotation>,
    pub kind: ParamKind,
    pub default_value: Option<ExprId>,
    /// `this.name`
    pub is_field_formal: bool,
    pub metadata: Vec<Annotation>,
    pub span: Span,
}

impl Param {
    /// Required positional parameter.
    pub fn new(name: Name, ty: Option<TypeAnnotation>) -> Self {
        Param {
            name,
            ty,
            kind: ParamKind::Required,
            default_value: None,
            is_field_formal: false,
            metadata: Vec::new(),
            span: Span::DUMMY,
        }
    }
}
