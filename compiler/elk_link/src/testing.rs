//! Fixtures for link tests: syntax builders, the core libraries, macro
//! host libraries, and a recording macro executor.

use std::cell::RefCell;
use std::future::Future;

use elk_element::{ElementId, ElementKind, ElementStore, LibraryId, LinkedType};
use elk_ir::{
    Annotation, Argument, ClassDecl, Combinator, CompilationUnit, ConstructorDecl, Declaration,
    Directive, ExportDirective, ExprId, ExprKind, FieldDecl, ImportDirective, Member, MethodDecl,
    MethodKind, Name, Param, ParamKind, ParsedUnit, PartDirective, StringInterner, TypeAnnotation,
    TypeParam,
};

use crate::{
    AugmentationParser, LibraryInput, LinkConfig, LinkError, LinkOutput, LinkSession,
    MacroExecution, MacroExecutionError, MacroExecutor, MacroRequest, MacroResult,
    NoMacroExecutor,
};

pub(crate) const CORE: &str = "dart:core";
pub(crate) const ASYNC: &str = "dart:async";
pub(crate) const MACROS: &str = "package:macros/macros.dart";
pub(crate) const GEN: &str = "package:gen/gen.dart";

/// Builds one parsed unit.
pub(crate) struct UnitBuilder<'i> {
    interner: &'i StringInterner,
    uri: Name,
    unit: CompilationUnit,
}

impl<'i> UnitBuilder<'i> {
    pub fn new(interner: &'i StringInterner, uri: &str) -> Self {
        UnitBuilder {
            interner,
            uri: interner.intern(uri),
            unit: CompilationUnit::new(),
        }
    }

    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    pub fn ty(&self, name: &str) -> TypeAnnotation {
        TypeAnnotation::named(self.name(name))
    }

    pub fn generic(&self, name: &str, args: Vec<TypeAnnotation>) -> TypeAnnotation {
        TypeAnnotation::generic(self.name(name), args)
    }

    pub fn directive(&mut self, directive: Directive) -> &mut Self {
        self.unit.directives.push(directive);
        self
    }

    pub fn import(&mut self, uri: &str) -> &mut Self {
        let import = ImportDirective::new(self.name(uri));
        self.directive(Directive::Import(import))
    }

    pub fn export(&mut self, uri: &str) -> &mut Self {
        let export = ExportDirective::new(self.name(uri));
        self.unit.directives.push(Directive::Export(export));
        self
    }

    pub fn export_hiding(&mut self, uri: &str, hidden: &[&str]) -> &mut Self {
        let mut export = ExportDirective::new(self.name(uri));
        export.combinators = vec![Combinator::Hide(hidden.iter().map(|h| self.name(h)).collect())];
        self.unit.directives.push(Directive::Export(export));
        self
    }

    pub fn part(&mut self, uri: &str) -> &mut Self {
        let part = PartDirective {
            uri: self.name(uri),
            span: elk_ir::Span::DUMMY,
        };
        self.unit.directives.push(Directive::Part(part));
        self
    }

    pub fn declare(&mut self, decl: Declaration) -> &mut Self {
        self.unit.declarations.push(decl);
        self
    }

    /// `class <name> {}`
    pub fn class(&mut self, name: &str) -> &mut Self {
        let class = ClassDecl::new(self.name(name));
        self.declare(Declaration::Class(class))
    }

    pub fn expr(&mut self, kind: ExprKind) -> ExprId {
        self.unit.arena.alloc(kind)
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.expr(ExprKind::Int(value))
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        let value = self.name(value);
        self.expr(ExprKind::String(value))
    }

    pub fn ident(&mut self, name: &str) -> ExprId {
        let name = self.name(name);
        self.expr(ExprKind::Identifier(name))
    }

    pub fn call(&mut self, name: &str, args: Vec<Argument>) -> ExprId {
        let name = self.name(name);
        self.expr(ExprKind::Invocation {
            target: None,
            name,
            args,
        })
    }

    pub fn unit(self) -> ParsedUnit {
        ParsedUnit::new(self.uri, self.unit)
    }

    /// Single-unit library.
    pub fn library(self) -> LibraryInput {
        LibraryInput::new(self.uri, vec![self.unit()])
    }
}

pub(crate) fn field(name: Name, ty: Option<TypeAnnotation>) -> Member {
    let mut field = FieldDecl::new(name, ty, None);
    field.is_final = true;
    Member::Field(field)
}

pub(crate) fn getter(name: Name, ty: Option<TypeAnnotation>) -> Member {
    let mut getter = MethodDecl::new(name, ty);
    getter.kind = MethodKind::Getter;
    Member::Method(getter)
}

/// `dart:core` with the types the linker builds types from.
pub(crate) fn core_library(interner: &StringInterner) -> LibraryInput {
    let mut u = UnitBuilder::new(interner, CORE);
    for name in ["Object", "Null", "bool", "num", "String"] {
        u.class(name);
    }
    for name in ["int", "double"] {
        let mut class = ClassDecl::new(u.name(name));
        class.superclass = Some(u.ty("num"));
        u.declare(Declaration::Class(class));
    }
    for (name, params) in [("List", &["E"][..]), ("Set", &["E"][..]), ("Map", &["K", "V"][..])] {
        let mut class = ClassDecl::new(u.name(name));
        class.type_params = params.iter().map(|p| TypeParam::new(u.name(p))).collect();
        u.declare(Declaration::Class(class));
    }
    let mut enum_ = ClassDecl::new(u.name("Enum"));
    enum_.modifiers.is_abstract = true;
    u.declare(Declaration::Class(enum_));
    u.library()
}

/// `dart:async` with `Future<T>`.
pub(crate) fn async_library(interner: &StringInterner) -> LibraryInput {
    let mut u = UnitBuilder::new(interner, ASYNC);
    let mut future = ClassDecl::new(u.name("Future"));
    future.type_params = vec![TypeParam::new(u.name("T"))];
    u.declare(Declaration::Class(future));
    u.library()
}

/// The macro interfaces.
pub(crate) fn macros_library(interner: &StringInterner) -> LibraryInput {
    let mut u = UnitBuilder::new(interner, MACROS);
    let mut macro_ = ClassDecl::new(u.name("Macro"));
    macro_.modifiers.is_abstract = true;
    u.declare(Declaration::Class(macro_));
    let mut class_types = ClassDecl::new(u.name("ClassTypesMacro"));
    class_types.modifiers.is_abstract = true;
    class_types.interfaces = vec![u.ty("Macro")];
    u.declare(Declaration::Class(class_types));
    u.library()
}

/// `macro class Gen implements ClassTypesMacro` with a
/// `const Gen({this.x, this.y})` constructor, a macro class that is not a
/// types macro, and a plain annotation class.
pub(crate) fn gen_library(interner: &StringInterner) -> LibraryInput {
    let mut u = UnitBuilder::new(interner, GEN);
    u.import(MACROS);

    let mut gen = ClassDecl::new(u.name("Gen"));
    gen.modifiers.is_macro = true;
    gen.interfaces = vec![u.ty("ClassTypesMacro")];
    let mut constructor = ConstructorDecl::unnamed();
    constructor.is_const = true;
    for name in ["x", "y"] {
        gen.members.push(field(u.name(name), Some(u.ty("Object").nullable())));
        let mut param = Param::new(u.name(name), None);
        param.kind = ParamKind::Named;
        param.is_field_formal = true;
        constructor.params.push(param);
    }
    gen.members.push(Member::Constructor(constructor));
    u.declare(Declaration::Class(gen));

    let mut other = ClassDecl::new(u.name("OtherMacro"));
    other.modifiers.is_macro = true;
    other.interfaces = vec![u.ty("Macro")];
    let mut constructor = ConstructorDecl::unnamed();
    constructor.is_const = true;
    other.members.push(Member::Constructor(constructor));
    u.declare(Declaration::Class(other));

    let mut plain = ClassDecl::new(u.name("Plain"));
    let mut constructor = ConstructorDecl::unnamed();
    constructor.is_const = true;
    plain.members.push(Member::Constructor(constructor));
    u.declare(Declaration::Class(plain));
    u.library()
}

/// `@Gen(...)`
pub(crate) fn gen_annotation(u: &UnitBuilder<'_>, args: Vec<Argument>) -> Annotation {
    Annotation::call(u.name("Gen"), args)
}

/// A store, its interner, and helpers to link batches and inspect results.
pub(crate) struct Harness {
    pub interner: StringInterner,
    pub store: ElementStore,
    pub config: LinkConfig,
}

impl Harness {
    pub fn new() -> Self {
        crate::init_tracing();
        Harness {
            interner: StringInterner::new(),
            store: ElementStore::new(),
            config: LinkConfig::default(),
        }
    }

    /// A harness whose store already holds `dart:core` and `dart:async`.
    pub async fn with_core() -> Self {
        let mut h = Harness::new();
        let inputs = vec![core_library(&h.interner), async_library(&h.interner)];
        h.link_ok(inputs).await;
        h
    }

    /// A harness with the core libraries and the macro host libraries
    /// linked.
    pub async fn with_macros() -> Self {
        let mut h = Harness::with_core().await;
        let inputs = vec![macros_library(&h.interner), gen_library(&h.interner)];
        h.link_ok(inputs).await;
        h
    }

    pub fn unit(&self, uri: &str) -> UnitBuilder<'_> {
        UnitBuilder::new(&self.interner, uri)
    }

    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    pub async fn link(&mut self, inputs: Vec<LibraryInput>) -> Result<LinkOutput, LinkError> {
        LinkSession::new(&mut self.store, &self.interner, &self.config, NoMacroExecutor)
            .link(inputs)
            .await
    }

    pub async fn link_ok(&mut self, inputs: Vec<LibraryInput>) -> LinkOutput {
        self.link(inputs)
            .await
            .unwrap_or_else(|e| panic!("link failed: {e}"))
    }

    /// Link with a macro executor. With `parse_augmentations` the generated
    /// units are parsed by a [`FragmentParser`] and built into their
    /// libraries.
    pub async fn link_with<E: MacroExecutor>(
        &mut self,
        executor: E,
        parse_augmentations: bool,
        inputs: Vec<LibraryInput>,
    ) -> Result<LinkOutput, LinkError> {
        let parser = FragmentParser {
            interner: &self.interner,
        };
        let mut session = LinkSession::new(&mut self.store, &self.interner, &self.config, executor);
        if parse_augmentations {
            session = session.with_augmentation_parser(&parser);
        }
        session.link(inputs).await
    }

    pub fn library(&self, uri: &str) -> LibraryId {
        self.store
            .library_by_uri(self.name(uri))
            .unwrap_or_else(|| panic!("library {uri} is not in the store"))
    }

    /// Top-level declaration `name` of library `uri`.
    pub fn declaration(&self, uri: &str, name: &str) -> ElementId {
        let name = self.name(name);
        self.store
            .library(self.library(uri))
            .declarations
            .iter()
            .copied()
            .find(|&id| self.store.get(id).name == name)
            .unwrap_or_else(|| panic!("no declaration {} in {uri}", self.interner.lookup(name)))
    }

    /// Member (not constructor) `name` of `class`.
    pub fn member(&self, class: ElementId, name: &str) -> ElementId {
        let name = self.name(name);
        self.store
            .get(class)
            .interface()
            .and_then(|data| {
                data.members
                    .iter()
                    .copied()
                    .find(|&id| self.store.get(id).name == name)
            })
            .unwrap_or_else(|| panic!("no member {}", self.interner.lookup(name)))
    }

    /// Constructor of `class` named `name` (`""` for the unnamed one).
    pub fn constructor(&self, class: ElementId, name: &str) -> ElementId {
        let name = self.name(name);
        self.store
            .get(class)
            .interface()
            .and_then(|data| {
                data.constructors
                    .iter()
                    .copied()
                    .find(|&id| self.store.get(id).name == name)
            })
            .unwrap_or_else(|| panic!("no constructor {}", self.interner.lookup(name)))
    }

    /// Declared or inferred type of a variable, field, or parameter; return
    /// type of an executable.
    pub fn type_of(&self, element: ElementId) -> LinkedType {
        let element = self.store.get(element);
        if let Some(ty) = element.value_type() {
            return ty.clone();
        }
        match element.executable() {
            Some(data) => data.return_type.clone(),
            None => panic!("{} has no type", element.kind.label()),
        }
    }

    /// Non-nullable interface type of the declaration `name` of `uri`.
    pub fn interface(&self, uri: &str, name: &str, args: Vec<LinkedType>) -> LinkedType {
        let element = self.declaration(uri, name);
        assert!(self.store.get(element).kind.is_interface());
        LinkedType::interface(element, args)
    }

    pub fn core(&self, name: &str) -> LinkedType {
        self.interface(CORE, name, Vec::new())
    }

    /// Element kinds of a library's declarations, for quick shape checks.
    pub fn declaration_kinds(&self, uri: &str) -> Vec<(String, ElementKind)> {
        self.store
            .library(self.library(uri))
            .declarations
            .iter()
            .map(|&id| {
                let element = self.store.get(id);
                (self.interner.lookup(element.name).to_string(), element.kind)
            })
            .collect()
    }
}

type Responder = Box<dyn Fn(&MacroRequest) -> MacroExecution>;

/// Executor that records every request and answers from a closure.
pub(crate) struct RecordingExecutor {
    pub requests: RefCell<Vec<MacroRequest>>,
    respond: Responder,
}

impl RecordingExecutor {
    pub fn new(respond: impl Fn(&MacroRequest) -> MacroExecution + 'static) -> Self {
        RecordingExecutor {
            requests: RefCell::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    /// Adds `int get <class>Generated => 0;` to every annotated class.
    pub fn generating_getters() -> Self {
        RecordingExecutor::new(|request| {
            MacroExecution::Applied(MacroResult {
                library_fragments: Vec::new(),
                class_fragments: vec![format!(
                    "int get {}Generated => 0;",
                    request.target.name.to_lowercase()
                )],
            })
        })
    }

    /// Fails on classes named in `failing`, generates getters elsewhere.
    pub fn failing_on(failing: &'static [&'static str]) -> Self {
        RecordingExecutor::new(move |request| {
            if failing.contains(&request.target.name.as_str()) {
                MacroExecution::Failed(MacroExecutionError::new(
                    format!("cannot expand {}", request.target.name),
                    "#0 Gen.buildTypesForClass",
                ))
            } else {
                MacroExecution::Applied(MacroResult {
                    library_fragments: Vec::new(),
                    class_fragments: vec![format!(
                        "int get {}Generated => 0;",
                        request.target.name.to_lowercase()
                    )],
                })
            }
        })
    }

    pub fn classes(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|r| r.target.name.clone())
            .collect()
    }
}

impl MacroExecutor for RecordingExecutor {
    fn execute_types_phase(&self, request: &MacroRequest) -> impl Future<Output = MacroExecution> {
        self.requests.borrow_mut().push(request.clone());
        let outcome = (self.respond)(request);
        async move {
            tokio::task::yield_now().await;
            outcome
        }
    }
}

/// Parses the subset of augmentation source the fixtures generate:
///
/// ```text
/// augment library '<uri>';
/// class <Name> {}
/// augment class <Name> {
///   int get <name> => 0;
/// }
/// ```
pub(crate) struct FragmentParser<'i> {
    pub interner: &'i StringInterner,
}

impl AugmentationParser for FragmentParser<'_> {
    fn parse(&self, _uri: &str, source: &str) -> Result<CompilationUnit, String> {
        let mut unit = CompilationUnit::new();
        let mut open: Option<ClassDecl> = None;
        for line in source.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line.starts_with("augment library ") {
                continue;
            }
            if let Some(name) = line
                .strip_prefix("augment class ")
                .and_then(|rest| rest.strip_suffix(" {"))
            {
                let mut class = ClassDecl::new(self.interner.intern(name));
                class.modifiers.is_augmentation = true;
                open = Some(class);
            } else if line == "}" {
                let class = open.take().ok_or("unbalanced '}'")?;
                unit.declarations.push(Declaration::Class(class));
            } else if let Some(name) = line
                .strip_prefix("class ")
                .and_then(|rest| rest.strip_suffix(" {}"))
            {
                let class = ClassDecl::new(self.interner.intern(name));
                unit.declarations.push(Declaration::Class(class));
            } else if let Some(name) = line
                .strip_prefix("int get ")
                .and_then(|rest| rest.strip_suffix(" => 0;"))
            {
                let class = open.as_mut().ok_or("getter outside a class")?;
                let int = TypeAnnotation::named(self.interner.intern("int"));
                let mut getter = MethodDecl::new(self.interner.intern(name), Some(int));
                getter.kind = MethodKind::Getter;
                getter.body = Some(unit.arena.alloc(ExprKind::Int(0)));
                class.members.push(Member::Method(getter));
            } else {
                return Err(format!("unexpected line '{line}'"));
            }
        }
        match open {
            Some(_) => Err("unterminated class".to_string()),
            None => Ok(unit),
        }
    }
}
