//! Library builder: elements from declarations.
//!
//! A [`LibraryBuilder`] owns one input library's parsed units for the
//! lifetime of the batch. [`build`] walks every unit and creates an empty
//! element for each declaration, member, parameter, and type parameter,
//! recording its syntax position in the [`NodeMap`]. Later passes fill the
//! elements in:
//!
//! ```text
//! build                               step 1/3  elements, directives, parts
//! build_augmentation                  step 3    macro-generated unit
//! build_enum_members                  step 7    constant types, `values`
//! resolve_implicit_super_constructors step 8
//! resolve_constructors                step 10   field formals, redirects
//! resolve_constant_initializers       step 10
//! resolve_default_values              step 10
//! resolve_metadata                    step 10
//! collect_mixin_super_invoked_names   step 11
//! ```
//!
//! Every pass works on one library at a time and may run in any library
//! order. Structural problems are reported as [`LibraryError`]s and the
//! offending declaration is skipped.

mod augment;
mod constants;
mod members;
mod mixins;

pub(crate) use augment::build_augmentation;
pub(crate) use constants::{
    enclosing_interface, resolve_constant_initializers, resolve_default_values,
    resolve_metadata, ConstLowering,
};
pub(crate) use members::{
    build_enum_members, constructor_named, resolve_constructors,
    resolve_implicit_super_constructors,
};
pub(crate) use mixins::collect_mixin_super_invoked_names;

use elk_element::{
    Element, ElementFlags, ElementId, ElementKind, ElementStore, ExportEntry, ImportEntry,
    LibraryId, NameFilter, ParameterKind, UnitEntry, Variance,
};
use elk_ir::{
    Declaration, Member, MethodKind, Name, Param, ParsedUnit, StringInterner, TypeParam,
};
use rustc_hash::FxHashMap;

use crate::linker::{report, Linker};
use crate::names::WellKnownNames;
use crate::node_map::{index_u32, NodeKind, NodeMap, NodeRef};
use crate::{LibraryError, LibraryErrorKind, LibraryInput};

/// In-progress state of one batch library.
pub(crate) struct LibraryBuilder {
    /// Position in the batch.
    pub index: usize,
    pub id: LibraryId,
    pub uri: Name,
    /// Defining unit first, then parts, then the augmentation unit if any.
    pub units: Vec<ParsedUnit>,
    /// Top-level declarations by name, private ones included.
    pub locals: FxHashMap<Name, ElementId>,
}

impl LibraryBuilder {
    pub fn new(index: usize, id: LibraryId, input: LibraryInput) -> Self {
        LibraryBuilder {
            index,
            id,
            uri: input.uri,
            units: input.units,
            locals: FxHashMap::default(),
        }
    }
}

/// Create the elements of every unit of library `lib`.
#[tracing::instrument(level = "debug", skip_all, fields(
    library = linker.interner.lookup(linker.builders[lib].uri),
    units = linker.builders[lib].units.len(),
))]
pub(crate) fn build(linker: &mut Linker<'_>, lib: usize) {
    let store = &mut *linker.store;
    let interner = linker.interner;
    let builder = &mut linker.builders[lib];

    record_units_and_directives(
        store,
        &linker.names,
        &mut linker.errors,
        interner,
        builder,
    );

    let mut declarer = Declarer {
        store,
        node_map: &mut linker.node_map,
        errors: &mut linker.errors,
        interner,
        library: builder.id,
        library_uri: builder.uri,
        extra_flags: ElementFlags::empty(),
    };
    for (unit_index, unit) in builder.units.iter().enumerate() {
        for (decl_index, decl) in unit.unit.declarations.iter().enumerate() {
            let node = NodeRef::declaration(builder.index, unit_index, decl_index);
            if let Some(element) = declarer.declare_top_level(node, decl) {
                declarer.register_top_level(&mut builder.locals, element, decl.name());
            }
        }
    }
    tracing::debug!(elements = store_len(&declarer), "library built");
}

fn store_len(declarer: &Declarer<'_>) -> usize {
    declarer.store.library(declarer.library).elements.len()
}

/// Units, imports, exports, and `part` validation.
fn record_units_and_directives(
    store: &mut ElementStore,
    names: &WellKnownNames,
    errors: &mut Vec<LibraryError>,
    interner: &StringInterner,
    builder: &LibraryBuilder,
) {
    let mut imports = Vec::new();
    let mut exports = Vec::new();

    if let Some(defining) = builder.units.first() {
        for import in defining.unit.imports() {
            imports.push(ImportEntry {
                uri: import.uri,
                target: store.library_by_uri(import.uri),
                prefix: import.prefix,
                filters: NameFilter::from_combinators(&import.combinators),
                is_implicit: false,
            });
        }
        for export in defining.unit.exports() {
            let target = store.library_by_uri(export.uri);
            if target.is_none() {
                tracing::debug!(uri = interner.lookup(export.uri), "export of unknown library");
            }
            exports.push(ExportEntry {
                uri: export.uri,
                target,
                filters: NameFilter::from_combinators(&export.combinators),
            });
        }
        for part in defining.unit.parts() {
            let supplied = builder.units.iter().skip(1).any(|unit| unit.uri == part.uri);
            if !supplied {
                report(
                    errors,
                    interner,
                    builder.uri,
                    LibraryErrorKind::MissingPart,
                    format!("part '{}' was not supplied", interner.lookup(part.uri)),
                );
            }
        }
    }

    let imports_core = imports.iter().any(|import| import.uri == names.dart_core);
    if builder.uri != names.dart_core && !imports_core {
        imports.push(ImportEntry {
            uri: names.dart_core,
            target: store.library_by_uri(names.dart_core),
            prefix: None,
            filters: Vec::new(),
            is_implicit: true,
        });
    }

    let entry = store.library_mut(builder.id);
    entry.units = builder
        .units
        .iter()
        .map(|unit| UnitEntry {
            uri: unit.uri,
            is_synthetic: unit.is_synthetic,
            is_augmentation: false,
        })
        .collect();
    entry.imports = imports;
    entry.exports = exports;
}

/// Allocates elements for declarations of one library.
pub(crate) struct Declarer<'a> {
    pub store: &'a mut ElementStore,
    pub node_map: &'a mut NodeMap,
    pub errors: &'a mut Vec<LibraryError>,
    pub interner: &'a StringInterner,
    pub library: LibraryId,
    pub library_uri: Name,
    /// Added to every element created, e.g. `AUGMENTATION`.
    pub extra_flags: ElementFlags,
}

impl Declarer<'_> {
    fn alloc(&mut self, element: Element, node: NodeRef) -> ElementId {
        let id = self.store.alloc(element.with_flags(self.extra_flags));
        self.node_map.insert(id, node);
        id
    }

    fn element(&self, name: Name, kind: ElementKind, enclosing: Option<ElementId>) -> Element {
        Element::new(name, kind, self.library, enclosing)
    }

    fn error(&mut self, kind: LibraryErrorKind, message: String) {
        report(self.errors, self.interner, self.library_uri, kind, message);
    }

    /// Make a top-level element visible under `name` in the library.
    pub fn register_top_level(
        &mut self,
        locals: &mut FxHashMap<Name, ElementId>,
        element: ElementId,
        name: Name,
    ) {
        self.store
            .library_mut(self.library)
            .declarations
            .push(element);
        if locals.contains_key(&name) {
            self.error(
                LibraryErrorKind::DuplicateDeclaration,
                format!(
                    "'{}' is already declared in this library",
                    self.interner.lookup(name)
                ),
            );
        } else {
            locals.insert(name, element);
        }
    }

    /// Create the element of a top-level declaration and everything below
    /// it. Returns `None` when the declaration is rejected.
    pub fn declare_top_level(&mut self, node: NodeRef, decl: &Declaration) -> Option<ElementId> {
        match decl {
            Declaration::Class(class) => {
                if class.modifiers.is_augmentation {
                    self.error(
                        LibraryErrorKind::MalformedDeclaration,
                        format!(
                            "'augment class {}' outside a macro-generated unit",
                            self.interner.lookup(class.name)
                        ),
                    );
                    return None;
                }
                let mut flags = ElementFlags::empty();
                flags.set(ElementFlags::ABSTRACT, class.modifiers.is_abstract);
                flags.set(ElementFlags::MACRO, class.modifiers.is_macro);
                let id = self.alloc(
                    self.element(class.name, ElementKind::Class, None)
                        .with_flags(flags),
                    node,
                );
                let type_params =
                    self.declare_type_params(node, id, None, &class.type_params, Variance::Covariant);
                if let Some(data) = self.store.get_mut(id).interface_mut() {
                    data.type_params = type_params;
                }
                self.declare_members(node, id, &class.members, true);
                let has_constructor = class
                    .members
                    .iter()
                    .any(|member| matches!(member, Member::Constructor(_)));
                if !has_constructor {
                    self.declare_implicit_constructor(node, id);
                }
                Some(id)
            }
            Declaration::Mixin(mixin) => {
                let id = self.alloc(self.element(mixin.name, ElementKind::Mixin, None), node);
                let type_params =
                    self.declare_type_params(node, id, None, &mixin.type_params, Variance::Covariant);
                if let Some(data) = self.store.get_mut(id).interface_mut() {
                    data.type_params = type_params;
                }
                self.declare_members(node, id, &mixin.members, false);
                Some(id)
            }
            Declaration::Enum(decl) => {
                let id = self.alloc(self.element(decl.name, ElementKind::Enum, None), node);
                let mut constants = Vec::with_capacity(decl.constants.len());
                for (index, constant) in decl.constants.iter().enumerate() {
                    let flags = ElementFlags::STATIC
                        | ElementFlags::CONST
                        | ElementFlags::FINAL
                        | ElementFlags::ENUM_CONSTANT;
                    let field = self.alloc(
                        self.element(constant.name, ElementKind::Field, Some(id))
                            .with_flags(flags),
                        node.with_node(NodeKind::EnumConstant(index_u32(index))),
                    );
                    constants.push(field);
                }
                if let Some(data) = self.store.get_mut(id).interface_mut() {
                    data.members = constants;
                }
                self.declare_members(node, id, &decl.members, true);
                Some(id)
            }
            Declaration::TypeAlias(alias) => {
                let id = self.alloc(self.element(alias.name, ElementKind::TypeAlias, None), node);
                let type_params =
                    self.declare_type_params(node, id, None, &alias.type_params, Variance::Unrelated);
                if let Some(data) = self.store.get_mut(id).type_alias_mut() {
                    data.type_params = type_params;
                }
                Some(id)
            }
            Declaration::Function(function) => {
                let mut flags = ElementFlags::empty();
                flags.set(
                    ElementFlags::HAS_IMPLICIT_RETURN_TYPE,
                    function.return_type.is_none(),
                );
                let id = self.alloc(
                    self.element(function.name, ElementKind::Function, None)
                        .with_flags(flags),
                    node,
                );
                let type_params = self.declare_type_params(
                    node,
                    id,
                    None,
                    &function.type_params,
                    Variance::Unrelated,
                );
                let params = self.declare_params(node, id, None, &function.params);
                if let Some(data) = self.store.get_mut(id).executable_mut() {
                    data.type_params = type_params;
                    data.params = params;
                }
                Some(id)
            }
            Declaration::Variable(variable) => {
                let mut flags = ElementFlags::empty();
                flags.set(ElementFlags::CONST, variable.is_const);
                flags.set(ElementFlags::FINAL, variable.is_final || variable.is_const);
                flags.set(ElementFlags::HAS_IMPLICIT_TYPE, variable.ty.is_none());
                let id = self.alloc(
                    self.element(variable.name, ElementKind::TopLevelVariable, None)
                        .with_flags(flags),
                    node,
                );
                Some(id)
            }
        }
    }

    /// Declare body members of `class`, appending to its member and
    /// constructor lists.
    pub fn declare_members(
        &mut self,
        node: NodeRef,
        class: ElementId,
        members: &[Member],
        allow_constructors: bool,
    ) {
        for (index, member) in members.iter().enumerate() {
            let member_index = index_u32(index);
            let member_node = node.with_node(NodeKind::Member(member_index));
            match member {
                Member::Field(field) => {
                    if self.member_conflicts(class, field.name, ElementKind::Field) {
                        continue;
                    }
                    let mut flags = ElementFlags::empty();
                    flags.set(ElementFlags::STATIC, field.is_static);
                    flags.set(ElementFlags::CONST, field.is_const);
                    flags.set(ElementFlags::FINAL, field.is_final || field.is_const);
                    flags.set(ElementFlags::HAS_IMPLICIT_TYPE, field.ty.is_none());
                    let id = self.alloc(
                        self.element(field.name, ElementKind::Field, Some(class))
                            .with_flags(flags),
                        member_node,
                    );
                    self.push_member(class, id);
                }
                Member::Method(method) => {
                    let kind = match method.kind {
                        MethodKind::Method => ElementKind::Method,
                        MethodKind::Getter => ElementKind::Getter,
                        MethodKind::Setter => ElementKind::Setter,
                    };
                    if self.member_conflicts(class, method.name, kind) {
                        continue;
                    }
                    let mut flags = ElementFlags::empty();
                    flags.set(ElementFlags::STATIC, method.is_static);
                    flags.set(
                        ElementFlags::HAS_IMPLICIT_RETURN_TYPE,
                        method.return_type.is_none() && kind != ElementKind::Setter,
                    );
                    flags.set(ElementFlags::ABSTRACT, method.body.is_none());
                    let id = self.alloc(
                        self.element(method.name, kind, Some(class)).with_flags(flags),
                        member_node,
                    );
                    let type_params = self.declare_type_params(
                        node,
                        id,
                        Some(member_index),
                        &method.type_params,
                        Variance::Unrelated,
                    );
                    let params = self.declare_params(node, id, Some(member_index), &method.params);
                    if let Some(data) = self.store.get_mut(id).executable_mut() {
                        data.type_params = type_params;
                        data.params = params;
                    }
                    self.push_member(class, id);
                }
                Member::Constructor(constructor) => {
                    let name = constructor.name.unwrap_or(Name::EMPTY);
                    if !allow_constructors {
                        self.error(
                            LibraryErrorKind::MalformedDeclaration,
                            format!(
                                "'{}' cannot declare constructors",
                                self.interner.lookup(self.store.get(class).name)
                            ),
                        );
                        continue;
                    }
                    if self.member_conflicts(class, name, ElementKind::Constructor) {
                        continue;
                    }
                    let mut flags = ElementFlags::empty();
                    flags.set(ElementFlags::CONST, constructor.is_const);
                    flags.set(ElementFlags::FACTORY, constructor.is_factory);
                    let id = self.alloc(
                        self.element(name, ElementKind::Constructor, Some(class))
                            .with_flags(flags),
                        member_node,
                    );
                    let params =
                        self.declare_params(node, id, Some(member_index), &constructor.params);
                    if let Some(data) = self.store.get_mut(id).executable_mut() {
                        data.params = params;
                    }
                    if let Some(data) = self.store.get_mut(class).interface_mut() {
                        data.constructors.push(id);
                    }
                }
            }
        }
    }

    fn declare_implicit_constructor(&mut self, node: NodeRef, class: ElementId) {
        let id = self.alloc(
            self.element(Name::EMPTY, ElementKind::Constructor, Some(class))
                .with_flags(ElementFlags::SYNTHETIC),
            node.with_node(NodeKind::ImplicitConstructor),
        );
        if let Some(data) = self.store.get_mut(class).interface_mut() {
            data.constructors.push(id);
        }
    }

    fn push_member(&mut self, class: ElementId, member: ElementId) {
        if let Some(data) = self.store.get_mut(class).interface_mut() {
            data.members.push(member);
        }
    }

    /// Report and return `true` if `class` already declares `name` in a way
    /// a new `kind` member would clash with. A getter and a setter may share
    /// a name.
    fn member_conflicts(&mut self, class: ElementId, name: Name, kind: ElementKind) -> bool {
        let Some(data) = self.store.get(class).interface() else {
            return false;
        };
        let candidates = if kind == ElementKind::Constructor {
            &data.constructors
        } else {
            &data.members
        };
        let clash = candidates.iter().any(|&existing| {
            let existing = self.store.get(existing);
            existing.name == name
                && !matches!(
                    (existing.kind, kind),
                    (ElementKind::Getter, ElementKind::Setter)
                        | (ElementKind::Setter, ElementKind::Getter)
                )
        });
        if clash {
            let class_name = self.interner.lookup(self.store.get(class).name);
            self.error(
                LibraryErrorKind::DuplicateDeclaration,
                format!(
                    "'{class_name}' already declares {} '{}'",
                    kind.label(),
                    self.interner.lookup(name)
                ),
            );
        }
        clash
    }

    fn declare_type_params(
        &mut self,
        node: NodeRef,
        owner: ElementId,
        member: Option<u32>,
        params: &[TypeParam],
        variance: Variance,
    ) -> Vec<ElementId> {
        params
            .iter()
            .enumerate()
            .map(|(index, param)| {
                let mut element = self.element(param.name, ElementKind::TypeParameter, Some(owner));
                if let Some(data) = element.type_parameter_mut() {
                    data.variance = variance;
                }
                self.alloc(
                    element,
                    node.with_node(NodeKind::TypeParam {
                        member,
                        index: index_u32(index),
                    }),
                )
            })
            .collect()
    }

    fn declare_params(
        &mut self,
        node: NodeRef,
        executable: ElementId,
        member: Option<u32>,
        params: &[Param],
    ) -> Vec<ElementId> {
        params
            .iter()
            .enumerate()
            .map(|(index, param)| {
                let mut flags = ElementFlags::empty();
                flags.set(ElementFlags::FIELD_FORMAL, param.is_field_formal);
                flags.set(ElementFlags::HAS_IMPLICIT_TYPE, param.ty.is_none());
                let mut element = self
                    .element(param.name, ElementKind::Parameter, Some(executable))
                    .with_flags(flags);
                if let Some(data) = element.parameter_mut() {
                    data.kind = ParameterKind::from(param.kind);
                }
                self.alloc(
                    element,
                    node.with_node(NodeKind::Param {
                        member,
                        index: index_u32(index),
                    }),
                )
            })
            .collect()
    }
}
