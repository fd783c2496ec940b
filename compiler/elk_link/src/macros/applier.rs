//! Applying type-phase macros to the classes of one library.

use std::fmt::Write as _;

use elk_element::{
    ElementFlags, ElementId, ElementKind, ElementStore, LibraryId, MacroApplicationError,
    NameFilter,
};
use elk_ir::{
    Annotation, ClassDecl, Declaration, ExprArena, Member, Name, ParsedUnit, StringInterner,
    TypeAnnotation,
};
use rustc_hash::FxHashSet;

use super::{
    evaluate_arguments, AugmentationParser, ClassIntrospection, FieldView, MacroArguments,
    MacroExecution, MacroExecutor, MacroGeneratedUnit, MacroRequest,
    MacroResult, TypeAnnotationView, TypeParameterView,
};
use crate::builder::build_augmentation;
use crate::linker::{report, Linker};
use crate::names::WellKnownNames;
use crate::node_map::NodeRef;
use crate::LibraryErrorKind;

/// Progress of one annotation.
enum ApplicationState {
    Unevaluated,
    ArgumentsEvaluated(MacroArguments),
    Executed(Result<MacroResult, MacroApplicationError>),
}

/// An annotation on a class that resolved to a macro.
struct Application<'a> {
    annotation_index: u32,
    annotation: &'a Annotation,
    macro_class: ElementId,
    state: ApplicationState,
}

impl Application<'_> {
    /// Evaluate the arguments of an unevaluated application. A rejected
    /// argument finishes the application; its error is returned.
    fn evaluate(
        &mut self,
        arena: &ExprArena,
        interner: &StringInterner,
    ) -> Option<&MacroApplicationError> {
        if !matches!(self.state, ApplicationState::Unevaluated) {
            return None;
        }
        let args = self.annotation.arguments.as_deref().unwrap_or_default();
        self.state = match evaluate_arguments(arena, interner, args) {
            Ok(arguments) => ApplicationState::ArgumentsEvaluated(arguments),
            Err(err) => ApplicationState::Executed(Err(MacroApplicationError::Argument {
                annotation_index: self.annotation_index,
                argument_index: err.argument_index,
                message: err.message,
            })),
        };
        match &self.state {
            ApplicationState::Executed(Err(error)) => Some(error),
            _ => None,
        }
    }
}

/// A class of the library with its macro applications.
struct Target<'a> {
    class: ElementId,
    name: Name,
    arena: &'a ExprArena,
    introspection: ClassIntrospection,
    applications: Vec<Application<'a>>,
}

/// Run every macro applied to a class of library `lib` and build the merged
/// output into the library.
///
/// Returns the generated unit when any macro produced code. Argument and
/// execution failures are recorded on the class; they never fail the link.
#[tracing::instrument(level = "debug", skip_all, fields(
    library = linker.interner.lookup(linker.builders[lib].uri),
))]
pub(crate) async fn execute_macro_types_phase<E: MacroExecutor>(
    linker: &mut Linker<'_>,
    lib: usize,
    executor: &E,
    parser: Option<&dyn AugmentationParser>,
) -> Option<MacroGeneratedUnit> {
    let interner = linker.interner;
    let library_uri = linker.builders[lib].uri;
    let library_name = interner.lookup(library_uri).to_string();

    // Syntax is cloned out so the store stays writable across awaits.
    let units = linker.builders[lib].units.clone();
    let mut targets = collect_targets(linker, lib, &units, &library_name);
    if targets.is_empty() {
        return None;
    }

    let mut library_fragments = Vec::new();
    let mut class_blocks: Vec<(Name, Vec<String>)> = Vec::new();
    for target in &mut targets {
        let mut class_fragments = Vec::new();
        for application in &mut target.applications {
            let annotation_index = application.annotation_index;
            if let Some(error) = application.evaluate(target.arena, interner) {
                tracing::warn!(
                    class = interner.lookup(target.name),
                    annotation_index,
                    ?error,
                    "macro argument rejected"
                );
                record(linker.store, target.class, error.clone());
                continue;
            }

            let state = std::mem::replace(&mut application.state, ApplicationState::Unevaluated);
            let ApplicationState::ArgumentsEvaluated(arguments) = state else {
                application.state = state;
                continue;
            };
            let macro_element = linker.store.get(application.macro_class);
            let request = MacroRequest {
                macro_library: interner
                    .lookup(linker.store.library(macro_element.library).uri)
                    .to_string(),
                macro_class: interner.lookup(macro_element.name).to_string(),
                constructor: application
                    .annotation
                    .constructor
                    .map(|c| interner.lookup(c).to_string())
                    .unwrap_or_default(),
                arguments,
                annotation_index,
                target: target.introspection.clone(),
            };
            tracing::debug!(
                class = %request.target.name,
                macro_class = %request.macro_class,
                "executing macro"
            );
            let outcome = match executor.execute_types_phase(&request).await {
                MacroExecution::Applied(result) => Ok(result),
                MacroExecution::Failed(err) => Err(MacroApplicationError::Execution {
                    annotation_index,
                    message: err.message,
                    stack_trace: err.stack_trace,
                }),
            };

            match &outcome {
                Ok(result) => {
                    library_fragments.extend(result.library_fragments.iter().cloned());
                    class_fragments.extend(result.class_fragments.iter().cloned());
                }
                Err(error) => {
                    tracing::warn!(
                        class = interner.lookup(target.name),
                        annotation_index,
                        ?error,
                        "macro failed"
                    );
                    record(linker.store, target.class, error.clone());
                }
            }
            application.state = ApplicationState::Executed(outcome);
        }
        if !class_fragments.is_empty() {
            class_blocks.push((target.name, class_fragments));
        }
    }

    let (executed, failed) = targets
        .iter()
        .flat_map(|t| &t.applications)
        .fold((0, 0), |(ok, err), a| match a.state {
            ApplicationState::Executed(Ok(_)) => (ok + 1, err),
            ApplicationState::Executed(Err(_)) => (ok, err + 1),
            _ => (ok, err),
        });
    tracing::debug!(executed, failed, "macro applications");

    if library_fragments.is_empty() && class_blocks.is_empty() {
        return None;
    }
    let source = merge(&library_name, &library_fragments, &class_blocks, interner);
    let uri = linker.config.augmentation_uri(&library_name);

    if let Some(parser) = parser {
        match parser.parse(&uri, &source) {
            Ok(unit) => {
                let parsed = ParsedUnit {
                    uri: interner.intern(&uri),
                    text: Some(source.clone()),
                    is_synthetic: true,
                    unit,
                };
                build_augmentation(linker, lib, parsed);
            }
            Err(message) => report(
                &mut linker.errors,
                interner,
                library_uri,
                LibraryErrorKind::MalformedDeclaration,
                format!("macro-generated unit '{uri}' does not parse: {message}"),
            ),
        }
    }

    Some(MacroGeneratedUnit {
        library: library_name,
        uri,
        source,
    })
}

fn record(store: &mut ElementStore, class: ElementId, error: MacroApplicationError) {
    if let Some(data) = store.get_mut(class).interface_mut() {
        data.macro_errors.push(error);
    }
}

/// Classes of the library's units, in declaration order, with the
/// annotations that resolve to macros.
fn collect_targets<'a>(
    linker: &Linker<'_>,
    lib: usize,
    units: &'a [ParsedUnit],
    library_name: &str,
) -> Vec<Target<'a>> {
    let store = &*linker.store;
    let library = linker.builders[lib].id;
    let mut targets = Vec::new();
    for (unit_index, unit) in units.iter().enumerate() {
        for (decl_index, decl) in unit.unit.declarations.iter().enumerate() {
            let Declaration::Class(class) = decl else {
                continue;
            };
            let node = NodeRef::declaration(lib, unit_index, decl_index);
            let Some(element) = linker.node_map.element(node) else {
                continue;
            };
            let applications: Vec<Application<'a>> = class
                .metadata
                .iter()
                .enumerate()
                .filter(|(_, annotation)| annotation.arguments.is_some())
                .filter_map(|(index, annotation)| {
                    let macro_class =
                        resolve_macro(store, &linker.names, library, annotation)?;
                    Some(Application {
                        annotation_index: u32::try_from(index).unwrap_or(u32::MAX),
                        annotation,
                        macro_class,
                        state: ApplicationState::Unevaluated,
                    })
                })
                .collect();
            if applications.is_empty() {
                continue;
            }
            targets.push(Target {
                class: element,
                name: class.name,
                arena: &unit.unit.arena,
                introspection: introspect(linker.interner, library_name, class),
                applications,
            });
        }
    }
    targets
}

/// The macro class an annotation names, looked up only in imported
/// libraries that are already linked.
fn resolve_macro(
    store: &ElementStore,
    names: &WellKnownNames,
    library: LibraryId,
    annotation: &Annotation,
) -> Option<ElementId> {
    let candidate = store
        .library(library)
        .imports
        .iter()
        .filter(|import| import.prefix == annotation.prefix)
        .filter_map(|import| {
            let target = store.library(import.target?);
            target.is_linked().then_some((target, import))
        })
        .find_map(|(target, import)| {
            if !NameFilter::all_allow(&import.filters, annotation.name) {
                return None;
            }
            target.export_scope.get(annotation.name)
        })?;
    let element = store.get(candidate);
    let is_macro = element.kind == ElementKind::Class
        && element.flags.contains(ElementFlags::MACRO)
        && implements_class_types_macro(store, names, candidate);
    is_macro.then_some(candidate)
}

fn implements_class_types_macro(store: &ElementStore, names: &WellKnownNames, class: ElementId) -> bool {
    let mut seen = FxHashSet::default();
    let mut stack = vec![class];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let element = store.get(id);
        if id != class && element.name == names.class_types_macro {
            return true;
        }
        let Some(data) = element.interface() else {
            continue;
        };
        stack.extend(
            data.supertype
                .iter()
                .chain(&data.interfaces)
                .chain(&data.mixins)
                .filter_map(elk_element::LinkedType::interface_element),
        );
    }
    false
}

fn introspect(interner: &StringInterner, library: &str, class: &ClassDecl) -> ClassIntrospection {
    let view = |ty: &TypeAnnotation| type_view(interner, ty);
    ClassIntrospection {
        library: library.to_string(),
        name: interner.lookup(class.name).to_string(),
        type_params: class
            .type_params
            .iter()
            .map(|param| TypeParameterView {
                name: interner.lookup(param.name).to_string(),
                bound: param.bound.as_ref().map(view),
            })
            .collect(),
        superclass: class.superclass.as_ref().map(view),
        interfaces: class.interfaces.iter().map(view).collect(),
        mixins: class.mixins.iter().map(view).collect(),
        fields: class
            .members
            .iter()
            .filter_map(|member| match member {
                Member::Field(field) => Some(FieldView {
                    name: interner.lookup(field.name).to_string(),
                    ty: field.ty.as_ref().map(view),
                    is_static: field.is_static,
                    is_final: field.is_final,
                    is_const: field.is_const,
                }),
                Member::Method(_) | Member::Constructor(_) => None,
            })
            .collect(),
        is_abstract: class.modifiers.is_abstract,
    }
}

fn type_view(interner: &StringInterner, ty: &TypeAnnotation) -> TypeAnnotationView {
    match ty {
        TypeAnnotation::Named {
            prefix,
            name,
            args,
            nullable,
            ..
        } => TypeAnnotationView::Named {
            prefix: prefix.map(|p| interner.lookup(p).to_string()),
            name: interner.lookup(*name).to_string(),
            args: args.iter().map(|arg| type_view(interner, arg)).collect(),
            nullable: *nullable,
        },
        TypeAnnotation::Function {
            return_type,
            params,
            nullable,
            ..
        } => TypeAnnotationView::Function {
            return_type: Box::new(type_view(interner, return_type)),
            params: params.iter().map(|p| type_view(interner, p)).collect(),
            nullable: *nullable,
        },
    }
}

/// One augmentation source: library fragments in order, then one
/// `augment class` block per class.
fn merge(
    library: &str,
    library_fragments: &[String],
    class_blocks: &[(Name, Vec<String>)],
    interner: &StringInterner,
) -> String {
    let mut source = format!("augment library '{library}';\n");
    for fragment in library_fragments {
        source.push('\n');
        source.push_str(fragment);
        source.push('\n');
    }
    for (class, fragments) in class_blocks {
        let _ = write!(source, "\naugment class {} {{\n", interner.lookup(*class));
        for fragment in fragments {
            for line in fragment.lines() {
                let _ = writeln!(source, "  {line}");
            }
        }
        source.push_str("}\n");
    }
    source
}

#[cfg(test)]
mod tests;
