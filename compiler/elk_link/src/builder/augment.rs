//! Building a macro-generated augmentation unit into its library.

use elk_element::{ElementFlags, ElementKind, UnitEntry};
use elk_ir::{Declaration, ParsedUnit};

use super::Declarer;
use crate::linker::Linker;
use crate::node_map::NodeRef;
use crate::LibraryErrorKind;

/// Append `unit` to library `lib` and create its elements.
///
/// New top-level declarations become library elements. `augment class X`
/// declarations add their members to the existing class `X`.
#[tracing::instrument(level = "debug", skip_all, fields(
    library = linker.interner.lookup(linker.builders[lib].uri),
    declarations = unit.unit.declarations.len(),
))]
pub(crate) fn build_augmentation(linker: &mut Linker<'_>, lib: usize, unit: ParsedUnit) {
    let store = &mut *linker.store;
    let builder = &mut linker.builders[lib];
    let unit_index = builder.units.len();

    store.library_mut(builder.id).units.push(UnitEntry {
        uri: unit.uri,
        is_synthetic: true,
        is_augmentation: true,
    });
    builder.units.push(unit);

    let mut declarer = Declarer {
        store,
        node_map: &mut linker.node_map,
        errors: &mut linker.errors,
        interner: linker.interner,
        library: builder.id,
        library_uri: builder.uri,
        extra_flags: ElementFlags::AUGMENTATION,
    };
    let declarations = &builder.units[unit_index].unit.declarations;
    for (decl_index, decl) in declarations.iter().enumerate() {
        let node = NodeRef::declaration(builder.index, unit_index, decl_index);
        match decl {
            Declaration::Class(class) if class.modifiers.is_augmentation => {
                let target = builder
                    .locals
                    .get(&class.name)
                    .copied()
                    .filter(|&id| declarer.store.get(id).kind == ElementKind::Class);
                match target {
                    Some(target) => declarer.declare_members(node, target, &class.members, true),
                    None => declarer.error(
                        LibraryErrorKind::UnknownAugmentationTarget,
                        format!(
                            "no class '{}' to augment",
                            declarer.interner.lookup(class.name)
                        ),
                    ),
                }
            }
            _ => {
                if let Some(element) = declarer.declare_top_level(node, decl) {
                    declarer.register_top_level(&mut builder.locals, element, decl.name());
                }
            }
        }
    }
}
