//! Pre-interned names the linker compares against.

use elk_ir::{Name, StringInterner};

/// Names interned once per session so passes compare `Name` values instead
/// of looking strings up.
pub(crate) struct WellKnownNames {
    // Libraries
    pub dart_core: Name,

    // Builtin types that are not declared by any library
    pub dynamic: Name,
    pub void: Name,
    pub never: Name,

    // dart:core
    pub object: Name,
    pub bool: Name,
    pub num: Name,
    pub int: Name,
    pub double: Name,
    pub string: Name,
    pub list: Name,
    pub set: Name,
    pub map: Name,
    pub enum_: Name,

    // Macros
    pub class_types_macro: Name,

    // Synthetic members
    pub values: Name,
    pub index: Name,
}

impl WellKnownNames {
    pub fn new(interner: &StringInterner) -> Self {
        Self {
            dart_core: interner.intern("dart:core"),
            dynamic: interner.intern("dynamic"),
            void: interner.intern("void"),
            never: interner.intern("Never"),
            object: interner.intern("Object"),
            bool: interner.intern("bool"),
            num: interner.intern("num"),
            int: interner.intern("int"),
            double: interner.intern("double"),
            string: interner.intern("String"),
            list: interner.intern("List"),
            set: interner.intern("Set"),
            map: interner.intern("Map"),
            enum_: interner.intern("Enum"),
            class_types_macro: interner.intern("ClassTypesMacro"),
            values: interner.intern("values"),
            index: interner.intern("index"),
        }
    }
}

/// Library-private names start with `_`.
pub(crate) fn is_private(interner: &StringInterner, name: Name) -> bool {
    interner.lookup(name).starts_with('_')
}
