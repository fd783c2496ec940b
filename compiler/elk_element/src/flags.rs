//! Element modifier and link-state flags.

use bitflags::bitflags;

bitflags! {
    /// Modifiers copied from syntax plus facts computed by link passes.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct ElementFlags: u32 {
        // === Declaration Modifiers (bits 0-11) ===

        const ABSTRACT = 1 << 0;
        /// `macro class`
        const MACRO = 1 << 1;
        const STATIC = 1 << 2;
        const CONST = 1 << 3;
        const FINAL = 1 << 4;
        const FACTORY = 1 << 5;
        /// `this.name` constructor parameter.
        const FIELD_FORMAL = 1 << 6;
        /// Constant of an enum declaration.
        const ENUM_CONSTANT = 1 << 7;

        // === Provenance (bits 12-15) ===

        /// Created by the linker rather than declared in source.
        const SYNTHETIC = 1 << 12;
        /// Declared in a macro-generated augmentation unit.
        const AUGMENTATION = 1 << 13;

        // === Computed By Link Passes (bits 16-31) ===

        /// Type was not written and must be inferred.
        const HAS_IMPLICIT_TYPE = 1 << 16;
        /// Return type was not written and must be inferred.
        const HAS_IMPLICIT_RETURN_TYPE = 1 << 17;
        /// Type alias that refers to itself through other aliases.
        const SELF_REFERENTIAL = 1 << 18;
        /// Generic declaration whose raw form instantiates to its bounds.
        const SIMPLY_BOUNDED = 1 << 19;
        /// Top-level inference hit a dependency cycle through this element.
        const INFERENCE_CYCLE = 1 << 20;
    }
}
