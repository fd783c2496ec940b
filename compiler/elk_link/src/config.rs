//! Link configuration.

use elk_element::ExportConflictPolicy;

/// Configuration for a link session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkConfig {
    /// Which symbol wins when two re-exports bind the same name.
    pub export_conflict_policy: ExportConflictPolicy,
    /// Propagation rounds allowed before the batch is declared divergent.
    pub max_export_rounds: u32,
    /// Run the macro type phase. When off, macro annotations are ignored.
    pub run_macros: bool,
    /// Replaces a trailing `.dart` in the library URI to form the URI of the
    /// macro-generated augmentation unit.
    pub augmentation_suffix: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            export_conflict_policy: ExportConflictPolicy::default(),
            max_export_rounds: 1000,
            run_macros: true,
            augmentation_suffix: ".macro.dart".to_string(),
        }
    }
}

impl LinkConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_export_conflict_policy(mut self, policy: ExportConflictPolicy) -> Self {
        self.export_conflict_policy = policy;
        self
    }

    #[must_use]
    pub fn with_max_export_rounds(mut self, rounds: u32) -> Self {
        self.max_export_rounds = rounds;
        self
    }

    #[must_use]
    pub fn with_macros(mut self, run_macros: bool) -> Self {
        self.run_macros = run_macros;
        self
    }

    #[must_use]
    pub fn with_augmentation_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.augmentation_suffix = suffix.into();
        self
    }

    /// URI of the augmentation unit generated for `library_uri`.
    pub fn augmentation_uri(&self, library_uri: &str) -> String {
        match library_uri.strip_suffix(".dart") {
            Some(stem) => format!("{stem}{}", self.augmentation_suffix),
            None => format!("{library_uri}{}", self.augmentation_suffix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn augmentation_uri_replaces_dart_extension() {
        let config = LinkConfig::default();
        assert_eq!(
            config.augmentation_uri("package:app/c.dart"),
            "package:app/c.macro.dart"
        );
        assert_eq!(config.augmentation_uri("memory:c"), "memory:c.macro.dart");
    }

    #[test]
    fn builder_methods_override_defaults() {
        let config = LinkConfig::new()
            .with_export_conflict_policy(ExportConflictPolicy::FirstWriterWins)
            .with_max_export_rounds(3)
            .with_macros(false)
            .with_augmentation_suffix(".g.dart");
        assert_eq!(
            config.export_conflict_policy,
            ExportConflictPolicy::FirstWriterWins
        );
        assert_eq!(config.max_export_rounds, 3);
        assert!(!config.run_macros);
        assert_eq!(config.augmentation_uri("a.dart"), "a.g.dart");
    }
}
