use elk_element::{Element, ElementId, ElementKind, ExportConflictPolicy, ExportEntry};
use elk_ir::{Combinator, Name};
use pretty_assertions::assert_eq;

use super::*;

struct Fixture {
    store: ElementStore,
    interner: StringInterner,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            store: ElementStore::new(),
            interner: StringInterner::new(),
        }
    }

    fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    fn library(&mut self, uri: &str, classes: &[&str]) -> LibraryId {
        let uri = self.name(uri);
        let Some(lib) = self.store.add_library(uri) else {
            panic!("duplicate library in fixture");
        };
        for class in classes {
            let name = self.name(class);
            let id = self
                .store
                .alloc(Element::new(name, ElementKind::Class, lib, None));
            self.store.library_mut(lib).export_scope.declare(name, id);
        }
        lib
    }

    fn export(&mut self, exporter: LibraryId, exportee: LibraryId, combinators: &[Combinator]) {
        let uri = self.store.library(exportee).uri;
        self.store.library_mut(exporter).exports.push(ExportEntry {
            uri,
            target: Some(exportee),
            filters: NameFilter::from_combinators(combinators),
        });
    }

    fn names(&self, lib: LibraryId) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .store
            .library(lib)
            .export_scope
            .iter()
            .map(|(name, _)| self.interner.lookup(name))
            .collect();
        names.sort_unstable();
        names
    }

    fn element(&self, lib: LibraryId, name: &str) -> Option<ElementId> {
        self.store.library(lib).export_scope.get(self.name(name))
    }

    fn propagate(&mut self, batch: &[LibraryId], config: &LinkConfig) -> Result<u32, LinkError> {
        propagate_export_scopes(&mut self.store, batch, &self.interner, config)
    }
}

#[test]
fn mutual_exports_share_both_names() {
    let mut f = Fixture::new();
    let a = f.library("a.dart", &["Foo"]);
    let b = f.library("b.dart", &["Bar"]);
    f.export(a, b, &[]);
    f.export(b, a, &[]);

    let rounds = f.propagate(&[a, b], &LinkConfig::default());

    assert!(rounds.is_ok());
    assert_eq!(f.names(a), vec!["Bar", "Foo"]);
    assert_eq!(f.names(b), vec!["Bar", "Foo"]);
}

#[test]
fn chain_is_closed_transitively() {
    let mut f = Fixture::new();
    let a = f.library("a.dart", &["A"]);
    let b = f.library("b.dart", &["B"]);
    let c = f.library("c.dart", &["C"]);
    let d = f.library("d.dart", &["D"]);
    f.export(a, b, &[]);
    f.export(b, c, &[]);
    f.export(c, d, &[]);

    assert!(f.propagate(&[a, b, c, d], &LinkConfig::default()).is_ok());

    assert_eq!(f.names(a), vec!["A", "B", "C", "D"]);
    assert_eq!(f.names(b), vec!["B", "C", "D"]);
    assert_eq!(f.names(d), vec!["D"]);
}

#[test]
fn diamond_exports_same_symbol_once() {
    let mut f = Fixture::new();
    let base = f.library("base.dart", &["Base"]);
    let left = f.library("left.dart", &[]);
    let right = f.library("right.dart", &[]);
    let top = f.library("top.dart", &[]);
    f.export(left, base, &[]);
    f.export(right, base, &[]);
    f.export(top, left, &[]);
    f.export(top, right, &[]);

    assert!(f
        .propagate(&[base, left, right, top], &LinkConfig::default())
        .is_ok());

    assert_eq!(f.names(top), vec!["Base"]);
    assert_eq!(f.element(top, "Base"), f.element(base, "Base"));
}

#[test]
fn show_and_hide_filter_pushes() {
    let mut f = Fixture::new();
    let lib = f.library("lib.dart", &["A", "B", "C"]);
    let shown = f.library("shown.dart", &[]);
    let hidden = f.library("hidden.dart", &[]);
    let a = f.name("A");
    let b = f.name("B");
    f.export(shown, lib, &[Combinator::Show(vec![a])]);
    f.export(hidden, lib, &[Combinator::Hide(vec![a, b])]);

    assert!(f
        .propagate(&[lib, shown, hidden], &LinkConfig::default())
        .is_ok());

    assert_eq!(f.names(shown), vec!["A"]);
    assert_eq!(f.names(hidden), vec!["C"]);
}

#[test]
fn private_names_are_never_exported() {
    let mut f = Fixture::new();
    let lib = f.library("lib.dart", &["Public", "_Private"]);
    let user = f.library("user.dart", &[]);
    f.export(user, lib, &[]);

    assert!(f.propagate(&[lib, user], &LinkConfig::default()).is_ok());

    assert_eq!(f.names(user), vec!["Public"]);
}

#[test]
fn declared_names_beat_exported_names() {
    let mut f = Fixture::new();
    let lib = f.library("lib.dart", &["Shared"]);
    let user = f.library("user.dart", &["Shared"]);
    f.export(user, lib, &[]);
    let declared = f.element(user, "Shared");

    assert!(f.propagate(&[lib, user], &LinkConfig::default()).is_ok());

    assert_eq!(f.element(user, "Shared"), declared);
}

#[test]
fn conflict_policy_decides_between_unrelated_exportees() {
    for (policy, winner) in [
        (ExportConflictPolicy::LastWriterWins, "two.dart"),
        (ExportConflictPolicy::FirstWriterWins, "one.dart"),
    ] {
        let mut f = Fixture::new();
        let one = f.library("one.dart", &["Thing"]);
        let two = f.library("two.dart", &["Thing"]);
        let top = f.library("top.dart", &[]);
        f.export(top, one, &[]);
        f.export(top, two, &[]);
        let config = LinkConfig::default().with_export_conflict_policy(policy);

        assert!(f.propagate(&[one, two, top], &config).is_ok());

        let expected = if winner == "one.dart" { one } else { two };
        assert_eq!(f.element(top, "Thing"), f.element(expected, "Thing"));
    }
}

#[test]
fn linked_exportees_are_read_but_not_written() {
    let mut f = Fixture::new();
    let linked = f.library("linked.dart", &["Old"]);
    let a = f.library("a.dart", &["New"]);
    f.export(a, linked, &[]);
    f.export(linked, a, &[]);

    assert!(f.propagate(&[a], &LinkConfig::default()).is_ok());

    assert_eq!(f.names(a), vec!["New", "Old"]);
    assert_eq!(f.names(linked), vec!["Old"]);
}

#[test]
fn repeated_propagation_changes_nothing() {
    let mut f = Fixture::new();
    let a = f.library("a.dart", &["A"]);
    let b = f.library("b.dart", &["B"]);
    let c = f.library("c.dart", &["C"]);
    f.export(a, b, &[]);
    f.export(b, c, &[]);
    f.export(c, a, &[]);
    assert!(f.propagate(&[a, b, c], &LinkConfig::default()).is_ok());
    let before: Vec<_> = [a, b, c]
        .iter()
        .map(|&lib| f.store.library(lib).export_scope.clone())
        .collect();

    assert!(f.propagate(&[a, b, c], &LinkConfig::default()).is_ok());

    let after: Vec<_> = [a, b, c]
        .iter()
        .map(|&lib| f.store.library(lib).export_scope.clone())
        .collect();
    assert_eq!(before, after);
    assert_eq!(f.names(b), vec!["A", "B", "C"]);
}

#[test]
fn round_limit_reports_divergence() {
    let mut f = Fixture::new();
    let a = f.library("a.dart", &["A"]);
    let b = f.library("b.dart", &["B"]);
    f.export(a, b, &[]);
    f.export(b, a, &[]);
    let config = LinkConfig::default().with_max_export_rounds(1);

    // The first round adds names, so a second round is needed to observe
    // convergence.
    assert_eq!(
        f.propagate(&[a, b], &config),
        Err(LinkError::ExportsDiverged { rounds: 1 })
    );
}

#[test]
fn pushes_report_whether_an_exporter_changed() {
    let mut f = Fixture::new();
    let one = f.library("one.dart", &["Thing"]);
    let two = f.library("two.dart", &["Thing"]);
    let top = f.library("top.dart", &[]);
    let mut edges = ExportEdges::default();
    edges.insert(one, vec![(top, Vec::new())]);
    edges.insert(two, vec![(top, Vec::new())]);
    let config = LinkConfig::default();
    let push = |f: &mut Fixture, exportee: LibraryId| {
        push_into_exporters(&mut f.store, &edges, exportee, &f.interner, &config)
    };

    // Added, then the same symbol again.
    assert!(push(&mut f, one));
    assert!(!push(&mut f, one));
    // Replaced by a differing symbol under the default policy.
    assert!(push(&mut f, two));
    assert!(!push(&mut f, two));
    // No exporters.
    assert!(!push(&mut f, top));
    assert_eq!(f.element(top, "Thing"), f.element(two, "Thing"));
}

#[test]
fn mutual_exports_settle_after_one_quiet_round() {
    let mut f = Fixture::new();
    let a = f.library("a.dart", &["Foo"]);
    let b = f.library("b.dart", &["Bar"]);
    f.export(a, b, &[]);
    f.export(b, a, &[]);

    // The first round adds names; the second writes nothing new.
    assert_eq!(f.propagate(&[a, b], &LinkConfig::default()), Ok(2));
    assert_eq!(f.propagate(&[a, b], &LinkConfig::default()), Ok(1));
}
