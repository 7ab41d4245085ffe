use super::{Diagnostic, DiagnosticKind, Diagnostics, SourcePos};

fn pos(line: u32, column: u32) -> SourcePos {
    SourcePos::new("schema.strata", line, column)
}

#[test]
fn positions_order_by_file_then_line_then_column() {
    let mut positions = vec![pos(3, 1), pos(1, 9), pos(1, 2)];
    positions.sort();
    assert_eq!(positions, vec![pos(1, 2), pos(1, 9), pos(3, 1)]);
    assert!(SourcePos::new("a.strata", 9, 9) < SourcePos::new("b.strata", 1, 1));
}

#[test]
fn display_formats() {
    assert_eq!(pos(4, 7).to_string(), "schema.strata:4:7");
    assert_eq!(
        Diagnostic::message(pos(1, 1), "'Foo' is not defined.").to_string(),
        "schema.strata:1:1: 'Foo' is not defined."
    );
    assert_eq!(
        Diagnostic::expect(pos(2, 5), "integer").to_string(),
        "schema.strata:2:5: expected integer"
    );
}

#[test]
fn collection_accumulates_and_counts() {
    let mut diag = Diagnostics::new();
    assert!(diag.is_empty());

    diag.report(pos(1, 1), "first");
    diag.expect(pos(2, 1), "list");
    assert_eq!(diag.len(), 2);
    assert_eq!(diag.as_slice()[1].kind, DiagnosticKind::Expect);

    let mut other = Diagnostics::new();
    other.report(pos(3, 1), "second");
    diag.extend(other);
    assert_eq!(diag.len(), 3);
}

#[test]
fn to_strings_sorts_and_collapses_duplicates() {
    let mut diag = Diagnostics::new();
    diag.report(pos(5, 1), "later");
    diag.report(pos(2, 1), "earlier");
    diag.report(pos(5, 1), "later");

    assert_eq!(
        diag.to_strings(),
        vec![
            "schema.strata:2:1: earlier".to_string(),
            "schema.strata:5:1: later".to_string(),
        ]
    );
}

#[test]
fn collection_round_trips_through_iterators() {
    let diag: Diagnostics = vec![
        Diagnostic::message(pos(1, 1), "a"),
        Diagnostic::expect(pos(1, 2), "b"),
    ]
    .into_iter()
    .collect();
    assert_eq!(diag.len(), 2);

    let back: Vec<Diagnostic> = diag.clone().into_iter().collect();
    assert_eq!(back, diag.into_vec());
}
