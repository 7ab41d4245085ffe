//! Numbering and uniqueness validators.
//!
//! Pure scans that report into a [`Diagnostics`] sink. Duplicate detection
//! sorts and scans for adjacent equals; name-keyed maps elsewhere keep one
//! binding per name regardless.

use crate::diagnostics::{Diagnostics, SourcePos};

/// Check that numbers form `0, 1, 2, …` with no gaps or repeats, and that
/// every number stays within the ordinal bound.
///
/// `label` names the numbered kind in messages ("Enumerants", "Fields",
/// "Methods"). A repeat is reported at both positions; a gap is reported
/// once, naming the first missing number.
pub fn validate_numbering(
    label: &str,
    items: &[(u32, SourcePos)],
    max_ordinal: u16,
    errors: &mut Diagnostics,
) {
    let mut sorted: Vec<&(u32, SourcePos)> = items.iter().collect();
    sorted.sort_by_key(|item| item.0);

    for pair in sorted.windows(2) {
        if pair[0].0 == pair[1].0 {
            let message = format!(
                "Duplicate number {}.  {} must be numbered uniquely.",
                pair[0].0, label
            );
            errors.report(pair[0].1.clone(), message.clone());
            errors.report(pair[1].1.clone(), message);
        }
    }

    let mut expected = 0u32;
    for item in &sorted {
        if item.0 == expected {
            expected += 1;
        } else if item.0 > expected {
            errors.report(
                item.1.clone(),
                format!(
                    "{} must be numbered sequentially starting from zero; number {} is missing.",
                    label, expected
                ),
            );
            break;
        }
    }

    for item in items {
        if item.0 > max_ordinal as u32 {
            errors.report(
                item.1.clone(),
                format!(
                    "Number {} is too large; the maximum is {}.",
                    item.0, max_ordinal
                ),
            );
        }
    }
}

/// Report every sibling declaration whose name is already taken.
pub fn validate_unique_names(items: &[(String, SourcePos)], errors: &mut Diagnostics) {
    let mut sorted: Vec<&(String, SourcePos)> = items.iter().collect();
    sorted.sort();
    for pair in sorted.windows(2) {
        if pair[0].0 == pair[1].0 {
            errors.report(
                pair[1].1.clone(),
                format!("'{}' is already defined.", pair[0].0),
            );
        }
    }
}

/// In a union numbered N, at most one member may be numbered below N. Older
/// releases saw those fields as separate declarations, and more than one
/// cannot be retroactively unionized.
pub fn validate_union_retrofit(
    union_name: &str,
    union_number: u32,
    union_pos: &SourcePos,
    member_numbers: &[u32],
    errors: &mut Diagnostics,
) {
    let earlier = member_numbers
        .iter()
        .filter(|&&number| number < union_number)
        .count();
    if earlier > 1 {
        errors.report(
            union_pos.clone(),
            format!(
                "No more than one field in union '{}' may have a number lower than the \
                 union's number, as it is impossible to retroactively unionize fields \
                 that had been separate.",
                union_name
            ),
        );
    }
}
