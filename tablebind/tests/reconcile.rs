mod common;

use tablebind::reconcile::{assign_identities, reconcile};
use tablebind::RowItem;

use common::{contiguous, identities};

fn attached(n: usize) -> Vec<RowItem<usize>> {
    let items: Vec<_> = (0..n).map(RowItem::new).collect();
    assign_identities(&items);
    items
}

/// Build a new list from `old`: keep the listed old items in the listed
/// order, with `fresh` untagged items spliced in at the given positions.
fn rebuild(old: &[RowItem<usize>], keep: &[usize], fresh: &[usize]) -> Vec<RowItem<usize>> {
    let mut next: Vec<_> = keep.iter().map(|&i| old[i].clone()).collect();
    for &at in fresh {
        let at = at.min(next.len());
        next.insert(at, RowItem::new(100 + at));
    }
    next
}

fn check_partition(old_len: usize, next: &[RowItem<usize>]) {
    let ops = reconcile(old_len, next);

    let mut all: Vec<usize> = ops.deleted.iter().chain(&ops.kept).copied().collect();
    all.sort_unstable();
    assert_eq!(all, (0..old_len).collect::<Vec<_>>());
    assert!(ops.deleted.iter().all(|p| !ops.kept.contains(p)));

    // the widget ends up with one row per item
    assert_eq!(old_len - ops.deleted.len() + ops.inserted.len(), next.len());

    ops.assign_identities(next);
    assert_eq!(identities(next), contiguous(next.len()));
}

// =============================================================================
// Completeness
// =============================================================================

#[test]
fn test_partition_over_mixed_changes() {
    let cases: &[(usize, &[usize], &[usize])] = &[
        (0, &[], &[0, 0, 0]),
        (3, &[0, 1, 2], &[]),
        (3, &[], &[]),
        (4, &[1, 3], &[0, 5]),
        (5, &[0, 2, 4], &[1, 1]),
        (6, &[5], &[0]),
        (6, &[0, 1, 2, 3, 4, 5], &[6]),
        // reordered attached items
        (4, &[2, 0, 1, 3], &[]),
        (5, &[4, 3, 2, 1, 0], &[2]),
    ];
    for &(old_len, keep, fresh) in cases {
        let old = attached(old_len);
        let next = rebuild(&old, keep, fresh);
        check_partition(old_len, &next);
    }
}

#[test]
fn test_untagged_items_land_at_final_positions() {
    let old = attached(3);
    let next = rebuild(&old, &[0, 2], &[1, 3]);
    let ops = reconcile(3, &next);

    assert_eq!(ops.deleted, vec![1]);
    assert_eq!(ops.kept, vec![0, 2]);
    let positions: Vec<_> = ops.inserted.iter().map(|i| i.position).collect();
    assert_eq!(positions, vec![1, 3]);
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_reconcile_against_itself_is_noop() {
    for n in [0, 1, 7] {
        let items = attached(n);
        let ops = reconcile(n, &items);
        assert!(ops.deleted.is_empty());
        assert!(ops.inserted.is_empty());

        ops.assign_identities(&items);
        let again = reconcile(n, &items);
        assert!(again.is_noop());
    }
}
