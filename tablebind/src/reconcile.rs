//! Collection reconciliation.
//!
//! Compares the previous tagged snapshot (known only by its length, since
//! every attached item carries its old position as identity) against the
//! current collection and produces the widget operations that bring the two
//! back in line.
//!
//! The walk is a linear two-pointer merge, not a general sequence diff.
//! Attached items are expected to keep their relative order. An attached
//! item that moved is reported as a deletion of its old position plus an
//! insertion at its new one.

use crate::collection::RowItem;

/// An item to insert into the widget.
#[derive(Debug)]
pub struct Insertion<T> {
    /// Final position, which is also the item's new identity.
    pub position: usize,
    pub item: RowItem<T>,
}

/// Widget operations for one collection change.
#[derive(Debug)]
pub struct Reconciliation<T> {
    /// Old positions whose rows must be removed, ascending.
    pub deleted: Vec<usize>,
    /// Old positions whose rows survive, ascending.
    pub kept: Vec<usize>,
    /// Rows to add, ascending by final position.
    pub inserted: Vec<Insertion<T>>,
    /// Length of the new collection.
    pub len: usize,
}

impl<T> Reconciliation<T> {
    /// Returns `true` if the widget needs no row changes.
    pub fn is_noop(&self) -> bool {
        self.deleted.is_empty() && self.inserted.is_empty()
    }

    /// Tag every item with its position in `collection`.
    pub fn assign_identities(&self, collection: &[RowItem<T>]) {
        assign_identities(collection);
    }
}

/// Tag every item with its position.
pub fn assign_identities<T>(collection: &[RowItem<T>]) {
    for (index, item) in collection.iter().enumerate() {
        item.set_identity(Some(index));
    }
}

/// Diff a snapshot of `old_len` attached rows against `collection`.
///
/// Identities are not modified; see [`Reconciliation::assign_identities`].
pub fn reconcile<T>(old_len: usize, collection: &[RowItem<T>]) -> Reconciliation<T> {
    // (position in collection, old identity) of every tagged item, in order
    let existing: Vec<(usize, usize)> = collection
        .iter()
        .enumerate()
        .filter_map(|(position, item)| item.identity().map(|id| (position, id)))
        .collect();

    let mut deleted = Vec::new();
    let mut kept = Vec::new();
    let mut matched = vec![false; collection.len()];
    let mut cursor = 0;

    for old_position in 0..old_len {
        match existing.get(cursor) {
            Some(&(position, id)) if id == old_position => {
                kept.push(old_position);
                matched[position] = true;
                cursor += 1;
            }
            _ => deleted.push(old_position),
        }
    }

    // untagged items plus tagged ones the walk could not place
    let inserted = collection
        .iter()
        .enumerate()
        .filter(|(position, _)| !matched[*position])
        .map(|(position, item)| Insertion {
            position,
            item: item.clone(),
        })
        .collect();

    Reconciliation {
        deleted,
        kept,
        inserted,
        len: collection.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attached(n: usize) -> Vec<RowItem<usize>> {
        let items: Vec<_> = (0..n).map(RowItem::new).collect();
        assign_identities(&items);
        items
    }

    #[test]
    fn test_unchanged_snapshot_is_noop() {
        let items = attached(4);
        let ops = reconcile(4, &items);
        assert!(ops.is_noop());
        assert_eq!(ops.kept, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_removed_items_are_deleted_positions() {
        let mut items = attached(6);
        items.remove(5);
        items.remove(2);
        let ops = reconcile(6, &items);
        assert_eq!(ops.deleted, vec![2, 5]);
        assert!(ops.inserted.is_empty());
    }

    #[test]
    fn test_untagged_items_are_inserted_at_final_position() {
        let mut items = attached(2);
        items.insert(1, RowItem::new(10));
        items.push(RowItem::new(11));
        let ops = reconcile(2, &items);
        assert!(ops.deleted.is_empty());
        let positions: Vec<usize> = ops.inserted.iter().map(|i| i.position).collect();
        assert_eq!(positions, vec![1, 3]);
        assert_eq!(ops.inserted[0].item.get(), 10);
    }

    #[test]
    fn test_clearing_all_deletes_everything() {
        let ops = reconcile::<usize>(3, &[]);
        assert_eq!(ops.deleted, vec![0, 1, 2]);
        assert_eq!(ops.len, 0);
    }

    #[test]
    fn test_moved_item_becomes_delete_and_insert() {
        let items = attached(3);
        let reordered = vec![items[2].clone(), items[0].clone(), items[1].clone()];
        let ops = reconcile(3, &reordered);

        // the walk skips 0 and 1 looking for identity 2 first
        assert_eq!(ops.deleted, vec![0, 1]);
        assert_eq!(ops.kept, vec![2]);
        let positions: Vec<usize> = ops.inserted.iter().map(|i| i.position).collect();
        assert_eq!(positions, vec![1, 2]);
        assert_eq!(ops.kept.len() + ops.inserted.len(), reordered.len());
    }

    #[test]
    fn test_assign_identities_is_contiguous() {
        let mut items = attached(3);
        items.remove(0);
        items.push(RowItem::new(7));
        let ops = reconcile(3, &items);
        ops.assign_identities(&items);
        let ids: Vec<Option<usize>> = items.iter().map(RowItem::identity).collect();
        assert_eq!(ids, vec![Some(0), Some(1), Some(2)]);
    }
}
