//! Host-owned bound collection and its items.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::notify::ChangeSender;

#[derive(Debug)]
struct ItemInner<T> {
    value: RwLock<T>,
    identity: RwLock<Option<usize>>,
}

/// Shared handle to one item of a bound collection.
///
/// Clones refer to the same item; equality between handles is reference
/// equality ([`RowItem::same`]). The identity tag is the item's position in
/// the table it is currently attached to, or `None` when detached.
#[derive(Debug)]
pub struct RowItem<T> {
    inner: Arc<ItemInner<T>>,
}

impl<T> Clone for RowItem<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> RowItem<T> {
    /// Wrap a value as a fresh, untagged item.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(ItemInner {
                value: RwLock::new(value),
                identity: RwLock::new(None),
            }),
        }
    }

    /// Current identity tag.
    pub fn identity(&self) -> Option<usize> {
        *self
            .inner
            .identity
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn set_identity(&self, identity: Option<usize>) {
        *self
            .inner
            .identity
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = identity;
    }

    /// Drop the identity tag.
    ///
    /// Required before moving an item into another table by hand; the
    /// controller's own add/remove operations do it automatically.
    pub fn clear_identity(&self) {
        self.set_identity(None);
    }

    /// Returns `true` if both handles refer to the same item.
    pub fn same(&self, other: &RowItem<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Address used for reference-equality sets.
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    /// Read the value through a closure.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self
            .inner
            .value
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }

    /// Mutate the value in place.
    ///
    /// The table is not told about the change; call
    /// [`TableController::update_row`](crate::TableController::update_row).
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut guard = self
            .inner
            .value
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard);
    }

    /// Get a clone of the value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }
}

/// Reactive ordered collection bound to a table.
///
/// Every mutation bumps a version counter which the controller's content
/// watch compares against, and notifies the digest driver if one is installed.
/// Clones share the same underlying vector.
#[derive(Debug)]
pub struct Collection<T> {
    items: Arc<RwLock<Vec<RowItem<T>>>>,
    version: Arc<AtomicU64>,
    notifier: Arc<Mutex<Option<ChangeSender>>>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            version: Arc::clone(&self.version),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Collection<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            version: Arc::new(AtomicU64::new(0)),
            notifier: Arc::new(Mutex::new(None)),
        }
    }

    /// Build a collection wrapping each value in a fresh item.
    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        Self::from_items(values.into_iter().map(RowItem::new))
    }

    pub fn from_items(items: impl IntoIterator<Item = RowItem<T>>) -> Self {
        let collection = Self::new();
        *collection.write() = items.into_iter().collect();
        collection
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<RowItem<T>>> {
        self.items
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<RowItem<T>>> {
        self.items
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Notify the digest driver on every later mutation, from any clone.
    pub fn install_notifier(&self, sender: ChangeSender) {
        *self
            .notifier
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(sender);
    }

    /// Returns `true` if both handles share the same vector.
    pub fn same(&self, other: &Collection<T>) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    /// Monotonic change counter.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Clone of the current item handles.
    pub fn snapshot(&self) -> Vec<RowItem<T>> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<RowItem<T>> {
        self.read().get(index).cloned()
    }

    /// Position of `item` by reference equality.
    pub fn position(&self, item: &RowItem<T>) -> Option<usize> {
        self.read().iter().position(|i| i.same(item))
    }

    /// Mutate the vector and mark the collection changed.
    pub fn update<R>(&self, f: impl FnOnce(&mut Vec<RowItem<T>>) -> R) -> R {
        let result = f(&mut self.write());
        self.touch();
        result
    }

    pub fn push(&self, item: RowItem<T>) {
        self.update(|items| items.push(item));
    }

    pub fn insert(&self, index: usize, item: RowItem<T>) {
        self.update(|items| items.insert(index, item));
    }

    /// Remove `item` by reference equality, returning whether it was present.
    pub fn remove_item(&self, item: &RowItem<T>) -> bool {
        let removed = {
            let mut items = self.write();
            match items.iter().position(|i| i.same(item)) {
                Some(index) => {
                    items.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.touch();
        }
        removed
    }

    fn touch(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
        let notifier = self
            .notifier
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(sender) = notifier.as_ref() {
            sender.notify();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_equality_is_by_reference() {
        let a = RowItem::new(1);
        let b = RowItem::new(1);
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
    }

    #[test]
    fn test_mutations_bump_version() {
        let collection = Collection::from_values([1, 2]);
        let before = collection.version();
        collection.push(RowItem::new(3));
        assert_eq!(collection.version(), before + 1);
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn test_remove_missing_item_is_a_noop() {
        let collection = Collection::from_values([1, 2]);
        let before = collection.version();
        assert!(!collection.remove_item(&RowItem::new(1)));
        assert_eq!(collection.version(), before);
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_clones_share_items() {
        let a = Collection::from_values(["x"]);
        let b = a.clone();
        b.push(RowItem::new("y"));
        assert_eq!(a.len(), 2);
        assert!(a.same(&b));
        assert!(!a.same(&Collection::from_values(["x"])));
    }
}
