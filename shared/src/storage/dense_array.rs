use std::slice::{Iter, IterMut};

/// Result of [`DenseArray::swap_remove`]: the removed value, and the old
/// position of the element that was moved into the vacated position (if any).
pub struct SwapRemoved<T> {
    pub value: T,
    pub moved_from: Option<usize>,
}

/// A contiguous, growable sequence with O(1) swap-removal.
///
/// Positions are not stable across removals: removing position `p` moves the
/// last element into `p`. Callers that keep external references to positions
/// use [`SwapRemoved::moved_from`] to fix them up.
pub struct DenseArray<T> {
    items: Vec<T>,
}

impl<T> Default for DenseArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DenseArray<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends a value, returning its position
    pub fn push(&mut self, value: T) -> usize {
        self.items.push(value);
        self.items.len() - 1
    }

    pub fn get(&self, position: usize) -> Option<&T> {
        self.items.get(position)
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut T> {
        self.items.get_mut(position)
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// Removes the value at `position` by moving the last value into its place.
    ///
    /// # Panics
    /// Panics if `position` is out of bounds.
    pub fn swap_remove(&mut self, position: usize) -> SwapRemoved<T> {
        let last = self.items.len() - 1;
        let value = self.items.swap_remove(position);
        let moved_from = if position != last { Some(last) } else { None };

        SwapRemoved { value, moved_from }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
