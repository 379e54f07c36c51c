use std::collections::{btree_set, BTreeSet};

use crate::{
    serde::{Serde, SerdeErr, StreamRead, StreamWrite},
    world::replicate::SyncMode,
};

/// An ordered set that remembers what was added and removed since the last
/// [`flush`](DeltaSet::flush).
///
/// In `Full` mode the whole membership is written as an array. In `Delta`
/// mode an object `{ removed, added }` is written; applying removals before
/// additions reproduces the writer's final membership. Removing a member that
/// was added since the last flush cancels the pending addition.
///
/// Reads replace or patch the membership without recording any deltas, so a
/// mirror never re-broadcasts what it received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeltaSet<T: Ord + Copy> {
    members: BTreeSet<T>,
    added: Vec<T>,
    removed: Vec<T>,
}

impl<T: Ord + Copy> Default for DeltaSet<T> {
    fn default() -> Self {
        Self {
            members: BTreeSet::new(),
            added: Vec::new(),
            removed: Vec::new(),
        }
    }
}

impl<T: Ord + Copy> DeltaSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the value was already a member
    pub fn insert(&mut self, value: T) -> bool {
        if !self.members.insert(value) {
            return false;
        }
        self.added.push(value);
        true
    }

    /// Returns `false` if the value was not a member
    pub fn remove(&mut self, value: &T) -> bool {
        if !self.members.remove(value) {
            return false;
        }
        if let Some(position) = self.added.iter().position(|added| added == value) {
            self.added.swap_remove(position);
        } else {
            self.removed.push(*value);
        }
        true
    }

    pub fn contains(&self, value: &T) -> bool {
        self.members.contains(value)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, T> {
        self.members.iter()
    }

    /// Members added since the last flush
    pub fn added(&self) -> &[T] {
        &self.added
    }

    /// Members removed since the last flush
    pub fn removed(&self) -> &[T] {
        &self.removed
    }

    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    pub fn flush(&mut self) {
        self.added.clear();
        self.removed.clear();
    }
}

impl<T: Ord + Copy + Serde> DeltaSet<T> {
    pub fn write<W: StreamWrite + ?Sized>(&self, writer: &mut W, mode: SyncMode) {
        match mode {
            SyncMode::Full => write_items(writer, self.members.iter()),
            SyncMode::Delta => {
                writer.object_begin();
                writer.object_next("removed");
                write_items(writer, self.removed.iter());
                writer.object_next("added");
                write_items(writer, self.added.iter());
                writer.object_end();
            }
        }
    }

    pub fn read<R: StreamRead + ?Sized>(
        &mut self,
        reader: &mut R,
        mode: SyncMode,
    ) -> Result<(), SerdeErr> {
        match mode {
            SyncMode::Full => {
                let members = Vec::<T>::de(reader)?;
                self.members = members.into_iter().collect();
            }
            SyncMode::Delta => {
                reader.object_begin()?;
                reader.object_next("removed")?;
                let removed = Vec::<T>::de(reader)?;
                reader.object_next("added")?;
                let added = Vec::<T>::de(reader)?;
                reader.object_end()?;

                for value in &removed {
                    self.members.remove(value);
                }
                self.members.extend(added);
            }
        }
        Ok(())
    }
}

fn write_items<'t, T, W>(writer: &mut W, items: impl ExactSizeIterator<Item = &'t T>)
where
    T: Serde + 't,
    W: StreamWrite + ?Sized,
{
    writer.array_begin(items.len());
    for item in items {
        writer.array_next();
        item.ser(writer);
    }
    writer.array_end();
}

impl<'s, T: Ord + Copy> IntoIterator for &'s DeltaSet<T> {
    type Item = &'s T;
    type IntoIter = btree_set::Iter<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}
