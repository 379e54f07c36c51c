use super::{dense_array::DenseArray, slot_allocator::SlotAllocator};

struct DenseRecord<R> {
    slot: u32,
    value: R,
}

/// One slot of an [`EntityTable`], as seen when walking slots in index order
pub struct SlotView<'t, R> {
    pub index: u32,
    pub generation: u32,
    pub value: Option<&'t R>,
}

/// Generational slot map: dense records addressed through a sparse slot table.
///
/// Lookup, insertion and removal are O(1). Records live contiguously in the
/// dense array; each remembers its slot so a swap-remove can correct the
/// sparse entry of the record it relocates.
pub struct EntityTable<R> {
    slots: SlotAllocator,
    dense: DenseArray<DenseRecord<R>>,
}

impl<R> Default for EntityTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> EntityTable<R> {
    pub fn new() -> Self {
        Self {
            slots: SlotAllocator::new(),
            dense: DenseArray::new(),
        }
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Number of slots ever created, live or not
    pub fn slot_count(&self) -> usize {
        self.slots.slot_count()
    }

    /// Inserts a record into a fresh or recycled slot
    pub fn insert(&mut self, value: R) -> (u32, u32) {
        let (index, generation) = self.slots.allocate(self.dense.len());
        self.dense.push(DenseRecord { slot: index, value });
        (index, generation)
    }

    /// Inserts a record at a caller-chosen slot and generation. If the slot is
    /// already occupied its record is replaced and returned.
    pub fn insert_at(&mut self, index: u32, generation: u32, value: R) -> Option<R> {
        if let Some(position) = self.slots.occupant(index) {
            self.slots.occupy_at(index, generation, position);
            let record = self.dense.get_mut(position)?;
            return Some(std::mem::replace(&mut record.value, value));
        }

        self.slots.occupy_at(index, generation, self.dense.len());
        self.dense.push(DenseRecord { slot: index, value });
        None
    }

    /// Removes a live record, recycling its slot
    pub fn remove(&mut self, index: u32, generation: u32) -> Option<R> {
        let position = self.slots.dense_index(index, generation)?;
        let removed = self.dense.swap_remove(position);

        if removed.moved_from.is_some() {
            if let Some(moved) = self.dense.get(position) {
                self.slots.set_dense(moved.slot, position);
            }
        }
        self.slots.free(index);

        Some(removed.value.value)
    }

    pub fn contains(&self, index: u32, generation: u32) -> bool {
        self.slots.is_alive(index, generation)
    }

    /// Dense position of a live record
    pub fn position(&self, index: u32, generation: u32) -> Option<usize> {
        self.slots.dense_index(index, generation)
    }

    pub fn get(&self, index: u32, generation: u32) -> Option<&R> {
        let position = self.slots.dense_index(index, generation)?;
        self.dense.get(position).map(|record| &record.value)
    }

    pub fn get_mut(&mut self, index: u32, generation: u32) -> Option<&mut R> {
        let position = self.slots.dense_index(index, generation)?;
        self.dense.get_mut(position).map(|record| &mut record.value)
    }

    /// Slot index, generation and record at a dense position
    pub fn at(&self, position: usize) -> Option<(u32, u32, &R)> {
        let record = self.dense.get(position)?;
        let generation = self.slots.generation(record.slot)?;
        Some((record.slot, generation, &record.value))
    }

    pub fn at_mut(&mut self, position: usize) -> Option<(u32, u32, &mut R)> {
        let record = self.dense.get_mut(position)?;
        let generation = self.slots.generation(record.slot)?;
        Some((record.slot, generation, &mut record.value))
    }

    /// Current generation of a slot, live or not
    pub fn generation(&self, index: u32) -> Option<u32> {
        self.slots.generation(index)
    }

    /// Live records in dense order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, &R)> + '_ {
        let slots = &self.slots;
        self.dense.iter().map(move |record| {
            let generation = slots.generation(record.slot).unwrap_or_default();
            (record.slot, generation, &record.value)
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, u32, &mut R)> + '_ {
        let slots = &self.slots;
        self.dense.iter_mut().map(move |record| {
            let generation = slots.generation(record.slot).unwrap_or_default();
            (record.slot, generation, &mut record.value)
        })
    }

    /// Every slot in index order, dead ones included
    pub fn slots(&self) -> impl Iterator<Item = SlotView<'_, R>> + '_ {
        self.slots
            .iter()
            .map(move |(index, generation, occupied)| SlotView {
                index,
                generation,
                value: if occupied {
                    self.slots
                        .occupant(index)
                        .and_then(|position| self.dense.get(position))
                        .map(|record| &record.value)
                } else {
                    None
                },
            })
    }

    /// Appends the next slot in index order. Used to rebuild a table slot by
    /// slot; the free list ends up threaded in ascending slot order.
    pub fn restore_slot(&mut self, generation: u32, value: Option<R>) -> u32 {
        match value {
            Some(value) => {
                let index = self.slots.push_occupied(generation, self.dense.len());
                self.dense.push(DenseRecord { slot: index, value });
                index
            }
            None => self.slots.push_vacant(generation),
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.dense.clear();
    }
}
