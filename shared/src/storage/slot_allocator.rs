#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    // Slot holds a live record at this dense position
    Occupied { dense: u32 },
    // Slot is on the free list
    Vacant { next_free: Option<u32> },
    // Generation counter is exhausted, slot is never handed out again
    Retired,
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    state: SlotState,
}

/// Hands out `(index, generation)` pairs and keeps the sparse slot table.
///
/// Each slot either redirects to a dense position (occupied) or threads the
/// free list (vacant). Freed slots are recycled LIFO, and every free bumps the
/// slot's generation so outstanding handles to it stop matching.
#[derive(Clone, Debug, Default)]
pub struct SlotAllocator {
    slots: Vec<Slot>,
    free_head: Option<u32>,
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
        }
    }

    /// Number of slots ever created, live or not
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Allocates a slot pointing at `dense`, recycling the most recently freed
    /// slot when one is available
    pub fn allocate(&mut self, dense: usize) -> (u32, u32) {
        let dense = dense_to_u32(dense);

        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index as usize];
            let SlotState::Vacant { next_free } = slot.state else {
                panic!("Slot {} is on the free list but is not vacant", index);
            };
            self.free_head = next_free;
            slot.state = SlotState::Occupied { dense };
            return (index, slot.generation);
        }

        let index = self.next_index();
        self.slots.push(Slot {
            generation: 0,
            state: SlotState::Occupied { dense },
        });
        (index, 0)
    }

    /// Frees an occupied slot, incrementing its generation and pushing it onto
    /// the free list. Returns the slot's new generation.
    pub fn free(&mut self, index: u32) -> u32 {
        let slot = &mut self.slots[index as usize];
        if !matches!(slot.state, SlotState::Occupied { .. }) {
            panic!("Cannot free slot {} which is not occupied", index);
        }

        match slot.generation.checked_add(1) {
            Some(generation) => {
                slot.generation = generation;
                slot.state = SlotState::Vacant {
                    next_free: self.free_head,
                };
                self.free_head = Some(index);
            }
            None => {
                slot.state = SlotState::Retired;
            }
        }

        slot.generation
    }

    /// Occupies the slot at a caller-chosen `index` with a caller-chosen
    /// `generation`, growing the table if needed. Returns the dense position
    /// previously held by the slot if it was already occupied.
    pub fn occupy_at(&mut self, index: u32, generation: u32, dense: usize) -> Option<usize> {
        let dense = dense_to_u32(dense);

        while self.slots.len() <= index as usize {
            let new_index = self.next_index();
            self.slots.push(Slot {
                generation: 0,
                state: SlotState::Vacant {
                    next_free: self.free_head,
                },
            });
            self.free_head = Some(new_index);
        }

        let state = self.slots[index as usize].state;
        let previous = match state {
            SlotState::Occupied { dense } => Some(dense as usize),
            SlotState::Vacant { .. } => {
                self.unlink(index);
                None
            }
            SlotState::Retired => None,
        };

        let slot = &mut self.slots[index as usize];
        slot.generation = generation;
        slot.state = SlotState::Occupied { dense };

        previous
    }

    /// Appends an occupied slot, used when rebuilding from a snapshot
    pub fn push_occupied(&mut self, generation: u32, dense: usize) -> u32 {
        let index = self.next_index();
        self.slots.push(Slot {
            generation,
            state: SlotState::Occupied {
                dense: dense_to_u32(dense),
            },
        });
        index
    }

    /// Appends a vacant slot and threads it onto the free list, used when
    /// rebuilding from a snapshot. A slot at the last generation comes back
    /// retired.
    pub fn push_vacant(&mut self, generation: u32) -> u32 {
        let index = self.next_index();
        if generation == u32::MAX {
            self.slots.push(Slot {
                generation,
                state: SlotState::Retired,
            });
            return index;
        }
        self.slots.push(Slot {
            generation,
            state: SlotState::Vacant {
                next_free: self.free_head,
            },
        });
        self.free_head = Some(index);
        index
    }

    /// Dense position of a live slot, `None` if the slot is vacant or the
    /// generation does not match
    pub fn dense_index(&self, index: u32, generation: u32) -> Option<usize> {
        let slot = self.slots.get(index as usize)?;
        match slot.state {
            SlotState::Occupied { dense } if slot.generation == generation => Some(dense as usize),
            _ => None,
        }
    }

    /// Dense position of an occupied slot, regardless of generation
    pub fn occupant(&self, index: u32) -> Option<usize> {
        match self.slots.get(index as usize)?.state {
            SlotState::Occupied { dense } => Some(dense as usize),
            _ => None,
        }
    }

    pub fn is_alive(&self, index: u32, generation: u32) -> bool {
        self.dense_index(index, generation).is_some()
    }

    /// Redirects an occupied slot to a new dense position
    pub fn set_dense(&mut self, index: u32, dense: usize) {
        let slot = &mut self.slots[index as usize];
        let SlotState::Occupied { .. } = slot.state else {
            panic!("Cannot redirect slot {} which is not occupied", index);
        };
        slot.state = SlotState::Occupied {
            dense: dense_to_u32(dense),
        };
    }

    /// Current generation of a slot
    pub fn generation(&self, index: u32) -> Option<u32> {
        self.slots.get(index as usize).map(|slot| slot.generation)
    }

    pub fn is_occupied(&self, index: u32) -> bool {
        self.occupant(index).is_some()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_head = None;
    }

    /// Iterates over every slot in index order, yielding its generation and
    /// whether it is occupied
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, bool)> + '_ {
        self.slots.iter().enumerate().map(|(index, slot)| {
            (
                index as u32,
                slot.generation,
                matches!(slot.state, SlotState::Occupied { .. }),
            )
        })
    }

    fn next_index(&self) -> u32 {
        let Ok(index) = u32::try_from(self.slots.len()) else {
            panic!("Slot index space exhausted");
        };
        index
    }

    // Removes a vacant slot from the free list. Mirrors occupy slots in the
    // order the server recycled them, so the walk normally stops at the head.
    fn unlink(&mut self, index: u32) {
        let SlotState::Vacant { next_free: after } = self.slots[index as usize].state else {
            return;
        };

        if self.free_head == Some(index) {
            self.free_head = after;
            return;
        }

        let mut cursor = self.free_head;
        while let Some(current) = cursor {
            let SlotState::Vacant { next_free } = self.slots[current as usize].state else {
                panic!("Slot {} is on the free list but is not vacant", current);
            };
            if next_free == Some(index) {
                self.slots[current as usize].state = SlotState::Vacant { next_free: after };
                return;
            }
            cursor = next_free;
        }
    }
}

fn dense_to_u32(dense: usize) -> u32 {
    let Ok(dense) = u32::try_from(dense) else {
        panic!("Dense position {} does not fit the slot table", dense);
    };
    dense
}
