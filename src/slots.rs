/// Allocates slot ids for the node arena, reusing slots of destroyed nodes.
#[derive(Debug, Default)]
pub struct Slots {
    deleted_slots: Vec<usize>,
    num_slots: usize,
}

impl Slots {
    #[must_use]
    pub fn new() -> Self {
        Slots {
            deleted_slots: Vec::new(),
            num_slots: 0,
        }
    }

    // Allocate or reuse a slot.
    pub fn insert(&mut self) -> usize {
        if let Some(slot_id) = self.deleted_slots.pop() {
            slot_id
        } else {
            let slot_id = self.num_slots;
            self.num_slots += 1;
            slot_id
        }
    }

    // Release a slot for reuse.
    pub fn delete(&mut self, slot_id: usize) {
        self.deleted_slots.push(slot_id);
    }

    /// Number of slots currently holding a live node.
    #[must_use]
    pub fn num_live(&self) -> usize {
        self.num_slots - self.deleted_slots.len()
    }
}
