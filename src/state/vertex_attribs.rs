//! Vertex attribute array tracking.
//!
//! Enable / disable calls are only issued on transitions. Disabling is lazy:
//! before a draw every enabled slot is marked for disabling, the draw enables
//! the slots it uses (clearing their mark) and the remaining marked slots are
//! disabled afterwards.

use crate::driver::GraphicsDriver;

#[derive(Debug, Clone, Copy, Default)]
struct SlotState {
    enabled: bool,
    pending_disable: bool,
}

#[derive(Debug, Default)]
pub struct VertexAttribCache {
    slots: Vec<SlotState>,
}

impl VertexAttribCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables `slot` unless already enabled and cancels a pending disable.
    pub fn enable(&mut self, driver: &mut dyn GraphicsDriver, slot: u32) {
        let index = slot as usize;
        if self.slots.len() <= index {
            self.slots.resize(index + 1, SlotState::default());
        }
        let state = &mut self.slots[index];
        state.pending_disable = false;
        if !state.enabled {
            driver.enable_vertex_attrib_array(slot);
            state.enabled = true;
        }
    }

    /// Marks every enabled slot for disabling.
    pub fn mark_all_for_disabling(&mut self) {
        for state in &mut self.slots {
            state.pending_disable = state.enabled;
        }
    }

    /// Disables every slot still marked.
    pub fn apply_disabling(&mut self, driver: &mut dyn GraphicsDriver) {
        for (slot, state) in self.slots.iter_mut().enumerate() {
            if state.pending_disable {
                driver.disable_vertex_attrib_array(slot as u32);
                state.enabled = false;
                state.pending_disable = false;
            }
        }
    }

    /// Forgets all tracked state without driver calls.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    #[must_use]
    pub fn is_enabled(&self, slot: u32) -> bool {
        self.slots.get(slot as usize).is_some_and(|s| s.enabled)
    }
}
