//! The live state frame.
//!
//! [`StateFrame`] holds one [`AttributeStack`] per ordinary attribute type,
//! per (texture unit, texture attribute type) and per uniform name, plus the
//! generator-name stack. Pushing a [`StateSet`] resolves each of its entries
//! against the matching stack; popping removes exactly the entries the push
//! added.
//!
//! Applying the frame to the driver lives in [`apply`](super::apply).

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::attribute::{AttributeKind, AttributeRef, AttributeTypeId, AttributeTypeToken};
use crate::driver::GraphicsDriver;
use crate::errors::{Result, StateError};
use crate::settings::StateSettings;
use crate::shader::generator::ShaderGenerators;
use crate::shader::program::{PROGRAM_TYPE, Program};
use crate::state::frame_uniforms::FrameUniforms;
use crate::state::stack::AttributeStack;
use crate::state::state_set::{StateSet, StateSetRef};
use crate::state::vertex_attribs::VertexAttribCache;
use crate::uniform::{AttributeUniforms, Uniform, UniformValueCache};
use crate::utils::interner::{self, Symbol};

/// Counters since creation or the last [`StateFrame::reset_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateStats {
    pub push_state_set: u64,
    pub apply: u64,
    pub apply_state_set: u64,
    /// Applies that bound a different program.
    pub program_switches: u64,
}

pub struct StateFrame<D: GraphicsDriver> {
    pub(crate) driver: D,
    pub(crate) settings: StateSettings,
    pub(crate) state_sets: Vec<StateSetRef>,
    pub(crate) attributes: Vec<AttributeStack<AttributeRef>>,
    pub(crate) texture_units: Vec<Vec<AttributeStack<AttributeRef>>>,
    pub(crate) uniforms: FxHashMap<Symbol, AttributeStack<Uniform>>,
    pub(crate) generator_names: AttributeStack<Symbol>,
    pub(crate) attribute_uniforms: AttributeUniforms,
    pub(crate) generators: ShaderGenerators,
    pub(crate) uniform_cache: UniformValueCache,
    pub(crate) frame_uniforms: FrameUniforms,
    pub(crate) vertex_attribs: VertexAttribCache,
    pub(crate) stats: StateStats,
    /// State sets lifted off the stack by insert / remove.
    scratch: Vec<StateSetRef>,
}

/// Returns the stack for `id`, creating it with `attribute`'s default
/// instance as global default.
pub(crate) fn ensure_stack<'a>(
    stacks: &'a mut Vec<AttributeStack<AttributeRef>>,
    id: AttributeTypeId,
    attribute: &AttributeRef,
) -> &'a mut AttributeStack<AttributeRef> {
    let index = id.index();
    if stacks.len() <= index {
        stacks.resize_with(index + 1, AttributeStack::new);
    }
    let stack = &mut stacks[index];
    if stack.global_default().is_none() {
        stack.set_global_default(attribute.clone_type());
    }
    stack
}

pub(crate) fn ensure_unit(
    units: &mut Vec<Vec<AttributeStack<AttributeRef>>>,
    unit: usize,
) -> &mut Vec<AttributeStack<AttributeRef>> {
    if units.len() <= unit {
        units.resize_with(unit + 1, Vec::new);
    }
    &mut units[unit]
}

#[cold]
#[track_caller]
fn stack_corrupted(stack: &str, operation: &str) -> ! {
    panic!("attribute stack `{stack}` is empty during `{operation}`: push and pop are unbalanced")
}

impl<D: GraphicsDriver> StateFrame<D> {
    #[must_use]
    pub fn new(driver: D) -> Self {
        Self::with_settings(driver, StateSettings::default())
    }

    #[must_use]
    pub fn with_settings(driver: D, settings: StateSettings) -> Self {
        interner::preload_common_uniforms();

        let mut attributes = Vec::new();
        let index = PROGRAM_TYPE.id().index();
        attributes.resize_with(index + 1, AttributeStack::new);
        let empty: AttributeRef = Rc::new(Program::empty());
        let mut program_stack = AttributeStack::with_global_default(Rc::clone(&empty));
        program_stack.set_last_applied(empty);
        attributes[index] = program_stack;

        let generators = ShaderGenerators::new(&settings.default_generator);

        Self {
            driver,
            settings,
            state_sets: Vec::new(),
            attributes,
            texture_units: Vec::new(),
            uniforms: FxHashMap::default(),
            generator_names: AttributeStack::new(),
            attribute_uniforms: AttributeUniforms::new(),
            generators,
            uniform_cache: UniformValueCache::new(),
            frame_uniforms: FrameUniforms::new(),
            vertex_attribs: VertexAttribCache::new(),
            stats: StateStats::default(),
            scratch: Vec::new(),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    #[inline]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    #[inline]
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    #[inline]
    pub fn settings(&self) -> &StateSettings {
        &self.settings
    }

    #[inline]
    pub fn generators(&self) -> &ShaderGenerators {
        &self.generators
    }

    #[inline]
    pub fn generators_mut(&mut self) -> &mut ShaderGenerators {
        &mut self.generators
    }

    /// Compiled generated programs across all generators.
    pub fn program_count(&self) -> usize {
        self.generators.program_count()
    }

    #[inline]
    pub fn state_set_depth(&self) -> usize {
        self.state_sets.len()
    }

    #[inline]
    pub fn state_sets(&self) -> &[StateSetRef] {
        &self.state_sets
    }

    pub fn attribute_stack(&self, token: &AttributeTypeToken) -> Option<&AttributeStack<AttributeRef>> {
        match token.kind() {
            AttributeKind::Ordinary => self.attributes.get(token.id().index()),
            AttributeKind::Texture => self.texture_attribute_stack(0, token),
        }
    }

    pub fn texture_attribute_stack(
        &self,
        unit: u32,
        token: &AttributeTypeToken,
    ) -> Option<&AttributeStack<AttributeRef>> {
        self.texture_units
            .get(unit as usize)
            .and_then(|stacks| stacks.get(token.id().index()))
    }

    pub fn uniform_stack(&self, name: &str) -> Option<&AttributeStack<Uniform>> {
        interner::get(name).and_then(|sym| self.uniforms.get(&sym))
    }

    /// Top-of-stack value of `token`'s stack, or its global default.
    pub fn current_attribute(&self, token: &AttributeTypeToken) -> Option<AttributeRef> {
        self.attribute_stack(token)
            .and_then(AttributeStack::current)
            .cloned()
    }

    /// The attribute of `token`'s type last sent to the driver.
    pub fn last_applied_attribute(&self, token: &AttributeTypeToken) -> Option<AttributeRef> {
        self.attribute_stack(token)
            .and_then(AttributeStack::last_applied)
            .cloned()
    }

    pub fn last_applied_texture_attribute(
        &self,
        unit: u32,
        token: &AttributeTypeToken,
    ) -> Option<AttributeRef> {
        self.texture_attribute_stack(unit, token)
            .and_then(AttributeStack::last_applied)
            .cloned()
    }

    /// The program last bound through this frame.
    pub fn last_applied_program(&self) -> Option<&Program> {
        self.attributes
            .get(PROGRAM_TYPE.id().index())
            .and_then(AttributeStack::last_applied)
            .and_then(|p| p.as_program())
    }

    /// Name of the generator the next apply would use, or `None` when a
    /// custom program is on top of the program stack. An empty generator-name
    /// stack selects the registry's default.
    pub fn current_shader_generator(&self) -> Option<&'static str> {
        let custom = self
            .attributes
            .get(PROGRAM_TYPE.id().index())
            .and_then(AttributeStack::top)
            .is_some_and(|entry| !entry.mask.is_off());
        if custom {
            return None;
        }
        let name = self
            .generator_names
            .top()
            .map(|entry| interner::resolve(entry.value))
            .filter(|name| self.generators.get(name).is_some())
            .unwrap_or(self.generators.default_name());
        Some(name)
    }

    #[inline]
    pub fn stats(&self) -> StateStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = StateStats::default();
    }

    // ── Push / pop ───────────────────────────────────────────────────────────

    pub fn push_state_set(&mut self, state_set: StateSetRef) {
        self.stats.push_state_set += 1;
        self.push_entries(&state_set);
        self.state_sets.push(state_set);
    }

    /// Pops the top state set.
    pub fn pop_state_set(&mut self) -> Result<StateSetRef> {
        let Some(state_set) = self.state_sets.pop() else {
            return Err(StateError::StackUnderflow {
                stack: "state set",
                operation: "pop_state_set",
            });
        };
        self.pop_entries(&state_set, "pop_state_set");
        Ok(state_set)
    }

    pub fn pop_all_state_sets(&mut self) {
        while let Some(state_set) = self.state_sets.pop() {
            self.pop_entries(&state_set, "pop_all_state_sets");
        }
    }

    /// Inserts `state_set` at `position` (0 is the bottom), re-resolving every
    /// state set above it.
    pub fn insert_state_set(&mut self, position: usize, state_set: StateSetRef) -> Result<()> {
        let depth = self.state_sets.len();
        if position > depth {
            return Err(StateError::PositionOutOfRange { position, depth });
        }

        let lifted = self.lift_above(position, "insert_state_set");
        self.push_entries(&state_set);
        self.state_sets.push(state_set);
        self.restore_lifted(lifted);
        Ok(())
    }

    /// Removes the state set at `position`, re-resolving every state set
    /// above it.
    pub fn remove_state_set(&mut self, position: usize) -> Result<StateSetRef> {
        let depth = self.state_sets.len();
        if position >= depth {
            log::warn!("remove_state_set: position {position} out of range (depth {depth})");
            return Err(StateError::PositionOutOfRange { position, depth });
        }

        let lifted = self.lift_above(position + 1, "remove_state_set");
        let removed = self.pop_state_set()?;
        self.restore_lifted(lifted);
        Ok(removed)
    }

    /// Pops every state set above `position` into the scratch list, top first.
    fn lift_above(&mut self, position: usize, operation: &'static str) -> Vec<StateSetRef> {
        let mut lifted = std::mem::take(&mut self.scratch);
        lifted.clear();
        while self.state_sets.len() > position {
            if let Some(state_set) = self.state_sets.pop() {
                self.pop_entries(&state_set, operation);
                lifted.push(state_set);
            }
        }
        lifted
    }

    fn restore_lifted(&mut self, mut lifted: Vec<StateSetRef>) {
        while let Some(state_set) = lifted.pop() {
            self.push_entries(&state_set);
            self.state_sets.push(state_set);
        }
        self.scratch = lifted;
    }

    pub(crate) fn push_entries(&mut self, state_set: &StateSet) {
        for (id, pair) in state_set.attributes() {
            ensure_stack(&mut self.attributes, id, &pair.attribute).push(&pair.attribute, pair.mask);
        }

        for unit in state_set.texture_units() {
            if unit >= self.settings.max_texture_units {
                log::warn!(
                    "Ignoring texture unit {unit} of state set {:?}: limit is {}",
                    state_set.name().unwrap_or("<unnamed>"),
                    self.settings.max_texture_units
                );
                continue;
            }
            let stacks = ensure_unit(&mut self.texture_units, unit as usize);
            for (id, pair) in state_set.texture_attributes(unit) {
                ensure_stack(stacks, id, &pair.attribute).push(&pair.attribute, pair.mask);
            }
        }

        self.push_uniforms(state_set);

        if let Some((name, mask)) = state_set.shader_generator() {
            self.generator_names.push(&name, mask);
        }
    }

    pub(crate) fn pop_entries(&mut self, state_set: &StateSet, operation: &str) {
        for (id, pair) in state_set.attributes() {
            if self
                .attributes
                .get_mut(id.index())
                .and_then(AttributeStack::pop)
                .is_none()
            {
                stack_corrupted(pair.attribute.attribute_type().name(), operation);
            }
        }

        for unit in state_set.texture_units() {
            if unit >= self.settings.max_texture_units {
                continue;
            }
            for (id, pair) in state_set.texture_attributes(unit) {
                if self
                    .texture_units
                    .get_mut(unit as usize)
                    .and_then(|stacks| stacks.get_mut(id.index()))
                    .and_then(AttributeStack::pop)
                    .is_none()
                {
                    stack_corrupted(pair.attribute.attribute_type().name(), operation);
                }
            }
        }

        self.pop_uniforms(state_set, operation);

        if state_set.shader_generator().is_some() && self.generator_names.pop().is_none() {
            stack_corrupted("shader generator", operation);
        }
    }

    pub(crate) fn push_uniforms(&mut self, state_set: &StateSet) {
        for (name, pair) in state_set.uniforms() {
            self.uniforms
                .entry(name)
                .or_insert_with(|| AttributeStack::with_global_default(pair.uniform.clone()))
                .push(&pair.uniform, pair.mask);
        }
    }

    pub(crate) fn pop_uniforms(&mut self, state_set: &StateSet, operation: &str) {
        for (name, pair) in state_set.uniforms() {
            if self
                .uniforms
                .get_mut(&name)
                .and_then(AttributeStack::pop)
                .is_none()
            {
                stack_corrupted(pair.uniform.name(), operation);
            }
        }
    }

    // ── Global defaults ──────────────────────────────────────────────────────

    /// Replaces the value `attribute`'s stack falls back to when empty.
    pub fn set_global_default_attribute(&mut self, attribute: AttributeRef) -> Result<()> {
        let token = attribute.attribute_type();
        if token.kind() != AttributeKind::Ordinary {
            return Err(StateError::AttributeKindMismatch {
                name: token.name(),
                expected: AttributeKind::Ordinary.as_str(),
            });
        }
        ensure_stack(&mut self.attributes, token.id(), &attribute).set_global_default(attribute);
        Ok(())
    }

    pub fn global_default_attribute(&self, token: &AttributeTypeToken) -> Option<AttributeRef> {
        self.attribute_stack(token)
            .and_then(AttributeStack::global_default)
            .cloned()
    }

    pub fn set_global_default_texture_attribute(
        &mut self,
        unit: u32,
        attribute: AttributeRef,
    ) -> Result<()> {
        let token = attribute.attribute_type();
        if token.kind() != AttributeKind::Texture {
            return Err(StateError::AttributeKindMismatch {
                name: token.name(),
                expected: AttributeKind::Texture.as_str(),
            });
        }
        let stacks = ensure_unit(&mut self.texture_units, unit as usize);
        ensure_stack(stacks, token.id(), &attribute).set_global_default(attribute);
        Ok(())
    }

    pub fn global_default_texture_attribute(
        &self,
        unit: u32,
        token: &AttributeTypeToken,
    ) -> Option<AttributeRef> {
        self.texture_attribute_stack(unit, token)
            .and_then(AttributeStack::global_default)
            .cloned()
    }

    // ── Draw id ──────────────────────────────────────────────────────────────

    /// Stamps every pushed state set with `id`.
    pub fn set_state_sets_draw_id(&self, id: u32) {
        for state_set in &self.state_sets {
            state_set.set_draw_id(id);
        }
    }

    /// Whether the pushed state sets differ from the `count` state sets that
    /// were stamped with `id`.
    pub fn state_set_stack_changed(&self, id: u32, count: usize) -> bool {
        count != self.state_sets.len()
            || self.state_sets.iter().any(|s| s.draw_id() != Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::OverrideMask;
    use crate::attributes::{MATERIAL_TYPE, Material};
    use crate::driver::RecordingDriver;

    fn material_set(mask: OverrideMask) -> StateSetRef {
        let mut ss = StateSet::new();
        ss.set_attribute_with_mask(Material::new().into_ref(), mask);
        ss.into_ref()
    }

    #[test]
    fn test_pop_on_empty_frame_is_an_error() {
        let mut frame = StateFrame::new(RecordingDriver::new());
        let err = frame.pop_state_set().unwrap_err();
        assert!(matches!(err, StateError::StackUnderflow { operation: "pop_state_set", .. }));
    }

    #[test]
    fn test_insert_reresolves_sets_above() {
        let mut frame = StateFrame::new(RecordingDriver::new());
        let plain = material_set(OverrideMask::ON);
        let forced = material_set(OverrideMask::ON | OverrideMask::OVERRIDE);

        frame.push_state_set(Rc::clone(&plain));
        let top = frame.current_attribute(&MATERIAL_TYPE).unwrap();
        assert!(Rc::ptr_eq(&top, &plain.attribute(&MATERIAL_TYPE).unwrap().attribute));

        frame.insert_state_set(0, Rc::clone(&forced)).unwrap();
        let top = frame.current_attribute(&MATERIAL_TYPE).unwrap();
        assert!(Rc::ptr_eq(&top, &forced.attribute(&MATERIAL_TYPE).unwrap().attribute));
        assert_eq!(frame.state_set_depth(), 2);
        assert!(Rc::ptr_eq(&frame.state_sets()[0], &forced));
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut frame = StateFrame::new(RecordingDriver::new());
        frame.push_state_set(material_set(OverrideMask::ON));
        let err = frame.remove_state_set(1).unwrap_err();
        assert_eq!(err, StateError::PositionOutOfRange { position: 1, depth: 1 });
        assert!(frame.insert_state_set(2, material_set(OverrideMask::ON)).is_err());
    }

    #[test]
    fn test_draw_id_detects_stack_changes() {
        let mut frame = StateFrame::new(RecordingDriver::new());
        frame.push_state_set(material_set(OverrideMask::ON));
        frame.set_state_sets_draw_id(7);

        assert!(!frame.state_set_stack_changed(7, 1));
        assert!(frame.state_set_stack_changed(8, 1));

        frame.push_state_set(material_set(OverrideMask::ON));
        assert!(frame.state_set_stack_changed(7, 1));
        assert!(frame.state_set_stack_changed(7, 2));
    }

    #[test]
    fn test_unknown_generator_name_falls_back_to_default() {
        let mut frame = StateFrame::new(RecordingDriver::new());
        let mut ss = StateSet::new();
        ss.set_shader_generator_name("does-not-exist");
        frame.push_state_set(ss.into_ref());

        assert_eq!(frame.current_shader_generator(), Some("default"));
    }
}
