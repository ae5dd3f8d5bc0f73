//! Reconciling the frame with the driver.
//!
//! [`StateFrame::apply`] walks every stack, sends the attributes whose
//! identity differs from what the driver last received, selects a program
//! (custom or generated) and uploads the uniforms whose values changed.
//!
//! [`StateFrame::apply_state_set`] does the same with one extra state set
//! layered on top, without pushing it. Stacks it touches are left marked as
//! changed so the next apply restores the frame's own values.

use rustc_hash::FxHashMap;

use crate::attribute::{
    ApplyContext, AttributeKind, AttributeRef, AttributeTypeId, Capabilities, StateAttribute,
};
use crate::driver::GraphicsDriver;
use crate::errors::{Result, StateError};
use crate::shader::program::{LinkedProgram, PROGRAM_TYPE, Program, ProgramBinding};
use crate::state::frame::{StateFrame, ensure_stack, ensure_unit};
use crate::state::frame_uniforms::is_frame_uniform;
use crate::state::resolve::resolve_override;
use crate::state::stack::AttributeStack;
use crate::state::state_set::StateSet;
use crate::uniform::{AttributeUniforms, Uniform, UniformGroup, UniformValueCache};
use crate::utils::interner::{self, Symbol};

use glam::Mat4;

/// Sends `attribute` unless it is what `stack` last applied.
fn apply_to_stack(
    driver: &mut dyn GraphicsDriver,
    attribute_uniforms: &mut AttributeUniforms,
    stack: &mut AttributeStack<AttributeRef>,
    attribute: AttributeRef,
    unit: Option<u32>,
) -> Result<()> {
    if stack.is_applied(&attribute) {
        return Ok(());
    }

    if attribute
        .attribute_type()
        .capabilities()
        .contains(Capabilities::APPLY)
    {
        let uniforms = attribute_uniforms.get_or_create(attribute.as_ref(), unit);
        if let Some(unit) = unit {
            driver.active_texture(unit);
        }
        let mut ctx = ApplyContext {
            driver,
            unit,
            uniforms: uniforms.as_deref(),
        };
        if let Err(err) = attribute.apply(&mut ctx) {
            stack.mark_changed();
            return Err(err);
        }
    }

    stack.set_last_applied(attribute);
    Ok(())
}

/// The linked program last bound through the program stack.
fn bound_linked(attributes: &[AttributeStack<AttributeRef>]) -> Option<&LinkedProgram> {
    attributes
        .get(PROGRAM_TYPE.id().index())
        .and_then(AttributeStack::last_applied)
        .and_then(|p| p.as_program())
        .and_then(Program::linked)
}

fn ensure_kind(attribute: &dyn StateAttribute, expected: AttributeKind) -> Result<()> {
    let token = attribute.attribute_type();
    if token.kind() == expected {
        Ok(())
    } else {
        Err(StateError::AttributeKindMismatch {
            name: token.name(),
            expected: expected.as_str(),
        })
    }
}

/// Declared uniforms split into attribute-owned (`active`) and the rest.
///
/// Frame matrices are left out of generated programs only; a custom program
/// resolves every declared name.
fn build_binding(
    uniform_cache: &mut UniformValueCache,
    program: &Program,
    linked: &LinkedProgram,
) -> ProgramBinding {
    let actives = program.active_uniforms();
    let mut active = Vec::new();
    let mut foreign = Vec::new();
    for &(name, location) in linked.uniforms() {
        if program.is_generated() && is_frame_uniform(name) {
            continue;
        }
        match actives.and_then(|map| map.get_symbol(name)) {
            Some(uniform) => active.push((location, uniform.clone())),
            None => foreign.push((location, name)),
        }
    }
    let slot = uniform_cache.allocate(active.len(), foreign.len());
    ProgramBinding {
        slot,
        active,
        foreign,
    }
}

/// Uniforms of a custom program's tracked attribute types, taken from the
/// global defaults of their stacks.
fn tracked_uniforms(
    attributes: &[AttributeStack<AttributeRef>],
    texture_units: &[Vec<AttributeStack<AttributeRef>>],
    attribute_uniforms: &mut AttributeUniforms,
    program: &Program,
) -> FxHashMap<Symbol, Uniform> {
    let mut tracked = FxHashMap::default();

    for token in program.tracked_attribute_types() {
        let Some(default) = attributes
            .get(token.id().index())
            .and_then(AttributeStack::global_default)
        else {
            log::debug!(
                "Program '{}' tracks '{}' before any instance was seen",
                program.label(),
                token.name()
            );
            continue;
        };
        if let Some(map) = attribute_uniforms.get_or_create(default.as_ref(), None) {
            tracked.extend(map.iter().map(|u| (u.symbol(), u.clone())));
        }
    }

    for &(unit, token) in program.tracked_texture_attribute_types() {
        let Some(default) = texture_units
            .get(unit as usize)
            .and_then(|stacks| stacks.get(token.id().index()))
            .and_then(AttributeStack::global_default)
        else {
            continue;
        };
        if let Some(map) = attribute_uniforms.get_or_create(default.as_ref(), Some(unit)) {
            tracked.extend(map.iter().map(|u| (u.symbol(), u.clone())));
        }
    }

    tracked
}

impl<D: GraphicsDriver> StateFrame<D> {
    /// Brings the driver in line with the stacks.
    pub fn apply(&mut self) -> Result<()> {
        self.stats.apply += 1;
        self.apply_attribute_stacks(None)?;
        self.apply_texture_stacks(None)?;
        self.apply_program(None)?;
        self.apply_program_uniforms()
    }

    /// Applies the frame with `state_set` layered on top, without pushing it.
    pub fn apply_state_set(&mut self, state_set: &StateSet) -> Result<()> {
        self.stats.apply_state_set += 1;
        self.apply_attribute_stacks(Some(state_set))?;
        self.apply_texture_stacks(Some(state_set))?;
        self.apply_program(Some(state_set))?;

        self.push_uniforms(state_set);
        let result = self.apply_program_uniforms();
        self.pop_uniforms(state_set, "apply_state_set");
        result
    }

    /// Pops every state set, then applies.
    pub fn apply_default(&mut self) -> Result<()> {
        self.pop_all_state_sets();
        self.apply()
    }

    fn apply_attribute_stacks(&mut self, extra: Option<&StateSet>) -> Result<()> {
        let program_index = PROGRAM_TYPE.id().index();
        let count = self
            .attributes
            .len()
            .max(extra.map_or(0, StateSet::attribute_capacity));

        for index in 0..count {
            if index == program_index {
                continue;
            }
            let id = AttributeTypeId(index as u32);
            match extra.and_then(|ss| ss.attribute_by_id(id)) {
                Some(pair) => {
                    let stack = ensure_stack(&mut self.attributes, id, &pair.attribute);
                    let resolved = resolve_override(stack.top(), &pair.attribute, pair.mask).value;
                    stack.mark_changed();
                    apply_to_stack(
                        &mut self.driver,
                        &mut self.attribute_uniforms,
                        stack,
                        resolved,
                        None,
                    )?;
                }
                None => {
                    let Some(stack) = self.attributes.get_mut(index) else {
                        continue;
                    };
                    if let Some(attribute) = stack.take_changed() {
                        apply_to_stack(
                            &mut self.driver,
                            &mut self.attribute_uniforms,
                            stack,
                            attribute,
                            None,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_texture_stacks(&mut self, extra: Option<&StateSet>) -> Result<()> {
        let extra_units = extra
            .and_then(|ss| ss.texture_units().next_back())
            .map_or(0, |unit| (unit as usize).saturating_add(1));
        let unit_count = self
            .texture_units
            .len()
            .max(extra_units)
            .min(self.settings.max_texture_units as usize);

        for unit_index in 0..unit_count {
            let unit = unit_index as u32;
            let type_count = self
                .texture_units
                .get(unit_index)
                .map_or(0, Vec::len)
                .max(extra.map_or(0, |ss| ss.texture_attribute_capacity(unit)));

            for index in 0..type_count {
                let id = AttributeTypeId(index as u32);
                match extra.and_then(|ss| ss.texture_attribute_by_id(unit, id)) {
                    Some(pair) => {
                        let stacks = ensure_unit(&mut self.texture_units, unit_index);
                        let stack = ensure_stack(stacks, id, &pair.attribute);
                        let resolved =
                            resolve_override(stack.top(), &pair.attribute, pair.mask).value;
                        stack.mark_changed();
                        apply_to_stack(
                            &mut self.driver,
                            &mut self.attribute_uniforms,
                            stack,
                            resolved,
                            Some(unit),
                        )?;
                    }
                    None => {
                        let Some(stack) = self
                            .texture_units
                            .get_mut(unit_index)
                            .and_then(|stacks| stacks.get_mut(index))
                        else {
                            continue;
                        };
                        if let Some(attribute) = stack.take_changed() {
                            apply_to_stack(
                                &mut self.driver,
                                &mut self.attribute_uniforms,
                                stack,
                                attribute,
                                Some(unit),
                            )?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Picks the custom program when the program stack's top is not `OFF`,
    /// the generated one otherwise, and binds it.
    fn apply_program(&mut self, extra: Option<&StateSet>) -> Result<()> {
        let index = PROGRAM_TYPE.id().index();
        let custom = {
            let stack = &self.attributes[index];
            let entry = match extra.and_then(|ss| ss.attribute_by_id(PROGRAM_TYPE.id())) {
                Some(pair) => Some(resolve_override(stack.top(), &pair.attribute, pair.mask)),
                None => stack.top().cloned(),
            };
            entry.filter(|e| !e.mask.is_off()).map(|e| e.value)
        };

        let program: AttributeRef = match custom {
            Some(program) => program,
            None => {
                let name = match extra.and_then(StateSet::shader_generator) {
                    Some((name, mask)) => {
                        resolve_override(self.generator_names.top(), &name, mask).value
                    }
                    None => self
                        .generator_names
                        .top()
                        .map_or(self.generators.default_symbol(), |e| e.value),
                };
                self.generators.resolve_mut(name)?.get_or_create_program(
                    &self.attributes,
                    &self.texture_units,
                    &mut self.attribute_uniforms,
                    &mut self.driver,
                    &self.settings,
                )?
            }
        };

        let stack = &mut self.attributes[index];
        if !stack.is_applied(&program) {
            self.stats.program_switches += 1;
        }
        apply_to_stack(
            &mut self.driver,
            &mut self.attribute_uniforms,
            stack,
            program,
            None,
        )
    }

    /// Uploads the uniforms of the bound program whose values changed since
    /// they were last sent to it.
    fn apply_program_uniforms(&mut self) -> Result<()> {
        let Some(program_ref) = self
            .attributes
            .get(PROGRAM_TYPE.id().index())
            .and_then(AttributeStack::last_applied)
            .cloned()
        else {
            return Ok(());
        };
        let Some(program) = program_ref.as_program() else {
            return Ok(());
        };
        let Some(linked) = program.linked() else {
            self.frame_uniforms.bind_program(None);
            return Ok(());
        };
        self.frame_uniforms.bind_program(Some(linked.handle()));

        let binding = program
            .binding
            .get_or_init(|| build_binding(&mut self.uniform_cache, program, linked));
        let tracked = if program.is_generated() {
            None
        } else {
            Some(program.tracked_uniforms.get_or_init(|| {
                tracked_uniforms(
                    &self.attributes,
                    &self.texture_units,
                    &mut self.attribute_uniforms,
                    program,
                )
            }))
        };

        for (index, (location, uniform)) in binding.active.iter().enumerate() {
            let value = uniform.get();
            if self
                .uniform_cache
                .check_and_store(binding.slot, UniformGroup::Active, index, &value)
            {
                self.driver.upload_uniform(*location, &value);
            }
        }

        for (index, &(location, name)) in binding.foreign.iter().enumerate() {
            let uniform = self
                .uniforms
                .get(&name)
                .and_then(AttributeStack::current)
                .or_else(|| tracked.and_then(|t| t.get(&name)));
            let Some(uniform) = uniform else {
                log::trace!(
                    "No value for uniform '{}' of program '{}'",
                    interner::resolve(name),
                    program.label()
                );
                continue;
            };
            let value = uniform.get();
            if self
                .uniform_cache
                .check_and_store(binding.slot, UniformGroup::Foreign, index, &value)
            {
                self.driver.upload_uniform(location, &value);
            }
        }

        Ok(())
    }

    // ── Direct application ───────────────────────────────────────────────────

    /// Sends `attribute` now, bypassing the stacks. The next apply restores
    /// the stack's value.
    pub fn apply_attribute(&mut self, attribute: AttributeRef) -> Result<()> {
        ensure_kind(attribute.as_ref(), AttributeKind::Ordinary)?;
        let stack = ensure_stack(&mut self.attributes, attribute.attribute_type().id(), &attribute);
        stack.mark_changed();
        apply_to_stack(
            &mut self.driver,
            &mut self.attribute_uniforms,
            stack,
            attribute,
            None,
        )
    }

    pub fn apply_texture_attribute(&mut self, unit: u32, attribute: AttributeRef) -> Result<()> {
        ensure_kind(attribute.as_ref(), AttributeKind::Texture)?;
        let stacks = ensure_unit(&mut self.texture_units, unit as usize);
        let stack = ensure_stack(stacks, attribute.attribute_type().id(), &attribute);
        stack.mark_changed();
        apply_to_stack(
            &mut self.driver,
            &mut self.attribute_uniforms,
            stack,
            attribute,
            Some(unit),
        )
    }

    /// Records that `attribute` was sent to the driver by other means.
    pub fn have_applied_attribute(&mut self, attribute: AttributeRef) -> Result<()> {
        ensure_kind(attribute.as_ref(), AttributeKind::Ordinary)?;
        let stack = ensure_stack(&mut self.attributes, attribute.attribute_type().id(), &attribute);
        stack.set_last_applied(attribute);
        stack.mark_changed();
        Ok(())
    }

    pub fn have_applied_texture_attribute(
        &mut self,
        unit: u32,
        attribute: AttributeRef,
    ) -> Result<()> {
        ensure_kind(attribute.as_ref(), AttributeKind::Texture)?;
        let stacks = ensure_unit(&mut self.texture_units, unit as usize);
        let stack = ensure_stack(stacks, attribute.attribute_type().id(), &attribute);
        stack.set_last_applied(attribute);
        stack.mark_changed();
        Ok(())
    }

    // ── Frame uniforms ───────────────────────────────────────────────────────

    /// Uploads the model-view matrix (and the normal matrix derived from it)
    /// to the bound program.
    pub fn apply_model_view_matrix(&mut self, matrix: Mat4) {
        let Some(linked) = bound_linked(&self.attributes) else {
            return;
        };
        self.frame_uniforms
            .apply_model_view(&mut self.driver, linked, matrix);
    }

    pub fn apply_projection_matrix(&mut self, matrix: Mat4) {
        let Some(linked) = bound_linked(&self.attributes) else {
            return;
        };
        self.frame_uniforms
            .apply_projection(&mut self.driver, linked, matrix);
    }

    /// Forces the next matrix uploads through.
    pub fn reset_cache_frame(&mut self) {
        self.frame_uniforms.reset();
    }

    pub fn enable_vertex_color(&mut self) {
        self.set_vertex_color(true);
    }

    pub fn disable_vertex_color(&mut self) {
        self.set_vertex_color(false);
    }

    fn set_vertex_color(&mut self, enabled: bool) {
        let Some(linked) = bound_linked(&self.attributes) else {
            return;
        };
        self.frame_uniforms
            .set_vertex_color(&mut self.driver, linked, enabled);
    }

    /// Whether the bound program declares `name`.
    pub fn program_has_uniform(&self, name: &str) -> bool {
        bound_linked(&self.attributes).is_some_and(|l| l.has_uniform(name))
    }

    // ── Vertex attributes ────────────────────────────────────────────────────

    pub fn set_vertex_attrib_array(&mut self, slot: u32) {
        self.vertex_attribs.enable(&mut self.driver, slot);
    }

    pub fn lazy_disabling_of_vertex_attributes(&mut self) {
        self.vertex_attribs.mark_all_for_disabling();
    }

    pub fn apply_disabling_of_vertex_attributes(&mut self) {
        self.vertex_attribs.apply_disabling(&mut self.driver);
    }

    pub fn clear_vertex_attrib_cache(&mut self) {
        self.vertex_attribs.clear();
    }

    #[must_use]
    pub fn is_vertex_attrib_enabled(&self, slot: u32) -> bool {
        self.vertex_attribs.is_enabled(slot)
    }
}
