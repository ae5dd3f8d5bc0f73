//! State sets.
//!
//! A [`StateSet`] is the declarative bundle of state a scene node carries:
//! ordinary attributes keyed by type, texture attributes keyed by
//! (unit, type), uniforms keyed by name and optionally a shader generator
//! name. Each entry has an [`OverrideMask`].
//!
//! State sets are built mutably and then shared as [`StateSetRef`]; a
//! pushed state set is never modified.

use std::cell::Cell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::attribute::{AttributeKind, AttributeRef, AttributeTypeId, AttributeTypeToken, OverrideMask};
use crate::errors::{Result, StateError};
use crate::uniform::Uniform;
use crate::utils::interner::{self, Symbol};

pub type StateSetRef = Rc<StateSet>;

#[derive(Debug, Clone)]
pub struct AttributePair {
    pub attribute: AttributeRef,
    pub mask: OverrideMask,
}

#[derive(Debug, Clone)]
pub struct UniformPair {
    pub uniform: Uniform,
    pub mask: OverrideMask,
}

#[derive(Debug, Default)]
struct TextureUnit {
    attributes: Vec<Option<AttributePair>>,
    active: Vec<AttributeTypeId>,
}

#[derive(Debug, Default)]
pub struct StateSet {
    name: Option<String>,
    attributes: Vec<Option<AttributePair>>,
    active_attributes: Vec<AttributeTypeId>,
    /// Sorted by unit. Only units holding an attribute are stored.
    texture_units: SmallVec<[(u32, TextureUnit); 2]>,
    uniforms: FxHashMap<Symbol, UniformPair>,
    uniform_order: Vec<Symbol>,
    generator: Option<(Symbol, OverrideMask)>,
    draw_id: Cell<Option<u32>>,
}

fn set_slot(
    slots: &mut Vec<Option<AttributePair>>,
    active: &mut Vec<AttributeTypeId>,
    id: AttributeTypeId,
    pair: AttributePair,
) {
    let index = id.index();
    if slots.len() <= index {
        slots.resize_with(index + 1, || None);
    }
    if slots[index].is_none() {
        active.push(id);
    }
    slots[index] = Some(pair);
}

fn clear_slot(
    slots: &mut [Option<AttributePair>],
    active: &mut Vec<AttributeTypeId>,
    id: AttributeTypeId,
) -> Option<AttributePair> {
    let removed = slots.get_mut(id.index())?.take()?;
    active.retain(|&a| a != id);
    Some(removed)
}

impl StateSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn into_ref(self) -> StateSetRef {
        Rc::new(self)
    }

    // ── Attributes ───────────────────────────────────────────────────────────

    /// Sets `attribute` with the `ON` mask.
    ///
    /// Texture attributes go to unit 0.
    pub fn set_attribute(&mut self, attribute: AttributeRef) {
        self.set_attribute_with_mask(attribute, OverrideMask::ON);
    }

    pub fn set_attribute_with_mask(&mut self, attribute: AttributeRef, mask: OverrideMask) {
        let token = attribute.attribute_type();
        let pair = AttributePair { attribute, mask };
        match token.kind() {
            AttributeKind::Ordinary => set_slot(
                &mut self.attributes,
                &mut self.active_attributes,
                token.id(),
                pair,
            ),
            AttributeKind::Texture => self.insert_texture_pair(0, token, pair),
        }
    }

    #[must_use]
    pub fn attribute(&self, token: &AttributeTypeToken) -> Option<&AttributePair> {
        match token.kind() {
            AttributeKind::Ordinary => self.attribute_by_id(token.id()),
            AttributeKind::Texture => self.texture_attribute_by_id(0, token.id()),
        }
    }

    pub fn remove_attribute(&mut self, token: &AttributeTypeToken) -> Option<AttributePair> {
        match token.kind() {
            AttributeKind::Ordinary => {
                clear_slot(&mut self.attributes, &mut self.active_attributes, token.id())
            }
            AttributeKind::Texture => self.remove_texture_attribute(0, token),
        }
    }

    #[inline]
    #[must_use]
    pub fn attribute_by_id(&self, id: AttributeTypeId) -> Option<&AttributePair> {
        self.attributes.get(id.index()).and_then(Option::as_ref)
    }

    /// Declared ordinary attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (AttributeTypeId, &AttributePair)> + '_ {
        self.active_attributes
            .iter()
            .filter_map(|&id| self.attribute_by_id(id).map(|pair| (id, pair)))
    }

    /// One past the highest ordinary type id declared.
    #[inline]
    #[must_use]
    pub fn attribute_capacity(&self) -> usize {
        self.attributes.len()
    }

    // ── Texture attributes ───────────────────────────────────────────────────

    pub fn set_texture_attribute(&mut self, unit: u32, attribute: AttributeRef) -> Result<()> {
        self.set_texture_attribute_with_mask(unit, attribute, OverrideMask::ON)
    }

    pub fn set_texture_attribute_with_mask(
        &mut self,
        unit: u32,
        attribute: AttributeRef,
        mask: OverrideMask,
    ) -> Result<()> {
        let token = attribute.attribute_type();
        if token.kind() != AttributeKind::Texture {
            return Err(StateError::AttributeKindMismatch {
                name: token.name(),
                expected: AttributeKind::Texture.as_str(),
            });
        }
        self.insert_texture_pair(unit, token, AttributePair { attribute, mask });
        Ok(())
    }

    fn insert_texture_pair(&mut self, unit: u32, token: &AttributeTypeToken, pair: AttributePair) {
        let pos = match self.texture_units.binary_search_by_key(&unit, |(u, _)| *u) {
            Ok(pos) => pos,
            Err(pos) => {
                self.texture_units.insert(pos, (unit, TextureUnit::default()));
                pos
            }
        };
        let slot = &mut self.texture_units[pos].1;
        set_slot(&mut slot.attributes, &mut slot.active, token.id(), pair);
    }

    fn texture_unit(&self, unit: u32) -> Option<&TextureUnit> {
        self.texture_units
            .binary_search_by_key(&unit, |(u, _)| *u)
            .ok()
            .map(|pos| &self.texture_units[pos].1)
    }

    #[must_use]
    pub fn texture_attribute(&self, unit: u32, token: &AttributeTypeToken) -> Option<&AttributePair> {
        self.texture_attribute_by_id(unit, token.id())
    }

    pub fn remove_texture_attribute(
        &mut self,
        unit: u32,
        token: &AttributeTypeToken,
    ) -> Option<AttributePair> {
        let pos = self
            .texture_units
            .binary_search_by_key(&unit, |(u, _)| *u)
            .ok()?;
        let slot = &mut self.texture_units[pos].1;
        let removed = clear_slot(&mut slot.attributes, &mut slot.active, token.id())?;
        if slot.active.is_empty() {
            self.texture_units.remove(pos);
        }
        Some(removed)
    }

    #[inline]
    #[must_use]
    pub fn texture_attribute_by_id(&self, unit: u32, id: AttributeTypeId) -> Option<&AttributePair> {
        self.texture_unit(unit)
            .and_then(|slot| slot.attributes.get(id.index()))
            .and_then(Option::as_ref)
    }

    /// Units with at least one texture attribute, ascending.
    pub fn texture_units(&self) -> impl DoubleEndedIterator<Item = u32> + '_ {
        self.texture_units.iter().map(|(unit, _)| *unit)
    }

    /// Declared texture attributes of `unit` in declaration order.
    pub fn texture_attributes(
        &self,
        unit: u32,
    ) -> impl Iterator<Item = (AttributeTypeId, &AttributePair)> + '_ {
        self.texture_unit(unit)
            .into_iter()
            .flat_map(move |slot| {
                slot.active.iter().filter_map(move |&id| {
                    slot.attributes
                        .get(id.index())
                        .and_then(Option::as_ref)
                        .map(|pair| (id, pair))
                })
            })
    }

    /// One past the highest texture type id declared on `unit`.
    #[must_use]
    pub fn texture_attribute_capacity(&self, unit: u32) -> usize {
        self.texture_unit(unit)
            .map_or(0, |slot| slot.attributes.len())
    }

    // ── Uniforms ─────────────────────────────────────────────────────────────

    pub fn add_uniform(&mut self, uniform: Uniform) {
        self.add_uniform_with_mask(uniform, OverrideMask::ON);
    }

    pub fn add_uniform_with_mask(&mut self, uniform: Uniform, mask: OverrideMask) {
        let name = uniform.symbol();
        if self
            .uniforms
            .insert(name, UniformPair { uniform, mask })
            .is_none()
        {
            self.uniform_order.push(name);
        }
    }

    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<&UniformPair> {
        interner::get(name).and_then(|sym| self.uniforms.get(&sym))
    }

    pub fn remove_uniform(&mut self, name: &str) -> Option<UniformPair> {
        let sym = interner::get(name)?;
        let removed = self.uniforms.remove(&sym)?;
        self.uniform_order.retain(|&s| s != sym);
        Some(removed)
    }

    /// Declared uniforms in declaration order.
    pub fn uniforms(&self) -> impl Iterator<Item = (Symbol, &UniformPair)> + '_ {
        self.uniform_order
            .iter()
            .filter_map(|sym| self.uniforms.get(sym).map(|pair| (*sym, pair)))
    }

    // ── Shader generator ─────────────────────────────────────────────────────

    pub fn set_shader_generator_name(&mut self, name: &str) {
        self.set_shader_generator_name_with_mask(name, OverrideMask::ON);
    }

    pub fn set_shader_generator_name_with_mask(&mut self, name: &str, mask: OverrideMask) {
        self.generator = Some((interner::intern(name), mask));
    }

    pub fn clear_shader_generator_name(&mut self) {
        self.generator = None;
    }

    #[must_use]
    pub fn shader_generator_name(&self) -> Option<&'static str> {
        self.generator.map(|(sym, _)| interner::resolve(sym))
    }

    #[inline]
    #[must_use]
    pub fn shader_generator(&self) -> Option<(Symbol, OverrideMask)> {
        self.generator
    }

    // ── Draw id ──────────────────────────────────────────────────────────────

    /// Id of the last draw this state set was stamped with while pushed.
    #[inline]
    #[must_use]
    pub fn draw_id(&self) -> Option<u32> {
        self.draw_id.get()
    }

    #[inline]
    pub(crate) fn set_draw_id(&self, id: u32) {
        self.draw_id.set(Some(id));
    }
}
