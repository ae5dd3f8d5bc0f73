//! State Attributes
//!
//! An attribute is one typed piece of render state: a material, a light, a
//! blend mode, a texture, a program. The engine sees attributes only through
//! the [`StateAttribute`] trait.
//!
//! # Identity
//!
//! Change detection compares attributes by identity ([`AttributeRef`] is an
//! `Rc`, compared with `Rc::ptr_eq`), never by value. Attributes are
//! therefore treated as immutable once shared: to change one, build a new
//! instance and put it in the state set. An attribute mutated in place behind
//! a shared handle is not re-applied.
//!
//! # Override masks
//!
//! Every attribute, uniform and generator name placed in a
//! [`StateSet`](crate::state::StateSet) carries an [`OverrideMask`]:
//!
//! | Bit | Meaning |
//! |-----|---------|
//! | `ON` | The entry is active. A program pushed with an empty mask does not count as a custom program. |
//! | `OVERRIDE` | Descendants cannot replace this value. |
//! | `PROTECTED` | This value replaces an ancestor's `OVERRIDE`. |

pub mod registry;

pub use registry::{
    AttributeKind, AttributeTypeId, AttributeTypeToken, Capabilities, attribute_type_name,
    lookup_attribute_type, register_attribute_type, registered_type_count,
};

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use xxhash_rust::xxh3::xxh3_64;

use crate::driver::GraphicsDriver;
use crate::errors::Result;
use crate::shader::defines::ShaderDefines;
use crate::shader::program::Program;
use crate::uniform::{UniformMap, UniformValue};

bitflags! {
    /// Cascade precedence of a state-set entry.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct OverrideMask: u8 {
        const ON        = 1 << 0;
        const OVERRIDE  = 1 << 1;
        const PROTECTED = 1 << 2;
    }
}

impl OverrideMask {
    pub const OFF: Self = Self::empty();

    #[inline]
    #[must_use]
    pub fn is_off(self) -> bool {
        self.is_empty()
    }
}

/// Shared handle to an attribute instance.
pub type AttributeRef = Rc<dyn StateAttribute>;

/// Everything an attribute may touch while applying itself.
pub struct ApplyContext<'a> {
    pub driver: &'a mut dyn GraphicsDriver,
    /// Texture unit for texture attributes. The unit is already active.
    pub unit: Option<u32>,
    /// The type-shared uniforms of the attribute's type on `unit`, for types
    /// with the `UNIFORMS` capability.
    pub uniforms: Option<&'a UniformMap>,
}

impl ApplyContext<'_> {
    /// Writes `value` into the shared uniform `name`. No-op when the type has
    /// no uniform of that name.
    pub fn set_uniform(&self, name: &str, value: UniformValue) {
        if let Some(uniform) = self.uniforms.and_then(|map| map.get(name)) {
            uniform.set(value);
        }
    }
}

/// The contract every attribute participating in state must fulfil.
///
/// Only [`attribute_type`](Self::attribute_type) and
/// [`clone_type`](Self::clone_type) are required. The remaining methods are
/// called only when the type's token declares the matching
/// [`Capabilities`].
pub trait StateAttribute: fmt::Debug {
    /// The static declaration of this attribute's type.
    fn attribute_type(&self) -> &'static AttributeTypeToken;

    /// A default-valued instance of the same type, used as the global default
    /// of a stack created for this type.
    fn clone_type(&self) -> AttributeRef;

    /// Summary of everything in this instance that changes generated shader
    /// code. Equal hashes must produce equal shaders.
    ///
    /// Values that only flow through uniforms must stay out of the hash.
    fn content_hash(&self) -> u64 {
        type_hash(self.attribute_type())
    }

    fn apply(&self, _ctx: &mut ApplyContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Builds the uniforms of this type on `unit`. Called once per
    /// (type, unit); the result is shared by every instance of the type.
    fn create_uniforms(&self, _unit: Option<u32>) -> Option<UniformMap> {
        None
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn is_texture_null(&self) -> bool {
        false
    }

    /// Adds the shader defines this instance needs to `defines`.
    fn shader_defines(&self, _unit: Option<u32>, _defines: &mut ShaderDefines) {}

    /// Downcast for the program attribute.
    fn as_program(&self) -> Option<&Program> {
        None
    }
}

/// Content hash shared by every instance of a type whose shader code does not
/// depend on instance values.
#[inline]
#[must_use]
pub fn type_hash(token: &AttributeTypeToken) -> u64 {
    xxh3_64(token.name().as_bytes())
}

/// Whether `attribute` contributes to shader fingerprints.
#[must_use]
pub fn is_shader_active(attribute: &dyn StateAttribute) -> bool {
    let caps = attribute.attribute_type().capabilities();
    if caps.contains(Capabilities::ENABLE_QUERY) && !attribute.is_enabled() {
        return false;
    }
    if caps.contains(Capabilities::TEXTURE_NULL_QUERY) && attribute.is_texture_null() {
        return false;
    }
    true
}
