use std::hash::{Hash, Hasher};
use std::rc::Rc;

use glam::{Vec3, Vec4};
use rustc_hash::FxHasher;

use crate::attribute::{
    ApplyContext, AttributeKind, AttributeRef, AttributeTypeToken, Capabilities, StateAttribute,
};
use crate::errors::Result;
use crate::shader::defines::ShaderDefines;
use crate::uniform::{Uniform, UniformMap, UniformValue};

/// Maximum number of simultaneous lights.
pub const MAX_LIGHTS: usize = 8;

const LIGHT_CAPS: Capabilities = Capabilities::APPLY
    .union(Capabilities::UNIFORMS)
    .union(Capabilities::ENABLE_QUERY);

/// One attribute type per light index, so each index has its own stack.
pub static LIGHT_TYPES: [AttributeTypeToken; MAX_LIGHTS] = [
    AttributeTypeToken::new("Light0", AttributeKind::Ordinary, LIGHT_CAPS),
    AttributeTypeToken::new("Light1", AttributeKind::Ordinary, LIGHT_CAPS),
    AttributeTypeToken::new("Light2", AttributeKind::Ordinary, LIGHT_CAPS),
    AttributeTypeToken::new("Light3", AttributeKind::Ordinary, LIGHT_CAPS),
    AttributeTypeToken::new("Light4", AttributeKind::Ordinary, LIGHT_CAPS),
    AttributeTypeToken::new("Light5", AttributeKind::Ordinary, LIGHT_CAPS),
    AttributeTypeToken::new("Light6", AttributeKind::Ordinary, LIGHT_CAPS),
    AttributeTypeToken::new("Light7", AttributeKind::Ordinary, LIGHT_CAPS),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LightKind {
    #[default]
    Directional,
    Point,
    Spot,
}

impl LightKind {
    fn define_value(self) -> &'static str {
        match self {
            Self::Directional => "DIRECTIONAL",
            Self::Point => "POINT",
            Self::Spot => "SPOT",
        }
    }
}

/// A light source bound to one of [`MAX_LIGHTS`] indices.
///
/// The kind and the enabled flag change the generated shader; colours and
/// placement only flow through uniforms.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    index: u8,
    pub kind: LightKind,
    pub enabled: bool,
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    /// View-space position.
    pub position: Vec4,
    /// View-space direction for directional and spot lights.
    pub direction: Vec3,
    /// Cosine of the spot cone half-angle.
    pub spot_cut_off: f32,
}

impl Light {
    /// A white directional light on `index`.
    ///
    /// Indices past [`MAX_LIGHTS`] are clamped to the last one.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index: index.min(MAX_LIGHTS - 1) as u8,
            kind: LightKind::Directional,
            enabled: true,
            ambient: Vec4::new(0.2, 0.2, 0.2, 1.0),
            diffuse: Vec4::new(0.8, 0.8, 0.8, 1.0),
            specular: Vec4::new(0.2, 0.2, 0.2, 1.0),
            position: Vec4::new(0.0, 0.0, 1.0, 0.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
            spot_cut_off: 0.9,
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        usize::from(self.index)
    }

    #[must_use]
    pub fn with_kind(mut self, kind: LightKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_diffuse(mut self, diffuse: Vec4) -> Self {
        self.diffuse = diffuse;
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: Vec4) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn into_ref(self) -> AttributeRef {
        Rc::new(self)
    }

    fn uniform_name(&self, field: &str) -> String {
        format!("uLight{}_{field}", self.index)
    }
}

impl StateAttribute for Light {
    fn attribute_type(&self) -> &'static AttributeTypeToken {
        &LIGHT_TYPES[self.index()]
    }

    fn clone_type(&self) -> AttributeRef {
        Rc::new(Light::new(self.index()).with_enabled(false))
    }

    fn content_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.attribute_type().name().hash(&mut hasher);
        self.kind.hash(&mut hasher);
        self.enabled.hash(&mut hasher);
        hasher.finish()
    }

    fn apply(&self, ctx: &mut ApplyContext<'_>) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        ctx.set_uniform(&self.uniform_name("Ambient"), UniformValue::Vec4(self.ambient));
        ctx.set_uniform(&self.uniform_name("Diffuse"), UniformValue::Vec4(self.diffuse));
        ctx.set_uniform(&self.uniform_name("Specular"), UniformValue::Vec4(self.specular));
        ctx.set_uniform(&self.uniform_name("Position"), UniformValue::Vec4(self.position));
        ctx.set_uniform(&self.uniform_name("Direction"), UniformValue::Vec3(self.direction));
        ctx.set_uniform(&self.uniform_name("SpotCutOff"), UniformValue::Float(self.spot_cut_off));
        Ok(())
    }

    fn create_uniforms(&self, _unit: Option<u32>) -> Option<UniformMap> {
        Some(
            UniformMap::new()
                .with(Uniform::vec4(&self.uniform_name("Ambient"), self.ambient))
                .with(Uniform::vec4(&self.uniform_name("Diffuse"), self.diffuse))
                .with(Uniform::vec4(&self.uniform_name("Specular"), self.specular))
                .with(Uniform::vec4(&self.uniform_name("Position"), self.position))
                .with(Uniform::vec3(&self.uniform_name("Direction"), self.direction))
                .with(Uniform::float(&self.uniform_name("SpotCutOff"), self.spot_cut_off)),
        )
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn shader_defines(&self, _unit: Option<u32>, defines: &mut ShaderDefines) {
        defines.set_flag("HAS_LIGHTING");
        defines.set(&format!("LIGHT{}", self.index), self.kind.define_value());
    }
}
