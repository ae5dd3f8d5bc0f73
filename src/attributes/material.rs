use std::rc::Rc;

use glam::Vec4;

use crate::attribute::{
    ApplyContext, AttributeKind, AttributeRef, AttributeTypeToken, Capabilities, StateAttribute,
};
use crate::errors::Result;
use crate::shader::defines::ShaderDefines;
use crate::uniform::{Uniform, UniformMap, UniformValue};

pub static MATERIAL_TYPE: AttributeTypeToken = AttributeTypeToken::new(
    "Material",
    AttributeKind::Ordinary,
    Capabilities::APPLY.union(Capabilities::UNIFORMS),
);

/// Fixed-function style surface colours.
///
/// All values travel through uniforms, so every material shares one content
/// hash and one generated program.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub emission: Vec4,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vec4::new(0.2, 0.2, 0.2, 1.0),
            diffuse: Vec4::new(0.8, 0.8, 0.8, 1.0),
            specular: Vec4::new(0.0, 0.0, 0.0, 1.0),
            emission: Vec4::new(0.0, 0.0, 0.0, 1.0),
            shininess: 12.5,
        }
    }
}

impl Material {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ambient(mut self, ambient: Vec4) -> Self {
        self.ambient = ambient;
        self
    }

    #[must_use]
    pub fn with_diffuse(mut self, diffuse: Vec4) -> Self {
        self.diffuse = diffuse;
        self
    }

    #[must_use]
    pub fn with_specular(mut self, specular: Vec4) -> Self {
        self.specular = specular;
        self
    }

    #[must_use]
    pub fn with_emission(mut self, emission: Vec4) -> Self {
        self.emission = emission;
        self
    }

    #[must_use]
    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess;
        self
    }

    #[must_use]
    pub fn into_ref(self) -> AttributeRef {
        Rc::new(self)
    }
}

impl StateAttribute for Material {
    fn attribute_type(&self) -> &'static AttributeTypeToken {
        &MATERIAL_TYPE
    }

    fn clone_type(&self) -> AttributeRef {
        Rc::new(Material::default())
    }

    fn apply(&self, ctx: &mut ApplyContext<'_>) -> Result<()> {
        ctx.set_uniform("uMaterialAmbient", UniformValue::Vec4(self.ambient));
        ctx.set_uniform("uMaterialDiffuse", UniformValue::Vec4(self.diffuse));
        ctx.set_uniform("uMaterialSpecular", UniformValue::Vec4(self.specular));
        ctx.set_uniform("uMaterialEmission", UniformValue::Vec4(self.emission));
        ctx.set_uniform("uMaterialShininess", UniformValue::Float(self.shininess));
        Ok(())
    }

    fn create_uniforms(&self, _unit: Option<u32>) -> Option<UniformMap> {
        Some(
            UniformMap::new()
                .with(Uniform::vec4("uMaterialAmbient", self.ambient))
                .with(Uniform::vec4("uMaterialDiffuse", self.diffuse))
                .with(Uniform::vec4("uMaterialSpecular", self.specular))
                .with(Uniform::vec4("uMaterialEmission", self.emission))
                .with(Uniform::float("uMaterialShininess", self.shininess)),
        )
    }

    fn shader_defines(&self, _unit: Option<u32>, defines: &mut ShaderDefines) {
        defines.set_flag("HAS_MATERIAL");
    }
}
