use std::rc::Rc;

use crate::attribute::{
    ApplyContext, AttributeKind, AttributeRef, AttributeTypeToken, Capabilities, StateAttribute,
};
use crate::driver::TextureHandle;
use crate::errors::Result;
use crate::shader::defines::ShaderDefines;
use crate::uniform::{Uniform, UniformMap};

pub static TEXTURE_TYPE: AttributeTypeToken = AttributeTypeToken::new(
    "Texture",
    AttributeKind::Texture,
    Capabilities::APPLY
        .union(Capabilities::UNIFORMS)
        .union(Capabilities::TEXTURE_NULL_QUERY),
);

/// 绑定到纹理单元的 2D 纹理
///
/// 没有句柄的纹理会解绑其所在单元，且不参与着色器生成。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Texture {
    handle: Option<TextureHandle>,
}

impl Texture {
    #[must_use]
    pub fn new(handle: TextureHandle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    #[must_use]
    pub fn null() -> Self {
        Self { handle: None }
    }

    #[must_use]
    pub fn handle(&self) -> Option<TextureHandle> {
        self.handle
    }

    #[must_use]
    pub fn into_ref(self) -> AttributeRef {
        Rc::new(self)
    }
}

impl StateAttribute for Texture {
    fn attribute_type(&self) -> &'static AttributeTypeToken {
        &TEXTURE_TYPE
    }

    fn clone_type(&self) -> AttributeRef {
        Rc::new(Texture::null())
    }

    fn apply(&self, ctx: &mut ApplyContext<'_>) -> Result<()> {
        ctx.driver.bind_texture(self.handle);
        Ok(())
    }

    // 采样器名称随单元变化: Texture0, Texture1, ...
    fn create_uniforms(&self, unit: Option<u32>) -> Option<UniformMap> {
        let unit = unit.unwrap_or(0);
        Some(UniformMap::new().with(Uniform::sampler(&format!("Texture{unit}"), unit)))
    }

    fn is_texture_null(&self) -> bool {
        self.handle.is_none()
    }

    fn shader_defines(&self, unit: Option<u32>, defines: &mut ShaderDefines) {
        defines.set_flag(&format!("HAS_TEXTURE{}", unit.unwrap_or(0)));
    }
}
