//! Built-in Attributes
//!
//! | Attribute | Kind | Shader | Driver |
//! |-----------|------|--------|--------|
//! | [`Material`] | ordinary | surface colour uniforms | none |
//! | [`Light`] | ordinary, one type per index | lighting code + uniforms | none |
//! | [`Texture`] | texture | sampler per unit | bind / unbind |
//! | [`BlendFunc`] | ordinary | none | blend state |
//! | [`CullFace`] | ordinary | none | cull state |
//!
//! [`Program`](crate::shader::Program) is an attribute as well and lives in
//! the shader module.

pub mod fixed;
pub mod light;
pub mod material;
pub mod texture;

pub use fixed::{BLEND_FUNC_TYPE, BlendFunc, CULL_FACE_TYPE, CullFace};
pub use light::{LIGHT_TYPES, Light, LightKind, MAX_LIGHTS};
pub use material::{MATERIAL_TYPE, Material};
pub use texture::{TEXTURE_TYPE, Texture};
