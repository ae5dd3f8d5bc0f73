//! Shader Programs
//!
//! - [`program`]: the [`Program`] attribute (custom, generated, empty)
//! - [`generator`]: fingerprint → program cache and the generator registry
//! - [`builder`]: the source builder contract and the template builder
//! - [`defines`]: `#define` sets contributed by attributes
//! - [`ids`]: fingerprint and cache-slot newtypes

pub mod builder;
pub mod defines;
pub mod generator;
pub mod ids;
pub mod program;

pub use builder::{ActiveAttribute, ShaderBuildInput, ShaderBuilder, TemplateShaderBuilder};
pub use defines::ShaderDefines;
pub use generator::{ShaderGenerator, ShaderGenerators};
pub use ids::{ProgramFingerprint, UniformCacheSlot};
pub use program::{LinkedProgram, PROGRAM_TYPE, Program, ShaderSource};
