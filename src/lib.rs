#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Render-state reconciliation and generated shader program caching.
//!
//! A scene traversal pushes and pops [`StateSet`]s on a [`StateFrame`].
//! Before each draw, [`StateFrame::apply`] sends the driver only what changed
//! since the last draw: attributes are compared by identity, a program is
//! picked (custom, or generated from the active attributes and cached by
//! fingerprint) and uniforms are uploaded only when their bits changed.

pub mod attribute;
pub mod attributes;
pub mod driver;
pub mod errors;
pub mod settings;
pub mod shader;
pub mod state;
pub mod uniform;
pub mod utils;

pub use attribute::{
    AttributeKind, AttributeRef, AttributeTypeToken, Capabilities, OverrideMask, StateAttribute,
};
pub use attributes::{BlendFunc, CullFace, Light, LightKind, Material, Texture};
pub use driver::{GraphicsDriver, RecordingDriver};
pub use errors::{Result, StateError};
pub use settings::StateSettings;
pub use shader::{Program, ProgramFingerprint, ShaderBuilder, ShaderDefines, TemplateShaderBuilder};
pub use state::{StateFrame, StateSet, StateSetRef, StateStats};
pub use uniform::{Uniform, UniformMap, UniformValue};
pub use utils::interner;
