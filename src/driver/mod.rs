//! Graphics Driver Boundary
//!
//! The state engine never talks to a graphics API directly. Everything it
//! needs from the hardware goes through [`GraphicsDriver`], one instance per
//! graphics context. All calls for a frame are issued from the thread that
//! owns that context.
//!
//! Handles returned by the driver are opaque `Copy` newtypes; the engine only
//! stores and compares them.

pub mod recording;

pub use recording::{DriverCall, RecordingDriver};

use crate::uniform::UniformValue;

/// Driver-side handle of a linked program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u32);

/// Driver-side handle of a texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Location of a uniform inside one linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation(pub u32);

/// Blend factors understood by [`FixedState::Blend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    SrcColor,
    OneMinusSrcColor,
}

/// Polygon faces understood by [`FixedState::CullFace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Front,
    Back,
    FrontAndBack,
}

/// Non-shader pipeline state an attribute can set.
///
/// `None` payloads disable the corresponding feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedState {
    /// Source / destination blend factors.
    Blend(Option<(BlendFactor, BlendFactor)>),
    /// Face culling.
    CullFace(Option<Face>),
}

/// Result of a successful program link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledProgram {
    /// Handle to pass back to [`GraphicsDriver::use_program`].
    pub handle: ProgramHandle,
    /// Every active uniform of the program with its location.
    pub uniforms: Vec<(String, UniformLocation)>,
    /// Every active vertex attribute of the program with its slot.
    pub attributes: Vec<(String, u32)>,
}

/// The graphics API surface the engine issues calls against.
pub trait GraphicsDriver {
    /// Makes `program` current. `None` unbinds any program.
    fn use_program(&mut self, program: Option<ProgramHandle>);

    /// Selects the texture unit subsequent texture binds apply to.
    fn active_texture(&mut self, unit: u32);

    /// Binds `texture` to the active unit. `None` unbinds it.
    fn bind_texture(&mut self, texture: Option<TextureHandle>);

    /// Uploads a uniform value to the current program.
    fn upload_uniform(&mut self, location: UniformLocation, value: &UniformValue);

    /// Compiles and links a program. The error string is the driver log.
    fn compile_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> std::result::Result<CompiledProgram, String>;

    fn enable_vertex_attrib_array(&mut self, slot: u32);

    fn disable_vertex_attrib_array(&mut self, slot: u32);

    /// Sets fixed-function pipeline state.
    fn apply_fixed_state(&mut self, state: FixedState);
}
