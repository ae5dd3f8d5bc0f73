//! Frame-global uniforms.
//!
//! Transform matrices and the vertex colour flag are owned by the frame, not
//! by attributes, and are uploaded straight to the current program. They are
//! never listed as a generated program's foreign uniforms.

use std::sync::LazyLock;

use glam::{Mat3, Mat4};
use rustc_hash::FxHashMap;

use crate::driver::{GraphicsDriver, ProgramHandle};
use crate::shader::program::LinkedProgram;
use crate::uniform::UniformValue;
use crate::utils::interner::{self, Symbol};

pub const MODEL_VIEW_MATRIX: &str = "uModelViewMatrix";
pub const MODEL_MATRIX: &str = "uModelMatrix";
pub const VIEW_MATRIX: &str = "uViewMatrix";
pub const PROJECTION_MATRIX: &str = "uProjectionMatrix";
pub const MODEL_VIEW_NORMAL_MATRIX: &str = "uModelViewNormalMatrix";
pub const ARRAY_COLOR_ENABLED: &str = "uArrayColorEnabled";

/// Vertex attribute that must exist for the vertex colour flag to matter.
pub const COLOR_ATTRIBUTE: &str = "Color";

struct FrameSymbols {
    model_view: Symbol,
    projection: Symbol,
    normal: Symbol,
    array_color: Symbol,
    all: [Symbol; 6],
}

static SYMBOLS: LazyLock<FrameSymbols> = LazyLock::new(|| {
    let model_view = interner::intern(MODEL_VIEW_MATRIX);
    let projection = interner::intern(PROJECTION_MATRIX);
    let normal = interner::intern(MODEL_VIEW_NORMAL_MATRIX);
    let array_color = interner::intern(ARRAY_COLOR_ENABLED);
    FrameSymbols {
        model_view,
        projection,
        normal,
        array_color,
        all: [
            model_view,
            interner::intern(MODEL_MATRIX),
            interner::intern(VIEW_MATRIX),
            projection,
            normal,
            array_color,
        ],
    }
});

/// Whether `name` is managed by the frame rather than by attributes.
#[must_use]
pub fn is_frame_uniform(name: Symbol) -> bool {
    SYMBOLS.all.contains(&name)
}

/// Last matrices uploaded to the current program, and the vertex colour flag
/// per program.
#[derive(Debug, Default)]
pub struct FrameUniforms {
    program: Option<ProgramHandle>,
    model_view: Option<Mat4>,
    normal_basis: Option<Mat3>,
    projection: Option<Mat4>,
    vertex_color: FxHashMap<ProgramHandle, bool>,
}

impl FrameUniforms {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets the last uploaded matrices.
    pub fn reset(&mut self) {
        self.model_view = None;
        self.normal_basis = None;
        self.projection = None;
    }

    /// Records the program now bound; a different program starts with an
    /// empty matrix cache.
    pub fn bind_program(&mut self, program: Option<ProgramHandle>) {
        if self.program != program {
            self.program = program;
            self.reset();
        }
    }

    /// Uploads `matrix` as the model-view matrix. The normal matrix is
    /// recomputed only when the upper 3x3 changed.
    pub fn apply_model_view(
        &mut self,
        driver: &mut dyn GraphicsDriver,
        program: &LinkedProgram,
        matrix: Mat4,
    ) {
        if self.model_view == Some(matrix) {
            return;
        }
        self.model_view = Some(matrix);
        if let Some(location) = program.uniform_location(SYMBOLS.model_view) {
            driver.upload_uniform(location, &UniformValue::Mat4(matrix));
        }

        let basis = Mat3::from_mat4(matrix);
        if self.normal_basis == Some(basis) {
            return;
        }
        self.normal_basis = Some(basis);
        if let Some(location) = program.uniform_location(SYMBOLS.normal) {
            let normal = Mat4::from_mat3(basis).inverse().transpose();
            driver.upload_uniform(location, &UniformValue::Mat4(normal));
        }
    }

    pub fn apply_projection(
        &mut self,
        driver: &mut dyn GraphicsDriver,
        program: &LinkedProgram,
        matrix: Mat4,
    ) {
        if self.projection == Some(matrix) {
            return;
        }
        self.projection = Some(matrix);
        if let Some(location) = program.uniform_location(SYMBOLS.projection) {
            driver.upload_uniform(location, &UniformValue::Mat4(matrix));
        }
    }

    /// Uploads the vertex colour flag when it differs from the last value
    /// sent to this program. Programs without both the flag uniform and a
    /// colour attribute are left alone.
    pub fn set_vertex_color(
        &mut self,
        driver: &mut dyn GraphicsDriver,
        program: &LinkedProgram,
        enabled: bool,
    ) {
        let Some(location) = program.uniform_location(SYMBOLS.array_color) else {
            return;
        };
        if program.attribute_slot(COLOR_ATTRIBUTE).is_none() {
            return;
        }
        let previous = self.vertex_color.entry(program.handle()).or_insert(false);
        if *previous == enabled {
            return;
        }
        *previous = enabled;
        let value = if enabled { 1.0 } else { 0.0 };
        driver.upload_uniform(location, &UniformValue::Float(value));
    }
}
