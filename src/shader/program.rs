//! Programs
//!
//! A [`Program`] is both a compiled shader unit and an attribute: it sits on
//! its own stack like any other attribute, and applying it binds it on the
//! driver.
//!
//! There are three flavours:
//!
//! - the **empty** program, global default of the program stack, which
//!   unbinds any program;
//! - **custom** programs, written by hand and placed in a state set. They are
//!   compiled lazily the first time they are applied and receive uniforms by
//!   name from the uniform stacks or from the attributes they track;
//! - **generated** programs, built and compiled by a
//!   [`ShaderGenerator`](super::generator::ShaderGenerator) for one active
//!   attribute fingerprint.

use std::cell::OnceCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::attribute::{
    ApplyContext, AttributeKind, AttributeRef, AttributeTypeToken, Capabilities, StateAttribute,
};
use crate::driver::{CompiledProgram, GraphicsDriver, ProgramHandle, UniformLocation};
use crate::errors::{Result, StateError};
use crate::shader::ids::{ProgramFingerprint, UniformCacheSlot};
use crate::uniform::{Uniform, UniformMap};
use crate::utils::interner::{self, Symbol};

pub static PROGRAM_TYPE: AttributeTypeToken =
    AttributeTypeToken::new("Program", AttributeKind::Ordinary, Capabilities::APPLY);

/// Vertex and fragment source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
}

/// Driver-side view of a successfully linked program.
#[derive(Debug)]
pub struct LinkedProgram {
    handle: ProgramHandle,
    uniforms: Vec<(Symbol, UniformLocation)>,
    attributes: FxHashMap<Symbol, u32>,
}

impl LinkedProgram {
    fn from_compiled(compiled: CompiledProgram) -> Self {
        Self {
            handle: compiled.handle,
            uniforms: compiled
                .uniforms
                .iter()
                .map(|(name, loc)| (interner::intern(name), *loc))
                .collect(),
            attributes: compiled
                .attributes
                .iter()
                .map(|(name, slot)| (interner::intern(name), *slot))
                .collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    /// Declared uniforms in declaration order.
    #[inline]
    #[must_use]
    pub fn uniforms(&self) -> &[(Symbol, UniformLocation)] {
        &self.uniforms
    }

    #[must_use]
    pub fn uniform_location(&self, name: Symbol) -> Option<UniformLocation> {
        self.uniforms
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, loc)| *loc)
    }

    #[must_use]
    pub fn has_uniform(&self, name: &str) -> bool {
        interner::get(name).is_some_and(|sym| self.uniform_location(sym).is_some())
    }

    #[must_use]
    pub fn attribute_slot(&self, name: &str) -> Option<u32> {
        interner::get(name).and_then(|sym| self.attributes.get(&sym).copied())
    }
}

#[derive(Debug)]
pub(crate) struct GeneratedInfo {
    pub(crate) fingerprint: ProgramFingerprint,
    pub(crate) generator: Symbol,
    pub(crate) active_uniforms: UniformMap,
}

/// Upload plan of a program, built the first time its uniforms are applied.
#[derive(Debug)]
pub(crate) struct ProgramBinding {
    pub(crate) slot: UniformCacheSlot,
    /// Attribute uniforms the program declares, with their shared handles.
    pub(crate) active: Vec<(UniformLocation, Uniform)>,
    /// Other declared uniforms, resolved by name at apply time.
    pub(crate) foreign: Vec<(UniformLocation, Symbol)>,
}

#[derive(Debug)]
pub struct Program {
    label: String,
    source: Option<ShaderSource>,
    linked: OnceCell<Result<LinkedProgram>>,
    generated: Option<GeneratedInfo>,
    track_attributes: Vec<&'static AttributeTypeToken>,
    track_texture_attributes: Vec<(u32, &'static AttributeTypeToken)>,
    pub(crate) binding: OnceCell<ProgramBinding>,
    pub(crate) tracked_uniforms: OnceCell<FxHashMap<Symbol, Uniform>>,
}

impl Program {
    /// A hand-written program, compiled on first apply.
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        vertex: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Self {
        Self::with_parts(
            label.into(),
            Some(ShaderSource {
                vertex: vertex.into(),
                fragment: fragment.into(),
            }),
            None,
        )
    }

    /// The program that unbinds any program.
    #[must_use]
    pub fn empty() -> Self {
        Self::with_parts("empty".to_string(), None, None)
    }

    pub(crate) fn generated(
        label: String,
        source: ShaderSource,
        linked: CompiledProgram,
        info: GeneratedInfo,
    ) -> Self {
        let program = Self::with_parts(label, Some(source), Some(info));
        let _ = program
            .linked
            .set(Ok(LinkedProgram::from_compiled(linked)));
        program
    }

    fn with_parts(label: String, source: Option<ShaderSource>, generated: Option<GeneratedInfo>) -> Self {
        Self {
            label,
            source,
            linked: OnceCell::new(),
            generated,
            track_attributes: Vec::new(),
            track_texture_attributes: Vec::new(),
            binding: OnceCell::new(),
            tracked_uniforms: OnceCell::new(),
        }
    }

    /// Feeds the uniforms of `types` to this custom program.
    ///
    /// Texture attribute types are tracked on unit 0; use
    /// [`track_texture_attribute`](Self::track_texture_attribute) for other units.
    #[must_use]
    pub fn track_attributes(mut self, types: &[&'static AttributeTypeToken]) -> Self {
        for token in types {
            match token.kind() {
                AttributeKind::Ordinary => self.track_attributes.push(token),
                AttributeKind::Texture => self.track_texture_attributes.push((0, token)),
            }
        }
        self
    }

    #[must_use]
    pub fn track_texture_attribute(mut self, unit: u32, token: &'static AttributeTypeToken) -> Self {
        self.track_texture_attributes.push((unit, token));
        self
    }

    #[must_use]
    pub fn into_ref(self) -> AttributeRef {
        Rc::new(self)
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> Option<&ShaderSource> {
        self.source.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source.is_none()
    }

    #[inline]
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.generated.is_some()
    }

    #[must_use]
    pub fn fingerprint(&self) -> Option<ProgramFingerprint> {
        self.generated.as_ref().map(|g| g.fingerprint)
    }

    /// Name of the generator that built this program.
    #[must_use]
    pub fn generator_name(&self) -> Option<&'static str> {
        self.generated.as_ref().map(|g| interner::resolve(g.generator))
    }

    /// Union of the uniforms contributed by the attributes this program was
    /// generated for.
    #[must_use]
    pub fn active_uniforms(&self) -> Option<&UniformMap> {
        self.generated.as_ref().map(|g| &g.active_uniforms)
    }

    /// Names of the declared uniforms that are not frame matrices and not
    /// contributed by an attribute. Empty until the program was first applied.
    #[must_use]
    pub fn foreign_uniforms(&self) -> Vec<&'static str> {
        self.binding
            .get()
            .map(|b| b.foreign.iter().map(|(_, s)| interner::resolve(*s)).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn tracked_attribute_types(&self) -> &[&'static AttributeTypeToken] {
        &self.track_attributes
    }

    #[must_use]
    pub fn tracked_texture_attribute_types(&self) -> &[(u32, &'static AttributeTypeToken)] {
        &self.track_texture_attributes
    }

    /// The linked program, if linking already happened and succeeded.
    #[must_use]
    pub fn linked(&self) -> Option<&LinkedProgram> {
        self.linked.get().and_then(|r| r.as_ref().ok())
    }

    /// Compiles and links on first call. A failed link is remembered and
    /// returned again without recompiling.
    pub fn link(&self, driver: &mut dyn GraphicsDriver) -> Result<&LinkedProgram> {
        let Some(source) = &self.source else {
            return Err(StateError::ProgramLink {
                label: self.label.clone(),
                message: "program has no source".to_string(),
            });
        };

        self.linked
            .get_or_init(|| {
                driver
                    .compile_program(&source.vertex, &source.fragment)
                    .map(LinkedProgram::from_compiled)
                    .map_err(|message| {
                        log::error!("Failed to link program '{}': {message}", self.label);
                        StateError::ProgramLink {
                            label: self.label.clone(),
                            message,
                        }
                    })
            })
            .as_ref()
            .map_err(Clone::clone)
    }
}

impl StateAttribute for Program {
    fn attribute_type(&self) -> &'static AttributeTypeToken {
        &PROGRAM_TYPE
    }

    fn clone_type(&self) -> AttributeRef {
        Rc::new(Program::empty())
    }

    fn apply(&self, ctx: &mut ApplyContext<'_>) -> Result<()> {
        if self.is_empty() {
            ctx.driver.use_program(None);
            return Ok(());
        }
        let handle = self.link(ctx.driver)?.handle();
        ctx.driver.use_program(Some(handle));
        Ok(())
    }

    fn as_program(&self) -> Option<&Program> {
        Some(self)
    }
}
