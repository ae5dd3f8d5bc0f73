//! Attributes that only set fixed-function pipeline state.
//!
//! None of these take part in shader generation.

use std::rc::Rc;

use crate::attribute::{
    ApplyContext, AttributeKind, AttributeRef, AttributeTypeToken, Capabilities, StateAttribute,
};
use crate::driver::{BlendFactor, Face, FixedState};
use crate::errors::Result;

pub static BLEND_FUNC_TYPE: AttributeTypeToken =
    AttributeTypeToken::new("BlendFunc", AttributeKind::Ordinary, Capabilities::APPLY);

pub static CULL_FACE_TYPE: AttributeTypeToken =
    AttributeTypeToken::new("CullFace", AttributeKind::Ordinary, Capabilities::APPLY);

/// Blending. `None` disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlendFunc {
    pub factors: Option<(BlendFactor, BlendFactor)>,
}

impl BlendFunc {
    #[must_use]
    pub fn new(source: BlendFactor, destination: BlendFactor) -> Self {
        Self {
            factors: Some((source, destination)),
        }
    }

    /// Standard `src_alpha, one_minus_src_alpha` blending.
    #[must_use]
    pub fn alpha() -> Self {
        Self::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn into_ref(self) -> AttributeRef {
        Rc::new(self)
    }
}

impl StateAttribute for BlendFunc {
    fn attribute_type(&self) -> &'static AttributeTypeToken {
        &BLEND_FUNC_TYPE
    }

    fn clone_type(&self) -> AttributeRef {
        Rc::new(BlendFunc::disabled())
    }

    fn apply(&self, ctx: &mut ApplyContext<'_>) -> Result<()> {
        ctx.driver.apply_fixed_state(FixedState::Blend(self.factors));
        Ok(())
    }
}

/// Face culling. `None` disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CullFace {
    pub face: Option<Face>,
}

impl Default for CullFace {
    fn default() -> Self {
        Self {
            face: Some(Face::Back),
        }
    }
}

impl CullFace {
    #[must_use]
    pub fn new(face: Face) -> Self {
        Self { face: Some(face) }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self { face: None }
    }

    #[must_use]
    pub fn into_ref(self) -> AttributeRef {
        Rc::new(self)
    }
}

impl StateAttribute for CullFace {
    fn attribute_type(&self) -> &'static AttributeTypeToken {
        &CULL_FACE_TYPE
    }

    fn clone_type(&self) -> AttributeRef {
        Rc::new(CullFace::default())
    }

    fn apply(&self, ctx: &mut ApplyContext<'_>) -> Result<()> {
        ctx.driver.apply_fixed_state(FixedState::CullFace(self.face));
        Ok(())
    }
}
