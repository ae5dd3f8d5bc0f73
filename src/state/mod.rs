//! Render State
//!
//! - [`state_set`]: [`StateSet`], the unit of push / pop
//! - [`stack`]: per-key [`AttributeStack`]s with change tracking
//! - [`resolve`]: override resolution on push
//! - [`frame`]: [`StateFrame`], the live stacks and their bookkeeping
//! - [`apply`]: reconciling a frame with the driver
//! - [`frame_uniforms`]: matrices and the vertex colour flag
//! - [`vertex_attribs`]: lazy vertex attribute array enabling

pub mod apply;
pub mod frame;
pub mod frame_uniforms;
pub mod resolve;
pub mod stack;
pub mod state_set;
pub mod vertex_attribs;

pub use frame::{StateFrame, StateStats};
pub use frame_uniforms::FrameUniforms;
pub use resolve::resolve_override;
pub use stack::{AttributeStack, StackEntry, StackValue};
pub use state_set::{AttributePair, StateSet, StateSetRef, UniformPair};
pub use vertex_attribs::VertexAttribCache;
