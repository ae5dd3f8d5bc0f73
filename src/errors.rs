//! Error Types
//!
//! This module defines the error types used throughout the state engine.
//!
//! # Overview
//!
//! The main error type [`StateError`] covers the recoverable failure modes:
//! - Structural misuse of the state-set stack (underflow, bad positions)
//! - Shader generation and program compilation failures
//! - Unknown shader generator names
//!
//! Corruption of an individual attribute stack (a per-type stack popped past
//! empty while balancing a state set) is not represented here: it can only
//! happen through a broken invariant and panics with a diagnostic instead.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, StateError>`.
//!
//! ```rust,ignore
//! use myth_state::errors::{StateError, Result};
//!
//! fn draw(frame: &mut StateFrame<MyDriver>) -> Result<()> {
//!     frame.apply()?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::shader::ids::ProgramFingerprint;

/// The main error type for the state engine.
///
/// `StateError` is `Clone` because a failed compilation is stored inside the
/// program cache and handed back on every lookup of the same fingerprint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    // ========================================================================
    // Stack Errors
    // ========================================================================
    /// A pop was requested on an empty stack.
    #[error("State stack underflow: `{operation}` on empty {stack} stack")]
    StackUnderflow {
        /// Which stack was empty
        stack: &'static str,
        /// The operation that was attempted
        operation: &'static str,
    },

    /// `insert_state_set` / `remove_state_set` addressed a position past the top.
    #[error("StateSet position {position} out of range (stack depth {depth})")]
    PositionOutOfRange {
        /// The requested position
        position: usize,
        /// Current state-set stack depth
        depth: usize,
    },

    /// An attribute was given to the wrong kind of slot.
    #[error("Attribute '{name}' cannot be used as a {expected} attribute")]
    AttributeKindMismatch {
        /// Registered type name of the attribute
        name: &'static str,
        /// The kind of slot it was given to
        expected: &'static str,
    },

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// No shader generator is registered under this name and there is no default.
    #[error("Unknown shader generator: {0}")]
    UnknownShaderGenerator(String),

    /// The driver rejected a generated program.
    #[error("Shader compilation failed for fingerprint {fingerprint}: {message}")]
    ShaderCompilation {
        /// Fingerprint of the attribute combination
        fingerprint: ProgramFingerprint,
        /// Driver diagnostic
        message: String,
    },

    /// The driver rejected a user-supplied program.
    #[error("Program '{label}' failed to link: {message}")]
    ProgramLink {
        /// Program label
        label: String,
        /// Driver diagnostic
        message: String,
    },

    /// Shader template loading or rendering failed.
    #[error("Shader template error: {0}")]
    Template(String),
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<minijinja::Error> for StateError {
    fn from(err: minijinja::Error) -> Self {
        StateError::Template(err.to_string())
    }
}

/// Alias for `Result<T, StateError>`.
pub type Result<T> = std::result::Result<T, StateError>;
