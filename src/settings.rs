//! State Engine Settings
//!
//! Configuration for a [`StateFrame`](crate::state::StateFrame) and the shader
//! generators it drives.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_state::StateSettings;
//!
//! // Defaults: 16 texture units, warn after 512 generated programs
//! let settings = StateSettings::default();
//!
//! // Smaller texture budget, quiet shader logging
//! let settings = StateSettings {
//!     max_texture_units: 8,
//!     log_generated_shaders: false,
//!     ..Default::default()
//! };
//! ```

/// Name of the generator used when no state set selects one.
pub const DEFAULT_GENERATOR_NAME: &str = "default";

/// Tunables for state reconciliation and program caching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSettings {
    /// Highest texture unit (exclusive) a state set may address.
    ///
    /// Texture attributes a state set places on a unit at or above this
    /// limit are ignored with a warning when the state set is pushed.
    pub max_texture_units: u32,

    /// Number of distinct programs after which a generator logs a warning.
    ///
    /// Generated programs are never evicted. Crossing this count usually
    /// means a per-instance value leaked into an attribute's content hash.
    pub program_count_warning: usize,

    /// Log the generated vertex / fragment source of every new program at
    /// `debug` level.
    pub log_generated_shaders: bool,

    /// Name the built-in template generator is registered under. It selects
    /// programs while the generator-name stack is empty, until another
    /// default is set on the registry.
    pub default_generator: String,
}

impl Default for StateSettings {
    #[inline]
    fn default() -> Self {
        Self {
            max_texture_units: 16,
            program_count_warning: 512,
            log_generated_shaders: cfg!(debug_assertions),
            default_generator: DEFAULT_GENERATOR_NAME.to_string(),
        }
    }
}
