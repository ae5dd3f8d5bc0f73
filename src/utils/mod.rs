//! Utility Module
//!
//! - [`interner`]: String interning for uniform names, generator names and
//!   shader define keys
//!
//! ```rust,ignore
//! use myth_state::utils::interner;
//!
//! let sym1 = interner::intern("uModelViewMatrix");
//! let sym2 = interner::intern("uModelViewMatrix");
//! assert_eq!(sym1, sym2); // O(1) comparison
//! ```

pub mod interner;

pub use interner::Symbol;
