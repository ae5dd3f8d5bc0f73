//! Shader Define Set
//!
//! Attributes describe the shader features they need as `#define`s. The set
//! is passed to the shader builder together with the active attribute list.
//!
//! Keys and values are interned [`Symbol`]s kept sorted by key, so two sets
//! built in different orders compare and hash equal.
//!
//! ```rust,ignore
//! let mut defines = ShaderDefines::new();
//! defines.set_flag("HAS_MATERIAL");
//! defines.set("LIGHT0", "POINT");
//! assert_eq!(defines.to_glsl(), "#define HAS_MATERIAL 1\n#define LIGHT0 POINT\n");
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

use crate::utils::interner::{self, Symbol};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderDefines {
    defines: Vec<(Symbol, Symbol)>,
}

impl ShaderDefines {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            defines: Vec::new(),
        }
    }

    /// Sets `key` to `value`, replacing a previous value.
    pub fn set(&mut self, key: &str, value: &str) {
        self.set_symbol(interner::intern(key), interner::intern(value));
    }

    /// Sets `key` to `1`.
    pub fn set_flag(&mut self, key: &str) {
        self.set(key, "1");
    }

    #[inline]
    pub fn set_symbol(&mut self, key: Symbol, value: Symbol) {
        match self.defines.binary_search_by_key(&key, |&(k, _)| k) {
            Ok(idx) => self.defines[idx].1 = value,
            Err(idx) => self.defines.insert(idx, (key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let Some(key) = interner::get(key) else {
            return false;
        };
        match self.defines.binary_search_by_key(&key, |&(k, _)| k) {
            Ok(idx) => {
                self.defines.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'static str> {
        let key = interner::get(key)?;
        self.defines
            .binary_search_by_key(&key, |&(k, _)| k)
            .ok()
            .map(|idx| interner::resolve(self.defines[idx].1))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.defines.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    pub fn clear(&mut self) {
        self.defines.clear();
    }

    /// Iterates `(key, value)` string pairs in key-symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.defines
            .iter()
            .map(|&(k, v)| (interner::resolve(k), interner::resolve(v)))
    }

    /// Lexicographically ordered copy for template rendering.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<&'static str, &'static str> {
        self.iter().collect()
    }

    /// One `#define KEY VALUE` line per entry, in lexicographic key order.
    #[must_use]
    pub fn to_glsl(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.to_map() {
            let _ = writeln!(out, "#define {key} {value}");
        }
        out
    }

    /// Adds every entry of `other`, its values winning on conflict.
    pub fn merge(&mut self, other: &ShaderDefines) {
        for &(key, value) in &other.defines {
            self.set_symbol(key, value);
        }
    }
}

impl Hash for ShaderDefines {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.defines.hash(state);
    }
}
