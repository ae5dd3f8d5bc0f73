//! Uniform Value Cache
//!
//! Shadows the last value uploaded for every (program, uniform) pair so that
//! uploads of an unchanged value are skipped, even when the owning attribute
//! was re-applied.
//!
//! Values of one to four scalars are compared bit for bit against the shadow.
//! Larger values (matrices) are never cached and always uploaded.

use crate::shader::ids::UniformCacheSlot;
use crate::uniform::UniformValue;

/// Which uniform list of a program an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformGroup {
    /// Uniforms contributed by attributes.
    Active,
    /// Uniforms the program needs but no attribute contributed.
    Foreign,
}

/// Last uploaded value of one uniform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniformShadow {
    len: u8,
    words: [u32; 4],
}

impl UniformShadow {
    #[inline]
    fn matches(&self, words: &[u32]) -> bool {
        let w = &self.words;
        match *words {
            [a] => self.len == 1 && w[0] == a,
            [a, b] => self.len == 2 && w[0] == a && w[1] == b,
            [a, b, c] => self.len == 3 && w[0] == a && w[1] == b && w[2] == c,
            [a, b, c, d] => self.len == 4 && w[0] == a && w[1] == b && w[2] == c && w[3] == d,
            _ => false,
        }
    }

    #[inline]
    fn store(&mut self, words: &[u32]) {
        self.len = words.len() as u8;
        self.words[..words.len()].copy_from_slice(words);
    }
}

#[derive(Debug, Default)]
struct ProgramShadows {
    active: Vec<Option<UniformShadow>>,
    foreign: Vec<Option<UniformShadow>>,
}

/// Per-program shadow storage, indexed by [`UniformCacheSlot`].
#[derive(Debug, Default)]
pub struct UniformValueCache {
    programs: Vec<ProgramShadows>,
}

impl UniformValueCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves shadows for a program with `active` attribute uniforms and
    /// `foreign` other uniforms.
    pub fn allocate(&mut self, active: usize, foreign: usize) -> UniformCacheSlot {
        let slot = UniformCacheSlot(self.programs.len() as u32);
        self.programs.push(ProgramShadows {
            active: vec![None; active],
            foreign: vec![None; foreign],
        });
        slot
    }

    /// Compares `value` against the shadow of uniform `index` in `group` and
    /// stores it when different.
    ///
    /// Returns `true` when the value must be uploaded.
    pub fn check_and_store(
        &mut self,
        slot: UniformCacheSlot,
        group: UniformGroup,
        index: usize,
        value: &UniformValue,
    ) -> bool {
        let words = value.words();
        if words.len() > 4 {
            return true;
        }

        let Some(program) = self.programs.get_mut(slot.index()) else {
            return true;
        };
        let shadows = match group {
            UniformGroup::Active => &mut program.active,
            UniformGroup::Foreign => &mut program.foreign,
        };
        let Some(entry) = shadows.get_mut(index) else {
            return true;
        };

        match entry {
            Some(shadow) if shadow.matches(words) => false,
            Some(shadow) => {
                shadow.store(words);
                true
            }
            None => {
                let mut shadow = UniformShadow::default();
                shadow.store(words);
                *entry = Some(shadow);
                true
            }
        }
    }

    /// Number of programs with allocated shadows.
    #[must_use]
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec2, Vec3, Vec4};

    use super::*;

    #[test]
    fn test_same_vec4_uploads_once() {
        let mut cache = UniformValueCache::new();
        let slot = cache.allocate(1, 0);
        let value = UniformValue::Vec4(Vec4::new(1.0, 0.0, 0.0, 1.0));

        assert!(cache.check_and_store(slot, UniformGroup::Active, 0, &value));
        assert!(!cache.check_and_store(slot, UniformGroup::Active, 0, &value));

        let changed = UniformValue::Vec4(Vec4::new(1.0, 0.0, 0.5, 1.0));
        assert!(cache.check_and_store(slot, UniformGroup::Active, 0, &changed));
        assert!(!cache.check_and_store(slot, UniformGroup::Active, 0, &changed));
    }

    #[test]
    fn test_every_small_size_is_cached() {
        let mut cache = UniformValueCache::new();
        let slot = cache.allocate(0, 4);
        let values = [
            UniformValue::Float(2.0),
            UniformValue::Vec2(Vec2::new(1.0, 2.0)),
            UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0)),
            UniformValue::Int(7),
        ];

        for (i, v) in values.iter().enumerate() {
            assert!(cache.check_and_store(slot, UniformGroup::Foreign, i, v));
        }
        for (i, v) in values.iter().enumerate() {
            assert!(!cache.check_and_store(slot, UniformGroup::Foreign, i, v));
        }
    }

    #[test]
    fn test_matrices_are_never_cached() {
        let mut cache = UniformValueCache::new();
        let slot = cache.allocate(1, 0);
        let value = UniformValue::Mat4(Mat4::IDENTITY);

        assert!(cache.check_and_store(slot, UniformGroup::Active, 0, &value));
        assert!(cache.check_and_store(slot, UniformGroup::Active, 0, &value));
    }

    #[test]
    fn test_groups_and_programs_are_independent() {
        let mut cache = UniformValueCache::new();
        let a = cache.allocate(1, 1);
        let b = cache.allocate(1, 1);
        let value = UniformValue::Float(1.0);

        assert!(cache.check_and_store(a, UniformGroup::Active, 0, &value));
        assert!(cache.check_and_store(a, UniformGroup::Foreign, 0, &value));
        assert!(cache.check_and_store(b, UniformGroup::Active, 0, &value));
        assert!(!cache.check_and_store(a, UniformGroup::Active, 0, &value));
        assert_eq!(cache.program_count(), 2);
    }

    #[test]
    fn test_comparison_is_bitwise_and_length_aware() {
        let mut cache = UniformValueCache::new();
        let slot = cache.allocate(1, 0);

        assert!(cache.check_and_store(slot, UniformGroup::Active, 0, &UniformValue::Float(0.0)));
        // Same bits, same length.
        assert!(!cache.check_and_store(slot, UniformGroup::Active, 0, &UniformValue::Int(0)));
        assert!(cache.check_and_store(slot, UniformGroup::Active, 0, &UniformValue::Float(-0.0)));
        assert!(cache.check_and_store(
            slot,
            UniformGroup::Active,
            0,
            &UniformValue::Vec2(Vec2::ZERO)
        ));
    }
}
