//! Override resolution.
//!
//! Decides, at push time, which value a stack entry holds:
//!
//! 1. empty stack: the candidate;
//! 2. top carries `OVERRIDE` and the candidate is not `PROTECTED`: a copy of
//!    the top entry;
//! 3. otherwise: the candidate.
//!
//! Resolving at push time keeps top-of-stack reads O(1) during apply.

use crate::attribute::OverrideMask;
use crate::state::stack::StackEntry;

#[must_use]
pub fn resolve_override<T: Clone>(
    top: Option<&StackEntry<T>>,
    value: &T,
    mask: OverrideMask,
) -> StackEntry<T> {
    match top {
        Some(top)
            if top.mask.contains(OverrideMask::OVERRIDE)
                && !mask.contains(OverrideMask::PROTECTED) =>
        {
            top.clone()
        }
        _ => StackEntry {
            value: value.clone(),
            mask,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(value: u32, mask: OverrideMask) -> StackEntry<u32> {
        StackEntry { value, mask }
    }

    #[test]
    fn test_empty_stack_accepts_candidate() {
        let resolved = resolve_override(None, &7, OverrideMask::ON);
        assert_eq!(resolved.value, 7);
        assert_eq!(resolved.mask, OverrideMask::ON);
    }

    #[test]
    fn test_plain_top_is_replaced() {
        let top = entry(1, OverrideMask::ON);
        let resolved = resolve_override(Some(&top), &2, OverrideMask::ON);
        assert_eq!(resolved.value, 2);
    }

    #[test]
    fn test_override_top_wins_over_plain_candidate() {
        let top = entry(1, OverrideMask::ON | OverrideMask::OVERRIDE);
        let resolved = resolve_override(Some(&top), &2, OverrideMask::ON);
        assert_eq!(resolved.value, 1);
        assert_eq!(resolved.mask, top.mask);

        // An OVERRIDE candidate does not beat an OVERRIDE ancestor either.
        let resolved = resolve_override(Some(&top), &3, OverrideMask::ON | OverrideMask::OVERRIDE);
        assert_eq!(resolved.value, 1);
    }

    #[test]
    fn test_protected_candidate_beats_override() {
        let top = entry(1, OverrideMask::ON | OverrideMask::OVERRIDE);
        let resolved = resolve_override(Some(&top), &2, OverrideMask::ON | OverrideMask::PROTECTED);
        assert_eq!(resolved.value, 2);
        assert!(resolved.mask.contains(OverrideMask::PROTECTED));
    }
}
