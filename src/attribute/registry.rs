//! Attribute type registry.
//!
//! Every attribute kind gets a small dense integer the first time it is used.
//! The integer indexes the per-type stacks of a [`StateFrame`] and the
//! per-type slots of a [`StateSet`], so lookups on the apply path are plain
//! array accesses.
//!
//! Kinds identify themselves with a `static` [`AttributeTypeToken`] rather
//! than by comparing constructors or type ids. The token registers itself
//! lazily; registering the same name twice returns the same id.
//!
//! Ordinary attributes and texture attributes live in separate id spaces, as
//! they index separate stack arrays.
//!
//! [`StateFrame`]: crate::state::StateFrame
//! [`StateSet`]: crate::state::StateSet

use std::sync::{LazyLock, OnceLock};

use bitflags::bitflags;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Dense per-kind index of an attribute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeTypeId(pub(crate) u32);

impl AttributeTypeId {
    /// Raw index into per-type storage arrays.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which stack family an attribute type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeKind {
    /// One stack per type.
    Ordinary,
    /// One stack per (texture unit, type).
    Texture,
}

impl AttributeKind {
    #[inline]
    const fn slot(self) -> usize {
        match self {
            Self::Ordinary => 0,
            Self::Texture => 1,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ordinary => "ordinary",
            Self::Texture => "texture",
        }
    }
}

bitflags! {
    /// Optional behaviour an attribute type opts into at declaration time.
    ///
    /// The engine only calls the matching [`StateAttribute`] methods for
    /// types that declare the capability.
    ///
    /// [`StateAttribute`]: super::StateAttribute
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// Issues driver calls in `apply`.
        const APPLY              = 1 << 0;
        /// Contributes uniforms through `create_uniforms`.
        const UNIFORMS           = 1 << 1;
        /// May be disabled; disabled instances are left out of fingerprints.
        const ENABLE_QUERY       = 1 << 2;
        /// May carry no texture; such instances are left out of fingerprints.
        const TEXTURE_NULL_QUERY = 1 << 3;
    }
}

/// Static declaration of an attribute type.
///
/// ```rust,ignore
/// static FOG_TYPE: AttributeTypeToken =
///     AttributeTypeToken::new("Fog", AttributeKind::Ordinary, Capabilities::APPLY);
/// ```
#[derive(Debug)]
pub struct AttributeTypeToken {
    name: &'static str,
    kind: AttributeKind,
    capabilities: Capabilities,
    id: OnceLock<AttributeTypeId>,
}

impl AttributeTypeToken {
    #[must_use]
    pub const fn new(name: &'static str, kind: AttributeKind, capabilities: Capabilities) -> Self {
        Self {
            name,
            kind,
            capabilities,
            id: OnceLock::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// The registered id, registering the type on first call.
    #[inline]
    pub fn id(&self) -> AttributeTypeId {
        *self
            .id
            .get_or_init(|| register_attribute_type(self.name, self.kind))
    }
}

impl PartialEq for AttributeTypeToken {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name
    }
}

impl Eq for AttributeTypeToken {}

#[derive(Default)]
struct KindTable {
    by_name: FxHashMap<&'static str, AttributeTypeId>,
    names: Vec<&'static str>,
}

static REGISTRY: LazyLock<RwLock<[KindTable; 2]>> = LazyLock::new(Default::default);

/// Registers `name` under `kind`, returning its id.
///
/// Idempotent: a name already registered under `kind` keeps its id.
pub fn register_attribute_type(name: &'static str, kind: AttributeKind) -> AttributeTypeId {
    if let Some(id) = lookup_attribute_type(name, kind) {
        return id;
    }

    let mut tables = REGISTRY.write();
    let table = &mut tables[kind.slot()];
    if let Some(&id) = table.by_name.get(name) {
        return id;
    }
    let id = AttributeTypeId(table.names.len() as u32);
    table.names.push(name);
    table.by_name.insert(name, id);
    log::trace!("Registered {} attribute type '{name}' as {}", kind.as_str(), id.0);
    id
}

#[must_use]
pub fn lookup_attribute_type(name: &str, kind: AttributeKind) -> Option<AttributeTypeId> {
    REGISTRY.read()[kind.slot()].by_name.get(name).copied()
}

#[must_use]
pub fn attribute_type_name(kind: AttributeKind, id: AttributeTypeId) -> Option<&'static str> {
    REGISTRY.read()[kind.slot()].names.get(id.index()).copied()
}

/// Number of types registered under `kind` so far.
#[must_use]
pub fn registered_type_count(kind: AttributeKind) -> usize {
    REGISTRY.read()[kind.slot()].names.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    static FIRST: AttributeTypeToken = AttributeTypeToken::new(
        "RegistryTestFirst",
        AttributeKind::Ordinary,
        Capabilities::APPLY,
    );
    static FIRST_AGAIN: AttributeTypeToken = AttributeTypeToken::new(
        "RegistryTestFirst",
        AttributeKind::Ordinary,
        Capabilities::APPLY,
    );
    static FIRST_AS_TEXTURE: AttributeTypeToken = AttributeTypeToken::new(
        "RegistryTestFirst",
        AttributeKind::Texture,
        Capabilities::APPLY,
    );

    #[test]
    fn test_registration_is_idempotent() {
        assert_eq!(FIRST.id(), FIRST_AGAIN.id());
        assert_eq!(
            register_attribute_type("RegistryTestFirst", AttributeKind::Ordinary),
            FIRST.id()
        );
        assert_eq!(
            attribute_type_name(AttributeKind::Ordinary, FIRST.id()),
            Some("RegistryTestFirst")
        );
    }

    #[test]
    fn test_kinds_have_separate_id_spaces() {
        let ordinary = FIRST.id();
        let texture = FIRST_AS_TEXTURE.id();

        assert_eq!(
            lookup_attribute_type("RegistryTestFirst", AttributeKind::Texture),
            Some(texture)
        );
        assert_eq!(
            attribute_type_name(AttributeKind::Texture, texture),
            Some("RegistryTestFirst")
        );
        assert!(registered_type_count(AttributeKind::Ordinary) > ordinary.index());
    }

    #[test]
    fn test_unknown_name_is_not_registered_by_lookup() {
        assert_eq!(
            lookup_attribute_type("RegistryTestNeverDeclared", AttributeKind::Ordinary),
            None
        );
    }
}
