//! Uniform 模块
//!
//! [`Uniform`] 是一个具名、共享、可变的值，最终上传到着色器程序。
//! 句柄克隆开销很小，并按身份比较：同一句柄的两个克隆是同一个 uniform，
//! 分别创建的两个句柄即使名称和值相同也不相等。
//!
//! Uniform 通过三条路径到达程序：
//!
//! - **属性 uniform**: 声明了 `UNIFORMS` 能力的属性类型，每个纹理单元拥有一个
//!   [`UniformMap`]，由该类型的所有实例共享 ([`AttributeUniforms`])。
//!   属性的 `apply` 把自己的值写入这个映射。
//! - **StateSet uniform**: 由 StateSet 压入帧内按名称划分的 uniform 栈。
//! - **帧 uniform**: 由帧自身维护的变换矩阵。
//!
//! 所有上传都经过 [`UniformValueCache`](value_cache::UniformValueCache) 过滤。

pub mod value_cache;

pub use value_cache::{UniformGroup, UniformShadow, UniformValueCache};

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use glam::{IVec2, IVec3, IVec4, Mat3, Mat4, Vec2, Vec3, Vec4};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::attribute::{AttributeKind, AttributeTypeId, Capabilities, StateAttribute};
use crate::utils::interner::{self, Symbol};

// ─── 值 ──────────────────────────────────────────────────────────────────────

/// Uniform 持有的值
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Int(i32),
    IVec2(IVec2),
    IVec3(IVec3),
    IVec4(IVec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    /// The raw 32-bit words of the value, in upload order.
    ///
    /// Used for bit-exact comparisons in the value cache.
    #[must_use]
    pub fn words(&self) -> &[u32] {
        match self {
            Self::Float(v) => bytemuck::cast_slice(std::slice::from_ref(v)),
            Self::Vec2(v) => bytemuck::cast_slice(std::slice::from_ref(v)),
            Self::Vec3(v) => bytemuck::cast_slice(std::slice::from_ref(v)),
            Self::Vec4(v) => bytemuck::cast_slice(std::slice::from_ref(v)),
            Self::Int(v) => bytemuck::cast_slice(std::slice::from_ref(v)),
            Self::IVec2(v) => bytemuck::cast_slice(std::slice::from_ref(v)),
            Self::IVec3(v) => bytemuck::cast_slice(std::slice::from_ref(v)),
            Self::IVec4(v) => bytemuck::cast_slice(std::slice::from_ref(v)),
            Self::Mat3(v) => bytemuck::cast_slice(std::slice::from_ref(v)),
            Self::Mat4(v) => bytemuck::cast_slice(std::slice::from_ref(v)),
        }
    }

    /// Number of scalar components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.words().len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// GLSL type name used in generated declarations.
    #[must_use]
    pub fn glsl_type(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Vec2(_) => "vec2",
            Self::Vec3(_) => "vec3",
            Self::Vec4(_) => "vec4",
            Self::Int(_) => "int",
            Self::IVec2(_) => "ivec2",
            Self::IVec3(_) => "ivec3",
            Self::IVec4(_) => "ivec4",
            Self::Mat3(_) => "mat3",
            Self::Mat4(_) => "mat4",
        }
    }
}

// ─── Uniform ─────────────────────────────────────────────────────────────────

struct UniformInner {
    name: Symbol,
    value: Cell<UniformValue>,
    /// 在生成代码中声明为 sampler 而不是 int
    sampler: bool,
}

/// 具名 uniform 值的共享句柄
#[derive(Clone)]
pub struct Uniform(Rc<UniformInner>);

impl Uniform {
    #[must_use]
    pub fn new(name: &str, value: UniformValue) -> Self {
        Self(Rc::new(UniformInner {
            name: interner::intern(name),
            value: Cell::new(value),
            sampler: false,
        }))
    }

    /// A texture sampler bound to `unit`.
    #[must_use]
    pub fn sampler(name: &str, unit: u32) -> Self {
        Self(Rc::new(UniformInner {
            name: interner::intern(name),
            value: Cell::new(UniformValue::Int(unit as i32)),
            sampler: true,
        }))
    }

    #[must_use]
    pub fn float(name: &str, value: f32) -> Self {
        Self::new(name, UniformValue::Float(value))
    }

    #[must_use]
    pub fn vec3(name: &str, value: Vec3) -> Self {
        Self::new(name, UniformValue::Vec3(value))
    }

    #[must_use]
    pub fn vec4(name: &str, value: Vec4) -> Self {
        Self::new(name, UniformValue::Vec4(value))
    }

    #[must_use]
    pub fn int(name: &str, value: i32) -> Self {
        Self::new(name, UniformValue::Int(value))
    }

    #[must_use]
    pub fn mat4(name: &str, value: Mat4) -> Self {
        Self::new(name, UniformValue::Mat4(value))
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        interner::resolve(self.0.name)
    }

    #[inline]
    #[must_use]
    pub fn symbol(&self) -> Symbol {
        self.0.name
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> UniformValue {
        self.0.value.get()
    }

    /// Replaces the value. Every holder of this handle sees the change.
    #[inline]
    pub fn set(&self, value: UniformValue) {
        self.0.value.set(value);
    }

    #[inline]
    #[must_use]
    pub fn is_sampler(&self) -> bool {
        self.0.sampler
    }

    /// GLSL type used when declaring this uniform.
    #[must_use]
    pub fn glsl_type(&self) -> &'static str {
        if self.0.sampler {
            "sampler2D"
        } else {
            self.get().glsl_type()
        }
    }

    /// Identity comparison.
    #[inline]
    #[must_use]
    pub fn same(&self, other: &Uniform) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Uniform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uniform")
            .field("name", &self.name())
            .field("value", &self.get())
            .finish()
    }
}

// ─── UniformMap ──────────────────────────────────────────────────────────────

/// Small ordered name → uniform map.
///
/// Insertion order is preserved; inserting an existing name replaces the
/// handle in place.
#[derive(Debug, Clone, Default)]
pub struct UniformMap {
    entries: SmallVec<[Uniform; 8]>,
}

impl UniformMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uniform: Uniform) {
        let sym = uniform.symbol();
        if let Some(slot) = self.entries.iter_mut().find(|u| u.symbol() == sym) {
            *slot = uniform;
        } else {
            self.entries.push(uniform);
        }
    }

    #[must_use]
    pub fn with(mut self, uniform: Uniform) -> Self {
        self.insert(uniform);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Uniform> {
        interner::get(name).and_then(|sym| self.get_symbol(sym))
    }

    #[inline]
    #[must_use]
    pub fn get_symbol(&self, name: Symbol) -> Option<&Uniform> {
        self.entries.iter().find(|u| u.symbol() == name)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Uniform> {
        self.entries.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── 类型共享的属性 uniform ──────────────────────────────────────────────────

type UniformKey = (AttributeKind, AttributeTypeId, Option<u32>);

/// 每个 (属性类型, 纹理单元) 对应一个 [`UniformMap`]，
/// 由该类型任一实例首次请求时创建，之后共享。
///
/// 按类型共享使得为某个材质实例生成的程序可以服务所有其他实例：
/// 程序持有共享句柄，每个材质在 apply 时写入自己的值。
#[derive(Debug, Default)]
pub struct AttributeUniforms {
    maps: FxHashMap<UniformKey, Option<Rc<UniformMap>>>,
}

impl AttributeUniforms {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared uniforms for `attribute`'s type on `unit`, creating
    /// them from this instance when the type is seen for the first time.
    ///
    /// Returns `None` for types without the `UNIFORMS` capability.
    pub fn get_or_create(
        &mut self,
        attribute: &dyn StateAttribute,
        unit: Option<u32>,
    ) -> Option<Rc<UniformMap>> {
        let token = attribute.attribute_type();
        if !token.capabilities().contains(Capabilities::UNIFORMS) {
            return None;
        }
        let key = (token.kind(), token.id(), unit);
        self.maps
            .entry(key)
            .or_insert_with(|| attribute.create_uniforms(unit).map(Rc::new))
            .clone()
    }

    /// Number of (type, unit) pairs seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_identity_is_by_handle() {
        let a = Uniform::float("uOpacity", 1.0);
        let b = a.clone();
        let c = Uniform::float("uOpacity", 1.0);

        assert!(a.same(&b));
        assert!(!a.same(&c));

        b.set(UniformValue::Float(0.5));
        assert_eq!(a.get(), UniformValue::Float(0.5));
    }

    #[test]
    fn test_words_length_matches_components() {
        assert_eq!(UniformValue::Float(1.0).len(), 1);
        assert_eq!(UniformValue::Vec3(Vec3::ONE).len(), 3);
        assert_eq!(UniformValue::Vec4(Vec4::ONE).len(), 4);
        assert_eq!(UniformValue::Mat3(Mat3::IDENTITY).len(), 9);
        assert_eq!(UniformValue::Mat4(Mat4::IDENTITY).len(), 16);
    }

    #[test]
    fn test_uniform_map_replaces_by_name() {
        let mut map = UniformMap::new();
        map.insert(Uniform::float("uA", 1.0));
        map.insert(Uniform::float("uB", 2.0));
        map.insert(Uniform::float("uA", 3.0));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("uA").map(Uniform::get), Some(UniformValue::Float(3.0)));
        let names: Vec<_> = map.iter().map(Uniform::name).collect();
        assert_eq!(names, vec!["uA", "uB"]);
    }
}
