//! 全局字符串驻留器 (String Interner)
//!
//! Uniform 名称、着色器生成器名称和宏定义键在每次 apply 时都会被比较。
//! 驻留后它们变成整数 [`Symbol`]，比较和哈希查找都是 O(1)。

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// 驻留字符串的紧凑整数标识符
pub type Symbol = Spur;

/// 驻留一个字符串，返回其 Symbol
///
/// 如果字符串已存在于驻留池中，返回已有的 Symbol。
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// 尝试获取已存在字符串的 Symbol，不会分配新内存
#[inline]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// 将 Symbol 解析回字符串
///
/// # Panics
/// 如果 Symbol 不是由本驻留器产生的，会 panic。
#[inline]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

/// 预驻留每个生成程序都会用到的 uniform 名称，
/// 避免第一帧在热路径上付出驻留开销。
pub fn preload_common_uniforms() {
    let common = [
        // 帧级矩阵
        "uModelMatrix",
        "uViewMatrix",
        "uModelViewMatrix",
        "uProjectionMatrix",
        "uModelViewNormalMatrix",
        "uArrayColorEnabled",
        // 材质
        "uMaterialAmbient",
        "uMaterialDiffuse",
        "uMaterialSpecular",
        "uMaterialEmission",
        "uMaterialShininess",
        // 顶点属性
        "Vertex",
        "Normal",
        "Color",
        "TexCoord0",
        // 生成器
        "default",
    ];

    for name in common {
        intern(name);
    }
}
