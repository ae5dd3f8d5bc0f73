//! Generated Program Cache
//!
//! A [`ShaderGenerator`] maps the fingerprint of the active attribute set to
//! a compiled [`Program`]. On a miss it asks its [`ShaderBuilder`] for
//! source, compiles it through the driver and keeps the result for the life
//! of the generator.
//!
//! # Fingerprints
//!
//! The fingerprint is an xxh3-128 over `(unit, type id, content hash)` of
//! every active attribute, visiting the builder's valid ordinary types in
//! ascending id order and then every texture unit's valid texture types in
//! ascending id order. Push order never affects it.
//!
//! # Growth
//!
//! Programs are never evicted. [`program_count`](ShaderGenerator::program_count)
//! and [`fingerprint_count`](ShaderGenerator::fingerprint_count) expose the
//! size, and a warning is logged once when the count reaches
//! [`StateSettings::program_count_warning`].
//!
//! # Failures
//!
//! A fingerprint whose source fails to build or compile is cached as failed.
//! Later lookups return the same error without rebuilding.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use xxhash_rust::xxh3::Xxh3;

use crate::attribute::{AttributeRef, AttributeTypeToken};
use crate::driver::GraphicsDriver;
use crate::errors::{Result, StateError};
use crate::settings::StateSettings;
use crate::shader::builder::{ActiveAttribute, ShaderBuildInput, ShaderBuilder, TemplateShaderBuilder};
use crate::shader::defines::ShaderDefines;
use crate::shader::ids::ProgramFingerprint;
use crate::shader::program::{GeneratedInfo, Program};
use crate::state::stack::AttributeStack;
use crate::uniform::{AttributeUniforms, UniformMap};
use crate::utils::interner::{self, Symbol};

/// Unit marker hashed for ordinary attributes.
const NO_UNIT: u32 = u32::MAX;

#[derive(Debug)]
enum CacheEntry {
    Ready(Rc<Program>),
    Failed(StateError),
}

impl CacheEntry {
    fn to_result(&self) -> Result<Rc<Program>> {
        match self {
            Self::Ready(program) => Ok(Rc::clone(program)),
            Self::Failed(err) => Err(err.clone()),
        }
    }
}

fn sorted_by_id(mut tokens: Vec<&'static AttributeTypeToken>) -> Vec<&'static AttributeTypeToken> {
    tokens.sort_by_key(|t| t.id());
    tokens.dedup_by_key(|t| t.id());
    tokens
}

pub struct ShaderGenerator {
    name: Symbol,
    builder: Box<dyn ShaderBuilder>,
    attribute_types: Vec<&'static AttributeTypeToken>,
    texture_attribute_types: Vec<&'static AttributeTypeToken>,
    cache: FxHashMap<ProgramFingerprint, CacheEntry>,
    program_count: usize,
    warned_growth: bool,
    /// Active attributes of the last fingerprint computed.
    scratch: Vec<ActiveAttribute>,
}

impl ShaderGenerator {
    pub fn new(name: &str, builder: Box<dyn ShaderBuilder>) -> Self {
        let attribute_types = sorted_by_id(builder.valid_attribute_types());
        let texture_attribute_types = sorted_by_id(builder.valid_texture_attribute_types());
        Self {
            name: interner::intern(name),
            builder,
            attribute_types,
            texture_attribute_types,
            cache: FxHashMap::default(),
            program_count: 0,
            warned_growth: false,
            scratch: Vec::with_capacity(16),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        interner::resolve(self.name)
    }

    /// Number of successfully compiled programs.
    #[must_use]
    pub fn program_count(&self) -> usize {
        self.program_count
    }

    /// Number of distinct fingerprints seen, failed ones included.
    #[must_use]
    pub fn fingerprint_count(&self) -> usize {
        self.cache.len()
    }

    /// The cached program for `fingerprint`, if it compiled.
    #[must_use]
    pub fn program(&self, fingerprint: ProgramFingerprint) -> Option<Rc<Program>> {
        match self.cache.get(&fingerprint)? {
            CacheEntry::Ready(program) => Some(Rc::clone(program)),
            CacheEntry::Failed(_) => None,
        }
    }

    /// Fingerprint of the attributes last applied on the given stacks.
    pub fn fingerprint(
        &mut self,
        attributes: &[AttributeStack<AttributeRef>],
        texture_units: &[Vec<AttributeStack<AttributeRef>>],
    ) -> ProgramFingerprint {
        self.scratch.clear();
        let mut hasher = Xxh3::new();

        for token in &self.attribute_types {
            let id = token.id();
            let Some(attribute) = attributes.get(id.index()).and_then(AttributeStack::last_applied)
            else {
                continue;
            };
            if self.builder.filter_attribute(attribute.as_ref()) {
                continue;
            }
            hasher.update(&NO_UNIT.to_le_bytes());
            hasher.update(&id.0.to_le_bytes());
            hasher.update(&attribute.content_hash().to_le_bytes());
            self.scratch.push(ActiveAttribute {
                unit: None,
                attribute: Rc::clone(attribute),
            });
        }

        for (unit, stacks) in texture_units.iter().enumerate() {
            let unit = unit as u32;
            for token in &self.texture_attribute_types {
                let id = token.id();
                let Some(attribute) = stacks.get(id.index()).and_then(AttributeStack::last_applied)
                else {
                    continue;
                };
                if self.builder.filter_attribute(attribute.as_ref()) {
                    continue;
                }
                hasher.update(&unit.to_le_bytes());
                hasher.update(&id.0.to_le_bytes());
                hasher.update(&attribute.content_hash().to_le_bytes());
                self.scratch.push(ActiveAttribute {
                    unit: Some(unit),
                    attribute: Rc::clone(attribute),
                });
            }
        }

        ProgramFingerprint(hasher.digest128())
    }

    /// Returns the program for the attributes last applied on the given
    /// stacks, generating and compiling it on first sight.
    pub fn get_or_create_program(
        &mut self,
        attributes: &[AttributeStack<AttributeRef>],
        texture_units: &[Vec<AttributeStack<AttributeRef>>],
        attribute_uniforms: &mut AttributeUniforms,
        driver: &mut dyn GraphicsDriver,
        settings: &StateSettings,
    ) -> Result<Rc<Program>> {
        let fingerprint = self.fingerprint(attributes, texture_units);
        if let Some(entry) = self.cache.get(&fingerprint) {
            return entry.to_result();
        }

        let entry = self.build_program(fingerprint, attribute_uniforms, driver, settings);
        let result = entry.to_result();
        self.cache.insert(fingerprint, entry);

        if !self.warned_growth && self.cache.len() >= settings.program_count_warning {
            self.warned_growth = true;
            log::warn!(
                "Shader generator '{}' holds {} programs; an attribute content hash may depend on per-instance values",
                self.name(),
                self.cache.len()
            );
        }

        result
    }

    fn build_program(
        &mut self,
        fingerprint: ProgramFingerprint,
        attribute_uniforms: &mut AttributeUniforms,
        driver: &mut dyn GraphicsDriver,
        settings: &StateSettings,
    ) -> CacheEntry {
        let mut uniforms = UniformMap::new();
        let mut defines = ShaderDefines::new();
        for active in &self.scratch {
            if let Some(map) = attribute_uniforms.get_or_create(active.attribute.as_ref(), active.unit) {
                for uniform in map.iter() {
                    uniforms.insert(uniform.clone());
                }
            }
            active.attribute.shader_defines(active.unit, &mut defines);
        }

        let attribute_names: Vec<String> = self
            .scratch
            .iter()
            .map(|a| match a.unit {
                Some(unit) => format!("{}[{unit}]", a.attribute.attribute_type().name()),
                None => a.attribute.attribute_type().name().to_string(),
            })
            .collect();
        log::debug!(
            "Generating program {fingerprint} with '{}' for [{}]",
            self.name(),
            attribute_names.join(", ")
        );

        let source = match self.builder.build(&ShaderBuildInput {
            attributes: &self.scratch,
            uniforms: &uniforms,
            defines: &defines,
        }) {
            Ok(source) => source,
            Err(err) => {
                log::error!("Shader generation failed for {fingerprint}: {err}");
                return CacheEntry::Failed(err);
            }
        };

        if settings.log_generated_shaders {
            log::debug!(
                "Generated vertex shader {fingerprint}:\n{}\nGenerated fragment shader {fingerprint}:\n{}",
                source.vertex,
                source.fragment
            );
        }

        let compiled = match driver.compile_program(&source.vertex, &source.fragment) {
            Ok(compiled) => compiled,
            Err(message) => {
                log::error!("Shader compilation failed for {fingerprint}: {message}");
                return CacheEntry::Failed(StateError::ShaderCompilation {
                    fingerprint,
                    message,
                });
            }
        };

        self.program_count += 1;
        let label = format!("{}#{fingerprint}", self.name());
        CacheEntry::Ready(Rc::new(Program::generated(
            label,
            source,
            compiled,
            GeneratedInfo {
                fingerprint,
                generator: self.name,
                active_uniforms: uniforms,
            },
        )))
    }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Name → generator registry with a default entry.
pub struct ShaderGenerators {
    generators: FxHashMap<Symbol, ShaderGenerator>,
    default: Symbol,
    warned_unknown: FxHashSet<Symbol>,
}

impl ShaderGenerators {
    /// A registry holding one [`TemplateShaderBuilder`] generator under
    /// `default_name`.
    #[must_use]
    pub fn new(default_name: &str) -> Self {
        let mut generators = FxHashMap::default();
        let default = interner::intern(default_name);
        generators.insert(
            default,
            ShaderGenerator::new(default_name, Box::new(TemplateShaderBuilder::default())),
        );
        Self {
            generators,
            default,
            warned_unknown: FxHashSet::default(),
        }
    }

    /// Registers `builder` under `name`, replacing any generator and cached
    /// programs previously registered under it.
    pub fn add(&mut self, name: &str, builder: impl ShaderBuilder + 'static) {
        let sym = interner::intern(name);
        self.warned_unknown.remove(&sym);
        self.generators
            .insert(sym, ShaderGenerator::new(name, Box::new(builder)));
    }

    /// Makes the generator registered under `name` the fallback.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        let sym = interner::get(name)
            .filter(|sym| self.generators.contains_key(sym))
            .ok_or_else(|| StateError::UnknownShaderGenerator(name.to_string()))?;
        self.default = sym;
        Ok(())
    }

    #[must_use]
    pub fn default_name(&self) -> &'static str {
        interner::resolve(self.default)
    }

    pub(crate) fn default_symbol(&self) -> Symbol {
        self.default
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ShaderGenerator> {
        interner::get(name).and_then(|sym| self.generators.get(&sym))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShaderGenerator> {
        self.generators.values()
    }

    /// Compiled programs across all generators.
    #[must_use]
    pub fn program_count(&self) -> usize {
        self.generators.values().map(ShaderGenerator::program_count).sum()
    }

    /// The generator for `name`, or the default one with a warning (logged
    /// once per name) when `name` is unknown.
    pub fn resolve_mut(&mut self, name: Symbol) -> Result<&mut ShaderGenerator> {
        let key = if self.generators.contains_key(&name) {
            name
        } else {
            if self.warned_unknown.insert(name) {
                log::warn!(
                    "Unknown shader generator '{}', using '{}'",
                    interner::resolve(name),
                    interner::resolve(self.default)
                );
            }
            self.default
        };
        self.generators
            .get_mut(&key)
            .ok_or_else(|| StateError::UnknownShaderGenerator(interner::resolve(name).to_string()))
    }
}
