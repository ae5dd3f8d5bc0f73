//! Shader Builders
//!
//! A [`ShaderBuilder`] turns the ordered list of active attributes into
//! vertex / fragment source. The engine treats it as a pure function: the
//! same fingerprint is assumed to produce the same source, which is what
//! makes fingerprint caching sound.
//!
//! [`TemplateShaderBuilder`] is the stock builder. It renders GLSL templates
//! embedded in the crate with minijinja, using `{$ $}` for blocks, `{{ }}`
//! for expressions and `$$` as the line-statement prefix.

use std::borrow::Cow;
use std::sync::OnceLock;

use minijinja::{Environment, Error, ErrorKind, syntax::SyntaxConfig};
use rust_embed::RustEmbed;
use serde::Serialize;

use crate::attribute::{AttributeRef, AttributeTypeToken, StateAttribute, is_shader_active};
use crate::attributes::{LIGHT_TYPES, MATERIAL_TYPE, TEXTURE_TYPE};
use crate::errors::Result;
use crate::shader::defines::ShaderDefines;
use crate::shader::program::ShaderSource;
use crate::uniform::UniformMap;

/// One attribute that takes part in program generation.
#[derive(Debug, Clone)]
pub struct ActiveAttribute {
    /// Texture unit for texture attributes.
    pub unit: Option<u32>,
    pub attribute: AttributeRef,
}

/// Everything a builder gets to produce source from.
#[derive(Debug)]
pub struct ShaderBuildInput<'a> {
    /// Active ordinary attributes by ascending type id, then active texture
    /// attributes by unit and type id.
    pub attributes: &'a [ActiveAttribute],
    /// Union of the uniforms the active attributes contribute.
    pub uniforms: &'a UniformMap,
    /// Merged defines of the active attributes.
    pub defines: &'a ShaderDefines,
}

pub trait ShaderBuilder {
    /// Ordinary attribute types that take part in generation.
    fn valid_attribute_types(&self) -> Vec<&'static AttributeTypeToken>;

    /// Texture attribute types that take part in generation.
    fn valid_texture_attribute_types(&self) -> Vec<&'static AttributeTypeToken>;

    /// Whether `attribute` is left out of the fingerprint and the build.
    fn filter_attribute(&self, attribute: &dyn StateAttribute) -> bool {
        !is_shader_active(attribute)
    }

    fn build(&self, input: &ShaderBuildInput<'_>) -> Result<ShaderSource>;
}

// ─── Template environment ────────────────────────────────────────────────────

static TEMPLATE_ENV: OnceLock<Environment<'static>> = OnceLock::new();

#[derive(RustEmbed)]
#[folder = "src/shader/templates"]
struct ShaderTemplates;

fn template_env() -> &'static Environment<'static> {
    TEMPLATE_ENV.get_or_init(|| {
        let mut env = Environment::new();

        let syntax = SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("$$")
            .build()
            .expect("Failed to configure Jinja2 syntax");

        env.set_syntax(syntax);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::SemiStrict);
        env.set_loader(template_loader);
        env
    })
}

fn template_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    let filename = if std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("glsl"))
    {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.glsl"))
    };

    #[cfg(debug_assertions)]
    {
        let path = std::path::Path::new("src/shader/templates").join(filename.as_ref());
        if path.exists() {
            return std::fs::read_to_string(&path).map(Some).map_err(|e| {
                Error::new(
                    ErrorKind::TemplateNotFound,
                    format!("Failed to read file: {e}"),
                )
            });
        }
    }

    if let Some(file) = ShaderTemplates::get(&filename)
        && let Ok(source) = std::str::from_utf8(file.data.as_ref())
    {
        return Ok(Some(source.to_string()));
    }

    Ok(None)
}

#[derive(Serialize)]
struct UniformDecl {
    ty: &'static str,
    name: &'static str,
}

#[derive(Serialize)]
struct TemplateContext<'a> {
    defines: std::collections::BTreeMap<&'static str, &'static str>,
    define_block: &'a str,
    uniforms: Vec<UniformDecl>,
    texture_units: Vec<u32>,
}

// ─── TemplateShaderBuilder ───────────────────────────────────────────────────

/// Builder rendering a vertex and a fragment template.
pub struct TemplateShaderBuilder {
    vertex_template: String,
    fragment_template: String,
    attribute_types: Vec<&'static AttributeTypeToken>,
    texture_attribute_types: Vec<&'static AttributeTypeToken>,
}

impl Default for TemplateShaderBuilder {
    fn default() -> Self {
        Self::new("default.vert", "default.frag")
    }
}

impl TemplateShaderBuilder {
    /// A builder over the given templates, accepting the built-in material,
    /// light and texture attributes.
    #[must_use]
    pub fn new(vertex_template: impl Into<String>, fragment_template: impl Into<String>) -> Self {
        let mut attribute_types: Vec<&'static AttributeTypeToken> = vec![&MATERIAL_TYPE];
        attribute_types.extend(LIGHT_TYPES.iter());
        Self {
            vertex_template: vertex_template.into(),
            fragment_template: fragment_template.into(),
            attribute_types,
            texture_attribute_types: vec![&TEXTURE_TYPE],
        }
    }

    /// Replaces the accepted ordinary attribute types.
    #[must_use]
    pub fn with_attribute_types(mut self, types: Vec<&'static AttributeTypeToken>) -> Self {
        self.attribute_types = types;
        self
    }

    /// Replaces the accepted texture attribute types.
    #[must_use]
    pub fn with_texture_attribute_types(mut self, types: Vec<&'static AttributeTypeToken>) -> Self {
        self.texture_attribute_types = types;
        self
    }

    fn render(&self, template: &str, ctx: &TemplateContext<'_>) -> Result<String> {
        let source = template_env().get_template(template)?.render(ctx)?;
        Ok(format!("// generated from {template}\n{source}"))
    }
}

impl ShaderBuilder for TemplateShaderBuilder {
    fn valid_attribute_types(&self) -> Vec<&'static AttributeTypeToken> {
        self.attribute_types.clone()
    }

    fn valid_texture_attribute_types(&self) -> Vec<&'static AttributeTypeToken> {
        self.texture_attribute_types.clone()
    }

    fn build(&self, input: &ShaderBuildInput<'_>) -> Result<ShaderSource> {
        let define_block = input.defines.to_glsl();
        let mut texture_units: Vec<u32> = input.attributes.iter().filter_map(|a| a.unit).collect();
        texture_units.dedup();

        let ctx = TemplateContext {
            defines: input.defines.to_map(),
            define_block: &define_block,
            uniforms: input
                .uniforms
                .iter()
                .map(|u| UniformDecl {
                    ty: u.glsl_type(),
                    name: u.name(),
                })
                .collect(),
            texture_units,
        };

        Ok(ShaderSource {
            vertex: self.render(&self.vertex_template, &ctx)?,
            fragment: self.render(&self.fragment_template, &ctx)?,
        })
    }
}
