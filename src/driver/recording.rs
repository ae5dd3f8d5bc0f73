//! In-memory driver that records every call.
//!
//! `RecordingDriver` never touches a GPU. It keeps the ordered list of calls
//! the engine issued so tests and benchmarks can assert on the exact driver
//! traffic. Program compilation is emulated by scanning the sources for
//! `uniform` / `attribute` / `in` declarations; a source containing `#error`
//! fails to compile with the offending line as the log.

use rustc_hash::FxHashMap;

use super::{
    CompiledProgram, FixedState, GraphicsDriver, ProgramHandle, TextureHandle, UniformLocation,
};
use crate::uniform::UniformValue;

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    UseProgram(Option<ProgramHandle>),
    ActiveTexture(u32),
    BindTexture(Option<TextureHandle>),
    UploadUniform {
        location: UniformLocation,
        value: UniformValue,
    },
    CompileProgram(ProgramHandle),
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    FixedState(FixedState),
}

#[derive(Debug, Default)]
pub struct RecordingDriver {
    calls: Vec<DriverCall>,
    next_program: u32,
    /// Per program: uniform location → name.
    programs: FxHashMap<ProgramHandle, Vec<String>>,
    current_program: Option<ProgramHandle>,
    /// Program current when the recorded calls begin.
    recorded_from: Option<ProgramHandle>,
    compile_count: usize,
}

impl RecordingDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded since creation or the last [`clear`](Self::clear).
    #[must_use]
    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    /// Returns and forgets the recorded calls.
    pub fn take_calls(&mut self) -> Vec<DriverCall> {
        self.recorded_from = self.current_program;
        std::mem::take(&mut self.calls)
    }

    pub fn clear(&mut self) {
        self.recorded_from = self.current_program;
        self.calls.clear();
    }

    /// Number of successful and failed compilations issued so far.
    #[must_use]
    pub fn compile_count(&self) -> usize {
        self.compile_count
    }

    #[must_use]
    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    /// Name of the uniform at `location` in `program`.
    #[must_use]
    pub fn uniform_name(&self, program: ProgramHandle, location: UniformLocation) -> Option<&str> {
        self.programs
            .get(&program)
            .and_then(|names| names.get(location.0 as usize))
            .map(String::as_str)
    }

    /// Recorded uploads as `(uniform name, value)` pairs, resolved against the
    /// program that was current when each upload was issued.
    #[must_use]
    pub fn uploads(&self) -> Vec<(String, UniformValue)> {
        let mut current = self.recorded_from;
        let mut out = Vec::new();
        for call in &self.calls {
            match call {
                DriverCall::UseProgram(p) => current = *p,
                DriverCall::UploadUniform { location, value } => {
                    let name = current
                        .and_then(|p| self.uniform_name(p, *location))
                        .unwrap_or("<unknown>");
                    out.push((name.to_string(), *value));
                }
                _ => {}
            }
        }
        out
    }

    /// Recorded uploads of the uniform `name`.
    #[must_use]
    pub fn uploads_of(&self, name: &str) -> Vec<UniformValue> {
        self.uploads()
            .into_iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v)
            .collect()
    }

    fn parse_declarations(source: &str, keywords: &[&str], out: &mut Vec<String>) {
        for line in source.lines() {
            let mut tokens = line
                .split(|c: char| c.is_whitespace() || c == ';' || c == '[')
                .filter(|t| !t.is_empty());
            let Some(first) = tokens.next() else {
                continue;
            };
            let first = if matches!(first, "highp" | "mediump" | "lowp") {
                match tokens.next() {
                    Some(t) => t,
                    None => continue,
                }
            } else {
                first
            };
            if !keywords.contains(&first) {
                continue;
            }
            let mut rest: Vec<&str> = tokens.collect();
            rest.retain(|t| !matches!(*t, "highp" | "mediump" | "lowp"));
            if let [_ty, name, ..] = rest.as_slice()
                && !out.iter().any(|n| n == name)
            {
                out.push((*name).to_string());
            }
        }
    }
}

impl GraphicsDriver for RecordingDriver {
    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.current_program = program;
        self.calls.push(DriverCall::UseProgram(program));
    }

    fn active_texture(&mut self, unit: u32) {
        self.calls.push(DriverCall::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, texture: Option<TextureHandle>) {
        self.calls.push(DriverCall::BindTexture(texture));
    }

    fn upload_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        self.calls.push(DriverCall::UploadUniform {
            location,
            value: *value,
        });
    }

    fn compile_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> std::result::Result<CompiledProgram, String> {
        self.compile_count += 1;

        if let Some(line) = vertex_source
            .lines()
            .chain(fragment_source.lines())
            .find(|l| l.trim_start().starts_with("#error"))
        {
            return Err(line.trim().to_string());
        }

        let mut uniform_names = Vec::new();
        Self::parse_declarations(vertex_source, &["uniform"], &mut uniform_names);
        Self::parse_declarations(fragment_source, &["uniform"], &mut uniform_names);

        let mut attribute_names = Vec::new();
        Self::parse_declarations(vertex_source, &["attribute", "in"], &mut attribute_names);

        self.next_program += 1;
        let handle = ProgramHandle(self.next_program);
        self.calls.push(DriverCall::CompileProgram(handle));

        let uniforms = uniform_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), UniformLocation(i as u32)))
            .collect();
        let attributes = attribute_names
            .into_iter()
            .enumerate()
            .map(|(i, n)| (n, i as u32))
            .collect();
        self.programs.insert(handle, uniform_names);

        Ok(CompiledProgram {
            handle,
            uniforms,
            attributes,
        })
    }

    fn enable_vertex_attrib_array(&mut self, slot: u32) {
        self.calls.push(DriverCall::EnableVertexAttribArray(slot));
    }

    fn disable_vertex_attrib_array(&mut self, slot: u32) {
        self.calls.push(DriverCall::DisableVertexAttribArray(slot));
    }

    fn apply_fixed_state(&mut self, state: FixedState) {
        self.calls.push(DriverCall::FixedState(state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "attribute vec3 Vertex;\nattribute vec4 Color;\nuniform mat4 uModelViewMatrix;\nuniform mat4 uProjectionMatrix;\n";
    const FS: &str = "precision highp float;\nuniform vec4 uMaterialDiffuse;\nuniform mat4 uModelViewMatrix;\n";

    #[test]
    fn test_compile_collects_declarations() {
        let mut driver = RecordingDriver::new();
        let compiled = driver.compile_program(VS, FS).unwrap();

        let uniforms: Vec<_> = compiled.uniforms.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            uniforms,
            vec!["uModelViewMatrix", "uProjectionMatrix", "uMaterialDiffuse"]
        );
        let attributes: Vec<_> = compiled.attributes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(attributes, vec!["Vertex", "Color"]);
        assert_eq!(
            driver.uniform_name(compiled.handle, UniformLocation(2)),
            Some("uMaterialDiffuse")
        );
    }

    #[test]
    fn test_compile_error_directive_fails() {
        let mut driver = RecordingDriver::new();
        let err = driver
            .compile_program(VS, "#error broken material\n")
            .unwrap_err();
        assert_eq!(err, "#error broken material");
        assert_eq!(driver.compile_count(), 1);
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn test_uploads_resolve_names() {
        let mut driver = RecordingDriver::new();
        let compiled = driver.compile_program(VS, FS).unwrap();
        driver.clear();

        driver.use_program(Some(compiled.handle));
        driver.upload_uniform(UniformLocation(2), &UniformValue::Float(1.0));

        assert_eq!(
            driver.uploads(),
            vec![("uMaterialDiffuse".to_string(), UniformValue::Float(1.0))]
        );
    }
}
