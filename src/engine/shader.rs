#[allow(unused_imports)]
use log::{debug, error, info, warn};

use crate::{
    AsVertexArray, Error, Gl, Primitive, ProgramHandle, TextureHandle, TextureKind,
    UniformLocation, UniformValue,
};
use regex::Regex;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

/// Build-time description of a GLSL source file.
#[derive(Debug)]
pub struct ShaderInfo {
    pub name: &'static str,
    pub code: &'static str,
    pub defines: &'static [&'static str],
}

fn merge_sort_dedup(lhs: &[&'static str], rhs: &[&'static str]) -> Vec<&'static str> {
    let mut vec = Vec::with_capacity(lhs.len() + rhs.len());

    vec.extend_from_slice(lhs);
    vec.extend_from_slice(rhs);
    vec.sort_unstable();
    vec.dedup();
    vec
}

#[derive(Debug)]
pub struct Shader {
    gl: Gl,
    invalidated: bool,
    handle: Option<ProgramHandle>,
    vertex: &'static ShaderInfo,
    fragment: &'static ShaderInfo,

    binds: HashMap<&'static str, u32>,
    defines: BTreeMap<&'static str, String>,

    locations: RefCell<HashMap<String, Option<UniformLocation>>>,
}

impl Shader {
    /// Creates a shader whose named samplers are assigned fixed texture units.
    pub fn new(
        gl: Gl,
        vertex: &'static ShaderInfo,
        fragment: &'static ShaderInfo,
        texture_units: &[(&'static str, u32)],
    ) -> Self {
        let mut defines = BTreeMap::new();

        for key in merge_sort_dedup(vertex.defines, fragment.defines) {
            defines.insert(key, String::new());
        }

        Self {
            gl,
            handle: None,
            vertex,
            fragment,
            binds: texture_units.iter().copied().collect(),
            defines,
            invalidated: true,
            locations: RefCell::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.fragment.name
    }

    pub fn handle(&self) -> Option<ProgramHandle> {
        self.handle
    }

    pub fn set_define(&mut self, define: &'static str, value: impl ToString) {
        assert!(self.defines.contains_key(define));

        if self.defines.get(define) != Some(&value.to_string()) {
            self.defines.insert(define, value.to_string());
            self.invalidated = true;
        }
    }

    pub fn begin_draw(&self) -> DrawCommand {
        DrawCommand::new(self)
    }

    /// Rebuilds the shader with the current source.
    pub fn rebuild(&mut self) -> Result<(), Error> {
        if !self.invalidated {
            return Ok(());
        }

        if let Some(handle) = self.handle.take() {
            self.gl.delete_program(handle);
        }

        self.locations.borrow_mut().clear();

        let preamble = self.gl.shader_preamble();

        let vert = Self::generate_source(preamble, self.vertex.code, &self.defines);
        let frag = Self::generate_source(preamble, self.fragment.code, &self.defines);

        match self.gl.create_program(self.fragment.name, &vert, &frag) {
            Ok(handle) => self.handle = Some(handle),
            Err(Error::Shader { name, log }) => {
                let log = Self::remap_build_log(&log, &vert, &frag);
                error!("{}", log);
                return Err(Error::Shader { name, log });
            }
            Err(error) => return Err(error),
        }

        self.invalidated = false;
        self.configure_binds();

        Ok(())
    }

    fn configure_binds(&self) {
        for (&name, &unit) in &self.binds {
            self.assign_texture_unit(name, unit);
        }
    }

    /// Points a sampler uniform at a texture unit.
    pub fn assign_texture_unit(&self, name: &str, unit: u32) {
        self.set_uniform(name, unit as i32);
    }

    /// Returns the texture unit assigned to a sampler uniform.
    pub fn texture_unit(&self, name: &str) -> Option<u32> {
        self.binds.get(name).copied()
    }

    /// Looks up a uniform location, caching the result.
    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        let program = self.handle?;

        if let Some(&location) = self.locations.borrow().get(name) {
            return location;
        }

        let location = self.gl.uniform_location(program, name);

        if location.is_none() {
            warn!("no such uniform in `{}': {}", self.name(), name);
        }

        self.locations.borrow_mut().insert(name.to_owned(), location);

        location
    }

    /// Sets a named uniform, making this shader's program current.
    pub fn set_uniform(&self, name: &str, value: impl Into<UniformValue>) {
        let location = self.location(name);
        self.set_uniform_at(location, value);
    }

    /// Sets a uniform at a previously located position.
    pub fn set_uniform_at(&self, location: Option<UniformLocation>, value: impl Into<UniformValue>) {
        if let (Some(program), Some(location)) = (self.handle, location) {
            self.gl.use_program(Some(program));
            self.gl.set_uniform(location, value.into());
        }
    }

    /// Reads back the current value of a named uniform.
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.gl.uniform_value(self.handle?, self.location(name)?)
    }

    fn remap_build_log(log: &str, vert: &str, frag: &str) -> String {
        let pattern = Regex::new(r#"([0-9]+):([0-9]+):"#).unwrap();

        pattern
            .replace_all(log, |caps: &regex::Captures| {
                let line: u32 = caps[2].parse().unwrap_or(0);

                // both stages are reported against their own source
                let (file, line) = match Self::determine_real_position(frag, line) {
                    (file, line) if file != "<unknown>" => (file, line),
                    _ => Self::determine_real_position(vert, line),
                };

                format!("{}:{}:", file, line)
            })
            .into_owned()
    }

    fn generate_source(
        preamble: &str,
        glsl_source: &str,
        defines: &BTreeMap<&'static str, String>,
    ) -> String {
        let mut source = String::from(preamble);
        source.reserve(glsl_source.len());

        for (name, value) in defines {
            source += "#define ";
            source += name;
            source += " (";
            source += value;
            source += ")\n";
        }

        source += glsl_source;
        source
    }

    /// Finds the position of a GLSL source line through file/line markers.
    fn determine_real_position(source: &str, line: u32) -> (String, u32) {
        let pattern = Regex::new(r#"^// __POS__ ([^:]+):([0-9]+)$"#).unwrap();

        let lines: Vec<&str> = source.lines().collect();

        for index in (0..line.min(lines.len() as u32)).rev() {
            if let Some(captures) = pattern.captures(lines[index as usize]) {
                let marker: u32 = captures[2].parse().unwrap_or(0);

                return (captures[1].to_owned(), (marker + line).saturating_sub(index + 2));
            }
        }

        (String::from("<unknown>"), 0)
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            self.gl.delete_program(handle);
        }
    }
}

#[derive(Debug)]
pub enum BindTarget {
    Texture(Option<TextureHandle>, TextureKind),
}

pub trait AsBindTarget {
    fn bind_target(&self) -> BindTarget;
}

/// Texture units held for the duration of a draw.
///
/// Every unit bound through this guard is rebound to no texture when the
/// guard is dropped, so no binding outlives the draw that required it.
#[derive(Debug)]
pub struct TextureUnits<'a> {
    gl: &'a Gl,
    bound: Vec<(u32, TextureKind)>,
}

impl<'a> TextureUnits<'a> {
    pub fn new(gl: &'a Gl) -> Self {
        Self { gl, bound: vec![] }
    }

    pub fn bind(&mut self, unit: u32, target: &dyn AsBindTarget) {
        let BindTarget::Texture(handle, kind) = target.bind_target();

        self.gl.active_texture(unit);
        self.gl.bind_texture(kind, handle);

        if !self.bound.contains(&(unit, kind)) {
            self.bound.push((unit, kind));
        }
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}

impl Drop for TextureUnits<'_> {
    fn drop(&mut self) {
        for (unit, kind) in self.bound.drain(..) {
            self.gl.active_texture(unit);
            self.gl.bind_texture(kind, None);
        }

        self.gl.active_texture(0);
    }
}

#[derive(Debug)]
pub struct DrawCommand<'a> {
    shader: &'a Shader,
    units: TextureUnits<'a>,
}

impl<'a> DrawCommand<'a> {
    fn new(shader: &'a Shader) -> Self {
        shader.gl.use_program(shader.handle);

        Self {
            shader,
            units: TextureUnits::new(&shader.gl),
        }
    }

    /// Binds a texture to the unit assigned to a sampler uniform.
    pub fn bind(&mut self, target: &dyn AsBindTarget, slot: &str) {
        if let Some(unit) = self.shader.texture_unit(slot) {
            self.units.bind(unit, target);
        } else {
            panic!("slot '{}' does not map to a texture unit", slot);
        }
    }

    pub fn set_uniform(&self, name: &str, value: impl Into<UniformValue>) {
        self.shader.set_uniform(name, value);
    }

    pub fn set_uniform_at(&self, location: Option<UniformLocation>, value: impl Into<UniformValue>) {
        self.shader.set_uniform_at(location, value);
    }

    pub fn set_viewport(&self, x: i32, y: i32, w: i32, h: i32) {
        self.shader.gl.viewport(x, y, w, h);
    }

    pub fn draw_triangles(&self, vertices: &dyn AsVertexArray) {
        self.draw(vertices, Primitive::Triangles);
    }

    pub fn draw_triangle_strip(&self, vertices: &dyn AsVertexArray) {
        self.draw(vertices, Primitive::TriangleStrip);
    }

    fn draw(&self, vertices: &dyn AsVertexArray, primitive: Primitive) {
        if let Some(handle) = vertices.vertex_array() {
            self.shader.gl.use_program(self.shader.handle);
            self.shader
                .gl
                .draw(handle, primitive, 0, vertices.vertex_count());
        }
    }
}

#[cfg(all(test, feature = "software"))]
mod tests {
    use super::*;
    use crate::SoftwareContext;
    use std::rc::Rc;

    static VERTEX: ShaderInfo = ShaderInfo {
        name: "test",
        code: "// __POS__ test.vert:1\nvoid main() {}\n",
        defines: &[],
    };

    static FRAGMENT: ShaderInfo = ShaderInfo {
        name: "test",
        code: "// __POS__ test.frag:1\n// define COUNT\nuniform sampler2D image;\nvoid main() {}\n",
        defines: &["COUNT"],
    };

    #[test]
    fn defines_are_emitted_after_preamble() {
        let mut defines = BTreeMap::new();
        defines.insert("COUNT", String::from("4"));

        let source = Shader::generate_source("#version 300 es\n", FRAGMENT.code, &defines);

        assert!(source.starts_with("#version 300 es\n#define COUNT (4)\n// __POS__"));
    }

    #[test]
    fn build_log_lines_map_to_source_files() {
        let source = "#version 300 es\n// __POS__ a.frag:1\nfoo\n// __POS__ b.glsl:1\nbar\nbaz\n";

        assert_eq!(Shader::determine_real_position(source, 3), ("a.frag".to_owned(), 1));
        assert_eq!(Shader::determine_real_position(source, 6), ("b.glsl".to_owned(), 2));
        assert_eq!(Shader::determine_real_position(source, 1).0, "<unknown>");
    }

    #[test]
    fn changing_a_define_rebuilds_the_program() {
        let context = Rc::new(SoftwareContext::new(4, 4));
        let gl: Gl = context.clone();

        let mut shader = Shader::new(gl, &VERTEX, &FRAGMENT, &[("image", 5)]);

        shader.set_define("COUNT", 2);
        shader.rebuild().unwrap();

        let first = shader.handle().unwrap();

        assert_eq!(shader.uniform("image"), Some(UniformValue::Int(5)));

        shader.rebuild().unwrap();
        assert_eq!(shader.handle(), Some(first));

        shader.set_define("COUNT", 3);
        shader.rebuild().unwrap();

        let second = shader.handle().unwrap();

        assert_ne!(first, second);
        assert!(context.program_source(second).unwrap().contains("#define COUNT (3)"));
        assert!(context.program_source(first).is_none());
    }

    #[test]
    fn texture_units_are_released_on_drop() {
        let context = Rc::new(SoftwareContext::new(4, 4));
        let gl: Gl = context.clone();

        let texture = gl.create_texture().unwrap();

        {
            let mut units = TextureUnits::new(&gl);
            units.bind(4, &BoundTexture(texture));
            units.bind(4, &BoundTexture(texture));

            assert_eq!(units.len(), 1);
            assert_eq!(gl.texture_binding(4, TextureKind::Flat), Some(texture));
        }

        assert_eq!(gl.texture_binding(4, TextureKind::Flat), None);
    }

    struct BoundTexture(TextureHandle);

    impl AsBindTarget for BoundTexture {
        fn bind_target(&self) -> BindTarget {
            BindTarget::Texture(Some(self.0), TextureKind::Flat)
        }
    }
}
