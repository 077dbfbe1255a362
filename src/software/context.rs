#[allow(unused_imports)]
use log::{debug, info, warn};

use super::kernels::{self, Bindings, Kernel};
use super::storage::{Texel, TextureStorage};
use crate::{
    Context, DepthFunction, Error, Filter, FramebufferHandle, ImageTarget, PixelFormat, Primitive,
    ProgramHandle, RenderbufferHandle, TextureData, TextureHandle, TextureKind, UniformLocation,
    UniformValue, VertexArrayHandle, VertexAttribute, Wrap,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

/// Snapshot of the pipeline state at the time of a draw call.
#[derive(Clone, Debug)]
pub struct DrawRecord {
    pub program: String,
    pub framebuffer: Option<FramebufferHandle>,
    pub primitive: Primitive,
    pub vertex_count: usize,
    pub units: BTreeMap<(u32, TextureKind), TextureHandle>,
    pub uniforms: HashMap<String, UniformValue>,
}

impl DrawRecord {
    /// Returns the texture bound to a unit, of either kind.
    pub fn unit(&self, unit: u32) -> Option<TextureHandle> {
        self.units
            .iter()
            .find(|((bound, _), _)| *bound == unit)
            .map(|(_, &handle)| handle)
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }
}

#[derive(Debug)]
struct Program {
    name: String,
    source: String,
    kernel: Option<Kernel>,
    values: HashMap<String, UniformValue>,
}

#[derive(Debug, Default)]
struct Attachment {
    color: Option<(u32, ImageTarget, usize)>,
    depth: Option<u32>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,

    textures: HashMap<u32, TextureStorage>,
    pending_textures: Vec<u32>,
    framebuffers: HashMap<u32, Attachment>,
    renderbuffers: HashMap<u32, Option<(usize, usize)>>,
    programs: HashMap<u32, Program>,
    vertex_arrays: HashMap<u32, usize>,
    locations: HashMap<u32, (u32, String)>,

    active_unit: u32,
    units: HashMap<(u32, TextureKind), u32>,
    framebuffer: Option<u32>,
    program: Option<u32>,
    viewport: (i32, i32, i32, i32),

    memory_used: usize,
    memory_limit: Option<usize>,

    screen: Vec<Texel>,
    draws: Vec<DrawRecord>,
}

impl State {
    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn reserve(&mut self, bytes: usize) -> Result<(), Error> {
        if let Some(limit) = self.memory_limit {
            if self.memory_used + bytes > limit {
                return Err(Error::ResourceExhausted(format!(
                    "allocation of {} bytes exceeds the {} byte budget ({} in use)",
                    bytes, limit, self.memory_used
                )));
            }
        }

        self.memory_used += bytes;

        Ok(())
    }

    fn texture_bytes(storage: &TextureStorage) -> usize {
        TextureStorage::byte_size(
            storage.kind,
            storage.format,
            storage.levels,
            storage.cols,
            storage.rows,
        )
    }
}

/// Reference implementation of the rendering context on the CPU.
///
/// Every resource lives in host memory and the environment precomputation,
/// sky and post-processing programs are executed by equivalent CPU kernels,
/// which makes the whole pipeline observable without a GPU. Draws of any
/// other program are only recorded. An optional memory budget makes allocations fail the way
/// an exhausted device would.
#[derive(Debug)]
pub struct SoftwareContext {
    width: usize,
    height: usize,
    state: RefCell<State>,
}

impl SoftwareContext {
    /// Creates a context whose default framebuffer is `width` by `height`.
    pub fn new(width: usize, height: usize) -> Self {
        let state = State {
            screen: vec![[0.0, 0.0, 0.0, 1.0]; width * height],
            viewport: (0, 0, width as i32, height as i32),
            ..State::default()
        };

        Self {
            width,
            height,
            state: RefCell::new(state),
        }
    }

    /// Limits the texture and renderbuffer memory this context may allocate.
    pub fn with_memory_limit(self, bytes: usize) -> Self {
        self.state.borrow_mut().memory_limit = Some(bytes);
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Every draw issued so far, in order.
    pub fn draws(&self) -> Vec<DrawRecord> {
        self.state.borrow().draws.clone()
    }

    pub fn last_draw(&self) -> Option<DrawRecord> {
        self.state.borrow().draws.last().cloned()
    }

    pub fn clear_draws(&self) {
        self.state.borrow_mut().draws.clear();
    }

    /// Number of texture objects currently alive.
    pub fn live_textures(&self) -> usize {
        let state = self.state.borrow();
        state.textures.len() + state.pending_textures.len()
    }

    /// Bytes of texture and renderbuffer storage currently allocated.
    pub fn memory_used(&self) -> usize {
        self.state.borrow().memory_used
    }

    /// Describes a live texture as (kind, format, size, levels).
    pub fn texture_info(
        &self,
        texture: TextureHandle,
    ) -> Option<(TextureKind, PixelFormat, (usize, usize), usize)> {
        let state = self.state.borrow();
        let storage = state.textures.get(&texture.get())?;

        Some((
            storage.kind,
            storage.format,
            (storage.cols, storage.rows),
            storage.levels,
        ))
    }

    /// Linked vertex and fragment source of a live program.
    pub fn program_source(&self, program: ProgramHandle) -> Option<String> {
        let state = self.state.borrow();

        state.programs.get(&program.get()).map(|entry| entry.source.clone())
    }

    /// Current value of a screen pixel, with row 0 at the bottom.
    pub fn screen_pixel(&self, x: usize, y: usize) -> [f32; 4] {
        self.state.borrow().screen[y * self.width + x]
    }

    /// Viewport as last set, as (x, y, width, height).
    pub fn current_viewport(&self) -> (i32, i32, i32, i32) {
        self.state.borrow().viewport
    }

    fn execute(&self, state: &mut State, kernel: Kernel, program: u32) {
        let (x, y, w, h) = state.viewport;

        if w <= 0 || h <= 0 {
            return;
        }

        let (cols, rows) = (w as usize, h as usize);

        let output = {
            let bindings = Bindings {
                uniforms: &state.programs[&program].values,
                textures: &state.textures,
                units: &state.units,
            };

            match kernels::shade(kernel, &bindings, cols, rows) {
                Some(output) => output,
                None => {
                    warn!("draw with `{:?}' kernel has no bound sampler", kernel);
                    return;
                }
            }
        };

        let attachment = state
            .framebuffer
            .and_then(|framebuffer| state.framebuffers.get(&framebuffer))
            .and_then(|attachment| attachment.color);

        match (state.framebuffer, attachment) {
            (None, _) => {
                for row in 0..rows {
                    for col in 0..cols {
                        let (sx, sy) = (x as usize + col, y as usize + row);

                        if sx < self.width && sy < self.height {
                            state.screen[sy * self.width + sx] = output[row * cols + col];
                        }
                    }
                }
            }
            (Some(_), Some((texture, target, level))) => {
                if let Some(storage) = state.textures.get_mut(&texture) {
                    if (x, y) == (0, 0) && storage.level_size(level) == (cols, rows) {
                        if let Err(error) = storage.store(target, level, output) {
                            warn!("discarded draw output: {}", error);
                        }
                    } else {
                        warn!("viewport does not cover the color attachment");
                    }
                }
            }
            (Some(_), None) => warn!("draw into a framebuffer without color attachment"),
        }
    }
}

impl Context for SoftwareContext {
    fn shader_preamble(&self) -> &'static str {
        "#version 300 es\nprecision highp float;\n"
    }

    fn create_texture(&self) -> Result<TextureHandle, Error> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();
        state.pending_textures.push(id);

        TextureHandle::new(id).ok_or_else(|| Error::ResourceExhausted("texture ids".into()))
    }

    fn delete_texture(&self, texture: TextureHandle) {
        let mut state = self.state.borrow_mut();
        let id = texture.get();

        state.pending_textures.retain(|&pending| pending != id);

        if let Some(storage) = state.textures.remove(&id) {
            state.memory_used -= State::texture_bytes(&storage);
        }

        state.units.retain(|_, bound| *bound != id);

        for attachment in state.framebuffers.values_mut() {
            if matches!(attachment.color, Some((color, _, _)) if color == id) {
                attachment.color = None;
            }
        }
    }

    fn allocate_texture(
        &self,
        texture: TextureHandle,
        kind: TextureKind,
        format: PixelFormat,
        levels: usize,
        cols: usize,
        rows: usize,
    ) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        let id = texture.get();

        if let Some(previous) = state.textures.remove(&id) {
            state.memory_used -= State::texture_bytes(&previous);
            state.pending_textures.push(id);
        }

        state.reserve(TextureStorage::byte_size(kind, format, levels, cols, rows))?;

        state.pending_textures.retain(|&pending| pending != id);
        state
            .textures
            .insert(id, TextureStorage::new(kind, format, levels, cols, rows));

        Ok(())
    }

    fn upload_texture(
        &self,
        texture: TextureHandle,
        target: ImageTarget,
        level: usize,
        cols: usize,
        rows: usize,
        data: TextureData,
    ) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();

        match state.textures.get_mut(&texture.get()) {
            Some(storage) => storage.upload(target, level, cols, rows, data),
            None => Err(Error::ResourceExhausted(format!(
                "texture {} has no storage",
                texture.get()
            ))),
        }
    }

    fn set_texture_sampling(
        &self,
        texture: TextureHandle,
        _kind: TextureKind,
        min_filter: Filter,
        mag_filter: Filter,
        wrap: Wrap,
    ) {
        if let Some(storage) = self.state.borrow_mut().textures.get_mut(&texture.get()) {
            storage.min_filter = min_filter;
            storage.mag_filter = mag_filter;
            storage.wrap = wrap;
        }
    }

    fn read_texture(
        &self,
        texture: TextureHandle,
        target: ImageTarget,
        level: usize,
    ) -> Result<Vec<f32>, Error> {
        let state = self.state.borrow();

        let storage = state.textures.get(&texture.get()).ok_or_else(|| {
            Error::ResourceExhausted(format!("texture {} has no storage", texture.get()))
        })?;

        Ok(storage.image(target, level)?.iter().flatten().copied().collect())
    }

    fn active_texture(&self, unit: u32) {
        self.state.borrow_mut().active_unit = unit;
    }

    fn bind_texture(&self, kind: TextureKind, texture: Option<TextureHandle>) {
        let mut state = self.state.borrow_mut();
        let unit = state.active_unit;

        match texture {
            Some(texture) => state.units.insert((unit, kind), texture.get()),
            None => state.units.remove(&(unit, kind)),
        };
    }

    fn texture_binding(&self, unit: u32, kind: TextureKind) -> Option<TextureHandle> {
        let state = self.state.borrow();
        TextureHandle::new(*state.units.get(&(unit, kind))?)
    }

    fn create_framebuffer(&self) -> Result<FramebufferHandle, Error> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();
        state.framebuffers.insert(id, Attachment::default());

        FramebufferHandle::new(id).ok_or_else(|| Error::ResourceExhausted("framebuffer ids".into()))
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferHandle) {
        let mut state = self.state.borrow_mut();
        state.framebuffers.remove(&framebuffer.get());

        if state.framebuffer == Some(framebuffer.get()) {
            state.framebuffer = None;
        }
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>) {
        self.state.borrow_mut().framebuffer = framebuffer.map(FramebufferHandle::get);
    }

    fn attach_texture(&self, texture: Option<TextureHandle>, target: ImageTarget, level: usize) {
        let mut state = self.state.borrow_mut();

        if let Some(framebuffer) = state.framebuffer {
            if let Some(attachment) = state.framebuffers.get_mut(&framebuffer) {
                attachment.color = texture.map(|texture| (texture.get(), target, level));
            }
        }
    }

    fn create_renderbuffer(&self) -> Result<RenderbufferHandle, Error> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();
        state.renderbuffers.insert(id, None);

        RenderbufferHandle::new(id)
            .ok_or_else(|| Error::ResourceExhausted("renderbuffer ids".into()))
    }

    fn delete_renderbuffer(&self, renderbuffer: RenderbufferHandle) {
        let mut state = self.state.borrow_mut();

        if let Some(Some((cols, rows))) = state.renderbuffers.remove(&renderbuffer.get()) {
            state.memory_used -= cols * rows * 4;
        }
    }

    fn allocate_renderbuffer(
        &self,
        renderbuffer: RenderbufferHandle,
        cols: usize,
        rows: usize,
    ) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        let id = renderbuffer.get();

        if let Some(Some((old_cols, old_rows))) = state.renderbuffers.get(&id).copied() {
            state.memory_used -= old_cols * old_rows * 4;
            state.renderbuffers.insert(id, None);
        }

        state.reserve(cols * rows * 4)?;
        state.renderbuffers.insert(id, Some((cols, rows)));

        Ok(())
    }

    fn attach_renderbuffer(&self, renderbuffer: Option<RenderbufferHandle>) {
        let mut state = self.state.borrow_mut();

        if let Some(framebuffer) = state.framebuffer {
            if let Some(attachment) = state.framebuffers.get_mut(&framebuffer) {
                attachment.depth = renderbuffer.map(RenderbufferHandle::get);
            }
        }
    }

    fn check_framebuffer(&self) -> Result<(), Error> {
        let state = self.state.borrow();

        let framebuffer = match state.framebuffer {
            Some(framebuffer) => framebuffer,
            None => return Ok(()),
        };

        let attachment = state
            .framebuffers
            .get(&framebuffer)
            .ok_or_else(|| Error::IncompleteFramebuffer("framebuffer was deleted".into()))?;

        let (texture, target, level) = attachment
            .color
            .ok_or_else(|| Error::IncompleteFramebuffer("missing color attachment".into()))?;

        let storage = state
            .textures
            .get(&texture)
            .ok_or_else(|| Error::IncompleteFramebuffer("color attachment has no storage".into()))?;

        if storage.format == PixelFormat::RGB32F {
            return Err(Error::IncompleteFramebuffer(
                "color attachment is not renderable".into(),
            ));
        }

        storage
            .image(target, level)
            .map_err(|error| Error::IncompleteFramebuffer(error.to_string()))?;

        if let Some(depth) = attachment.depth {
            let depth_size = state.renderbuffers.get(&depth).copied().flatten();

            if depth_size != Some(storage.level_size(level)) {
                return Err(Error::IncompleteFramebuffer(
                    "attachment dimensions differ".into(),
                ));
            }
        }

        Ok(())
    }

    fn viewport(&self, x: i32, y: i32, w: i32, h: i32) {
        self.state.borrow_mut().viewport = (x, y, w, h);
    }

    fn clear(&self, color: [f32; 4]) {
        let mut state = self.state.borrow_mut();

        let attachment = state
            .framebuffer
            .and_then(|framebuffer| state.framebuffers.get(&framebuffer))
            .and_then(|attachment| attachment.color);

        match (state.framebuffer, attachment) {
            (None, _) => {
                for pixel in &mut state.screen {
                    *pixel = color;
                }
            }
            (Some(_), Some((texture, target, level))) => {
                if let Some(storage) = state.textures.get_mut(&texture) {
                    let (w, h) = storage.level_size(level);
                    let _ = storage.store(target, level, vec![color; w * h]);
                }
            }
            (Some(_), None) => {}
        }
    }

    fn set_depth_function(&self, _function: DepthFunction) {}

    fn set_face_culling(&self, _enabled: bool) {}

    fn create_program(
        &self,
        name: &str,
        vertex: &str,
        fragment: &str,
    ) -> Result<ProgramHandle, Error> {
        for (stage, source) in &[("vertex", vertex), ("fragment", fragment)] {
            if !source.contains("void main()") {
                return Err(Error::Shader {
                    name: name.to_owned(),
                    log: format!("ERROR: 0:1: {} stage has no entry point", stage),
                });
            }
        }

        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();

        state.programs.insert(
            id,
            Program {
                name: name.to_owned(),
                source: format!("{}\n{}", vertex, fragment),
                kernel: Kernel::for_program(name),
                values: HashMap::new(),
            },
        );

        ProgramHandle::new(id).ok_or_else(|| Error::ResourceExhausted("program ids".into()))
    }

    fn delete_program(&self, program: ProgramHandle) {
        let mut state = self.state.borrow_mut();
        let id = program.get();

        state.programs.remove(&id);
        state.locations.retain(|_, (owner, _)| *owner != id);

        if state.program == Some(id) {
            state.program = None;
        }
    }

    fn use_program(&self, program: Option<ProgramHandle>) {
        self.state.borrow_mut().program = program.map(ProgramHandle::get);
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let mut state = self.state.borrow_mut();
        let id = program.get();

        let base = name.split(|c| c == '[' || c == '.').next().unwrap_or(name);

        if base.is_empty() || !state.programs.get(&id)?.source.contains(base) {
            return None;
        }

        let existing = state
            .locations
            .iter()
            .find(|(_, (owner, uniform))| *owner == id && uniform == name)
            .map(|(&location, _)| location);

        let location = match existing {
            Some(location) => location,
            None => {
                let location = state.allocate_id();
                state.locations.insert(location, (id, name.to_owned()));
                location
            }
        };

        UniformLocation::new(location)
    }

    fn set_uniform(&self, location: UniformLocation, value: UniformValue) {
        let mut state = self.state.borrow_mut();

        let (owner, name) = match state.locations.get(&location.get()) {
            Some(entry) => entry.clone(),
            None => return,
        };

        if state.program != Some(owner) {
            warn!("uniform `{}' set while its program is not current", name);
            return;
        }

        if let Some(program) = state.programs.get_mut(&owner) {
            program.values.insert(name, value);
        }
    }

    fn uniform_value(
        &self,
        program: ProgramHandle,
        location: UniformLocation,
    ) -> Option<UniformValue> {
        let state = self.state.borrow();
        let (owner, name) = state.locations.get(&location.get())?;

        if *owner != program.get() {
            return None;
        }

        state.programs.get(owner)?.values.get(name).copied()
    }

    fn create_vertex_array(
        &self,
        data: &[u8],
        stride: usize,
        layout: &[VertexAttribute],
    ) -> Result<VertexArrayHandle, Error> {
        for attribute in layout {
            assert!(attribute.offset + attribute.kind.components() * 4 <= stride);
        }

        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();
        state.vertex_arrays.insert(id, data.len() / stride.max(1));

        VertexArrayHandle::new(id).ok_or_else(|| Error::ResourceExhausted("vertex array ids".into()))
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle) {
        self.state
            .borrow_mut()
            .vertex_arrays
            .remove(&vertex_array.get());
    }

    fn draw(&self, vertex_array: VertexArrayHandle, primitive: Primitive, first: usize, count: usize) {
        let mut state = self.state.borrow_mut();

        let program = match state.program {
            Some(program) => program,
            None => {
                warn!("draw without a current program");
                return;
            }
        };

        match state.vertex_arrays.get(&vertex_array.get()) {
            Some(&vertices) if first + count <= vertices => {}
            _ => {
                warn!("draw exceeds the bounds of the vertex array");
                return;
            }
        }

        let (name, kernel, uniforms) = match state.programs.get(&program) {
            Some(entry) => (entry.name.clone(), entry.kernel, entry.values.clone()),
            None => return,
        };

        let units = state
            .units
            .iter()
            .filter_map(|(&key, &texture)| Some((key, TextureHandle::new(texture)?)))
            .collect();

        let record = DrawRecord {
            program: name,
            framebuffer: state.framebuffer.and_then(FramebufferHandle::new),
            primitive,
            vertex_count: count,
            units,
            uniforms,
        };

        state.draws.push(record);

        if let Some(kernel) = kernel {
            self.execute(&mut state, kernel, program);
        }
    }

    fn read_screen(&self, cols: usize, rows: usize) -> Result<Vec<u8>, Error> {
        let state = self.state.borrow();

        let mut pixels = Vec::with_capacity(cols * rows * 4);

        for y in 0..rows.min(self.height) {
            for x in 0..cols.min(self.width) {
                for &channel in &state.screen[y * self.width + x] {
                    pixels.push((channel.max(0.0).min(1.0) * 255.0).round() as u8);
                }
            }
        }

        if pixels.len() != cols * rows * 4 {
            return Err(Error::ResourceExhausted(format!(
                "screen of {}x{} cannot be read as {}x{}",
                self.width, self.height, cols, rows
            )));
        }

        Ok(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exceeding_memory_budget_fails_allocation() {
        let gl = SoftwareContext::new(4, 4).with_memory_limit(1024);
        let texture = gl.create_texture().unwrap();

        let result = gl.allocate_texture(texture, TextureKind::Cube, PixelFormat::RGBA16F, 1, 16, 16);

        assert!(matches!(result, Err(Error::ResourceExhausted(_))));
        assert_eq!(gl.memory_used(), 0);

        gl.delete_texture(texture);
        assert_eq!(gl.live_textures(), 0);
    }

    #[test]
    fn uniform_locations_follow_program_source() {
        let gl = SoftwareContext::new(4, 4);
        let source = "uniform Light lights[4];\nvoid main() {}";
        let program = gl.create_program("pbr", source, source).unwrap();

        assert!(gl.uniform_location(program, "lights[2].color").is_some());
        assert!(gl.uniform_location(program, "nothing").is_none());

        let location = gl.uniform_location(program, "lights[2].color").unwrap();
        assert_eq!(gl.uniform_location(program, "lights[2].color"), Some(location));

        gl.use_program(Some(program));
        gl.set_uniform(location, UniformValue::Vec4([1.0, 0.0, 0.0, 1.0]));

        assert_eq!(
            gl.uniform_value(program, location),
            Some(UniformValue::Vec4([1.0, 0.0, 0.0, 1.0]))
        );
    }

    #[test]
    fn mismatched_depth_storage_is_incomplete() {
        let gl = SoftwareContext::new(4, 4);

        let texture = gl.create_texture().unwrap();
        gl.allocate_texture(texture, TextureKind::Flat, PixelFormat::RG16F, 1, 8, 8)
            .unwrap();

        let depth = gl.create_renderbuffer().unwrap();
        gl.allocate_renderbuffer(depth, 4, 4).unwrap();

        let framebuffer = gl.create_framebuffer().unwrap();
        gl.bind_framebuffer(Some(framebuffer));
        gl.attach_renderbuffer(Some(depth));
        gl.attach_texture(Some(texture), ImageTarget::Flat, 0);

        assert!(matches!(gl.check_framebuffer(), Err(Error::IncompleteFramebuffer(_))));
    }
}
