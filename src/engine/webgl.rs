#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{
    Context, DepthFunction, Error, Filter, FramebufferHandle, ImageTarget, PixelFormat,
    Primitive, ProgramHandle, RenderbufferHandle, TextureData, TextureHandle, TextureKind,
    UniformLocation, UniformValue, VertexArrayHandle, VertexAttribute, Wrap,
};
use js_sys::{Float32Array, Object, Uint16Array, Uint8Array};
use std::cell::RefCell;
use std::collections::HashMap;
use web_sys::{
    WebGl2RenderingContext as Gl2, WebGlBuffer, WebGlFramebuffer, WebGlProgram,
    WebGlRenderbuffer, WebGlShader, WebGlTexture, WebGlUniformLocation, WebGlVertexArrayObject,
};

#[derive(Debug)]
struct TextureObject {
    object: WebGlTexture,
    storage: Option<(PixelFormat, usize, usize)>,
}

#[derive(Debug, Default)]
struct Objects {
    next_id: u32,

    textures: HashMap<u32, TextureObject>,
    framebuffers: HashMap<u32, WebGlFramebuffer>,
    renderbuffers: HashMap<u32, WebGlRenderbuffer>,
    programs: HashMap<u32, WebGlProgram>,
    vertex_arrays: HashMap<u32, (WebGlVertexArrayObject, WebGlBuffer)>,
    locations: HashMap<u32, (u32, String, WebGlUniformLocation)>,

    // shadowed state, WebGL cannot be cheaply queried
    values: HashMap<u32, UniformValue>,
    active_unit: u32,
    units: HashMap<(u32, TextureKind), u32>,
    framebuffer: Option<u32>,
    program: Option<u32>,
}

impl Objects {
    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// WebGL2 implementation of the rendering context.
#[derive(Debug)]
pub struct WebGlContext {
    gl: Gl2,
    objects: RefCell<Objects>,
}

impl WebGlContext {
    /// Wraps a WebGL2 context, failing if float render targets are missing.
    pub fn new(gl: Gl2) -> Result<Self, Error> {
        if let Err(_) | Ok(None) = gl.get_extension("EXT_color_buffer_float") {
            return Err(Error::MissingExtension("EXT_color_buffer_float"));
        }

        gl.enable(Gl2::DEPTH_TEST);
        gl.pixel_storei(Gl2::UNPACK_ALIGNMENT, 1);
        gl.pixel_storei(Gl2::PACK_ALIGNMENT, 1);

        Ok(Self {
            gl,
            objects: RefCell::default(),
        })
    }

    pub fn inner(&self) -> &Gl2 {
        &self.gl
    }

    fn check_memory(&self, what: &str) -> Result<(), Error> {
        match self.gl.get_error() {
            Gl2::OUT_OF_MEMORY => Err(Error::ResourceExhausted(format!(
                "out of memory while allocating {}",
                what
            ))),
            Gl2::NO_ERROR => Ok(()),
            code => {
                warn!("unexpected WebGL error {:#x} while allocating {}", code, what);
                Ok(())
            }
        }
    }

    fn compile_shader(&self, kind: u32, source: &str) -> Result<WebGlShader, String> {
        let shader = self
            .gl
            .create_shader(kind)
            .ok_or_else(|| String::from("failed to create shader object"))?;

        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);

        let status = self
            .gl
            .get_shader_parameter(&shader, Gl2::COMPILE_STATUS);

        if status.as_bool().unwrap_or(false) || self.gl.is_context_lost() {
            return Ok(shader);
        }

        let log = self
            .gl
            .get_shader_info_log(&shader)
            .unwrap_or_else(|| String::from("unknown shader building error"));

        self.gl.delete_shader(Some(&shader));

        Err(log)
    }
}

fn bind_target(kind: TextureKind) -> u32 {
    match kind {
        TextureKind::Flat => Gl2::TEXTURE_2D,
        TextureKind::Cube => Gl2::TEXTURE_CUBE_MAP,
    }
}

fn image_target(target: ImageTarget) -> u32 {
    match target {
        ImageTarget::Flat => Gl2::TEXTURE_2D,
        ImageTarget::Face(face) => Gl2::TEXTURE_CUBE_MAP_POSITIVE_X + face.index() as u32,
    }
}

fn image_kind(target: ImageTarget) -> TextureKind {
    match target {
        ImageTarget::Flat => TextureKind::Flat,
        ImageTarget::Face(_) => TextureKind::Cube,
    }
}

/// Internal format, pixel format and pixel type of a texture format.
fn format_triple(format: PixelFormat) -> (u32, u32, u32) {
    match format {
        PixelFormat::RGB32F => (Gl2::RGB32F, Gl2::RGB, Gl2::FLOAT),
        PixelFormat::RGBA16F => (Gl2::RGBA16F, Gl2::RGBA, Gl2::HALF_FLOAT),
        PixelFormat::RG16F => (Gl2::RG16F, Gl2::RG, Gl2::HALF_FLOAT),
        PixelFormat::RGBA8 => (Gl2::RGBA8, Gl2::RGBA, Gl2::UNSIGNED_BYTE),
    }
}

fn filter_mode(filter: Filter) -> i32 {
    (match filter {
        Filter::Nearest => Gl2::NEAREST,
        Filter::Linear => Gl2::LINEAR,
        Filter::LinearMipmapLinear => Gl2::LINEAR_MIPMAP_LINEAR,
    }) as i32
}

fn wrap_mode(wrap: Wrap) -> i32 {
    (match wrap {
        Wrap::Repeat => Gl2::REPEAT,
        Wrap::ClampToEdge => Gl2::CLAMP_TO_EDGE,
    }) as i32
}

impl Context for WebGlContext {
    fn shader_preamble(&self) -> &'static str {
        "#version 300 es\nprecision highp float;\nprecision highp int;\n"
    }

    fn create_texture(&self) -> Result<TextureHandle, Error> {
        let texture = self
            .gl
            .create_texture()
            .ok_or_else(|| Error::ResourceExhausted("texture object".into()))?;

        let mut objects = self.objects.borrow_mut();
        let id = objects.allocate_id();
        objects.textures.insert(
            id,
            TextureObject {
                object: texture,
                storage: None,
            },
        );

        TextureHandle::new(id).ok_or_else(|| Error::ResourceExhausted("texture ids".into()))
    }

    fn delete_texture(&self, texture: TextureHandle) {
        let mut objects = self.objects.borrow_mut();

        if let Some(texture) = objects.textures.remove(&texture.get()) {
            self.gl.delete_texture(Some(&texture.object));
        }

        objects.units.retain(|_, bound| *bound != texture.get());
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
        {
            let mut objects = self.objects.borrow_mut();

            let entry = match objects.textures.get_mut(&texture.get()) {
                Some(entry) => entry,
                None => return Err(Error::ResourceExhausted("unknown texture".into())),
            };

            let (internal_format, _, _) = format_triple(format);

            self.gl.bind_texture(bind_target(kind), Some(&entry.object));
            self.gl.tex_storage_2d(
                bind_target(kind),
                levels as i32,
                internal_format,
                cols as i32,
                rows as i32,
            );

            entry.storage = Some((format, cols, rows));
        }

        self.restore_unit_binding(kind);
        self.check_memory("texture storage")
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
        let kind = image_kind(target);

        {
            let objects = self.objects.borrow();

            let (object, format) = match objects.textures.get(&texture.get()) {
                Some(TextureObject {
                    object,
                    storage: Some((format, _, _)),
                }) => (object, *format),
                _ => return Err(Error::ResourceExhausted("texture has no storage".into())),
            };

            let (_, pixel_format, pixel_type) = format_triple(format);

            let source: Object = match data {
                TextureData::U8(data) => Uint8Array::from(data).into(),
                TextureData::F16(data) => Uint16Array::from(data).into(),
                TextureData::F32(data) => Float32Array::from(data).into(),
            };

            self.gl.bind_texture(bind_target(kind), Some(object));

            self.gl
                .tex_sub_image_2d_with_i32_and_i32_and_u32_and_type_and_opt_array_buffer_view(
                    image_target(target),
                    level as i32,
                    0,
                    0,
                    cols as i32,
                    rows as i32,
                    pixel_format,
                    pixel_type,
                    Some(&source),
                )
                .map_err(|_| Error::ResourceExhausted("texture upload rejected".into()))?;
        }

        self.restore_unit_binding(kind);
        self.check_memory("texture upload")
    }

    fn set_texture_sampling(
        &self,
        texture: TextureHandle,
        kind: TextureKind,
        min_filter: Filter,
        mag_filter: Filter,
        wrap: Wrap,
    ) {
        {
            let objects = self.objects.borrow();

            let object = match objects.textures.get(&texture.get()) {
                Some(texture) => &texture.object,
                None => return,
            };

            let target = bind_target(kind);

            self.gl.bind_texture(target, Some(object));
            self.gl
                .tex_parameteri(target, Gl2::TEXTURE_MIN_FILTER, filter_mode(min_filter));
            self.gl
                .tex_parameteri(target, Gl2::TEXTURE_MAG_FILTER, filter_mode(mag_filter));
            self.gl
                .tex_parameteri(target, Gl2::TEXTURE_WRAP_S, wrap_mode(wrap));
            self.gl
                .tex_parameteri(target, Gl2::TEXTURE_WRAP_T, wrap_mode(wrap));

            if kind == TextureKind::Cube {
                self.gl
                    .tex_parameteri(target, Gl2::TEXTURE_WRAP_R, wrap_mode(wrap));
            }
        }

        self.restore_unit_binding(kind);
    }

    fn read_texture(
        &self,
        texture: TextureHandle,
        target: ImageTarget,
        level: usize,
    ) -> Result<Vec<f32>, Error> {
        let objects = self.objects.borrow();

        let (object, format, cols, rows) = match objects.textures.get(&texture.get()) {
            Some(TextureObject {
                object,
                storage: Some((format, cols, rows)),
            }) => (object, *format, (*cols >> level).max(1), (*rows >> level).max(1)),
            _ => return Err(Error::ResourceExhausted("texture has no storage".into())),
        };

        if format == PixelFormat::RGB32F {
            return Err(Error::IncompleteFramebuffer(
                "RGB32F images cannot be read back".into(),
            ));
        }

        let framebuffer = self
            .gl
            .create_framebuffer()
            .ok_or_else(|| Error::ResourceExhausted("framebuffer object".into()))?;

        self.gl
            .bind_framebuffer(Gl2::READ_FRAMEBUFFER, Some(&framebuffer));
        self.gl.framebuffer_texture_2d(
            Gl2::READ_FRAMEBUFFER,
            Gl2::COLOR_ATTACHMENT0,
            image_target(target),
            Some(object),
            level as i32,
        );

        let result = if format == PixelFormat::RGBA8 {
            let mut pixels = vec![0u8; cols * rows * 4];

            self.gl
                .read_pixels_with_opt_u8_array(
                    0,
                    0,
                    cols as i32,
                    rows as i32,
                    Gl2::RGBA,
                    Gl2::UNSIGNED_BYTE,
                    Some(pixels.as_mut_slice()),
                )
                .map(|_| pixels.iter().map(|&x| f32::from(x) / 255.0).collect())
        } else {
            let pixels = Float32Array::new_with_length((cols * rows * 4) as u32);
            let view: &Object = pixels.as_ref();

            self.gl
                .read_pixels_with_opt_array_buffer_view(
                    0,
                    0,
                    cols as i32,
                    rows as i32,
                    Gl2::RGBA,
                    Gl2::FLOAT,
                    Some(view),
                )
                .map(|_| pixels.to_vec())
        };

        let current = objects
            .framebuffer
            .and_then(|id| objects.framebuffers.get(&id));

        self.gl.bind_framebuffer(Gl2::READ_FRAMEBUFFER, current);
        self.gl.delete_framebuffer(Some(&framebuffer));

        result.map_err(|_| Error::IncompleteFramebuffer("texture readback failed".into()))
    }

    fn active_texture(&self, unit: u32) {
        self.objects.borrow_mut().active_unit = unit;
        self.gl.active_texture(Gl2::TEXTURE0 + unit);
    }

    fn bind_texture(&self, kind: TextureKind, texture: Option<TextureHandle>) {
        let mut objects = self.objects.borrow_mut();
        let unit = objects.active_unit;

        let object = texture.and_then(|texture| objects.textures.get(&texture.get()));
        self.gl
            .bind_texture(bind_target(kind), object.map(|texture| &texture.object));

        match texture {
            Some(texture) => objects.units.insert((unit, kind), texture.get()),
            None => objects.units.remove(&(unit, kind)),
        };
    }

    fn texture_binding(&self, unit: u32, kind: TextureKind) -> Option<TextureHandle> {
        TextureHandle::new(*self.objects.borrow().units.get(&(unit, kind))?)
    }

    fn create_framebuffer(&self) -> Result<FramebufferHandle, Error> {
        let framebuffer = self
            .gl
            .create_framebuffer()
            .ok_or_else(|| Error::ResourceExhausted("framebuffer object".into()))?;

        let mut objects = self.objects.borrow_mut();
        let id = objects.allocate_id();
        objects.framebuffers.insert(id, framebuffer);

        FramebufferHandle::new(id).ok_or_else(|| Error::ResourceExhausted("framebuffer ids".into()))
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferHandle) {
        let mut objects = self.objects.borrow_mut();

        if let Some(object) = objects.framebuffers.remove(&framebuffer.get()) {
            self.gl.delete_framebuffer(Some(&object));
        }

        if objects.framebuffer == Some(framebuffer.get()) {
            objects.framebuffer = None;
        }
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>) {
        let mut objects = self.objects.borrow_mut();
        let id = framebuffer.map(FramebufferHandle::get);

        let object = id.and_then(|id| objects.framebuffers.get(&id));
        self.gl.bind_framebuffer(Gl2::FRAMEBUFFER, object);

        objects.framebuffer = id;
    }

    fn attach_texture(&self, texture: Option<TextureHandle>, target: ImageTarget, level: usize) {
        let objects = self.objects.borrow();
        let object = texture.and_then(|texture| objects.textures.get(&texture.get()));

        self.gl.framebuffer_texture_2d(
            Gl2::FRAMEBUFFER,
            Gl2::COLOR_ATTACHMENT0,
            image_target(target),
            object.map(|texture| &texture.object),
            level as i32,
        );
    }

    fn create_renderbuffer(&self) -> Result<RenderbufferHandle, Error> {
        let renderbuffer = self
            .gl
            .create_renderbuffer()
            .ok_or_else(|| Error::ResourceExhausted("renderbuffer object".into()))?;

        let mut objects = self.objects.borrow_mut();
        let id = objects.allocate_id();
        objects.renderbuffers.insert(id, renderbuffer);

        RenderbufferHandle::new(id)
            .ok_or_else(|| Error::ResourceExhausted("renderbuffer ids".into()))
    }

    fn delete_renderbuffer(&self, renderbuffer: RenderbufferHandle) {
        if let Some(object) = self
            .objects
            .borrow_mut()
            .renderbuffers
            .remove(&renderbuffer.get())
        {
            self.gl.delete_renderbuffer(Some(&object));
        }
    }

    fn allocate_renderbuffer(
        &self,
        renderbuffer: RenderbufferHandle,
        cols: usize,
        rows: usize,
    ) -> Result<(), Error> {
        {
            let objects = self.objects.borrow();

            let object = objects
                .renderbuffers
                .get(&renderbuffer.get())
                .ok_or_else(|| Error::ResourceExhausted("unknown renderbuffer".into()))?;

            self.gl.bind_renderbuffer(Gl2::RENDERBUFFER, Some(object));
            self.gl.renderbuffer_storage(
                Gl2::RENDERBUFFER,
                Gl2::DEPTH_COMPONENT24,
                cols as i32,
                rows as i32,
            );
        }

        self.check_memory("depth storage")
    }

    fn attach_renderbuffer(&self, renderbuffer: Option<RenderbufferHandle>) {
        let objects = self.objects.borrow();
        let object = renderbuffer.and_then(|rb| objects.renderbuffers.get(&rb.get()));

        self.gl.framebuffer_renderbuffer(
            Gl2::FRAMEBUFFER,
            Gl2::DEPTH_ATTACHMENT,
            Gl2::RENDERBUFFER,
            object,
        );
    }

    fn check_framebuffer(&self) -> Result<(), Error> {
        match self.gl.check_framebuffer_status(Gl2::FRAMEBUFFER) {
            Gl2::FRAMEBUFFER_COMPLETE => Ok(()),
            Gl2::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => Err(Error::IncompleteFramebuffer(
                "incomplete attachment".into(),
            )),
            Gl2::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => Err(Error::IncompleteFramebuffer(
                "missing color attachment".into(),
            )),
            Gl2::FRAMEBUFFER_INCOMPLETE_DIMENSIONS => Err(Error::IncompleteFramebuffer(
                "attachment dimensions differ".into(),
            )),
            Gl2::FRAMEBUFFER_UNSUPPORTED => Err(Error::IncompleteFramebuffer(
                "unsupported attachment format".into(),
            )),
            status => Err(Error::IncompleteFramebuffer(format!(
                "status {:#x}",
                status
            ))),
        }
    }

    fn viewport(&self, x: i32, y: i32, w: i32, h: i32) {
        self.gl.viewport(x, y, w, h);
    }

    fn clear(&self, color: [f32; 4]) {
        self.gl.clear_color(color[0], color[1], color[2], color[3]);
        self.gl
            .clear(Gl2::COLOR_BUFFER_BIT | Gl2::DEPTH_BUFFER_BIT);
    }

    fn set_depth_function(&self, function: DepthFunction) {
        self.gl.depth_func(match function {
            DepthFunction::Less => Gl2::LESS,
            DepthFunction::LessEqual => Gl2::LEQUAL,
        });
    }

    fn set_face_culling(&self, enabled: bool) {
        if enabled {
            self.gl.enable(Gl2::CULL_FACE);
        } else {
            self.gl.disable(Gl2::CULL_FACE);
        }
    }

    fn create_program(
        &self,
        name: &str,
        vertex: &str,
        fragment: &str,
    ) -> Result<ProgramHandle, Error> {
        let shader_error = |log: String| Error::Shader {
            name: name.to_owned(),
            log,
        };

        let vert = self
            .compile_shader(Gl2::VERTEX_SHADER, vertex)
            .map_err(shader_error)?;

        let frag = match self.compile_shader(Gl2::FRAGMENT_SHADER, fragment) {
            Ok(frag) => frag,
            Err(log) => {
                self.gl.delete_shader(Some(&vert));
                return Err(shader_error(log));
            }
        };

        let program = self
            .gl
            .create_program()
            .ok_or_else(|| Error::ResourceExhausted("program object".into()))?;

        self.gl.attach_shader(&program, &vert);
        self.gl.attach_shader(&program, &frag);
        self.gl.link_program(&program);

        self.gl.delete_shader(Some(&vert));
        self.gl.delete_shader(Some(&frag));

        let status = self.gl.get_program_parameter(&program, Gl2::LINK_STATUS);

        if !status.as_bool().unwrap_or(false) && !self.gl.is_context_lost() {
            let log = self
                .gl
                .get_program_info_log(&program)
                .unwrap_or_else(|| String::from("unknown program linking error"));

            self.gl.delete_program(Some(&program));

            return Err(shader_error(log));
        }

        let mut objects = self.objects.borrow_mut();
        let id = objects.allocate_id();
        objects.programs.insert(id, program);

        ProgramHandle::new(id).ok_or_else(|| Error::ResourceExhausted("program ids".into()))
    }

    fn delete_program(&self, program: ProgramHandle) {
        let mut objects = self.objects.borrow_mut();
        let id = program.get();

        if let Some(object) = objects.programs.remove(&id) {
            self.gl.delete_program(Some(&object));
        }

        let stale: Vec<u32> = objects
            .locations
            .iter()
            .filter(|(_, (owner, _, _))| *owner == id)
            .map(|(&location, _)| location)
            .collect();

        for location in stale {
            objects.locations.remove(&location);
            objects.values.remove(&location);
        }

        if objects.program == Some(id) {
            objects.program = None;
        }
    }

    fn use_program(&self, program: Option<ProgramHandle>) {
        let mut objects = self.objects.borrow_mut();
        let id = program.map(ProgramHandle::get);

        if objects.program == id {
            return;
        }

        let object = id.and_then(|id| objects.programs.get(&id));
        self.gl.use_program(object);

        objects.program = id;
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let mut objects = self.objects.borrow_mut();

        let existing = objects
            .locations
            .iter()
            .find(|(_, (owner, uniform, _))| *owner == program.get() && uniform == name)
            .map(|(&location, _)| location);

        if let Some(location) = existing {
            return UniformLocation::new(location);
        }

        let object = objects.programs.get(&program.get())?;
        let location = self.gl.get_uniform_location(object, name)?;

        let id = objects.allocate_id();
        objects
            .locations
            .insert(id, (program.get(), name.to_owned(), location));

        UniformLocation::new(id)
    }

    fn set_uniform(&self, location: UniformLocation, value: UniformValue) {
        let mut objects = self.objects.borrow_mut();

        let object = match objects.locations.get(&location.get()) {
            Some((owner, _, object)) if objects.program == Some(*owner) => object,
            _ => return,
        };

        let object = Some(object);

        match value {
            UniformValue::Int(x) => self.gl.uniform1i(object, x),
            UniformValue::Float(x) => self.gl.uniform1f(object, x),
            UniformValue::Vec2(v) => self.gl.uniform2fv_with_f32_array(object, &v),
            UniformValue::Vec3(v) => self.gl.uniform3fv_with_f32_array(object, &v),
            UniformValue::Vec4(v) => self.gl.uniform4fv_with_f32_array(object, &v),
            UniformValue::Mat4(m) => self
                .gl
                .uniform_matrix4fv_with_f32_array(object, false, &m),
        }

        objects.values.insert(location.get(), value);
    }

    fn uniform_value(
        &self,
        program: ProgramHandle,
        location: UniformLocation,
    ) -> Option<UniformValue> {
        let objects = self.objects.borrow();

        match objects.locations.get(&location.get()) {
            Some((owner, _, _)) if *owner == program.get() => {
                objects.values.get(&location.get()).copied()
            }
            _ => None,
        }
    }

    fn create_vertex_array(
        &self,
        data: &[u8],
        stride: usize,
        layout: &[VertexAttribute],
    ) -> Result<VertexArrayHandle, Error> {
        let buffer = self
            .gl
            .create_buffer()
            .ok_or_else(|| Error::ResourceExhausted("buffer object".into()))?;

        let vao = self
            .gl
            .create_vertex_array()
            .ok_or_else(|| Error::ResourceExhausted("vertex array object".into()))?;

        self.gl.bind_vertex_array(Some(&vao));
        self.gl.bind_buffer(Gl2::ARRAY_BUFFER, Some(&buffer));
        self.gl
            .buffer_data_with_u8_array(Gl2::ARRAY_BUFFER, data, Gl2::STATIC_DRAW);

        for attribute in layout {
            self.gl.vertex_attrib_pointer_with_i32(
                attribute.index as u32,
                attribute.kind.components() as i32,
                Gl2::FLOAT,
                false,
                stride as i32,
                attribute.offset as i32,
            );

            self.gl.enable_vertex_attrib_array(attribute.index as u32);
        }

        self.gl.bind_vertex_array(None);

        self.check_memory("vertex buffer")?;

        let mut objects = self.objects.borrow_mut();
        let id = objects.allocate_id();
        objects.vertex_arrays.insert(id, (vao, buffer));

        VertexArrayHandle::new(id).ok_or_else(|| Error::ResourceExhausted("vertex array ids".into()))
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle) {
        if let Some((vao, buffer)) = self
            .objects
            .borrow_mut()
            .vertex_arrays
            .remove(&vertex_array.get())
        {
            self.gl.delete_vertex_array(Some(&vao));
            self.gl.delete_buffer(Some(&buffer));
        }
    }

    fn draw(&self, vertex_array: VertexArrayHandle, primitive: Primitive, first: usize, count: usize) {
        let objects = self.objects.borrow();

        if let Some((vao, _)) = objects.vertex_arrays.get(&vertex_array.get()) {
            let mode = match primitive {
                Primitive::Triangles => Gl2::TRIANGLES,
                Primitive::TriangleStrip => Gl2::TRIANGLE_STRIP,
            };

            self.gl.bind_vertex_array(Some(vao));
            self.gl.draw_arrays(mode, first as i32, count as i32);
            self.gl.bind_vertex_array(None);
        }
    }

    fn read_screen(&self, cols: usize, rows: usize) -> Result<Vec<u8>, Error> {
        let objects = self.objects.borrow();
        let mut pixels = vec![0u8; cols * rows * 4];

        self.gl.bind_framebuffer(Gl2::READ_FRAMEBUFFER, None);

        let result = self.gl.read_pixels_with_opt_u8_array(
            0,
            0,
            cols as i32,
            rows as i32,
            Gl2::RGBA,
            Gl2::UNSIGNED_BYTE,
            Some(pixels.as_mut_slice()),
        );

        let current = objects
            .framebuffer
            .and_then(|id| objects.framebuffers.get(&id));

        self.gl.bind_framebuffer(Gl2::READ_FRAMEBUFFER, current);

        result.map_err(|_| Error::ResourceExhausted("screen readback failed".into()))?;

        Ok(pixels)
    }
}

impl WebGlContext {
    /// Rebinds whatever the active unit had bound before a storage operation.
    fn restore_unit_binding(&self, kind: TextureKind) {
        let objects = self.objects.borrow();

        let object = objects
            .units
            .get(&(objects.active_unit, kind))
            .and_then(|id| objects.textures.get(id));

        self.gl
            .bind_texture(bind_target(kind), object.map(|texture| &texture.object));
    }
}
