#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::shaders;
use crate::{
    unit_quad, Display, Error, Framebuffer, Gl, ImageTarget, QuadVertex, Shader, Texture,
    VertexArray, Wrap, RGBA8,
};

/// Offscreen render target at the scaled resolution, resolved to the screen
/// through the anti-aliasing, bloom and vignette shader.
///
/// The frame is drawn between `begin` and `present`. Only `present` touches
/// the default framebuffer, at the window size.
#[derive(Debug)]
pub struct PostProcess {
    gl: Gl,

    target: Texture<RGBA8>,
    framebuffer: Framebuffer,
    shader: Shader,
    quad: VertexArray<[QuadVertex]>,
}

impl PostProcess {
    pub fn new(gl: &Gl) -> Result<Self, Error> {
        let mut shader = Shader::new(
            gl.clone(),
            &shaders::VS_QUAD,
            &shaders::FS_POSTFX,
            &[("sceneTexture", 0)],
        );

        shader.rebuild()?;

        let mut quad = VertexArray::new(gl.clone());
        quad.upload(&unit_quad())?;

        Ok(Self {
            gl: gl.clone(),
            target: Texture::new(gl.clone()).with_wrap(Wrap::ClampToEdge),
            framebuffer: Framebuffer::new(gl.clone()),
            shader,
            quad,
        })
    }

    /// Reallocates the render target for a new scaled resolution.
    pub fn resize(&mut self, resolution: [f32; 2]) -> Result<(), Error> {
        let cols = (resolution[0] as usize).max(1);
        let rows = (resolution[1] as usize).max(1);

        if (self.target.cols(), self.target.rows()) != (cols, rows) {
            debug!("post-processing target resized to {}x{}", cols, rows);
        }

        self.target.create(cols, rows)?;
        self.framebuffer.rebuild(cols, rows)?;
        self.framebuffer.attach(&self.target, ImageTarget::Flat, 0)?;
        self.framebuffer.unbind();

        self.shader
            .set_uniform("resolution", [cols as f32, rows as f32]);

        Ok(())
    }

    pub fn set_effects(&self, display: &Display) {
        self.shader.set_uniform("enabledFxaa", display.fxaa);
        self.shader.set_uniform("enabledBloom", display.bloom);
        self.shader.set_uniform("enabledVignette", display.vignette);
    }

    /// Redirects drawing to the render target and clears it.
    pub fn begin(&self, background: [f32; 4]) {
        self.framebuffer.clear(background);
        self.gl
            .viewport(0, 0, self.target.cols() as i32, self.target.rows() as i32);
    }

    /// Draws the render target over the whole screen.
    pub fn present(&self, width: u32, height: u32) {
        self.gl.bind_framebuffer(None);

        let mut command = self.shader.begin_draw();
        command.set_viewport(0, 0, width as i32, height as i32);
        command.bind(&self.target, "sceneTexture");
        command.draw_triangle_strip(&self.quad);
    }

    pub fn target(&self) -> &Texture<RGBA8> {
        &self.target
    }

    pub fn shader(&self) -> &Shader {
        &self.shader
    }
}
