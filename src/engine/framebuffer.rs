#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{
    ColorAttachment, Error, FramebufferHandle, Gl, ImageTarget, RenderTarget, RenderbufferHandle,
    TextureHandle,
};

pub trait AsAttachment {
    type Target: RenderTarget;

    fn as_attachment(&self) -> Option<TextureHandle>;

    fn attachment_dimensions(&self, level: usize) -> (usize, usize);
}

/// Framebuffer with a single color attachment and a depth renderbuffer.
///
/// The depth storage is resized by `rebuild` while the color attachment can
/// be swapped between any texture image of matching dimensions, which lets a
/// single framebuffer be reused to render every face and mip of a cubemap.
#[derive(Debug)]
pub struct Framebuffer {
    gl: Gl,
    handle: Option<FramebufferHandle>,
    depth: Option<RenderbufferHandle>,
    cols: usize,
    rows: usize,
}

impl Framebuffer {
    pub fn new(gl: Gl) -> Self {
        Self {
            gl,
            handle: None,
            depth: None,
            cols: 0,
            rows: 0,
        }
    }

    pub fn handle(&self) -> Option<FramebufferHandle> {
        self.handle
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Creates the framebuffer if needed and resizes its depth storage.
    pub fn rebuild(&mut self, cols: usize, rows: usize) -> Result<(), Error> {
        assert!(cols > 0 && rows > 0, "invalid framebuffer dimensions");

        let handle = match self.handle {
            Some(handle) => handle,
            None => {
                let handle = self.gl.create_framebuffer()?;
                self.handle = Some(handle);
                handle
            }
        };

        let depth = match self.depth {
            Some(depth) => depth,
            None => {
                let depth = self.gl.create_renderbuffer()?;
                self.depth = Some(depth);
                depth
            }
        };

        if (self.cols, self.rows) != (cols, rows) {
            self.gl.allocate_renderbuffer(depth, cols, rows)?;
            self.cols = cols;
            self.rows = rows;
        }

        self.gl.bind_framebuffer(Some(handle));
        self.gl.attach_renderbuffer(Some(depth));

        Ok(())
    }

    /// Binds the framebuffer and attaches one image of the target as color.
    pub fn attach(
        &self,
        attachment: &dyn AsAttachment<Target = ColorAttachment>,
        target: ImageTarget,
        level: usize,
    ) -> Result<(), Error> {
        if attachment.attachment_dimensions(level) != (self.cols, self.rows) {
            panic!("inconsistent framebuffer attachment dimensions");
        }

        self.gl.bind_framebuffer(self.handle);
        self.gl
            .attach_texture(attachment.as_attachment(), target, level);

        self.gl.check_framebuffer()
    }

    /// Detaches the color image and restores the default framebuffer.
    pub fn unbind(&self) {
        self.gl.bind_framebuffer(self.handle);
        self.gl.attach_texture(None, ImageTarget::Flat, 0);
        self.gl.bind_framebuffer(None);
    }

    pub fn clear(&self, color: [f32; 4]) {
        self.gl.bind_framebuffer(self.handle);
        self.gl.clear(color);
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            self.gl.delete_framebuffer(handle);
        }

        if let Some(depth) = self.depth {
            self.gl.delete_renderbuffer(depth);
        }
    }
}
