#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{Error, Gl, VertexArrayHandle, VertexAttribute};
use std::marker::PhantomData;
use zerocopy::{AsBytes, FromBytes};

#[derive(Debug)]
pub struct VertexArray<T: ?Sized> {
    gl: Gl,
    handle: Option<VertexArrayHandle>,
    size: usize,
    phantom: PhantomData<T>,
}

impl<T: ?Sized> VertexArray<T> {
    pub fn new(gl: Gl) -> Self {
        Self {
            gl,
            handle: None,
            size: 0,
            phantom: PhantomData,
        }
    }

    pub fn handle(&self) -> Option<VertexArrayHandle> {
        self.handle
    }
}

impl<T: AsBytes + FromBytes + VertexLayout> VertexArray<[T]> {
    pub fn vertex_count(&self) -> usize {
        self.size / std::mem::size_of::<T>()
    }

    pub fn upload(&mut self, data: &[T]) -> Result<(), Error> {
        if let Some(handle) = self.handle.take() {
            self.gl.delete_vertex_array(handle);
        }

        let stride = std::mem::size_of::<T>();

        self.handle = Some(
            self.gl
                .create_vertex_array(data.as_bytes(), stride, T::VERTEX_LAYOUT)?,
        );

        self.size = data.len() * stride;

        Ok(())
    }
}

impl<T: ?Sized> Drop for VertexArray<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            self.gl.delete_vertex_array(handle);
        }
    }
}

pub trait VertexLayout {
    const VERTEX_LAYOUT: &'static [VertexAttribute];
}

pub trait AsVertexArray {
    fn vertex_array(&self) -> Option<VertexArrayHandle>;

    fn vertex_count(&self) -> usize;
}

impl<T: AsBytes + FromBytes + VertexLayout> AsVertexArray for VertexArray<[T]> {
    fn vertex_array(&self) -> Option<VertexArrayHandle> {
        self.handle
    }

    fn vertex_count(&self) -> usize {
        VertexArray::vertex_count(self)
    }
}
