//! The render sink: everything geometry and batching hand to the GPU side.

mod headless;

use glam::{Mat4, Vec3};

use crate::geometry::{PrimitiveTopology, Vertex};

pub use headless::{DrawCommand, HeadlessBufferManager};

/// Buffer objects backing one uploaded vertex (and optional index) array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandles {
    pub vao: u32,
    pub vbo: u32,
    pub ebo: Option<u32>,
}

/// Per-instance draw arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawParams {
    pub model: Mat4,
    /// Replaces the vertex colours for this draw when set.
    pub tint: Option<Vec3>,
    pub point_size: f32,
    pub line_width: f32,
}

impl Default for DrawParams {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            tint: None,
            point_size: 1.0,
            line_width: 1.0,
        }
    }
}

impl DrawParams {
    pub fn with_model(model: Mat4) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }
}

/// Capability interface over the graphics API.
///
/// Implementations own the actual buffer objects; callers only keep
/// [`BufferHandles`] and must hand them back to [`delete_buffers`](Self::delete_buffers).
pub trait BufferManager {
    fn create_buffers(&mut self, vertices: &[Vertex]) -> BufferHandles;
    fn create_indexed_buffers(&mut self, vertices: &[Vertex], indices: &[u32]) -> BufferHandles;
    fn delete_buffers(&mut self, handles: BufferHandles);
    /// Uploads the camera matrices used by subsequent draws.
    fn set_camera(&mut self, view: Mat4, projection: Mat4);
    fn draw_arrays(
        &mut self,
        handles: BufferHandles,
        topology: PrimitiveTopology,
        vertex_count: usize,
        params: &DrawParams,
    );
    fn draw_elements(
        &mut self,
        handles: BufferHandles,
        topology: PrimitiveTopology,
        index_count: usize,
        params: &DrawParams,
    );
}
