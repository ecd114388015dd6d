use std::collections::HashMap;
use std::mem::size_of;

use glam::Mat4;
use log::{debug, warn};

use super::{BufferHandles, BufferManager, DrawParams};
use crate::geometry::{PrimitiveTopology, Vertex};

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub handles: BufferHandles,
    pub topology: PrimitiveTopology,
    /// Vertex count for array draws, index count for indexed draws.
    pub count: usize,
    pub indexed: bool,
    pub params: DrawParams,
    pub view: Mat4,
    pub projection: Mat4,
}

#[derive(Debug)]
struct UploadedBuffers {
    vertices: Vec<u8>,
    indices: Option<Vec<u8>>,
}

/// In-memory [`BufferManager`] that keeps uploads as bytes and logs draws.
///
/// Used by the headless binary and by tests; no GPU context is required.
#[derive(Debug, Default)]
pub struct HeadlessBufferManager {
    next_id: u32,
    buffers: HashMap<u32, UploadedBuffers>,
    created: usize,
    deleted: usize,
    commands: Vec<DrawCommand>,
    total_draw_calls: u64,
    view: Mat4,
    projection: Mat4,
}

impl HeadlessBufferManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the per-frame draw log.
    pub fn begin_frame(&mut self) {
        self.commands.clear();
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Draw calls recorded since the last [`begin_frame`](Self::begin_frame).
    pub fn draw_calls(&self) -> usize {
        self.commands.len()
    }

    pub fn total_draw_calls(&self) -> u64 {
        self.total_draw_calls
    }

    pub fn created_count(&self) -> usize {
        self.created
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted
    }

    pub fn live_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn uploaded_bytes(&self) -> usize {
        self.buffers
            .values()
            .map(|buffers| buffers.vertices.len() + buffers.indices.as_ref().map_or(0, Vec::len))
            .sum()
    }

    /// Reads an uploaded vertex buffer back.
    pub fn vertices(&self, handles: BufferHandles) -> Option<Vec<Vertex>> {
        let buffers = self.buffers.get(&handles.vao)?;
        Some(
            buffers
                .vertices
                .chunks_exact(size_of::<Vertex>())
                .map(bytemuck::pod_read_unaligned)
                .collect(),
        )
    }

    /// Reads an uploaded index buffer back.
    pub fn indices(&self, handles: BufferHandles) -> Option<Vec<u32>> {
        let bytes = self.buffers.get(&handles.vao)?.indices.as_ref()?;
        Some(
            bytes
                .chunks_exact(size_of::<u32>())
                .map(bytemuck::pod_read_unaligned)
                .collect(),
        )
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn record(
        &mut self,
        handles: BufferHandles,
        topology: PrimitiveTopology,
        count: usize,
        indexed: bool,
        params: &DrawParams,
    ) {
        if !self.buffers.contains_key(&handles.vao) {
            warn!("draw with released buffers {handles:?} skipped");
            return;
        }
        self.total_draw_calls += 1;
        self.commands.push(DrawCommand {
            handles,
            topology,
            count,
            indexed,
            params: *params,
            view: self.view,
            projection: self.projection,
        });
    }
}

impl BufferManager for HeadlessBufferManager {
    fn create_buffers(&mut self, vertices: &[Vertex]) -> BufferHandles {
        let vao = self.allocate();
        let vbo = self.allocate();
        self.buffers.insert(
            vao,
            UploadedBuffers {
                vertices: bytemuck::cast_slice(vertices).to_vec(),
                indices: None,
            },
        );
        self.created += 1;
        debug!("created buffers vao={vao} vbo={vbo} ({} vertices)", vertices.len());
        BufferHandles { vao, vbo, ebo: None }
    }

    fn create_indexed_buffers(&mut self, vertices: &[Vertex], indices: &[u32]) -> BufferHandles {
        let vao = self.allocate();
        let vbo = self.allocate();
        let ebo = self.allocate();
        self.buffers.insert(
            vao,
            UploadedBuffers {
                vertices: bytemuck::cast_slice(vertices).to_vec(),
                indices: Some(bytemuck::cast_slice(indices).to_vec()),
            },
        );
        self.created += 1;
        debug!(
            "created indexed buffers vao={vao} vbo={vbo} ebo={ebo} ({} vertices, {} indices)",
            vertices.len(),
            indices.len()
        );
        BufferHandles {
            vao,
            vbo,
            ebo: Some(ebo),
        }
    }

    fn delete_buffers(&mut self, handles: BufferHandles) {
        if self.buffers.remove(&handles.vao).is_some() {
            self.deleted += 1;
        } else {
            warn!("delete of unknown buffers {handles:?} ignored");
        }
    }

    fn set_camera(&mut self, view: Mat4, projection: Mat4) {
        self.view = view;
        self.projection = projection;
    }

    fn draw_arrays(
        &mut self,
        handles: BufferHandles,
        topology: PrimitiveTopology,
        vertex_count: usize,
        params: &DrawParams,
    ) {
        self.record(handles, topology, vertex_count, false, params);
    }

    fn draw_elements(
        &mut self,
        handles: BufferHandles,
        topology: PrimitiveTopology,
        index_count: usize,
        params: &DrawParams,
    ) {
        self.record(handles, topology, index_count, true, params);
    }
}
