//! Draw-call batching.
//!
//! A [`BatchRenderer`] collects instances of geometry that share one
//! topology, bakes each instance's model matrix into a copy of its vertices
//! and uploads everything as a single buffer. One draw call then replaces N.

use glam::Mat4;
use log::{debug, warn};
use thiserror::Error;

use crate::geometry::{Geometry, PrimitiveTopology, Vertex};
use crate::render::{BufferHandles, BufferManager, DrawParams};
use crate::transform;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("cannot mix indexed and non-indexed geometry in one batch")]
    MixedIndexing { batch_indexed: bool },
    #[error("index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("{found} geometry cannot join a {expected} batch")]
    TopologyMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

fn indexing_label(indexed: bool) -> &'static str {
    if indexed {
        "indexed"
    } else {
        "non-indexed"
    }
}

/// One queued instance. Vertex data is an owned snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderBatch {
    pub vertices: Vec<Vertex>,
    pub indices: Option<Vec<u32>>,
    pub transform: Mat4,
    /// Start of this batch inside the merged vertex buffer, set by a merge.
    pub vertex_offset: usize,
}

impl RenderBatch {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.as_ref().map_or(0, Vec::len)
    }
}

/// Result of merging a list of batches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedGeometry {
    pub vertices: Vec<Vertex>,
    pub indices: Option<Vec<u32>>,
}

/// Transforms and concatenates `batches` in order, recording each batch's
/// vertex offset. Indices, when present, are rebased by that offset.
pub fn merge_batches(batches: &mut [RenderBatch], indexed: bool) -> MergedGeometry {
    let total_vertices = batches.iter().map(RenderBatch::vertex_count).sum();
    let mut vertices = Vec::with_capacity(total_vertices);
    let mut indices = indexed.then(|| {
        Vec::with_capacity(batches.iter().map(RenderBatch::index_count).sum())
    });

    for batch in batches.iter_mut() {
        let offset = vertices.len();
        batch.vertex_offset = offset;
        vertices.extend(batch.vertices.iter().map(|vertex| Vertex {
            position: transform::transform_point(&batch.transform, vertex.position()).to_array(),
            color: vertex.color,
        }));
        if let (Some(merged), Some(own)) = (indices.as_mut(), batch.indices.as_ref()) {
            let base = offset as u32;
            merged.extend(own.iter().map(|index| index + base));
        }
    }

    MergedGeometry { vertices, indices }
}

/// Merges same-topology geometry into one buffer and draws it at once.
#[derive(Debug)]
pub struct BatchRenderer {
    topology: PrimitiveTopology,
    batches: Vec<RenderBatch>,
    handles: Option<BufferHandles>,
    dirty: bool,
    /// Fixed by the first add after construction or a clear.
    indexed: Option<bool>,
    total_vertices: usize,
    total_indices: usize,
}

impl BatchRenderer {
    pub fn new(topology: PrimitiveTopology) -> Self {
        Self {
            topology,
            batches: Vec::new(),
            handles: None,
            dirty: false,
            indexed: None,
            total_vertices: 0,
            total_indices: 0,
        }
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    pub fn batches(&self) -> &[RenderBatch] {
        &self.batches
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    pub fn total_vertices(&self) -> usize {
        self.total_vertices
    }

    pub fn total_indices(&self) -> usize {
        self.total_indices
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed.unwrap_or(false)
    }

    pub fn handles(&self) -> Option<BufferHandles> {
        self.handles
    }

    /// Queues a copy of `vertices` (and `indices`) under `transform`.
    ///
    /// Empty vertex input is accepted and ignored.
    pub fn add(
        &mut self,
        vertices: &[Vertex],
        indices: Option<&[u32]>,
        transform: Mat4,
    ) -> Result<(), BatchError> {
        if vertices.is_empty() {
            return Ok(());
        }
        let incoming = indices.is_some();
        if let Some(batch_indexed) = self.indexed {
            if batch_indexed != incoming {
                warn!(
                    "rejected {} geometry for {} {} batch",
                    indexing_label(incoming),
                    indexing_label(batch_indexed),
                    self.topology.label()
                );
                return Err(BatchError::MixedIndexing { batch_indexed });
            }
        }
        if let Some(&index) = indices
            .unwrap_or_default()
            .iter()
            .find(|&&index| index as usize >= vertices.len())
        {
            return Err(BatchError::IndexOutOfRange {
                index,
                vertex_count: vertices.len(),
            });
        }

        self.indexed = Some(incoming);
        self.batches.push(RenderBatch {
            vertices: vertices.to_vec(),
            indices: indices.map(<[u32]>::to_vec),
            transform,
            vertex_offset: 0,
        });
        self.dirty = true;
        Ok(())
    }

    pub fn add_geometry(&mut self, geometry: &Geometry, transform: Mat4) -> Result<(), BatchError> {
        if geometry.topology() != self.topology {
            return Err(BatchError::TopologyMismatch {
                expected: self.topology.label(),
                found: geometry.topology().label(),
            });
        }
        self.add(geometry.vertices(), geometry.indices(), transform)
    }

    /// Drops queued batches. The uploaded buffer stays alive until
    /// [`cleanup`](Self::cleanup) or the next build.
    pub fn clear(&mut self) {
        self.batches.clear();
        self.indexed = None;
        self.dirty = true;
        self.total_vertices = 0;
        self.total_indices = 0;
    }

    /// Merges queued batches and replaces the uploaded buffer.
    pub fn build(&mut self, manager: &mut dyn BufferManager) {
        if self.batches.is_empty() || !self.dirty {
            return;
        }
        let indexed = self.is_indexed();
        let merged = merge_batches(&mut self.batches, indexed);
        self.total_vertices = merged.vertices.len();
        self.total_indices = merged.indices.as_ref().map_or(0, Vec::len);

        self.cleanup(manager);
        if !merged.vertices.is_empty() {
            self.handles = Some(match &merged.indices {
                Some(indices) => manager.create_indexed_buffers(&merged.vertices, indices),
                None => manager.create_buffers(&merged.vertices),
            });
        }
        self.dirty = false;
        debug!(
            "built {} batch: {} instances, {} vertices, {} indices",
            self.topology.label(),
            self.batches.len(),
            self.total_vertices,
            self.total_indices
        );
    }

    /// Builds if needed, then issues at most one draw call.
    ///
    /// Returns whether a draw was issued. `params.model` should normally be
    /// the identity since instance transforms are already baked in.
    pub fn flush(&mut self, manager: &mut dyn BufferManager, params: &DrawParams) -> bool {
        if self.dirty {
            self.build(manager);
        }
        let Some(handles) = self.handles else {
            return false;
        };
        if self.total_vertices == 0 {
            return false;
        }
        if self.is_indexed() && self.total_indices > 0 {
            manager.draw_elements(handles, self.topology, self.total_indices, params);
        } else {
            manager.draw_arrays(handles, self.topology, self.total_vertices, params);
        }
        true
    }

    /// Releases the uploaded buffer. Safe to call repeatedly.
    pub fn cleanup(&mut self, manager: &mut dyn BufferManager) {
        if let Some(handles) = self.handles.take() {
            manager.delete_buffers(handles);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessBufferManager;
    use glam::Vec3;

    fn tri(color: Vec3) -> Vec<Vertex> {
        vec![
            Vertex::new(Vec3::ZERO, color),
            Vertex::new(Vec3::X, color),
            Vertex::new(Vec3::Y, color),
        ]
    }

    #[test]
    fn indices_are_rebased_per_batch() {
        let mut manager = HeadlessBufferManager::new();
        let mut batcher = BatchRenderer::new(PrimitiveTopology::Triangles);
        batcher.add(&tri(Vec3::X), Some(&[0, 1, 2]), Mat4::IDENTITY).unwrap();
        batcher.add(&tri(Vec3::Y), Some(&[0, 1, 2]), Mat4::IDENTITY).unwrap();
        batcher.build(&mut manager);

        let handles = batcher.handles().unwrap();
        assert_eq!(manager.indices(handles), Some(vec![0, 1, 2, 3, 4, 5]));
        assert_eq!(batcher.batches()[1].vertex_offset, 3);
        assert_eq!(batcher.total_vertices(), 6);
        assert_eq!(batcher.total_indices(), 6);
    }

    #[test]
    fn model_matrix_moves_positions_not_colors() {
        let color = Vec3::new(0.2, 0.4, 0.6);
        let mut batches = vec![RenderBatch {
            vertices: vec![Vertex::new(Vec3::new(1.0, 2.0, 3.0), color)],
            indices: None,
            transform: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            vertex_offset: 0,
        }];
        let merged = merge_batches(&mut batches, false);
        assert_eq!(merged.vertices[0].position(), Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(merged.vertices[0].color(), color);
        assert!(merged.indices.is_none());
    }

    #[test]
    fn projective_transform_divides_by_w() {
        let mut scale_w = Mat4::IDENTITY;
        scale_w.w_axis.w = 2.0;
        let mut batches = vec![RenderBatch {
            vertices: vec![Vertex::new(Vec3::new(2.0, 4.0, 6.0), Vec3::ONE)],
            indices: None,
            transform: scale_w,
            vertex_offset: 0,
        }];
        let merged = merge_batches(&mut batches, false);
        assert_eq!(merged.vertices[0].position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn merge_does_not_alias_source() {
        let mut manager = HeadlessBufferManager::new();
        let mut geometry = Geometry::triangles();
        geometry.add_triangle([Vec3::ZERO, Vec3::X, Vec3::Y], Vec3::ONE);
        let mut batcher = BatchRenderer::new(PrimitiveTopology::Triangles);
        batcher.add_geometry(&geometry, Mat4::IDENTITY).unwrap();
        batcher.build(&mut manager);

        geometry.clear();
        let uploaded = manager.vertices(batcher.handles().unwrap()).unwrap();
        assert_eq!(uploaded.len(), 3);
        assert_eq!(batcher.batches()[0].vertex_count(), 3);
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let mut manager = HeadlessBufferManager::new();
        let mut batcher = BatchRenderer::new(PrimitiveTopology::Points);
        batcher.add(&[], None, Mat4::IDENTITY).unwrap();
        assert_eq!(batcher.batch_count(), 0);
        assert!(!batcher.is_dirty());

        batcher.build(&mut manager);
        assert!(!batcher.flush(&mut manager, &DrawParams::default()));
        assert_eq!(manager.created_count(), 0);
        assert_eq!(manager.draw_calls(), 0);
        assert_eq!(batcher.total_vertices(), 0);
        assert_eq!(batcher.total_indices(), 0);
    }

    #[test]
    fn flush_issues_exactly_one_draw() {
        let mut manager = HeadlessBufferManager::new();
        let mut batcher = BatchRenderer::new(PrimitiveTopology::Triangles);
        for step in 0..5 {
            let transform = Mat4::from_translation(Vec3::new(step as f32, 0.0, 0.0));
            batcher.add(&tri(Vec3::ONE), None, transform).unwrap();
        }
        assert!(batcher.flush(&mut manager, &DrawParams::default()));
        assert_eq!(manager.draw_calls(), 1);
        let command = &manager.commands()[0];
        assert!(!command.indexed);
        assert_eq!(command.count, 15);

        // A clean batch flushes without rebuilding.
        assert!(batcher.flush(&mut manager, &DrawParams::default()));
        assert_eq!(manager.created_count(), 1);
    }

    #[test]
    fn mixed_indexing_is_rejected() {
        let mut batcher = BatchRenderer::new(PrimitiveTopology::Triangles);
        batcher.add(&tri(Vec3::ONE), Some(&[0, 1, 2]), Mat4::IDENTITY).unwrap();
        let err = batcher.add(&tri(Vec3::ONE), None, Mat4::IDENTITY).unwrap_err();
        assert_eq!(err, BatchError::MixedIndexing { batch_indexed: true });
        assert_eq!(batcher.batch_count(), 1);

        // Clearing the queue frees the mode again.
        batcher.clear();
        batcher.add(&tri(Vec3::ONE), None, Mat4::IDENTITY).unwrap();
        assert!(!batcher.is_indexed());
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let mut batcher = BatchRenderer::new(PrimitiveTopology::Triangles);
        let err = batcher
            .add(&tri(Vec3::ONE), Some(&[0, 1, 3]), Mat4::IDENTITY)
            .unwrap_err();
        assert_eq!(
            err,
            BatchError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            }
        );
        assert_eq!(batcher.batch_count(), 0);
    }

    #[test]
    fn topology_must_match() {
        let mut batcher = BatchRenderer::new(PrimitiveTopology::Lines);
        let cube = Geometry::cube(1.0, Vec3::ONE);
        let err = batcher.add_geometry(&cube, Mat4::IDENTITY).unwrap_err();
        assert!(err.to_string().contains("triangles geometry cannot join a lines batch"));
    }

    #[test]
    fn clear_keeps_buffer_until_cleanup() {
        let mut manager = HeadlessBufferManager::new();
        let mut batcher = BatchRenderer::new(PrimitiveTopology::Triangles);
        batcher.add(&tri(Vec3::ONE), None, Mat4::IDENTITY).unwrap();
        batcher.build(&mut manager);
        batcher.clear();
        assert_eq!(batcher.total_vertices(), 0);
        assert!(batcher.handles().is_some());
        assert_eq!(manager.live_count(), 1);
        assert!(!batcher.flush(&mut manager, &DrawParams::default()));

        batcher.cleanup(&mut manager);
        batcher.cleanup(&mut manager);
        assert_eq!(manager.live_count(), 0);
        assert_eq!(manager.deleted_count(), 1);
    }

    #[test]
    fn rebuild_replaces_buffer() {
        let mut manager = HeadlessBufferManager::new();
        let mut batcher = BatchRenderer::new(PrimitiveTopology::Triangles);
        batcher.add(&tri(Vec3::ONE), None, Mat4::IDENTITY).unwrap();
        batcher.build(&mut manager);
        batcher.add(&tri(Vec3::ONE), None, Mat4::IDENTITY).unwrap();
        batcher.build(&mut manager);
        assert_eq!(manager.created_count(), 2);
        assert_eq!(manager.live_count(), 1);
        assert_eq!(batcher.total_vertices(), 6);
    }
}
