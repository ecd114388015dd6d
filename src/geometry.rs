//! Primitive shapes and the buffers that back them.
//!
//! Free-form shapes (points, lines, triangles) are built incrementally and
//! drawn without indices. Parametric shapes (rectangle, cube, sphere) are
//! regenerated whenever one of their parameters changes and always draw
//! indexed.

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::render::{BufferHandles, BufferManager, DrawParams};

pub const MIN_SPHERE_SEGMENTS: u32 = 3;
pub const MIN_SPHERE_RINGS: u32 = 2;
pub const MAX_SPHERE_SEGMENTS: u32 = 1024;
pub const MAX_SPHERE_RINGS: u32 = 1024;

/// Clamps sphere tessellation into the supported range.
pub fn sphere_detail(segments: u32, rings: u32) -> (u32, u32) {
    (
        segments.clamp(MIN_SPHERE_SEGMENTS, MAX_SPHERE_SEGMENTS),
        rings.clamp(MIN_SPHERE_RINGS, MAX_SPHERE_RINGS),
    )
}

/// Interleaved vertex: position followed by colour.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn color(&self) -> Vec3 {
        Vec3::from_array(self.color)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveTopology {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveTopology {
    pub fn label(self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Lines => "lines",
            Self::LineStrip => "line-strip",
            Self::LineLoop => "line-loop",
            Self::Triangles => "triangles",
            Self::TriangleStrip => "triangle-strip",
            Self::TriangleFan => "triangle-fan",
        }
    }
}

/// What a [`Geometry`] draws, with the parameters of parametric shapes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Points,
    Lines,
    Triangles,
    Rectangle { width: f32, height: f32 },
    Cube { size: f32 },
    Sphere { radius: f32, segments: u32, rings: u32 },
}

impl Shape {
    pub fn topology(&self) -> PrimitiveTopology {
        match self {
            Self::Points => PrimitiveTopology::Points,
            Self::Lines => PrimitiveTopology::Lines,
            _ => PrimitiveTopology::Triangles,
        }
    }

    pub fn is_parametric(&self) -> bool {
        !matches!(self, Self::Points | Self::Lines | Self::Triangles)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Lines => "lines",
            Self::Triangles => "triangles",
            Self::Rectangle { .. } => "rectangle",
            Self::Cube { .. } => "cube",
            Self::Sphere { .. } => "sphere",
        }
    }
}

/// Axis-aligned rectangle in the XY plane, centred on the origin.
pub fn rectangle_mesh(width: f32, height: f32, color: Vec3) -> (Vec<Vertex>, Vec<u32>) {
    let (hw, hh) = (width * 0.5, height * 0.5);
    let vertices = vec![
        Vertex::new(Vec3::new(-hw, -hh, 0.0), color),
        Vertex::new(Vec3::new(hw, -hh, 0.0), color),
        Vertex::new(Vec3::new(hw, hh, 0.0), color),
        Vertex::new(Vec3::new(-hw, hh, 0.0), color),
    ];
    (vertices, vec![0, 1, 2, 2, 3, 0])
}

/// Cube with shared corners, counter-clockwise faces seen from outside.
pub fn cube_mesh(size: f32, color: Vec3) -> (Vec<Vertex>, Vec<u32>) {
    let h = size * 0.5;
    let corners = [
        [-h, -h, h],
        [h, -h, h],
        [h, h, h],
        [-h, h, h],
        [-h, -h, -h],
        [h, -h, -h],
        [h, h, -h],
        [-h, h, -h],
    ];
    let vertices = corners
        .iter()
        .map(|corner| Vertex::new(Vec3::from_array(*corner), color))
        .collect();
    let indices = vec![
        0, 1, 2, 2, 3, 0, // front
        5, 4, 7, 7, 6, 5, // back
        3, 2, 6, 6, 7, 3, // top
        4, 5, 1, 1, 0, 4, // bottom
        1, 5, 6, 6, 2, 1, // right
        4, 0, 3, 3, 7, 4, // left
    ];
    (vertices, indices)
}

/// UV sphere around the origin. Segment and ring counts are clamped by
/// [`sphere_detail`].
pub fn sphere_mesh(radius: f32, segments: u32, rings: u32, color: Vec3) -> (Vec<Vertex>, Vec<u32>) {
    let (segments, rings) = sphere_detail(segments, rings);
    let (columns, rows) = (segments as usize, rings as usize);
    let mut vertices = Vec::with_capacity((rows + 1) * (columns + 1));
    let mut indices = Vec::with_capacity(rows * columns * 6);

    for ring in 0..=rings {
        let theta = PI * ring as f32 / rings as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();
        for segment in 0..=segments {
            let phi = 2.0 * PI * segment as f32 / segments as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();
            let direction = Vec3::new(sin_theta * cos_phi, cos_theta, sin_theta * sin_phi);
            vertices.push(Vertex::new(direction * radius, color));
        }
    }

    for ring in 0..rings {
        for segment in 0..segments {
            let first = ring * (segments + 1) + segment;
            let second = first + segments + 1;
            indices.extend_from_slice(&[first, second, first + 1, second, second + 1, first + 1]);
        }
    }

    (vertices, indices)
}

/// A drawable shape that owns its vertex data and GPU buffers.
#[derive(Debug, Clone)]
pub struct Geometry {
    shape: Shape,
    color: Vec3,
    vertices: Vec<Vertex>,
    indices: Option<Vec<u32>>,
    point_size: f32,
    line_width: f32,
    handles: Option<BufferHandles>,
    stale: bool,
}

impl Geometry {
    fn with_shape(shape: Shape, color: Vec3) -> Self {
        let mut geometry = Self {
            shape,
            color,
            vertices: Vec::new(),
            indices: None,
            point_size: 5.0,
            line_width: 1.0,
            handles: None,
            stale: true,
        };
        geometry.regenerate();
        info!(
            "{} geometry initialized with {} vertices",
            shape.label(),
            geometry.vertices.len()
        );
        geometry
    }

    pub fn points() -> Self {
        Self::with_shape(Shape::Points, Vec3::ONE)
    }

    pub fn lines() -> Self {
        Self::with_shape(Shape::Lines, Vec3::ONE)
    }

    pub fn triangles() -> Self {
        Self::with_shape(Shape::Triangles, Vec3::ONE)
    }

    pub fn rectangle(width: f32, height: f32, color: Vec3) -> Self {
        Self::with_shape(Shape::Rectangle { width, height }, color)
    }

    pub fn cube(size: f32, color: Vec3) -> Self {
        Self::with_shape(Shape::Cube { size }, color)
    }

    pub fn sphere(radius: f32, segments: u32, rings: u32, color: Vec3) -> Self {
        let (segments, rings) = sphere_detail(segments, rings);
        Self::with_shape(
            Shape::Sphere {
                radius,
                segments,
                rings,
            },
            color,
        )
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.shape.topology()
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.as_ref().map_or(0, Vec::len)
    }

    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    pub fn set_point_size(&mut self, size: f32) {
        self.point_size = size.max(1.0);
    }

    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.line_width = width.max(1.0);
    }

    pub fn handles(&self) -> Option<BufferHandles> {
        self.handles
    }

    /// True once buffers exist and match the current data.
    pub fn is_uploaded(&self) -> bool {
        self.handles.is_some() && !self.stale
    }

    pub fn add_point(&mut self, position: Vec3, color: Vec3) {
        if self.expect_shape(Shape::Points, "add_point") {
            self.push(&[Vertex::new(position, color)]);
        }
    }

    pub fn add_line(&mut self, start: Vec3, end: Vec3, color: Vec3) {
        self.add_line_colored(Vertex::new(start, color), Vertex::new(end, color));
    }

    /// Adds a segment whose ends carry their own colours.
    pub fn add_line_colored(&mut self, start: Vertex, end: Vertex) {
        if self.expect_shape(Shape::Lines, "add_line") {
            self.push(&[start, end]);
        }
    }

    pub fn add_triangle(&mut self, corners: [Vec3; 3], color: Vec3) {
        self.add_triangle_colored(corners.map(|corner| Vertex::new(corner, color)));
    }

    pub fn add_triangle_colored(&mut self, corners: [Vertex; 3]) {
        if self.expect_shape(Shape::Triangles, "add_triangle") {
            self.push(&corners);
        }
    }

    /// Drops all free-form vertices. Buffers are released on the next sync.
    pub fn clear(&mut self) {
        if self.shape.is_parametric() {
            return;
        }
        self.vertices.clear();
        self.stale = true;
    }

    /// Recolours the shape. Free-form vertices are all repainted.
    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
        if self.shape.is_parametric() {
            self.regenerate();
        } else {
            for vertex in &mut self.vertices {
                vertex.color = color.to_array();
            }
            self.stale = true;
        }
    }

    pub fn set_rectangle_size(&mut self, width: f32, height: f32) {
        if let Shape::Rectangle { .. } = self.shape {
            self.shape = Shape::Rectangle { width, height };
            self.regenerate();
        } else {
            self.wrong_shape("set_rectangle_size");
        }
    }

    pub fn set_cube_size(&mut self, size: f32) {
        if let Shape::Cube { .. } = self.shape {
            self.shape = Shape::Cube { size };
            self.regenerate();
        } else {
            self.wrong_shape("set_cube_size");
        }
    }

    pub fn set_sphere(&mut self, radius: f32, segments: u32, rings: u32) {
        if let Shape::Sphere { .. } = self.shape {
            let (segments, rings) = sphere_detail(segments, rings);
            self.shape = Shape::Sphere {
                radius,
                segments,
                rings,
            };
            self.regenerate();
        } else {
            self.wrong_shape("set_sphere");
        }
    }

    /// Brings GPU buffers in line with the current data.
    ///
    /// Stale buffers are deleted first; an empty shape ends with no buffers.
    pub fn upload(&mut self, manager: &mut dyn BufferManager) {
        if !self.stale && self.handles.is_some() {
            return;
        }
        self.cleanup(manager);
        self.stale = false;
        if self.vertices.is_empty() {
            return;
        }
        let handles = match &self.indices {
            Some(indices) => manager.create_indexed_buffers(&self.vertices, indices),
            None => manager.create_buffers(&self.vertices),
        };
        debug!(
            "uploaded {} geometry: {} vertices, {} indices",
            self.shape.label(),
            self.vertices.len(),
            self.index_count()
        );
        self.handles = Some(handles);
    }

    /// Draws one instance, uploading first if needed. Returns whether a
    /// draw call was issued.
    ///
    /// The point size and line width of the geometry override those in
    /// `params`; nothing on the geometry itself is modified per instance.
    pub fn draw(&mut self, manager: &mut dyn BufferManager, params: &DrawParams) -> bool {
        self.upload(manager);
        let Some(handles) = self.handles else {
            return false;
        };
        let params = DrawParams {
            point_size: self.point_size,
            line_width: self.line_width,
            ..*params
        };
        match &self.indices {
            Some(indices) => {
                manager.draw_elements(handles, self.topology(), indices.len(), &params)
            }
            None => manager.draw_arrays(handles, self.topology(), self.vertices.len(), &params),
        }
        true
    }

    /// Releases GPU buffers. Safe to call repeatedly.
    pub fn cleanup(&mut self, manager: &mut dyn BufferManager) {
        if let Some(handles) = self.handles.take() {
            manager.delete_buffers(handles);
        }
    }

    fn push(&mut self, vertices: &[Vertex]) {
        self.vertices.extend_from_slice(vertices);
        self.stale = true;
    }

    fn regenerate(&mut self) {
        let color = self.color;
        let mesh = match self.shape {
            Shape::Points | Shape::Lines | Shape::Triangles => None,
            Shape::Rectangle { width, height } => Some(rectangle_mesh(width, height, color)),
            Shape::Cube { size } => Some(cube_mesh(size, color)),
            Shape::Sphere {
                radius,
                segments,
                rings,
            } => Some(sphere_mesh(radius, segments, rings, color)),
        };
        if let Some((vertices, indices)) = mesh {
            self.vertices = vertices;
            self.indices = Some(indices);
        }
        self.stale = true;
    }

    fn expect_shape(&self, shape: Shape, operation: &str) -> bool {
        if self.shape == shape {
            true
        } else {
            self.wrong_shape(operation);
            false
        }
    }

    fn wrong_shape(&self, operation: &str) {
        warn!("{operation} ignored on {} geometry", self.shape.label());
    }
}
