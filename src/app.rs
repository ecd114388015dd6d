use glam::Vec3;
use log::{info, warn};

use crate::batch::BatchRenderer;
use crate::camera::{Camera, CameraMode, CameraView};
use crate::controller::OrbitController;
use crate::geometry::{Geometry, PrimitiveTopology, Vertex};
use crate::input::InputFrame;
use crate::metrics::FrameMetrics;
use crate::render::{BufferManager, DrawParams};
use crate::scene::{SandboxSettings, SceneDescription, SceneObject};
use crate::transform::{ModelTransform, Viewport};

/// Topologies that get their own batch renderer.
const BATCHED_TOPOLOGIES: [PrimitiveTopology; 3] = [
    PrimitiveTopology::Points,
    PrimitiveTopology::Lines,
    PrimitiveTopology::Triangles,
];

/// One scene object with its shared geometry and instance list.
#[derive(Debug)]
pub struct SceneItem {
    pub name: String,
    pub geometry: Geometry,
    pub instances: Vec<ModelTransform>,
    pub tints: Vec<Option<Vec3>>,
}

impl SceneItem {
    pub fn from_object(object: &SceneObject, settings: &SandboxSettings) -> Self {
        let mut geometry = object.build_geometry();
        geometry.set_point_size(settings.point_size);
        geometry.set_line_width(settings.line_width);
        let instances = object.instance_transforms();
        let tints = (0..instances.len())
            .map(|index| object.instance_tint(index))
            .collect();
        Self {
            name: object.name.clone(),
            geometry,
            instances,
            tints,
        }
    }
}

/// Totals of what a frame submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometryTotals {
    pub vertices: usize,
    pub indices: usize,
}

/// One interactive sandbox session.
///
/// Owns both cameras (the inactive one is parked so switching modes keeps
/// its state), the controller, scene geometry, one batch renderer per
/// topology and the frame metrics.
#[derive(Debug)]
pub struct Sandbox {
    settings: SandboxSettings,
    camera: Camera,
    parked: Camera,
    controller: OrbitController,
    items: Vec<SceneItem>,
    batches: Vec<BatchRenderer>,
    batches_stale: bool,
    metrics: FrameMetrics,
    frame_count: u64,
}

impl Sandbox {
    pub fn new(scene: &SceneDescription) -> Self {
        let settings = scene.settings.clone();
        let mut orbit = Camera::new(CameraMode::Orbit, settings.viewport);
        if let Some(camera) = orbit.as_3d_mut() {
            camera.set_up_axis(settings.up_axis);
        }
        let flat = Camera::new(CameraMode::Flat, settings.viewport);
        let (camera, parked) = match settings.mode {
            CameraMode::Orbit => (orbit, flat),
            CameraMode::Flat => (flat, orbit),
        };

        let items = scene
            .objects
            .iter()
            .map(|object| SceneItem::from_object(object, &settings))
            .collect();
        let batches = BATCHED_TOPOLOGIES
            .iter()
            .map(|&topology| BatchRenderer::new(topology))
            .collect();

        info!(
            "sandbox ready: {} objects, {} camera, batching {}",
            scene.objects.len(),
            settings.mode.label(),
            if settings.batching { "on" } else { "off" }
        );
        Self {
            controller: OrbitController::new(settings.controller),
            metrics: FrameMetrics::new(settings.target_fps),
            settings,
            camera,
            parked,
            items,
            batches,
            batches_stale: true,
            frame_count: 0,
        }
    }

    pub fn settings(&self) -> &SandboxSettings {
        &self.settings
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn controller_mut(&mut self) -> &mut OrbitController {
        &mut self.controller
    }

    pub fn items(&self) -> &[SceneItem] {
        &self.items
    }

    pub fn metrics(&self) -> &FrameMetrics {
        &self.metrics
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn batching(&self) -> bool {
        self.settings.batching
    }

    /// Switches the active camera. Each camera keeps its own state.
    pub fn switch_mode(&mut self, mode: CameraMode) {
        if self.camera.mode() != mode {
            std::mem::swap(&mut self.camera, &mut self.parked);
            info!("camera mode switched to {}", mode.label());
        }
        self.settings.mode = mode;
    }

    pub fn set_batching(&mut self, enabled: bool) {
        if enabled && !self.settings.batching {
            self.batches_stale = true;
        }
        self.settings.batching = enabled;
    }

    /// Resets the active camera, keeping the configured up axis.
    pub fn reset_camera(&mut self) {
        self.camera.reset();
        if let Some(camera) = self.camera.as_3d_mut() {
            camera.set_up_axis(self.settings.up_axis);
        }
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.settings.viewport = viewport;
        self.camera.set_viewport(viewport);
        self.parked.set_viewport(viewport);
    }

    /// Vertices and indices submitted per frame in the current mode.
    pub fn totals(&self) -> GeometryTotals {
        if self.settings.batching {
            self.batches
                .iter()
                .fold(GeometryTotals::default(), |totals, batch| GeometryTotals {
                    vertices: totals.vertices + batch.total_vertices(),
                    indices: totals.indices + batch.total_indices(),
                })
        } else {
            self.items
                .iter()
                .fold(GeometryTotals::default(), |totals, item| {
                    let copies = item.instances.len();
                    GeometryTotals {
                        vertices: totals.vertices + item.geometry.vertex_count() * copies,
                        indices: totals.indices + item.geometry.index_count() * copies,
                    }
                })
        }
    }

    /// Runs one update/render iteration and returns the draw calls issued.
    pub fn frame(&mut self, input: &InputFrame, dt: f32, sink: &mut dyn BufferManager) -> usize {
        self.metrics.begin_frame(dt);

        self.metrics
            .time("camera update", |_| self.controller.update(&mut self.camera, input));
        sink.set_camera(self.camera.view_matrix(), self.camera.projection_matrix());

        let draw_calls = if self.settings.batching {
            if self.batches_stale {
                let items = &self.items;
                let batches = &mut self.batches;
                self.metrics.time("batch rebuild", |_| refill_batches(items, batches));
                self.batches_stale = false;
            }
            let batches = &mut self.batches;
            let params = raster_params(&self.settings);
            self.metrics.time("render batched", |metrics| {
                batches
                    .iter_mut()
                    .filter(|batch| batch.batch_count() > 0)
                    .map(|batch| {
                        let label = batch.topology().label();
                        metrics.time(label, |_| usize::from(batch.flush(sink, &params)))
                    })
                    .sum::<usize>()
            })
        } else {
            let items = &mut self.items;
            self.metrics.time("render immediate", |metrics| {
                items
                    .iter_mut()
                    .map(|item| {
                        let name = item.name.clone();
                        metrics.time(&name, |_| draw_item(item, sink))
                    })
                    .sum::<usize>()
            })
        };

        self.metrics.set_draw_calls(draw_calls);
        self.metrics.end_frame();
        self.frame_count += 1;
        draw_calls
    }

    /// Releases every GPU buffer the sandbox created.
    pub fn cleanup(&mut self, sink: &mut dyn BufferManager) {
        for item in &mut self.items {
            item.geometry.cleanup(sink);
        }
        for batch in &mut self.batches {
            batch.cleanup(sink);
        }
    }
}

fn raster_params(settings: &SandboxSettings) -> DrawParams {
    DrawParams {
        point_size: settings.point_size,
        line_width: settings.line_width,
        ..DrawParams::default()
    }
}

fn draw_item(item: &mut SceneItem, sink: &mut dyn BufferManager) -> usize {
    let mut draws = 0;
    for (transform, tint) in item.instances.iter().zip(&item.tints) {
        let params = DrawParams {
            tint: *tint,
            ..DrawParams::with_model(transform.matrix())
        };
        if item.geometry.draw(sink, &params) {
            draws += 1;
        }
    }
    draws
}

/// Requeues every instance into the batch renderer for its topology.
///
/// Tinted instances are queued with recoloured vertex copies.
fn refill_batches(items: &[SceneItem], batches: &mut [BatchRenderer]) {
    for batch in batches.iter_mut() {
        batch.clear();
    }
    for item in items {
        let topology = item.geometry.topology();
        let Some(batch) = batches.iter_mut().find(|batch| batch.topology() == topology) else {
            warn!("no batch renderer for {} ({})", item.name, topology.label());
            continue;
        };
        for (transform, tint) in item.instances.iter().zip(&item.tints) {
            let result = match tint {
                Some(color) => {
                    let recolored: Vec<Vertex> = item
                        .geometry
                        .vertices()
                        .iter()
                        .map(|vertex| Vertex::new(vertex.position(), *color))
                        .collect();
                    batch.add(&recolored, item.geometry.indices(), transform.matrix())
                }
                None => batch.add_geometry(&item.geometry, transform.matrix()),
            };
            if let Err(err) = result {
                warn!("{} not batched: {err}", item.name);
            }
        }
    }
}
