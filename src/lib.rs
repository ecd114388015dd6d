//! Building blocks for an interactive primitive-rendering sandbox.
//!
//! The crate covers orbit and flat cameras driven by pointer input, batched
//! and immediate geometry submission, and per-frame metrics.  Everything
//! GPU facing goes through [`render::BufferManager`], so the whole frame
//! loop can run headless in tests and tooling.

pub mod app;
pub mod batch;
pub mod camera;
pub mod controller;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod metrics;
pub mod render;
pub mod scene;
pub mod transform;

pub use app::{GeometryTotals, Sandbox, SceneItem};
pub use batch::{BatchError, BatchRenderer, RenderBatch};
pub use camera::{Camera, Camera2D, Camera3D, CameraMode, CameraView, UpAxis};
pub use controller::{ControllerSettings, OrbitController};
pub use geometry::{Geometry, PrimitiveTopology, Shape, Vertex};
pub use input::{InputFrame, MouseButton, PointerTracker};
pub use logging::{init_logging, LoggingConfig};
pub use metrics::{FrameClock, FrameMetrics};
pub use render::{BufferHandles, BufferManager, DrawParams, HeadlessBufferManager};
pub use scene::{SandboxSettings, SceneDescription, SceneObject};
pub use transform::{ModelTransform, Viewport};
