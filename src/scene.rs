use anyhow::{anyhow, bail, Context, Result};
use glam::{Vec2, Vec3};
use log::{info, warn};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::camera::{CameraMode, UpAxis};
use crate::controller::ControllerSettings;
use crate::geometry::{Geometry, Shape, Vertex};
use crate::input::{InputFrame, MouseButton};
use crate::transform::{ModelTransform, Viewport};

/// Upper bound on `<repeat>` for one recorded input frame.
pub const MAX_INPUT_REPEAT: u32 = 10_000;

/// Everything a sandbox run needs: settings, objects and recorded input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneDescription {
    pub settings: SandboxSettings,
    pub objects: Vec<SceneObject>,
    /// Pointer input replayed one entry per frame.
    pub input: Vec<InputFrame>,
}

impl SceneDescription {
    /// Parses a `<scene>` document.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let root = document.root_element();

        let settings = match child(&root, "settings") {
            Some(node) => parse_settings(&node).context("invalid <settings>")?,
            None => SandboxSettings::default(),
        };

        let mut objects = Vec::new();
        for node in root.children().filter(|n| n.has_tag_name("object")) {
            let object = parse_object(&node).with_context(|| {
                let name = optional_text(&node, "name").unwrap_or_else(|| "<unnamed>".to_string());
                format!("invalid object {name}")
            })?;
            objects.push(object);
        }

        let mut input = Vec::new();
        if let Some(node) = child(&root, "input") {
            for (index, entry) in node
                .children()
                .filter(|n| n.has_tag_name("frame"))
                .enumerate()
            {
                let (frame, repeat) =
                    parse_input_frame(&entry).with_context(|| format!("invalid input frame {index}"))?;
                input.extend(std::iter::repeat(frame).take(repeat));
            }
        }

        info!(
            "scene parsed: {} objects, {} input frames",
            objects.len(),
            input.len()
        );
        Ok(Self {
            settings,
            objects,
            input,
        })
    }

    /// Instances drawn per frame across all objects.
    pub fn instance_count(&self) -> usize {
        self.objects.iter().map(|object| object.instances as usize).sum()
    }
}

/// What the settings panel of the interactive sandbox edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxSettings {
    #[serde(default = "default_mode")]
    pub mode: CameraMode,
    #[serde(default)]
    pub batching: bool,
    #[serde(default)]
    pub controller: ControllerSettings,
    #[serde(default)]
    pub up_axis: UpAxis,
    #[serde(default = "default_background")]
    pub background: Vec3,
    #[serde(default = "default_point_size")]
    pub point_size: f32,
    #[serde(default = "default_line_width")]
    pub line_width: f32,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default = "default_target_fps")]
    pub target_fps: f32,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            batching: false,
            controller: ControllerSettings::default(),
            up_axis: UpAxis::default(),
            background: default_background(),
            point_size: default_point_size(),
            line_width: default_line_width(),
            viewport: Viewport::default(),
            target_fps: default_target_fps(),
        }
    }
}

fn default_mode() -> CameraMode {
    CameraMode::Orbit
}

fn default_background() -> Vec3 {
    Vec3::splat(0.1)
}

fn default_point_size() -> f32 {
    5.0
}

fn default_line_width() -> f32 {
    1.0
}

fn default_target_fps() -> f32 {
    60.0
}

/// One primitive, possibly drawn several times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    pub shape: Shape,
    #[serde(default = "default_color")]
    pub color: Vec3,
    #[serde(default)]
    pub transform: ModelTransform,
    /// Free-form vertex data; unused by parametric shapes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vertices: Vec<Vertex>,
    #[serde(default = "default_instances")]
    pub instances: u32,
    /// Offset between consecutive instances.
    #[serde(default = "default_spacing")]
    pub spacing: Vec3,
    /// Per-instance colour overrides, cycled when there are fewer than instances.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tints: Vec<Vec3>,
}

fn default_color() -> Vec3 {
    Vec3::ONE
}

fn default_instances() -> u32 {
    1
}

fn default_spacing() -> Vec3 {
    Vec3::new(1.5, 0.0, 0.0)
}

impl SceneObject {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            color: default_color(),
            transform: ModelTransform::default(),
            vertices: Vec::new(),
            instances: default_instances(),
            spacing: default_spacing(),
            tints: Vec::new(),
        }
    }

    /// Builds the geometry shared by every instance of this object.
    pub fn build_geometry(&self) -> Geometry {
        match self.shape {
            Shape::Points => {
                let mut geometry = Geometry::points();
                for vertex in &self.vertices {
                    geometry.add_point(vertex.position(), vertex.color());
                }
                geometry
            }
            Shape::Lines => {
                let mut geometry = Geometry::lines();
                for pair in self.vertices.chunks_exact(2) {
                    geometry.add_line_colored(pair[0], pair[1]);
                }
                geometry
            }
            Shape::Triangles => {
                let mut geometry = Geometry::triangles();
                for corners in self.vertices.chunks_exact(3) {
                    geometry.add_triangle_colored([corners[0], corners[1], corners[2]]);
                }
                geometry
            }
            Shape::Rectangle { width, height } => Geometry::rectangle(width, height, self.color),
            Shape::Cube { size } => Geometry::cube(size, self.color),
            Shape::Sphere {
                radius,
                segments,
                rings,
            } => Geometry::sphere(radius, segments, rings, self.color),
        }
    }

    /// Per-instance transforms, stepping by `spacing` from the base transform.
    pub fn instance_transforms(&self) -> Vec<ModelTransform> {
        (0..self.instances)
            .map(|index| ModelTransform {
                position: self.transform.position + self.spacing * index as f32,
                ..self.transform
            })
            .collect()
    }

    pub fn instance_tint(&self, index: usize) -> Option<Vec3> {
        if self.tints.is_empty() {
            None
        } else {
            Some(self.tints[index % self.tints.len()])
        }
    }
}

fn parse_settings(node: &Node<'_, '_>) -> Result<SandboxSettings> {
    let mut settings = SandboxSettings::default();
    if let Some(mode) = optional_text(node, "mode") {
        settings.mode =
            CameraMode::from_name(&mode).ok_or_else(|| anyhow!("unknown camera mode {mode}"))?;
    }
    settings.batching = parse_bool(optional_text(node, "batch"), settings.batching)?;
    if let Some(axis) = optional_text(node, "up_axis") {
        settings.up_axis =
            UpAxis::from_name(&axis).ok_or_else(|| anyhow!("unknown up axis {axis}"))?;
    }

    let controller = &mut settings.controller;
    let orbit = parse_f32(optional_text(node, "orbit_sensitivity"), controller.orbit_sensitivity())?;
    controller.set_orbit_sensitivity(orbit);
    let pan = parse_f32(optional_text(node, "pan_sensitivity"), controller.pan_sensitivity())?;
    controller.set_pan_sensitivity(pan);
    let zoom = parse_f32(optional_text(node, "zoom_sensitivity"), controller.zoom_sensitivity())?;
    controller.set_zoom_sensitivity(zoom);
    let rotation = parse_f32(
        optional_text(node, "rotation_sensitivity"),
        controller.rotation_sensitivity(),
    )?;
    controller.set_rotation_sensitivity(rotation);

    settings.background = parse_color(optional_text(node, "background"), settings.background)?;
    settings.point_size = parse_f32(optional_text(node, "point_size"), settings.point_size)?.max(1.0);
    settings.line_width = parse_f32(optional_text(node, "line_width"), settings.line_width)?.max(1.0);
    settings.target_fps = parse_f32(optional_text(node, "target_fps"), settings.target_fps)?;
    if let Some(viewport) = optional_text(node, "viewport") {
        let size = parse_vec2(Some(viewport), Vec2::ZERO)?;
        if size.x < 1.0 || size.y < 1.0 {
            bail!("viewport must be at least 1x1 pixels");
        }
        settings.viewport = Viewport::new(size.x as u32, size.y as u32);
    }
    Ok(settings)
}

fn parse_object(node: &Node<'_, '_>) -> Result<SceneObject> {
    let name = required_text(node, "name")?;
    let kind = optional_text(node, "type").unwrap_or_else(|| "cube".to_string());
    let shape = match kind.to_ascii_lowercase().as_str() {
        "points" => Shape::Points,
        "lines" => Shape::Lines,
        "triangles" => Shape::Triangles,
        "rectangle" => Shape::Rectangle {
            width: parse_f32(optional_text(node, "width"), 1.0)?,
            height: parse_f32(optional_text(node, "height"), 1.0)?,
        },
        "cube" => Shape::Cube {
            size: parse_f32(optional_text(node, "size"), 1.0)?,
        },
        "sphere" => Shape::Sphere {
            radius: parse_f32(optional_text(node, "radius"), 0.5)?,
            segments: parse_u32(optional_text(node, "segments"), 32)?,
            rings: parse_u32(optional_text(node, "rings"), 16)?,
        },
        other => bail!("unknown object type {other}"),
    };

    let mut object = SceneObject::new(name, shape);
    object.color = parse_color(optional_text(node, "color"), object.color)?;
    object.transform.position = parse_vec3(optional_text(node, "position"), Vec3::ZERO)?;
    object.transform.rotation = parse_vec3(optional_text(node, "rotation"), Vec3::ZERO)?;
    object.transform.scale = parse_vec3(optional_text(node, "scale"), Vec3::ONE)?;
    object.instances = parse_u32(optional_text(node, "instances"), 1)?.max(1);
    object.spacing = parse_vec3(optional_text(node, "spacing"), object.spacing)?;

    for tint in node.children().filter(|n| n.has_tag_name("tint")) {
        let text = tint.text().map(str::trim).unwrap_or_default();
        object.tints.push(parse_color(Some(text.to_string()), Vec3::ONE)?);
    }

    for vertex in node.children().filter(|n| n.has_tag_name("vertex")) {
        let text = vertex.text().map(str::trim).unwrap_or_default();
        object.vertices.push(parse_vertex(text, object.color)?);
    }

    let stride = match object.shape {
        Shape::Lines => 2,
        Shape::Triangles => 3,
        _ => 1,
    };
    if object.vertices.len() % stride != 0 {
        bail!(
            "{} need a multiple of {stride} vertices, got {}",
            object.shape.label(),
            object.vertices.len()
        );
    }
    Ok(object)
}

/// `x y z` or `x y z r g b`, colour channels in 0-255.
fn parse_vertex(text: &str, color: Vec3) -> Result<Vertex> {
    let numbers = text
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .map_err(|err| anyhow!("failed to parse vertex component {component}: {err}"))
        })
        .collect::<Result<Vec<_>>>()?;
    match numbers.as_slice() {
        [x, y, z] => Ok(Vertex::new(Vec3::new(*x, *y, *z), color)),
        [x, y, z, r, g, b] => Ok(Vertex::new(
            Vec3::new(*x, *y, *z),
            Vec3::new(*r, *g, *b) / 255.0,
        )),
        _ => bail!("vertex needs 3 or 6 numbers, got {}", numbers.len()),
    }
}

fn parse_input_frame(node: &Node<'_, '_>) -> Result<(InputFrame, usize)> {
    let mut frame = InputFrame::idle();
    if let Some(buttons) = optional_text(node, "buttons") {
        for name in buttons.split(|c: char| c == ',' || c.is_whitespace()) {
            if name.is_empty() {
                continue;
            }
            let button =
                MouseButton::from_name(name).ok_or_else(|| anyhow!("unknown mouse button {name}"))?;
            frame = frame.with_button(button);
        }
    }
    frame.delta = parse_vec2(optional_text(node, "delta"), Vec2::ZERO)?;
    frame.scroll = parse_scroll(optional_text(node, "scroll"))?;
    let requested = parse_u32(optional_text(node, "repeat"), 1)?;
    let repeat = requested.min(MAX_INPUT_REPEAT);
    if repeat < requested {
        warn!("input frame repeat {requested} capped at {MAX_INPUT_REPEAT}");
    }
    Ok((frame, repeat as usize))
}

/// A single number is a vertical scroll.
fn parse_scroll(value: Option<String>) -> Result<Vec2> {
    let Some(value) = value else {
        return Ok(Vec2::ZERO);
    };
    if value.split_whitespace().count() == 1 {
        return Ok(Vec2::new(0.0, parse_f32(Some(value), 0.0)?));
    }
    parse_vec2(Some(value), Vec2::ZERO)
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(tag))
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn components<const N: usize>(value: &str, what: &str) -> Result<[f32; N]> {
    let mut out = [0.0; N];
    let mut numbers = value.split_whitespace();
    for slot in &mut out {
        let component = numbers
            .next()
            .ok_or_else(|| anyhow!("{what} is missing components"))?;
        *slot = component
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse {what} component {component}: {err}"))?;
    }
    Ok(out)
}

fn parse_vec2(value: Option<String>, default: Vec2) -> Result<Vec2> {
    match value {
        Some(value) => Ok(Vec2::from_array(components::<2>(&value, "vector")?)),
        None => Ok(default),
    }
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    match value {
        Some(value) => Ok(Vec3::from_array(components::<3>(&value, "vector")?)),
        None => Ok(default),
    }
}

fn parse_color(value: Option<String>, default: Vec3) -> Result<Vec3> {
    match value {
        Some(value) => Ok(Vec3::from_array(components::<3>(&value, "color")?) / 255.0),
        None => Ok(default),
    }
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}

fn parse_u32(value: Option<String>, default: u32) -> Result<u32> {
    match value {
        Some(value) => value
            .parse::<u32>()
            .map_err(|err| anyhow!("failed to parse integer {value}: {err}")),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, default: bool) -> Result<bool> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(anyhow!("failed to parse boolean {other}")),
    }
}
