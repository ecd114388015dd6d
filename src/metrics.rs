//! Frame timing and per-frame performance counters.
//!
//! [`FrameMetrics`] is an ordinary value owned by the caller and threaded
//! through the update loop; there is no process-wide instance.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::info;

/// Frames accumulated before the FPS figure is recomputed.
pub const FPS_WINDOW: u32 = 10;
/// FPS samples kept for [`FrameMetrics::fps_stats`].
pub const FPS_HISTORY: usize = 60;

/// Delta fed to the first frame, which has nothing to measure against.
pub const NOMINAL_DT: Duration = Duration::from_micros(16_667);

/// One step of the frame clock.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameStep {
    pub index: u64,
    /// Seconds since the previous step, kept inside the clock's limits.
    pub dt: f32,
    /// Wall time since the clock was created.
    pub elapsed: Duration,
}

/// Wall-clock pacing for a frame loop.
///
/// Stalls are reported as `max_dt` and busy loops as `min_dt`, so one bad
/// frame never reaches the controller or the FPS window as an outlier.
#[derive(Debug, Clone)]
pub struct FrameClock {
    started: Instant,
    previous: Option<Instant>,
    steps: u64,
    min_dt: Duration,
    max_dt: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_limits(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Limits are swapped if given in the wrong order.
    pub fn with_limits(min_dt: Duration, max_dt: Duration) -> Self {
        Self {
            started: Instant::now(),
            previous: None,
            steps: 0,
            min_dt: min_dt.min(max_dt),
            max_dt: max_dt.max(min_dt),
        }
    }

    pub fn tick(&mut self) -> FrameStep {
        let now = Instant::now();
        let raw = match self.previous.replace(now) {
            Some(previous) => now.saturating_duration_since(previous),
            None => NOMINAL_DT,
        };
        let step = FrameStep {
            index: self.steps,
            dt: raw.clamp(self.min_dt, self.max_dt).as_secs_f32(),
            elapsed: now.saturating_duration_since(self.started),
        };
        self.steps += 1;
        step
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Average, minimum and maximum over the FPS history.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FpsStats {
    pub average: f32,
    pub min: f32,
    pub max: f32,
}

/// One named operation in the timing tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingNode {
    pub name: String,
    /// Total time across this frame's calls.
    pub elapsed: Duration,
    pub call_count: u32,
    /// Children in the order they first ran.
    pub children: Vec<TimingNode>,
}

impl TimingNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            elapsed: Duration::ZERO,
            call_count: 0,
            children: Vec::new(),
        }
    }

    /// Sum of the leaf times below this node.
    pub fn children_elapsed(&self) -> Duration {
        self.children
            .iter()
            .map(|child| {
                if child.children.is_empty() {
                    child.elapsed
                } else {
                    child.children_elapsed()
                }
            })
            .sum()
    }
}

/// Figures captured at the end of a frame, for display during the next one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameReport {
    pub fps: f32,
    pub frame_time_ms: f32,
    pub draw_calls: usize,
    pub timings: Vec<(String, Duration)>,
    pub tree: Vec<TimingNode>,
}

#[derive(Debug, Clone)]
pub struct FrameMetrics {
    target_fps: f32,
    window_frames: u32,
    window_seconds: f32,
    current_fps: f32,
    fps_history: VecDeque<f32>,
    timings: Vec<(String, Duration)>,
    tree: Vec<TimingNode>,
    stack: Vec<String>,
    execution_order: Vec<String>,
    draw_calls: usize,
    previous: FrameReport,
}

impl Default for FrameMetrics {
    fn default() -> Self {
        Self::new(60.0)
    }
}

impl FrameMetrics {
    pub fn new(target_fps: f32) -> Self {
        Self {
            target_fps,
            window_frames: 0,
            window_seconds: 0.0,
            current_fps: 0.0,
            fps_history: VecDeque::with_capacity(FPS_HISTORY),
            timings: Vec::new(),
            tree: Vec::new(),
            stack: Vec::new(),
            execution_order: Vec::new(),
            draw_calls: 0,
            previous: FrameReport::default(),
        }
    }

    pub fn target_fps(&self) -> f32 {
        self.target_fps
    }

    /// Starts a frame that took `dt` seconds since the previous one.
    pub fn begin_frame(&mut self, dt: f32) {
        self.window_frames += 1;
        self.window_seconds += dt;
        if self.window_frames >= FPS_WINDOW {
            if self.window_seconds > 0.0 {
                self.current_fps = self.window_frames as f32 / self.window_seconds;
                if self.fps_history.len() == FPS_HISTORY {
                    self.fps_history.pop_front();
                }
                self.fps_history.push_back(self.current_fps);
            } else {
                self.current_fps = self.target_fps;
            }
            self.window_frames = 0;
            self.window_seconds = 0.0;
        }
        self.tree.clear();
        self.execution_order.clear();
        self.stack.clear();
    }

    /// Snapshots this frame's figures for [`previous_frame`](Self::previous_frame).
    pub fn end_frame(&mut self) {
        self.previous = FrameReport {
            fps: self.current_fps,
            frame_time_ms: self.frame_time() * 1000.0,
            draw_calls: self.draw_calls,
            timings: self.timings.clone(),
            tree: self.tree.clone(),
        };
    }

    /// Runs `operation` and records its wall time under `name`.
    ///
    /// Calls nest: timings recorded inside `operation` become children of
    /// `name` in the timing tree.
    pub fn time<R>(&mut self, name: &str, operation: impl FnOnce(&mut Self) -> R) -> R {
        self.stack.push(name.to_string());
        let start = Instant::now();
        let result = operation(self);
        let elapsed = start.elapsed();
        self.record(elapsed);
        self.stack.pop();
        result
    }

    fn record(&mut self, elapsed: Duration) {
        let path_key = self.stack.join(" -> ");
        if !self.execution_order.contains(&path_key) {
            self.execution_order.push(path_key);
        }

        let mut level = &mut self.tree;
        let depth = self.stack.len();
        for (position, part) in self.stack.iter().enumerate() {
            let slot = match level.iter().position(|node| node.name == *part) {
                Some(slot) => slot,
                None => {
                    level.push(TimingNode::new(part));
                    level.len() - 1
                }
            };
            let node = &mut level[slot];
            if position + 1 == depth {
                node.elapsed += elapsed;
                node.call_count += 1;
                break;
            }
            level = &mut node.children;
        }

        let Some(name) = self.stack.last() else {
            return;
        };
        match self.timings.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, time)) => *time = elapsed,
            None => self.timings.push((name.clone(), elapsed)),
        }
    }

    pub fn fps(&self) -> f32 {
        self.current_fps
    }

    /// Seconds per frame at the current FPS, zero before the first window.
    pub fn frame_time(&self) -> f32 {
        if self.current_fps > 0.0 {
            1.0 / self.current_fps
        } else {
            0.0
        }
    }

    pub fn fps_stats(&self) -> FpsStats {
        if self.fps_history.is_empty() {
            return FpsStats::default();
        }
        let sum: f32 = self.fps_history.iter().sum();
        FpsStats {
            average: sum / self.fps_history.len() as f32,
            min: self.fps_history.iter().copied().fold(f32::INFINITY, f32::min),
            max: self.fps_history.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        }
    }

    pub fn fps_history(&self) -> impl Iterator<Item = f32> + '_ {
        self.fps_history.iter().copied()
    }

    pub fn set_draw_calls(&mut self, count: usize) {
        self.draw_calls = count;
    }

    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    /// Timing tree of the frame in progress.
    pub fn timing_tree(&self) -> &[TimingNode] {
        &self.tree
    }

    /// Latest time per operation name, in first-seen order.
    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    /// Operation paths (`outer -> inner`) in the order they completed.
    pub fn execution_order(&self) -> &[String] {
        &self.execution_order
    }

    pub fn previous_frame(&self) -> &FrameReport {
        &self.previous
    }

    /// Diagnostic text for the previous frame, one line per entry.
    pub fn report_lines(&self) -> Vec<String> {
        let report = &self.previous;
        let stats = self.fps_stats();
        let mut lines = vec![
            format!("FPS: {:.1}", report.fps),
            format!("Frame Time: {:.2}ms", report.frame_time_ms),
            format!("Draw Calls: {}", report.draw_calls),
            format!(
                "FPS Stats - Avg: {:.1}, Max: {:.1}, Min: {:.1}",
                stats.average, stats.max, stats.min
            ),
        ];
        if !report.tree.is_empty() {
            lines.push("Operation Timings:".to_string());
            push_tree_lines(&report.tree, 1, &mut lines);
        }
        lines
    }

    pub fn log_stats(&self) {
        for line in self.report_lines() {
            info!("{line}");
        }
    }

    pub fn reset(&mut self) {
        self.fps_history.clear();
        self.timings.clear();
        self.tree.clear();
        self.execution_order.clear();
        self.stack.clear();
        self.window_frames = 0;
        self.window_seconds = 0.0;
        self.current_fps = 0.0;
        self.draw_calls = 0;
    }
}

fn push_tree_lines(nodes: &[TimingNode], depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        let ms = node.elapsed.as_secs_f64() * 1000.0;
        if node.children.is_empty() {
            let mut line = format!("{indent}{}: {ms:.2}ms", node.name);
            if node.call_count > 1 {
                line.push_str(&format!(" (x{})", node.call_count));
            }
            lines.push(line);
        } else {
            let children_ms = node.children_elapsed().as_secs_f64() * 1000.0;
            lines.push(format!(
                "{indent}{}: {ms:.2}ms (children: {children_ms:.2}ms)",
                node.name
            ));
            push_tree_lines(&node.children, depth + 1, lines);
        }
    }
}
