use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn write_scene(body: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp scene");
    tmp.write_all(body.as_bytes()).expect("write scene");
    tmp
}

fn sample_scene() -> NamedTempFile {
    write_scene(
        r#"<scene>
  <object>
    <name>Crates</name>
    <type>cube</type>
    <instances>2</instances>
  </object>
  <object>
    <name>Ball</name>
    <type>sphere</type>
    <segments>8</segments>
    <rings>4</rings>
  </object>
  <object>
    <name>Stars</name>
    <type>points</type>
    <vertex>0 0 0</vertex>
    <vertex>1 1 1 255 255 0</vertex>
  </object>
  <input>
    <frame>
      <buttons>left</buttons>
      <delta>-20 0</delta>
      <repeat>2</repeat>
    </frame>
  </input>
</scene>
"#,
    )
}

fn sandbox() -> Command {
    Command::cargo_bin("prim-sandbox").expect("binary exists")
}

#[test]
fn cli_batches_by_topology() {
    let scene = sample_scene();
    sandbox()
        .arg(scene.path())
        .arg("--batch")
        .assert()
        .success()
        .stdout(contains("Loaded scene with 3 objects (4 instances)"))
        .stdout(contains(" - Crates (cube)"))
        .stdout(contains(" - Stars (points)"))
        .stdout(contains("Draw calls per frame: 2"))
        .stdout(contains("Vertices: 63, Indices: 264"))
        .stdout(contains("Operation Timings:"));
}

#[test]
fn cli_draws_each_instance_without_batching() {
    let scene = sample_scene();
    sandbox()
        .arg(scene.path())
        .arg("--no-batch")
        .arg("--frames")
        .arg("3")
        .assert()
        .success()
        .stdout(contains("Draw calls per frame: 4"))
        .stdout(contains("Draw Calls: 4"))
        .stdout(contains("Vertices: 63, Indices: 264"));
}

#[test]
fn cli_replays_recorded_input() {
    let scene = sample_scene();
    sandbox()
        .arg(scene.path())
        .args(["--mode", "3d"])
        .assert()
        .success()
        .stdout(contains("Camera: 3D azimuth=20.0"));
}

#[test]
fn cli_flat_mode_override() {
    let scene = sample_scene();
    sandbox()
        .arg(scene.path())
        .args(["--mode", "2d"])
        .assert()
        .success()
        .stdout(contains("Camera: 2D"));
}

#[test]
fn cli_requires_scene_argument() {
    sandbox()
        .assert()
        .failure()
        .stderr(contains("Usage: prim-sandbox"));
}

#[test]
fn cli_rejects_unknown_flag() {
    let scene = sample_scene();
    sandbox()
        .arg(scene.path())
        .arg("--wireframe")
        .assert()
        .failure()
        .stderr(contains("Unknown argument: --wireframe"));
}

#[test]
fn cli_reports_missing_file() {
    sandbox()
        .arg("/definitely/not/here.xml")
        .assert()
        .failure()
        .stderr(contains("failed to read scene"));
}

#[test]
fn cli_reports_invalid_scene() {
    let scene = write_scene("<scene><object><type>cube</type></object></scene>");
    sandbox()
        .arg(scene.path())
        .assert()
        .failure()
        .stderr(contains("failed to parse scene XML"))
        .stderr(contains("<name> tag is missing"));
}

#[test]
fn cli_logs_stats_every_sixty_frames() {
    let scene = sample_scene();
    sandbox()
        .env_remove("RUST_LOG")
        .arg(scene.path())
        .args(["--frames", "60"])
        .assert()
        .success()
        .stderr(contains("FPS Stats - Avg"));
}
