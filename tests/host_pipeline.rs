// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/host_pipeline.rs - 主机协作者端到端测试
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{path::Path, time::Duration};

use clap::Parser;
use shanan_yolov5::{
  args::CommonArgs,
  output::DETECTION_TOPIC,
  task::{PeriodicTask, Task, shutdown_channel},
};

#[derive(Parser, Debug)]
struct HostArgs {
  #[command(flatten)]
  common: CommonArgs,
}

/// 两个类别，三行检测：行 0 与行 1 重叠，行 2 置信度不足
fn write_fixture(dir: &Path) {
  std::fs::write(
    dir.join("model.json"),
    r#"{
      "input_width": 64,
      "input_height": 64,
      "quantization_scale": 0.01,
      "quantization_zero_point": 0,
      "num_classes": 2,
      "num_detections": 3
    }"#,
  )
  .unwrap();

  let tensor: Vec<u8> = vec![
    50, 50, 40, 40, 80, 90, 10, //
    52, 52, 40, 40, 60, 90, 10, //
    10, 10, 10, 10, 20, 10, 90,
  ];
  std::fs::write(dir.join("output.bin"), tensor).unwrap();
  std::fs::write(dir.join("labels.txt"), "cat\n\ndog\n").unwrap();
  std::fs::write(
    dir.join("params.json"),
    r#"{"ConfThresholdPercent": "50", "IouThresholdPercent": 45}"#,
  )
  .unwrap();
}

fn host_args(dir: &Path, overlay: &str, frames: u64) -> HostArgs {
  let url = |scheme: &str, file: &str| format!("{scheme}://{}", dir.join(file).display());
  HostArgs::try_parse_from([
    "test".to_string(),
    "--model".to_string(),
    url("tensor", "output.bin"),
    "--model-params".to_string(),
    dir.join("model.json").display().to_string(),
    "--input".to_string(),
    format!("stub://camera?width=64&height=64&frames={frames}"),
    "--overlay".to_string(),
    overlay.to_string(),
    "--events".to_string(),
    url("events", "events/detections.jsonl"),
    "--labels".to_string(),
    dir.join("labels.txt").display().to_string(),
    "--params".to_string(),
    dir.join("params.json").display().to_string(),
  ])
  .unwrap()
}

#[test]
fn periodic_run_records_events_until_source_is_lost() {
  let dir = tempfile::tempdir().unwrap();
  write_fixture(dir.path());

  let args = host_args(dir.path(), "log://overlay", 3);
  let mut cycle = args.common.build_cycle().unwrap();
  assert_eq!(cycle.thresholds().conf(), 0.5);

  let (_trigger, shutdown) = shutdown_channel();
  let summary = PeriodicTask::new(shutdown)
    .with_period(Duration::from_millis(1))
    .run_task(&mut cycle)
    .unwrap();

  assert!(summary.source_lost);
  assert_eq!(summary.published, 3);
  assert_eq!(summary.detections, 3);
  assert_eq!(cycle.source().outstanding(), 0);
  assert_eq!(cycle.model().runs(), 3);

  let content =
    std::fs::read_to_string(dir.path().join("events").join("detections.jsonl")).unwrap();
  let events: Vec<serde_json::Value> = content
    .lines()
    .map(|line| serde_json::from_str(line).unwrap())
    .collect();
  assert_eq!(events.len(), 3);
  for event in &events {
    assert_eq!(event["topic"], DETECTION_TOPIC);
    assert_eq!(event["data"]["class"], "cat");
    let confidence = event["data"]["confidence"].as_f64().unwrap();
    assert!((confidence - 0.9).abs() < 1e-6);
  }
}

#[cfg(feature = "save_overlay")]
#[test]
fn overlay_snapshot_is_written() {
  let dir = tempfile::tempdir().unwrap();
  write_fixture(dir.path());

  let overlay = format!(
    "overlay://{}?width=64&height=64",
    dir.path().join("overlay.png").display()
  );
  let args = host_args(dir.path(), &overlay, 1);
  let mut cycle = args.common.build_cycle().unwrap();
  cycle.run_cycle().unwrap();

  let image = image::open(dir.path().join("overlay.png"))
    .unwrap()
    .to_rgba8();
  assert_eq!(image.dimensions(), (64, 64));
  // 行 0 的左上角 (0.3, 0.3)
  assert_eq!(image.get_pixel(19, 19).0, [255, 0, 0, 255]);
  assert_eq!(image.get_pixel(32, 32).0[3], 0);
}
