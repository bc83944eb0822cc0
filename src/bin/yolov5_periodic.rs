// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/yolov5_periodic.rs - 周期性目标检测
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

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use shanan_yolov5::{
  args::CommonArgs,
  task::{DEFAULT_PERIOD, PeriodicTask, Task, install_ctrlc_handler, shutdown_channel},
};

/// 按固定周期取帧、推理并发布检测结果
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub common: CommonArgs,

  /// 周期（毫秒）
  #[arg(long, value_name = "MILLISECONDS", default_value_t = DEFAULT_PERIOD.as_millis() as u64)]
  pub period_ms: u64,

  /// 最多执行的周期数，缺省不限
  #[arg(long, value_name = "COUNT")]
  pub max_cycles: Option<u64>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let (trigger, shutdown) = shutdown_channel();
  install_ctrlc_handler(trigger)?;

  let mut cycle = args.common.build_cycle()?;
  let summary = PeriodicTask::new(shutdown)
    .with_period(Duration::from_millis(args.period_ms))
    .with_max_cycles(args.max_cycles)
    .run_task(&mut cycle)?;

  if summary.source_lost {
    info!("采集流已丢失，正常退出");
  }

  Ok(())
}
