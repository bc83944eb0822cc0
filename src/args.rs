// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};
use tracing::info;
use url::Url;

use crate::{
  FromUrl,
  config::{ParameterFile, Thresholds},
  input::StubFrameSource,
  labels::LabelTable,
  model::{ModelParams, TensorReplay},
  output::{NotifierWrapper, OverlayWrapper},
  postprocess::TieBreak,
  task::FrameCycle,
};

const DEFAULT_CONFIDENCE: f32 = 0.5;
const DEFAULT_NMS_THRESHOLD: f32 = 0.45;

pub type HostFrameCycle = FrameCycle<StubFrameSource, TensorReplay, OverlayWrapper, NotifierWrapper>;

/// 目标置信度相等时抑制哪一个
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreakArg {
  /// 保留索引较小的检测
  #[default]
  Later,
  /// 保留索引较大的检测
  Earlier,
}

impl From<TieBreakArg> for TieBreak {
  fn from(value: TieBreakArg) -> Self {
    match value {
      TieBreakArg::Later => TieBreak::SuppressLater,
      TieBreakArg::Earlier => TieBreak::SuppressEarlier,
    }
  }
}

/// 各个程序共用的参数
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
  /// 模型输出来源，例如 tensor:///data/output.bin?fail_every=10
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 模型参数清单（JSON）
  #[arg(long, value_name = "FILE")]
  pub model_params: PathBuf,

  /// 输入来源，例如 stub://camera?width=640&height=640&frames=100
  #[arg(long, value_name = "SOURCE", default_value = "stub://camera")]
  pub input: Url,

  /// 叠加层输出，log:// 或 overlay:///tmp/overlay.png
  #[arg(long, value_name = "OVERLAY", default_value = "log://overlay")]
  pub overlay: Url,

  /// 事件输出，log:// 或 events:///tmp/events.jsonl
  #[arg(long, value_name = "EVENTS", default_value = "log://events")]
  pub events: Url,

  /// 标签文件，每行一个类别名，缺省使用 COCO 标签
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 设备参数文件（JSON），提供 ConfThresholdPercent 与 IouThresholdPercent
  #[arg(long, value_name = "FILE")]
  pub params: Option<PathBuf>,

  /// 置信度阈值 (0.0 - 1.0)，覆盖参数文件
  #[arg(long, value_name = "THRESHOLD")]
  pub confidence: Option<f32>,

  /// NMS IOU 阈值 (0.0 - 1.0)，覆盖参数文件
  #[arg(long, value_name = "THRESHOLD")]
  pub nms_threshold: Option<f32>,

  #[arg(long, value_enum, default_value_t = TieBreakArg::default())]
  pub tie_break: TieBreakArg,
}

impl CommonArgs {
  pub fn thresholds(&self) -> Result<Thresholds> {
    let base = match &self.params {
      Some(path) => ParameterFile::load(path)?.thresholds()?,
      None => Thresholds::new(DEFAULT_CONFIDENCE, DEFAULT_NMS_THRESHOLD)?,
    };
    Ok(Thresholds::new(
      self.confidence.unwrap_or(base.conf()),
      self.nms_threshold.unwrap_or(base.iou()),
    )?)
  }

  pub fn label_table(&self) -> Result<LabelTable> {
    Ok(match &self.labels {
      Some(path) => LabelTable::load(path)?,
      None => LabelTable::coco(),
    })
  }

  pub fn build_cycle(&self) -> Result<HostFrameCycle> {
    info!("模型输出来源: {}", self.model);
    info!("输入来源: {}", self.input);
    info!("叠加层输出: {}", self.overlay);
    info!("事件输出: {}", self.events);

    let params = ModelParams::from_manifest_file(&self.model_params)?;
    let thresholds = self.thresholds()?;
    info!(
      "阈值: 置信度 {:.2}, 交并比 {:.2}",
      thresholds.conf(),
      thresholds.iou()
    );

    let source = StubFrameSource::from_url(&self.input)?;
    let model = TensorReplay::from_url(&self.model)?;
    let overlay = OverlayWrapper::from_url(&self.overlay)?;
    let notifier = NotifierWrapper::from_url(&self.events)?;

    let cycle = FrameCycle::new(
      source,
      model,
      overlay,
      notifier,
      params,
      self.label_table()?,
      thresholds,
    )?
    .with_tie_break(self.tie_break.into());
    Ok(cycle)
  }
}

#[cfg(test)]
mod tests {
  use clap::Parser;

  use super::*;

  #[derive(Parser, Debug)]
  struct TestArgs {
    #[command(flatten)]
    common: CommonArgs,
  }

  #[test]
  fn command_line_overrides_parameter_file() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(
      file.path(),
      r#"{"ConfThresholdPercent": "30", "IouThresholdPercent": 60}"#,
    )
    .unwrap();

    let args = TestArgs::try_parse_from([
      "test",
      "--model",
      "tensor:///tmp/output.bin",
      "--model-params",
      "/tmp/model.json",
      "--params",
      file.path().to_str().unwrap(),
      "--nms-threshold",
      "0.5",
    ])
    .unwrap();

    let thresholds = args.common.thresholds().unwrap();
    assert_eq!(thresholds.conf(), 0.3);
    assert_eq!(thresholds.iou(), 0.5);
    assert_eq!(args.common.tie_break, TieBreakArg::Later);
    assert_eq!(args.common.overlay.scheme(), "log");
  }

  #[test]
  fn defaults_without_parameter_file() {
    let args = TestArgs::try_parse_from([
      "test",
      "--model",
      "tensor:///tmp/output.bin",
      "--model-params",
      "/tmp/model.json",
      "--tie-break",
      "earlier",
    ])
    .unwrap();

    let thresholds = args.common.thresholds().unwrap();
    assert_eq!(thresholds.conf(), DEFAULT_CONFIDENCE);
    assert_eq!(thresholds.iou(), DEFAULT_NMS_THRESHOLD);
    assert_eq!(TieBreak::from(args.common.tie_break), TieBreak::SuppressEarlier);
    assert_eq!(args.common.label_table().unwrap().len(), 80);
  }
}
