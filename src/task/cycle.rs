// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task/cycle.rs - 单帧处理周期
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

use std::{fmt::Display, time::Instant};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  config::Thresholds,
  input::FrameSource,
  labels::{LabelError, LabelTable},
  model::{DecodeError, Model, ModelParams, Yolov5Output},
  output::{DetectionEvent, Notify, Render},
  postprocess::{
    Detection, DetectionScratch, TieBreak, confidence_filter, non_maximum_suppression, resolve,
  },
};

const UNKNOWN_LABEL: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Acquiring,
  Preprocessing,
  Inferring,
  Decoding,
  Filtering,
  Suppressing,
  Resolving,
  Publishing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
  /// 已发布，按索引升序
  Published { detections: Vec<Detection> },
  /// 可恢复的失败，帧已交还，来源已清空
  Skipped { stage: Stage, reason: String },
  /// 采集流不可用，不应再启动新的周期
  SourceLost,
}

#[derive(Error, Debug)]
pub enum CycleError {
  #[error("标签表错误: {0}")]
  Labels(#[from] LabelError),
  #[error("输出张量格式错误: {0}")]
  MalformedTensor(#[from] DecodeError),
}

/// 持有一次检测流程所需的全部协作者与缓冲区
pub struct FrameCycle<S, M, R, N> {
  source: S,
  model: M,
  overlay: R,
  notifier: N,
  params: ModelParams,
  labels: LabelTable,
  thresholds: Thresholds,
  tie_break: TieBreak,
  scratch: DetectionScratch,
}

impl<S, M, R, N> FrameCycle<S, M, R, N>
where
  S: FrameSource,
  M: Model<Frame = S::Frame>,
  M::Error: Display,
  R: Render,
  R::Error: Display,
  N: Notify,
  N::Error: Display,
{
  pub fn new(
    source: S,
    model: M,
    overlay: R,
    notifier: N,
    params: ModelParams,
    labels: LabelTable,
    thresholds: Thresholds,
  ) -> Result<Self, CycleError> {
    labels.ensure_covers(params.num_classes())?;
    let scratch = DetectionScratch::new(&params);
    Ok(Self {
      source,
      model,
      overlay,
      notifier,
      params,
      labels,
      thresholds,
      tie_break: TieBreak::default(),
      scratch,
    })
  }

  pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
    self.tie_break = tie_break;
    self
  }

  /// 新阈值从下一个周期开始生效
  pub fn set_thresholds(&mut self, thresholds: Thresholds) {
    info!(
      "更新阈值: 置信度 {:.2}, 交并比 {:.2}",
      thresholds.conf(),
      thresholds.iou()
    );
    self.thresholds = thresholds;
  }

  pub fn thresholds(&self) -> Thresholds {
    self.thresholds
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  pub fn model(&self) -> &M {
    &self.model
  }

  pub fn overlay(&self) -> &R {
    &self.overlay
  }

  pub fn notifier(&self) -> &N {
    &self.notifier
  }

  /// 声明失败只记录日志，检测照常进行
  pub fn declare_events(&mut self) {
    if let Err(e) = self.notifier.declare() {
      warn!("声明检测事件失败: {}", e);
    }
  }

  pub fn undeclare_events(&mut self) {
    self.notifier.undeclare();
  }

  /// 执行一个完整周期
  ///
  /// 取到的帧在任何路径上都恰好交还一次；跳过的周期会让来源清空排队的旧帧。
  pub fn run_cycle(&mut self) -> Result<CycleOutcome, CycleError> {
    debug!("阶段: {:?}", Stage::Acquiring);
    let Some(frame) = self.source.acquire_frame() else {
      error!("获取帧失败，采集流已不可用");
      return Ok(CycleOutcome::SourceLost);
    };

    let outcome = self.process_frame(&frame);
    self.source.release_frame(frame);

    match &outcome {
      Ok(CycleOutcome::Skipped { stage, reason }) => {
        warn!("跳过本周期 ({:?}): {}", stage, reason);
        self.source.flush();
      }
      Err(e) => error!("周期失败: {}", e),
      _ => {}
    }
    outcome
  }

  fn process_frame(&mut self, frame: &S::Frame) -> Result<CycleOutcome, CycleError> {
    debug!("阶段: {:?}", Stage::Preprocessing);
    let now = Instant::now();
    if let Err(e) = self.model.preprocess(frame) {
      return Ok(skipped(Stage::Preprocessing, e));
    }
    let preprocess_time = now.elapsed();
    info!("预处理完成，耗时: {:.2?}", preprocess_time);

    debug!("阶段: {:?}", Stage::Inferring);
    let now = Instant::now();
    if let Err(e) = self.model.infer(frame) {
      return Ok(skipped(Stage::Inferring, e));
    }
    let inference_time = now.elapsed();
    info!("推理完成，耗时: {:.2?}", inference_time);
    self.source.update_framerate(preprocess_time + inference_time);

    let tensor = match self.model.output_tensor(0) {
      Ok(tensor) => tensor,
      Err(e) => return Ok(skipped(Stage::Inferring, e)),
    };

    debug!("阶段: {:?}", Stage::Decoding);
    let now = Instant::now();
    let output = Yolov5Output::new(tensor, &self.params)?;
    self.scratch.decode(&output);

    debug!("阶段: {:?}", Stage::Filtering);
    let (rows, mask) = self.scratch.split_mut();
    confidence_filter(rows, self.thresholds.conf(), mask);
    let candidates = mask.count_valid();

    debug!("阶段: {:?}", Stage::Suppressing);
    let suppressed = non_maximum_suppression(rows, self.thresholds.iou(), self.tie_break, mask);

    debug!("阶段: {:?}", Stage::Resolving);
    let detections: Vec<Detection> =
      resolve(output, self.scratch.rows(), self.scratch.mask()).collect();
    info!(
      "解析完成，耗时: {:.2?}, 候选 {} 个, 抑制 {} 个, 保留 {} 个",
      now.elapsed(),
      candidates,
      suppressed,
      detections.len()
    );

    debug!("阶段: {:?}", Stage::Publishing);
    self.publish(&detections);
    Ok(CycleOutcome::Published { detections })
  }

  fn publish(&mut self, detections: &[Detection]) {
    if let Err(e) = self.overlay.clear() {
      warn!("清空叠加层失败: {}", e);
    }

    for detection in detections {
      let label = self
        .labels
        .get(detection.class_index)
        .unwrap_or(UNKNOWN_LABEL);
      let [x1, y1, x2, y2] = detection.bbox;
      info!(
        "检测到 {}: 目标置信度 {:.2}, 类别得分 {:.2}, 位置 [{:.3}, {:.3}, {:.3}, {:.3}]",
        label, detection.objectness, detection.class_score, x1, y1, x2, y2
      );

      if let Err(e) = self.overlay.rectangle(detection.bbox) {
        warn!("绘制矩形失败: {}", e);
      }

      let event = DetectionEvent::new(label, detection.class_score, detection.bbox);
      if let Err(e) = self.notifier.notify(&event) {
        warn!("发送检测事件失败: {}", e);
      }
    }

    if let Err(e) = self.overlay.commit() {
      warn!("提交叠加层失败: {}", e);
    }
  }
}

fn skipped<E: Display>(stage: Stage, error: E) -> CycleOutcome {
  CycleOutcome::Skipped {
    stage,
    reason: error.to_string(),
  }
}
