// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 任务调度
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

use std::{
  fmt::Display,
  time::{Duration, Instant},
};

use tracing::{debug, info, warn};

use crate::{
  input::FrameSource,
  model::Model,
  output::{Notify, Render},
  postprocess::Detection,
};

mod cycle;
pub use self::cycle::{CycleError, CycleOutcome, FrameCycle, Stage};

mod shutdown;
pub use self::shutdown::{ShutdownSignal, ShutdownTrigger, install_ctrlc_handler, shutdown_channel};

/// 默认周期 500 毫秒，约 2 FPS
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(500);

pub trait Task<C>: Sized {
  type Error;
  fn run_task(self, cycle: &mut C) -> Result<TaskSummary, Self::Error>;
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TaskSummary {
  pub published: u64,
  pub skipped: u64,
  pub detections: u64,
  pub source_lost: bool,
  pub interrupted: bool,
  /// 最近一次发布的检测结果
  pub last_detections: Vec<Detection>,
}

impl TaskSummary {
  pub fn cycles(&self) -> u64 {
    self.published + self.skipped
  }

  fn record(&mut self, outcome: CycleOutcome) -> bool {
    match outcome {
      CycleOutcome::Published { detections } => {
        self.published += 1;
        self.detections += detections.len() as u64;
        self.last_detections = detections;
        true
      }
      CycleOutcome::Skipped { .. } => {
        self.skipped += 1;
        true
      }
      CycleOutcome::SourceLost => {
        self.source_lost = true;
        false
      }
    }
  }
}

pub struct OneShotTask;

impl<S, M, R, N> Task<FrameCycle<S, M, R, N>> for OneShotTask
where
  S: FrameSource,
  M: Model<Frame = S::Frame>,
  M::Error: Display,
  R: Render,
  R::Error: Display,
  N: Notify,
  N::Error: Display,
{
  type Error = anyhow::Error;

  fn run_task(self, cycle: &mut FrameCycle<S, M, R, N>) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    cycle.declare_events();
    let now = Instant::now();
    let outcome = cycle.run_cycle();
    cycle.undeclare_events();

    let mut summary = TaskSummary::default();
    match outcome? {
      CycleOutcome::SourceLost => anyhow::bail!("没有输入帧"),
      CycleOutcome::Skipped { stage, reason } => {
        anyhow::bail!("本周期在 {:?} 阶段被跳过: {}", stage, reason)
      }
      outcome => {
        summary.record(outcome);
      }
    }
    info!("任务完成，耗时: {:.2?}", now.elapsed());
    Ok(summary)
  }
}

/// 按固定周期重复执行，直到采集流丢失、收到退出信号或达到周期上限
///
/// 计时采用截止时间：超时的周期会把下一次截止时间重新对齐到当前时刻，不会连续补跑。
pub struct PeriodicTask {
  period: Duration,
  max_cycles: Option<u64>,
  shutdown: ShutdownSignal,
}

impl PeriodicTask {
  pub fn new(shutdown: ShutdownSignal) -> Self {
    Self {
      period: DEFAULT_PERIOD,
      max_cycles: None,
      shutdown,
    }
  }

  pub fn with_period(mut self, period: Duration) -> Self {
    self.period = period;
    self
  }

  pub fn with_max_cycles(mut self, max_cycles: Option<u64>) -> Self {
    self.max_cycles = max_cycles;
    self
  }

  fn run_loop<S, M, R, N>(
    &mut self,
    cycle: &mut FrameCycle<S, M, R, N>,
  ) -> Result<TaskSummary, CycleError>
  where
    S: FrameSource,
    M: Model<Frame = S::Frame>,
    M::Error: Display,
    R: Render,
    R::Error: Display,
    N: Notify,
    N::Error: Display,
  {
    let mut summary = TaskSummary::default();
    let mut deadline = Instant::now();

    loop {
      if self.shutdown.is_triggered() {
        warn!("中断信号接收，退出任务循环");
        summary.interrupted = true;
        break;
      }
      if self.max_cycles.is_some_and(|n| summary.cycles() >= n) {
        info!("达到指定周期数 {}, 退出任务循环", summary.cycles());
        break;
      }

      info!("处理第 {} 个周期", summary.cycles() + 1);
      if !summary.record(cycle.run_cycle()?) {
        warn!("采集流已丢失，不再启动新的周期");
        break;
      }

      deadline += self.period;
      let now = Instant::now();
      if deadline < now {
        debug!("周期超时 {:.2?}，重新对齐", now - deadline);
        deadline = now;
      }
      if self.shutdown.wait_until(deadline) {
        warn!("等待期间收到中断信号，退出任务循环");
        summary.interrupted = true;
        break;
      }
    }

    Ok(summary)
  }
}

impl<S, M, R, N> Task<FrameCycle<S, M, R, N>> for PeriodicTask
where
  S: FrameSource,
  M: Model<Frame = S::Frame>,
  M::Error: Display,
  R: Render,
  R::Error: Display,
  N: Notify,
  N::Error: Display,
{
  type Error = anyhow::Error;

  fn run_task(mut self, cycle: &mut FrameCycle<S, M, R, N>) -> Result<TaskSummary, Self::Error> {
    info!("开始任务, 周期 {:?}", self.period);
    cycle.declare_events();
    let result = self.run_loop(cycle);
    cycle.undeclare_events();

    let summary = result?;
    info!(
      "任务完成，退出: 发布 {} 次, 跳过 {} 次, 检测 {} 个",
      summary.published, summary.skipped, summary.detections
    );
    Ok(summary)
  }
}
