// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task/shutdown.rs - 协作式退出
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
  sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError},
  thread,
  time::{Duration, Instant},
};

use tracing::{debug, info, warn};

/// 收到信号后仍未退出时强制结束进程
const FORCE_EXIT_AFTER: Duration = Duration::from_secs(30);

pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
  let (tx, rx) = mpsc::channel();
  (
    ShutdownTrigger { tx },
    ShutdownSignal {
      rx,
      triggered: false,
    },
  )
}

#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
  tx: Sender<()>,
}

impl ShutdownTrigger {
  pub fn trigger(&self) {
    if self.tx.send(()).is_err() {
      debug!("任务循环已退出，忽略退出请求");
    }
  }
}

/// 只在周期之间检查，不会打断正在进行的推理
#[derive(Debug)]
pub struct ShutdownSignal {
  rx: Receiver<()>,
  triggered: bool,
}

impl ShutdownSignal {
  pub fn is_triggered(&mut self) -> bool {
    if !self.triggered {
      match self.rx.try_recv() {
        Ok(()) => self.triggered = true,
        Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
      }
    }
    self.triggered
  }

  /// 等到截止时间，期间收到退出请求则提前返回 `true`
  pub fn wait_until(&mut self, deadline: Instant) -> bool {
    if self.triggered {
      return true;
    }

    let timeout = deadline.saturating_duration_since(Instant::now());
    match self.rx.recv_timeout(timeout) {
      Ok(()) => {
        self.triggered = true;
        true
      }
      Err(RecvTimeoutError::Timeout) => false,
      Err(RecvTimeoutError::Disconnected) => {
        // 没有触发端了，只剩计时
        thread::sleep(deadline.saturating_duration_since(Instant::now()));
        false
      }
    }
  }
}

/// SIGINT 与 SIGTERM 都会触发退出
pub fn install_ctrlc_handler(trigger: ShutdownTrigger) -> Result<(), ctrlc::Error> {
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    trigger.trigger();
    thread::spawn(|| {
      thread::sleep(FORCE_EXIT_AFTER);
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })
}
