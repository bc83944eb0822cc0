// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input.rs - 视频帧来源
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

/// 帧来源
///
/// 每个周期恰好调用一次 `acquire_frame`，取到的帧无论周期如何结束都必须交还一次。
/// `acquire_frame` 返回 `None` 表示采集流已被外部重新配置，无法在进程内恢复。
pub trait FrameSource {
  type Frame;

  fn acquire_frame(&mut self) -> Option<Self::Frame>;
  fn release_frame(&mut self, frame: Self::Frame);

  /// 告知一帧的预处理加推理耗时，来源可据此调整采集帧率
  fn update_framerate(&mut self, _processing: Duration) {}

  /// 丢弃已排队的旧帧，在跳过周期后调用
  fn flush(&mut self) {}
}

mod stub_source;
pub use self::stub_source::{StubFrameSource, StubSourceError};
