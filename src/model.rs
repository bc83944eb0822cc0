// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型
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

/// 推理运行时
///
/// 预处理、推理与取输出张量三步分开调用，任意一步失败时本周期不会产生输出张量。
/// 推理本身由硬件加速器完成，这里只约定调用方式。
pub trait Model {
  type Frame;
  type Error;

  fn preprocess(&mut self, frame: &Self::Frame) -> Result<(), Self::Error>;
  fn infer(&mut self, frame: &Self::Frame) -> Result<(), Self::Error>;
  fn output_tensor(&self, index: usize) -> Result<&[u8], Self::Error>;
}

mod params;
pub use self::params::{ModelManifest, ModelParams, ModelParamsError, Quantization};

pub mod yolov5;
pub use self::yolov5::{BoxGeometry, ClassScore, DecodeError, Yolov5Output};

mod replay;
pub use self::replay::{ReplayError, TensorReplay};
