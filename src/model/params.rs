// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/params.rs - 模型参数与量化
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

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// 每个检测行的固定字段数: cx, cy, w, h, objectness
pub const YOLOV5_BOX_FIELDS: usize = 5;

#[derive(Error, Debug)]
pub enum ModelParamsError {
  #[error("读取模型清单失败: {0}")]
  Io(#[from] std::io::Error),
  #[error("模型清单格式错误: {0}")]
  Manifest(#[from] serde_json::Error),
  #[error("模型参数 {0} 不能为 0")]
  Zero(&'static str),
  #[error("量化系数无效: {0}")]
  InvalidScale(f32),
  #[error("量化零点无效: {0}")]
  InvalidZeroPoint(f32),
  #[error("输出张量尺寸溢出: {num_detections} 个检测, {num_classes} 个类别")]
  TensorTooLarge {
    num_detections: usize,
    num_classes: usize,
  },
}

/// 仿射量化参数，`value = (raw - zero_point) * scale`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantization {
  pub scale: f32,
  pub zero_point: f32,
}

impl Quantization {
  #[inline]
  pub fn dequantize(&self, raw: u8) -> f32 {
    (raw as f32 - self.zero_point) * self.scale
  }
}

/// 模型清单文件，对应编译模型时生成的参数
#[derive(Debug, Clone, Deserialize)]
pub struct ModelManifest {
  pub input_width: u32,
  pub input_height: u32,
  pub quantization_scale: f32,
  pub quantization_zero_point: f32,
  pub num_classes: usize,
  pub num_detections: usize,
}

/// 模型参数，启动后不再变化
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
  input_width: u32,
  input_height: u32,
  quantization: Quantization,
  num_classes: usize,
  num_detections: usize,
}

impl TryFrom<ModelManifest> for ModelParams {
  type Error = ModelParamsError;

  fn try_from(manifest: ModelManifest) -> Result<Self, Self::Error> {
    if manifest.input_width == 0 {
      return Err(ModelParamsError::Zero("input_width"));
    }
    if manifest.input_height == 0 {
      return Err(ModelParamsError::Zero("input_height"));
    }
    if manifest.num_classes == 0 {
      return Err(ModelParamsError::Zero("num_classes"));
    }
    if manifest.num_detections == 0 {
      return Err(ModelParamsError::Zero("num_detections"));
    }
    if !manifest.quantization_scale.is_finite() || manifest.quantization_scale <= 0.0 {
      return Err(ModelParamsError::InvalidScale(manifest.quantization_scale));
    }
    if !manifest.quantization_zero_point.is_finite() {
      return Err(ModelParamsError::InvalidZeroPoint(
        manifest.quantization_zero_point,
      ));
    }

    let tensor_len = YOLOV5_BOX_FIELDS
      .checked_add(manifest.num_classes)
      .and_then(|size| size.checked_mul(manifest.num_detections));
    if tensor_len.is_none() {
      return Err(ModelParamsError::TensorTooLarge {
        num_detections: manifest.num_detections,
        num_classes: manifest.num_classes,
      });
    }

    Ok(ModelParams {
      input_width: manifest.input_width,
      input_height: manifest.input_height,
      quantization: Quantization {
        scale: manifest.quantization_scale,
        zero_point: manifest.quantization_zero_point,
      },
      num_classes: manifest.num_classes,
      num_detections: manifest.num_detections,
    })
  }
}

impl ModelParams {
  pub fn from_manifest_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelParamsError> {
    let data = std::fs::read_to_string(path.as_ref())?;
    let manifest: ModelManifest = serde_json::from_str(&data)?;
    let params = ModelParams::try_from(manifest)?;
    params.log_summary();
    Ok(params)
  }

  pub fn log_summary(&self) {
    info!(
      "模型输入尺寸: {} x {}",
      self.input_width, self.input_height
    );
    info!("量化系数: {}", self.quantization.scale);
    info!("量化零点: {}", self.quantization.zero_point);
    info!("类别数量: {}", self.num_classes);
    info!("检测数量: {}", self.num_detections);
  }

  pub fn input_width(&self) -> u32 {
    self.input_width
  }

  pub fn input_height(&self) -> u32 {
    self.input_height
  }

  pub fn quantization(&self) -> Quantization {
    self.quantization
  }

  pub fn num_classes(&self) -> usize {
    self.num_classes
  }

  pub fn num_detections(&self) -> usize {
    self.num_detections
  }

  pub fn size_per_detection(&self) -> usize {
    YOLOV5_BOX_FIELDS + self.num_classes
  }

  /// 输出张量的最小字节数
  pub fn tensor_len(&self) -> usize {
    self.num_detections * self.size_per_detection()
  }
}
