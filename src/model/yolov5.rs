// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/yolov5.rs - YOLOv5 量化输出张量解码
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

use thiserror::Error;

use crate::model::params::{ModelParams, Quantization, YOLOV5_BOX_FIELDS};

const FIELD_CX: usize = 0;
const FIELD_CY: usize = 1;
const FIELD_W: usize = 2;
const FIELD_H: usize = 3;
const FIELD_OBJECTNESS: usize = 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
  #[error("输出张量长度不足: 期望至少 {expected} 字节, 实际 {actual} 字节")]
  ShortTensor { expected: usize, actual: usize },
}

/// 中心点格式的检测框，归一化到整帧宽高
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoxGeometry {
  pub cx: f32,
  pub cy: f32,
  pub w: f32,
  pub h: f32,
}

impl BoxGeometry {
  /// 未裁剪的角点 [x1, y1, x2, y2]，可能超出 [0, 1]
  pub fn raw_corners(&self) -> [f32; 4] {
    let (hw, hh) = (self.w / 2.0, self.h / 2.0);
    [self.cx - hw, self.cy - hh, self.cx + hw, self.cy + hh]
  }

  /// 裁剪到画面内的角点 [x1, y1, x2, y2]
  pub fn corners(&self) -> [f32; 4] {
    self.raw_corners().map(|v| v.clamp(0.0, 1.0))
  }

  /// 按 w × h 计算的面积（裁剪前）
  pub fn area(&self) -> f32 {
    self.w * self.h
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassScore {
  pub index: usize,
  pub score: f32,
}

/// 单输出 YOLOv5 张量的只读视图
///
/// 每行布局为 `[cx, cy, w, h, objectness, class_0 .. class_{n-1}]`，
/// 所有字段均为量化后的 `u8`。构造时校验长度，之后按行读取不会越界。
#[derive(Debug, Clone, Copy)]
pub struct Yolov5Output<'a> {
  data: &'a [u8],
  quantization: Quantization,
  num_detections: usize,
  size_per_detection: usize,
}

impl<'a> Yolov5Output<'a> {
  pub fn new(data: &'a [u8], params: &ModelParams) -> Result<Self, DecodeError> {
    let expected = params.tensor_len();
    if data.len() < expected {
      return Err(DecodeError::ShortTensor {
        expected,
        actual: data.len(),
      });
    }

    Ok(Yolov5Output {
      data,
      quantization: params.quantization(),
      num_detections: params.num_detections(),
      size_per_detection: params.size_per_detection(),
    })
  }

  pub fn num_detections(&self) -> usize {
    self.num_detections
  }

  fn row(&self, index: usize) -> &'a [u8] {
    assert!(
      index < self.num_detections,
      "检测索引越界: {} >= {}",
      index,
      self.num_detections
    );
    let start = index * self.size_per_detection;
    &self.data[start..start + self.size_per_detection]
  }

  pub fn geometry(&self, index: usize) -> BoxGeometry {
    let row = self.row(index);
    let q = self.quantization;
    BoxGeometry {
      cx: q.dequantize(row[FIELD_CX]),
      cy: q.dequantize(row[FIELD_CY]),
      w: q.dequantize(row[FIELD_W]),
      h: q.dequantize(row[FIELD_H]),
    }
  }

  pub fn objectness(&self, index: usize) -> f32 {
    self.quantization.dequantize(self.row(index)[FIELD_OBJECTNESS])
  }

  /// 在类别列中取最大得分，得分相同时取索引较小者
  pub fn best_class(&self, index: usize) -> ClassScore {
    let q = self.quantization;
    self.row(index)[YOLOV5_BOX_FIELDS..]
      .iter()
      .enumerate()
      .fold(
        ClassScore {
          index: 0,
          score: f32::NEG_INFINITY,
        },
        |best, (class, &raw)| {
          let score = q.dequantize(raw);
          if score > best.score {
            ClassScore {
              index: class,
              score,
            }
          } else {
            best
          }
        },
      )
  }
}
