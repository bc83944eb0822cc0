// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/scratch.rs - 每周期复用的检测缓冲区
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

use crate::model::{BoxGeometry, ModelParams, Yolov5Output};

/// 一行检测反量化后的框与目标置信度
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecodedRow {
  pub geometry: BoxGeometry,
  pub objectness: f32,
}

/// 有效性掩码，`true` 表示该检测已失效
///
/// 周期内只能把检测标记为失效，恢复有效只能通过整体 `reset`。
#[derive(Debug, Clone)]
pub struct ValidityMask {
  invalid: Box<[bool]>,
}

impl ValidityMask {
  pub fn new(len: usize) -> Self {
    Self {
      invalid: vec![false; len].into_boxed_slice(),
    }
  }

  pub fn len(&self) -> usize {
    self.invalid.len()
  }

  pub fn is_empty(&self) -> bool {
    self.invalid.is_empty()
  }

  pub fn reset(&mut self) {
    self.invalid.fill(false);
  }

  pub fn invalidate(&mut self, index: usize) {
    self.invalid[index] = true;
  }

  pub fn is_valid(&self, index: usize) -> bool {
    !self.invalid[index]
  }

  /// 按索引升序返回仍有效的检测
  pub fn survivors(&self) -> impl Iterator<Item = usize> + '_ {
    self
      .invalid
      .iter()
      .enumerate()
      .filter_map(|(i, &invalid)| (!invalid).then_some(i))
  }

  pub fn count_valid(&self) -> usize {
    self.invalid.iter().filter(|&&invalid| !invalid).count()
  }
}

/// 启动时按模型参数一次性分配，之后每个周期原地覆盖
#[derive(Debug, Clone)]
pub struct DetectionScratch {
  rows: Box<[DecodedRow]>,
  mask: ValidityMask,
}

impl DetectionScratch {
  pub fn new(params: &ModelParams) -> Self {
    let n = params.num_detections();
    Self {
      rows: vec![DecodedRow::default(); n].into_boxed_slice(),
      mask: ValidityMask::new(n),
    }
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// 反量化每一行的框和目标置信度，每个字段只反量化一次
  pub fn decode(&mut self, output: &Yolov5Output<'_>) {
    assert_eq!(
      output.num_detections(),
      self.rows.len(),
      "输出张量与缓冲区的检测数量不一致"
    );
    for (i, row) in self.rows.iter_mut().enumerate() {
      *row = DecodedRow {
        geometry: output.geometry(i),
        objectness: output.objectness(i),
      };
    }
  }

  pub fn rows(&self) -> &[DecodedRow] {
    &self.rows
  }

  pub fn mask(&self) -> &ValidityMask {
    &self.mask
  }

  /// 同时借出只读的行和可写的掩码
  pub fn split_mut(&mut self) -> (&[DecodedRow], &mut ValidityMask) {
    (&self.rows, &mut self.mask)
  }
}
