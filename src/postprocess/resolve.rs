// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/resolve.rs - 类别解析
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

use serde::Serialize;

use crate::{
  model::Yolov5Output,
  postprocess::scratch::{DecodedRow, ValidityMask},
};

/// 一个最终保留下来的检测结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
  pub index: usize,
  pub class_index: usize,
  pub class_score: f32,
  pub objectness: f32,
  pub bbox: [f32; 4], // [x1, y1, x2, y2]，已裁剪到 [0, 1]
}

/// 按索引升序给每个有效检测补上类别与角点，不做任何额外过滤
pub fn resolve<'a>(
  output: Yolov5Output<'a>,
  rows: &'a [DecodedRow],
  mask: &'a ValidityMask,
) -> impl Iterator<Item = Detection> + 'a {
  mask.survivors().map(move |index| {
    let row = &rows[index];
    let class = output.best_class(index);
    Detection {
      index,
      class_index: class.index,
      class_score: class.score,
      objectness: row.objectness,
      bbox: row.geometry.corners(),
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    model::{ModelManifest, ModelParams},
    postprocess::scratch::DetectionScratch,
  };

  #[test]
  fn resolves_only_survivors_in_order() {
    let params = ModelParams::try_from(ModelManifest {
      input_width: 32,
      input_height: 32,
      quantization_scale: 0.25,
      quantization_zero_point: 0.0,
      num_classes: 3,
      num_detections: 3,
    })
    .unwrap();
    let data = [
      2, 2, 2, 2, 4, 0, 3, 1, //
      1, 1, 1, 1, 2, 4, 0, 0, //
      3, 3, 2, 2, 3, 0, 0, 2,
    ];
    let output = Yolov5Output::new(&data, &params).unwrap();
    let mut scratch = DetectionScratch::new(&params);
    scratch.decode(&output);

    let (_, mask) = scratch.split_mut();
    mask.invalidate(1);

    let detections: Vec<Detection> = resolve(output, scratch.rows(), scratch.mask()).collect();
    assert_eq!(detections.len(), 2);

    assert_eq!(detections[0].index, 0);
    assert_eq!(detections[0].class_index, 1);
    assert_eq!(detections[0].class_score, 0.75);
    assert_eq!(detections[0].objectness, 1.0);
    assert_eq!(detections[0].bbox, [0.25, 0.25, 0.75, 0.75]);

    assert_eq!(detections[1].index, 2);
    assert_eq!(detections[1].class_index, 2);
    assert_eq!(detections[1].bbox, [0.5, 0.5, 1.0, 1.0]);
  }
}
