// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/nms.rs - 非极大值抑制
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

use std::cmp::Ordering;

use crate::{
  model::BoxGeometry,
  postprocess::scratch::{DecodedRow, ValidityMask},
};

/// 两个检测目标置信度完全相同时抑制哪一个
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreak {
  /// 抑制索引较大的检测
  #[default]
  SuppressLater,
  /// 抑制索引较小的检测
  SuppressEarlier,
}

/// 交并比
///
/// 交集使用未裁剪的角点，并集使用 w × h 面积。并集不大于 0 时视为不重叠。
pub fn intersection_over_union(a: &BoxGeometry, b: &BoxGeometry) -> f32 {
  let [ax1, ay1, ax2, ay2] = a.raw_corners();
  let [bx1, by1, bx2, by2] = b.raw_corners();

  let inter_w = (ax2.min(bx2) - ax1.max(bx1)).max(0.0);
  let inter_h = (ay2.min(by2) - ay1.max(by1)).max(0.0);
  let inter = inter_w * inter_h;
  let union = a.area() + b.area() - inter;

  if union <= 0.0 {
    return 0.0;
  }
  (inter / union).min(1.0)
}

/// 贪心两两抑制，返回本次新失效的检测数
///
/// 外层检测一旦被抑制，立即停止它的内层比较。
pub fn non_maximum_suppression(
  rows: &[DecodedRow],
  iou_threshold: f32,
  tie_break: TieBreak,
  mask: &mut ValidityMask,
) -> usize {
  assert_eq!(rows.len(), mask.len(), "掩码长度与检测数量不一致");

  let mut suppressed = 0;
  for (i, first) in rows.iter().enumerate() {
    if !mask.is_valid(i) {
      continue;
    }

    for (j, second) in rows.iter().enumerate().skip(i + 1) {
      if !mask.is_valid(j) {
        continue;
      }

      if intersection_over_union(&first.geometry, &second.geometry) <= iou_threshold {
        continue;
      }

      let suppress_first = match first.objectness.partial_cmp(&second.objectness) {
        Some(Ordering::Greater) => false,
        Some(Ordering::Less) => true,
        _ => tie_break == TieBreak::SuppressEarlier,
      };

      suppressed += 1;
      if suppress_first {
        mask.invalidate(i);
        break;
      }
      mask.invalidate(j);
    }
  }

  suppressed
}
