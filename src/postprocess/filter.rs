// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/filter.rs - 置信度过滤
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

use crate::postprocess::scratch::{DecodedRow, ValidityMask};

/// 先重置掩码，再把目标置信度严格小于阈值的检测标记为失效
pub fn confidence_filter(rows: &[DecodedRow], conf_threshold: f32, mask: &mut ValidityMask) {
  assert_eq!(rows.len(), mask.len(), "掩码长度与检测数量不一致");
  mask.reset();
  for (i, row) in rows.iter().enumerate() {
    if row.objectness < conf_threshold {
      mask.invalidate(i);
    }
  }
}
