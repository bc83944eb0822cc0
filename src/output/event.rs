// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/event.rs - 检测事件载荷
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

/// 事件主题
pub const DETECTION_TOPIC: &str = "tns1:VideoAnalytics/tns1:ObjectDetected";

fn round3(value: f32) -> f32 {
  (value * 1000.0).round() / 1000.0
}

/// 每个保留下来的检测发送一个事件
///
/// `confidence` 使用类别得分，坐标保留三位小数。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionEvent<'a> {
  pub class: &'a str,
  pub confidence: f32,
  pub bbox: [f32; 4],
}

impl<'a> DetectionEvent<'a> {
  pub fn new(class: &'a str, confidence: f32, bbox: [f32; 4]) -> Self {
    Self {
      class,
      confidence: round3(confidence),
      bbox: bbox.map(round3),
    }
  }

  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string(self)
  }
}
