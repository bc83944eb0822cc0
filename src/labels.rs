// 该文件是 Shanan （山南西风） 项目的一部分。
// src/labels.rs - 类别标签表
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

use thiserror::Error;
use tracing::info;

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("读取标签文件失败: {0}")]
  Io(#[from] std::io::Error),
  #[error("标签数量不足: 模型有 {classes} 个类别, 标签只有 {labels} 个")]
  TooFew { classes: usize, labels: usize },
}

/// 类别索引到名称的映射，启动时加载一次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
  names: Box<[String]>,
}

impl LabelTable {
  pub fn coco() -> Self {
    Self::from_names(COCO_CLASSES.iter().map(|s| s.to_string()))
  }

  pub fn from_names<I: IntoIterator<Item = String>>(names: I) -> Self {
    Self {
      names: names.into_iter().collect(),
    }
  }

  /// 每行一个标签，去掉首尾空白，忽略空行
  pub fn parse(text: &str) -> Self {
    Self::from_names(
      text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string),
    )
  }

  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LabelError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let table = Self::parse(&text);
    info!(
      "从 {} 读取到 {} 个标签",
      path.as_ref().display(),
      table.len()
    );
    Ok(table)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&str> {
    self.names.get(index).map(String::as_str)
  }

  /// 标签必须覆盖模型的全部类别
  pub fn ensure_covers(&self, num_classes: usize) -> Result<(), LabelError> {
    if self.names.len() < num_classes {
      return Err(LabelError::TooFew {
        classes: num_classes,
        labels: self.names.len(),
      });
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_one_label_per_line() {
    let table = LabelTable::parse("person\r\n bicycle \n\ncar\n");
    assert_eq!(table.len(), 3);
    assert_eq!(table.get(1), Some("bicycle"));
    assert_eq!(table.get(2), Some("car"));
    assert_eq!(table.get(3), None);
  }

  #[test]
  fn coverage_is_checked_against_class_count() {
    let table = LabelTable::parse("a\nb");
    assert!(table.ensure_covers(2).is_ok());
    assert!(matches!(
      table.ensure_covers(3),
      Err(LabelError::TooFew {
        classes: 3,
        labels: 2
      })
    ));
  }

  #[test]
  fn coco_table_has_eighty_classes() {
    let table = LabelTable::coco();
    assert_eq!(table.len(), 80);
    assert_eq!(table.get(0), Some("person"));
    assert_eq!(table.get(79), Some("toothbrush"));
  }

  #[test]
  fn loads_label_file() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "cat\ndog\n").unwrap();
    let table = LabelTable::load(file.path()).unwrap();
    assert_eq!(table.get(0), Some("cat"));
    assert_eq!(table.len(), 2);
  }
}
