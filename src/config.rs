// 该文件是 Shanan （山南西风） 项目的一部分。
// src/config.rs - 阈值与设备参数
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

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

pub const CONF_THRESHOLD_PARAM: &str = "ConfThresholdPercent";
pub const IOU_THRESHOLD_PARAM: &str = "IouThresholdPercent";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("读取参数文件失败: {0}")]
  Io(#[from] std::io::Error),
  #[error("参数文件格式错误: {0}")]
  Json(#[from] serde_json::Error),
  #[error("参数文件顶层必须是对象")]
  NotAnObject,
  #[error("缺少参数 {0}")]
  Missing(String),
  #[error("参数 {0} 不是整数: {1}")]
  NotAnInt(String, String),
  #[error("{0} 必须在 [0, 1] 范围内, 实际为 {1}")]
  OutOfRange(&'static str, f32),
}

/// 置信度阈值与 NMS 交并比阈值，均在 [0, 1] 内
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
  conf: f32,
  iou: f32,
}

fn check_unit(name: &'static str, value: f32) -> Result<f32, ConfigError> {
  if (0.0..=1.0).contains(&value) {
    Ok(value)
  } else {
    Err(ConfigError::OutOfRange(name, value))
  }
}

impl Thresholds {
  pub fn new(conf: f32, iou: f32) -> Result<Self, ConfigError> {
    Ok(Self {
      conf: check_unit("置信度阈值", conf)?,
      iou: check_unit("交并比阈值", iou)?,
    })
  }

  /// 设备上以整数百分比保存阈值
  pub fn from_percent(conf: i64, iou: i64) -> Result<Self, ConfigError> {
    Self::new(conf as f32 / 100.0, iou as f32 / 100.0)
  }

  pub fn conf(&self) -> f32 {
    self.conf
  }

  pub fn iou(&self) -> f32 {
    self.iou
  }
}

/// 设备参数文件，JSON 对象，值可以是整数或整数字符串
#[derive(Debug, Clone, Default)]
pub struct ParameterFile {
  values: Map<String, Value>,
}

impl ParameterFile {
  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    info!("读取参数文件: {}", path.as_ref().display());
    let data = std::fs::read_to_string(path.as_ref())?;
    Self::from_json_str(&data)
  }

  pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
    match serde_json::from_str(data)? {
      Value::Object(values) => Ok(Self { values }),
      _ => Err(ConfigError::NotAnObject),
    }
  }

  pub fn contains(&self, name: &str) -> bool {
    self.values.contains_key(name)
  }

  pub fn get_int(&self, name: &str) -> Result<i64, ConfigError> {
    let value = self
      .values
      .get(name)
      .ok_or_else(|| ConfigError::Missing(name.to_string()))?;

    let parsed = match value {
      Value::Number(n) => n.as_i64(),
      Value::String(s) => s.trim().parse::<i64>().ok(),
      _ => None,
    };

    let int = parsed.ok_or_else(|| ConfigError::NotAnInt(name.to_string(), value.to_string()))?;
    info!("参数 {}: {}", name, int);
    Ok(int)
  }

  pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
    Thresholds::from_percent(
      self.get_int(CONF_THRESHOLD_PARAM)?,
      self.get_int(IOU_THRESHOLD_PARAM)?,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn percent_parameters_become_fractions() {
    let params =
      ParameterFile::from_json_str(r#"{"ConfThresholdPercent": 25, "IouThresholdPercent": "5"}"#)
        .unwrap();
    let thresholds = params.thresholds().unwrap();
    assert_eq!(thresholds.conf(), 0.25);
    assert_eq!(thresholds.iou(), 0.05);
  }

  #[test]
  fn non_integer_parameter_is_fatal() {
    let params = ParameterFile::from_json_str(
      r#"{"ConfThresholdPercent": "high", "IouThresholdPercent": 4.5}"#,
    )
    .unwrap();
    assert!(matches!(
      params.get_int(CONF_THRESHOLD_PARAM),
      Err(ConfigError::NotAnInt(..))
    ));
    assert!(matches!(
      params.get_int(IOU_THRESHOLD_PARAM),
      Err(ConfigError::NotAnInt(..))
    ));
  }

  #[test]
  fn missing_parameter_is_reported() {
    let params = ParameterFile::from_json_str(r#"{"ConfThresholdPercent": 50}"#).unwrap();
    assert!(matches!(params.thresholds(), Err(ConfigError::Missing(name)) if name == IOU_THRESHOLD_PARAM));
  }

  #[test]
  fn rejects_out_of_range_thresholds() {
    assert!(matches!(
      Thresholds::from_percent(120, 50),
      Err(ConfigError::OutOfRange(..))
    ));
    assert!(matches!(
      Thresholds::new(0.5, -0.1),
      Err(ConfigError::OutOfRange(..))
    ));
    assert!(matches!(
      Thresholds::new(f32::NAN, 0.5),
      Err(ConfigError::OutOfRange(..))
    ));
    assert!(Thresholds::new(0.0, 1.0).is_ok());
  }

  #[test]
  fn top_level_must_be_object() {
    assert!(matches!(
      ParameterFile::from_json_str("[1, 2]"),
      Err(ConfigError::NotAnObject)
    ));
  }

  #[test]
  fn loads_from_file() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(
      file.path(),
      r#"{"ConfThresholdPercent": 40, "IouThresholdPercent": 45}"#,
    )
    .unwrap();
    let params = ParameterFile::load(file.path()).unwrap();
    assert!(params.contains(CONF_THRESHOLD_PARAM));
    assert_eq!(params.thresholds().unwrap(), Thresholds::new(0.4, 0.45).unwrap());
  }
}
