// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output.rs - 输出定义
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
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

/// 叠加层，坐标为归一化的 [x1, y1, x2, y2]
///
/// 每个周期的发布阶段开始时清空一次，之后逐个绘制矩形，最后提交。
pub trait Render {
  type Error;
  fn clear(&mut self) -> Result<(), Self::Error>;
  fn rectangle(&mut self, bbox: [f32; 4]) -> Result<(), Self::Error>;
  fn commit(&mut self) -> Result<(), Self::Error>;
}

/// 检测事件通知，发送失败不影响检测流程
pub trait Notify {
  type Error;

  /// 在第一个周期之前声明事件
  fn declare(&mut self) -> Result<(), Self::Error> {
    Ok(())
  }

  fn notify(&mut self, event: &DetectionEvent<'_>) -> Result<(), Self::Error>;

  /// 退出前撤销声明
  fn undeclare(&mut self) {}
}

mod event;
pub use self::event::{DETECTION_TOPIC, DetectionEvent};

mod overlay;
pub use self::overlay::LogOverlay;

#[cfg(feature = "save_overlay")]
mod save_overlay;
#[cfg(feature = "save_overlay")]
pub use self::save_overlay::{SaveOverlay, SaveOverlayError};

mod event_record;
pub use self::event_record::{EventRecord, EventRecordError, LogNotifier};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "save_overlay")]
  #[error("叠加层图像输出错误: {0}")]
  SaveOverlayError(#[from] SaveOverlayError),
  #[error("事件记录错误: {0}")]
  EventRecordError(#[from] EventRecordError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum OverlayWrapper {
  Log(LogOverlay),
  #[cfg(feature = "save_overlay")]
  SaveOverlay(SaveOverlay),
}

impl FromUrl for OverlayWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogOverlay::SCHEME => Ok(OverlayWrapper::Log(LogOverlay::from_url(url)?)),
      #[cfg(feature = "save_overlay")]
      SaveOverlay::SCHEME => Ok(OverlayWrapper::SaveOverlay(SaveOverlay::from_url(url)?)),
      other => Err(OutputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Render for OverlayWrapper {
  type Error = OutputError;

  fn clear(&mut self) -> Result<(), Self::Error> {
    match self {
      OverlayWrapper::Log(output) => output.clear().map_err(|never| match never {}),
      #[cfg(feature = "save_overlay")]
      OverlayWrapper::SaveOverlay(output) => output.clear().map_err(OutputError::from),
    }
  }

  fn rectangle(&mut self, bbox: [f32; 4]) -> Result<(), Self::Error> {
    match self {
      OverlayWrapper::Log(output) => output.rectangle(bbox).map_err(|never| match never {}),
      #[cfg(feature = "save_overlay")]
      OverlayWrapper::SaveOverlay(output) => output.rectangle(bbox).map_err(OutputError::from),
    }
  }

  fn commit(&mut self) -> Result<(), Self::Error> {
    match self {
      OverlayWrapper::Log(output) => output.commit().map_err(|never| match never {}),
      #[cfg(feature = "save_overlay")]
      OverlayWrapper::SaveOverlay(output) => output.commit().map_err(OutputError::from),
    }
  }
}

pub enum NotifierWrapper {
  Log(LogNotifier),
  EventRecord(EventRecord),
}

impl FromUrl for NotifierWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogNotifier::SCHEME => Ok(NotifierWrapper::Log(LogNotifier::from_url(url)?)),
      EventRecord::SCHEME => Ok(NotifierWrapper::EventRecord(EventRecord::from_url(url)?)),
      other => Err(OutputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Notify for NotifierWrapper {
  type Error = OutputError;

  fn declare(&mut self) -> Result<(), Self::Error> {
    match self {
      NotifierWrapper::Log(output) => output.declare().map_err(|never| match never {}),
      NotifierWrapper::EventRecord(output) => output.declare().map_err(OutputError::from),
    }
  }

  fn notify(&mut self, event: &DetectionEvent<'_>) -> Result<(), Self::Error> {
    match self {
      NotifierWrapper::Log(output) => output.notify(event).map_err(|never| match never {}),
      NotifierWrapper::EventRecord(output) => output.notify(event).map_err(OutputError::from),
    }
  }

  fn undeclare(&mut self) {
    match self {
      NotifierWrapper::Log(output) => output.undeclare(),
      NotifierWrapper::EventRecord(output) => output.undeclare(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn selects_outputs_by_scheme() {
    let overlay = OverlayWrapper::from_url(&Url::parse("log://overlay").unwrap()).unwrap();
    assert!(matches!(overlay, OverlayWrapper::Log(_)));

    let notifier = NotifierWrapper::from_url(&Url::parse("log://events").unwrap()).unwrap();
    assert!(matches!(notifier, NotifierWrapper::Log(_)));

    assert!(matches!(
      NotifierWrapper::from_url(&Url::parse("mqtt://broker").unwrap()),
      Err(OutputError::SchemeMismatch(scheme)) if scheme == "mqtt"
    ));
  }
}
