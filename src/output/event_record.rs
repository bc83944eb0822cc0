// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/event_record.rs - 检测事件记录
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

use std::{
  convert::Infallible,
  fs::{File, OpenOptions},
  io::{BufWriter, Write},
  path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{DETECTION_TOPIC, DetectionEvent, Notify, OutputError},
};

#[derive(Error, Debug)]
pub enum EventRecordError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("事件序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
  #[error("事件尚未声明")]
  NotDeclared,
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

#[derive(Serialize)]
struct EventLine<'a> {
  timestamp: String,
  topic: &'static str,
  data: &'a DetectionEvent<'a>,
}

/// 把事件逐行追加到 JSON Lines 文件
///
/// `declare` 打开文件，`undeclare` 刷新并关闭，未声明时发送会失败。
pub struct EventRecord {
  path: PathBuf,
  writer: Option<BufWriter<File>>,
}

impl EventRecord {
  pub fn new<P: Into<PathBuf>>(path: P) -> Self {
    Self {
      path: path.into(),
      writer: None,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn is_declared(&self) -> bool {
    self.writer.is_some()
  }
}

impl FromUrlWithScheme for EventRecord {
  const SCHEME: &'static str = "events";
}

impl FromUrl for EventRecord {
  type Error = EventRecordError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(EventRecordError::SchemeMismatch(format!(
        "期望记录方式 '{}', 实际记录方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }
    Ok(EventRecord::new(uri.path()))
  }
}

impl Notify for EventRecord {
  type Error = EventRecordError;

  fn declare(&mut self) -> Result<(), Self::Error> {
    if self.writer.is_some() {
      return Ok(());
    }

    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&self.path)?;
    self.writer = Some(BufWriter::new(file));
    info!("声明检测事件: {} -> {}", DETECTION_TOPIC, self.path.display());
    Ok(())
  }

  fn notify(&mut self, event: &DetectionEvent<'_>) -> Result<(), Self::Error> {
    let writer = self.writer.as_mut().ok_or(EventRecordError::NotDeclared)?;
    let line = EventLine {
      timestamp: Utc::now().to_rfc3339(),
      topic: DETECTION_TOPIC,
      data: event,
    };
    serde_json::to_writer(&mut *writer, &line)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
  }

  fn undeclare(&mut self) {
    if let Some(mut writer) = self.writer.take() {
      if let Err(e) = writer.flush() {
        warn!("关闭事件记录失败: {}", e);
      }
      info!("撤销检测事件声明: {}", self.path.display());
    }
  }
}

/// 只把事件写进日志
#[derive(Debug, Default)]
pub struct LogNotifier;

impl FromUrlWithScheme for LogNotifier {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogNotifier {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(LogNotifier)
  }
}

impl Notify for LogNotifier {
  type Error = Infallible;

  fn notify(&mut self, event: &DetectionEvent<'_>) -> Result<(), Self::Error> {
    info!(
      "检测事件: {} {:.3} [{:.3}, {:.3}, {:.3}, {:.3}]",
      event.class, event.confidence, event.bbox[0], event.bbox[1], event.bbox[2], event.bbox[3]
    );
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn notify_requires_declare() {
    let dir = tempfile::tempdir().unwrap();
    let mut record = EventRecord::new(dir.path().join("events.jsonl"));
    let event = DetectionEvent::new("dog", 0.5, [0.0, 0.0, 1.0, 1.0]);
    assert!(matches!(
      record.notify(&event),
      Err(EventRecordError::NotDeclared)
    ));
  }

  #[test]
  fn appends_one_line_per_event() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("events.jsonl");
    let url = Url::parse(&format!("events://{}", path.display())).unwrap();
    let mut record = EventRecord::from_url(&url).unwrap();
    assert_eq!(record.path(), path.as_path());

    record.declare().unwrap();
    assert!(record.is_declared());
    record
      .notify(&DetectionEvent::new("cat", 0.9, [0.1, 0.2, 0.3, 0.4]))
      .unwrap();
    record
      .notify(&DetectionEvent::new("dog", 0.8, [0.5, 0.5, 0.6, 0.6]))
      .unwrap();
    record.undeclare();
    assert!(!record.is_declared());

    let content = std::fs::read_to_string(record.path()).unwrap();
    let lines: Vec<serde_json::Value> = content
      .lines()
      .map(|line| serde_json::from_str(line).unwrap())
      .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["topic"], DETECTION_TOPIC);
    assert_eq!(lines[0]["data"]["class"], "cat");
    assert_eq!(lines[1]["data"]["class"], "dog");
    assert!(
      chrono::DateTime::parse_from_rfc3339(lines[1]["timestamp"].as_str().unwrap()).is_ok()
    );
  }
}
