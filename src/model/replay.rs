// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/replay.rs - 回放预先录制的输出张量
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
use tracing::{debug, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::VideoFrame, model::Model};

#[derive(Error, Debug)]
pub enum ReplayError {
  #[error("张量文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch {
    expected: &'static str,
    actual: String,
  },
  #[error("参数 {0} 无效: {1}")]
  InvalidQuery(String, String),
  #[error("输入帧为空")]
  EmptyFrame,
  #[error("第 {0} 次推理被注入失败")]
  InjectedFailure(u64),
  #[error("不存在第 {0} 个输出张量")]
  NoSuchOutput(usize),
}

/// 回放一个已录制的量化输出张量
///
/// 在开发主机上代替硬件推理，每次推理都返回同一份张量。
/// `fail_every=N` 让每第 N 次推理失败，用于检验跳帧路径。
pub struct TensorReplay {
  tensor: Box<[u8]>,
  fail_every: Option<u64>,
  runs: u64,
}

impl TensorReplay {
  pub fn new(tensor: Vec<u8>) -> Self {
    Self {
      tensor: tensor.into_boxed_slice(),
      fail_every: None,
      runs: 0,
    }
  }

  pub fn with_fail_every(mut self, fail_every: Option<u64>) -> Self {
    self.fail_every = fail_every.filter(|&n| n > 0);
    self
  }

  pub fn runs(&self) -> u64 {
    self.runs
  }
}

impl FromUrlWithScheme for TensorReplay {
  const SCHEME: &'static str = "tensor";
}

impl FromUrl for TensorReplay {
  type Error = ReplayError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayError::SchemeMismatch {
        expected: Self::SCHEME,
        actual: url.scheme().to_string(),
      });
    }

    let mut fail_every = None;
    for (k, v) in url.query_pairs() {
      if k == "fail_every" {
        let n = v
          .parse::<u64>()
          .map_err(|e| ReplayError::InvalidQuery(k.to_string(), e.to_string()))?;
        fail_every = Some(n);
      }
    }

    info!("加载张量文件: {}", url.path());
    let tensor = std::fs::read(url.path())?;
    debug!("张量大小: {} 字节", tensor.len());

    Ok(TensorReplay::new(tensor).with_fail_every(fail_every))
  }
}

impl Model for TensorReplay {
  type Frame = VideoFrame;
  type Error = ReplayError;

  fn preprocess(&mut self, frame: &Self::Frame) -> Result<(), Self::Error> {
    if frame.data().is_empty() {
      return Err(ReplayError::EmptyFrame);
    }
    debug!(
      "预处理第 {} 帧: {}x{} {:?}",
      frame.sequence(),
      frame.width(),
      frame.height(),
      frame.format()
    );
    Ok(())
  }

  fn infer(&mut self, frame: &Self::Frame) -> Result<(), Self::Error> {
    self.runs += 1;
    if self.fail_every.is_some_and(|n| self.runs % n == 0) {
      warn!("第 {} 帧推理注入失败", frame.sequence());
      return Err(ReplayError::InjectedFailure(self.runs));
    }
    Ok(())
  }

  fn output_tensor(&self, index: usize) -> Result<&[u8], Self::Error> {
    match index {
      0 => Ok(&self.tensor),
      _ => Err(ReplayError::NoSuchOutput(index)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::PixelFormat;

  #[test]
  fn injects_failures_periodically() {
    let mut replay = TensorReplay::new(vec![1, 2, 3]).with_fail_every(Some(3));
    let frame = VideoFrame::blank(0, 2, 2, PixelFormat::Rgb);
    assert!(replay.infer(&frame).is_ok());
    assert!(replay.infer(&frame).is_ok());
    assert!(matches!(
      replay.infer(&frame),
      Err(ReplayError::InjectedFailure(3))
    ));
    assert!(replay.infer(&frame).is_ok());
    assert_eq!(replay.runs(), 4);
  }

  #[test]
  fn zero_fail_every_disables_injection() {
    let mut replay = TensorReplay::new(vec![]).with_fail_every(Some(0));
    let frame = VideoFrame::blank(0, 2, 2, PixelFormat::Rgb);
    for _ in 0..5 {
      assert!(replay.infer(&frame).is_ok());
    }
  }

  #[test]
  fn only_first_output_exists() {
    let replay = TensorReplay::new(vec![9, 8]);
    assert_eq!(replay.output_tensor(0).unwrap(), &[9, 8]);
    assert!(matches!(
      replay.output_tensor(1),
      Err(ReplayError::NoSuchOutput(1))
    ));
  }

  #[test]
  fn loads_from_url() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), [5u8, 6, 7]).unwrap();
    let url = Url::parse(&format!("tensor://{}?fail_every=2", file.path().display())).unwrap();

    let replay = TensorReplay::from_url(&url).unwrap();
    assert_eq!(replay.output_tensor(0).unwrap(), &[5, 6, 7]);
    assert_eq!(replay.fail_every, Some(2));
  }

  #[test]
  fn rejects_other_scheme() {
    let url = Url::parse("stub://camera").unwrap();
    assert!(matches!(
      TensorReplay::from_url(&url),
      Err(ReplayError::SchemeMismatch { .. })
    ));
  }
}
