// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/stub_source.rs - 合成帧来源
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

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{PixelFormat, VideoFrame},
  input::FrameSource,
};

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 640;
const DEFAULT_FRAMERATE: f64 = 30.0;

#[derive(Error, Debug)]
pub enum StubSourceError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch {
    expected: &'static str,
    actual: String,
  },
  #[error("参数 {0} 无效: {1}")]
  InvalidQuery(String, String),
}

/// 生成空白帧的来源，用于在没有摄像头的主机上驱动流水线
///
/// `frames=N` 限定可取的帧数，取完后返回 `None`，模拟采集流被重新配置。
pub struct StubFrameSource {
  width: u32,
  height: u32,
  format: PixelFormat,
  remaining: Option<u64>,
  next_sequence: u64,
  outstanding: usize,
  framerate: f64,
  max_framerate: f64,
}

impl StubFrameSource {
  pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
    Self {
      width,
      height,
      format,
      remaining: None,
      next_sequence: 0,
      outstanding: 0,
      framerate: DEFAULT_FRAMERATE,
      max_framerate: DEFAULT_FRAMERATE,
    }
  }

  pub fn with_frame_limit(mut self, frames: Option<u64>) -> Self {
    self.remaining = frames;
    self
  }

  /// 尚未交还的帧数
  pub fn outstanding(&self) -> usize {
    self.outstanding
  }

  pub fn framerate(&self) -> f64 {
    self.framerate
  }
}

fn parse_query<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, StubSourceError>
where
  T::Err: std::fmt::Display,
{
  value
    .parse::<T>()
    .map_err(|e| StubSourceError::InvalidQuery(key.to_string(), e.to_string()))
}

impl FromUrlWithScheme for StubFrameSource {
  const SCHEME: &'static str = "stub";
}

impl FromUrl for StubFrameSource {
  type Error = StubSourceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(StubSourceError::SchemeMismatch {
        expected: Self::SCHEME,
        actual: url.scheme().to_string(),
      });
    }

    let mut width = DEFAULT_WIDTH;
    let mut height = DEFAULT_HEIGHT;
    let mut format = PixelFormat::Nv12;
    let mut frames = None;
    for (k, v) in url.query_pairs() {
      match &*k {
        "width" => width = parse_query(&k, &v)?,
        "height" => height = parse_query(&k, &v)?,
        "frames" => frames = Some(parse_query(&k, &v)?),
        "format" => {
          format = match &*v {
            "nv12" | "yuv" => PixelFormat::Nv12,
            "rgb" => PixelFormat::Rgb,
            other => {
              return Err(StubSourceError::InvalidQuery(
                k.to_string(),
                other.to_string(),
              ));
            }
          }
        }
        _ => warn!("忽略未知参数: {}={}", k, v),
      }
    }

    info!(
      "创建合成帧来源: {}x{} {:?}, 帧数限制 {:?}",
      width, height, format, frames
    );
    Ok(StubFrameSource::new(width, height, format).with_frame_limit(frames))
  }
}

impl FrameSource for StubFrameSource {
  type Frame = VideoFrame;

  fn acquire_frame(&mut self) -> Option<Self::Frame> {
    if let Some(remaining) = self.remaining.as_mut() {
      if *remaining == 0 {
        warn!("合成帧来源已耗尽");
        return None;
      }
      *remaining -= 1;
    }

    let sequence = self.next_sequence;
    self.next_sequence += 1;
    self.outstanding += 1;
    Some(VideoFrame::blank(
      sequence,
      self.width,
      self.height,
      self.format,
    ))
  }

  fn release_frame(&mut self, frame: Self::Frame) {
    self.outstanding = self.outstanding.saturating_sub(1);
    debug!("交还第 {} 帧", frame.sequence());
  }

  fn update_framerate(&mut self, processing: Duration) {
    let ms = processing.as_secs_f64() * 1000.0;
    let framerate = if ms > 0.0 {
      (1000.0 / ms).min(self.max_framerate)
    } else {
      self.max_framerate
    };
    if (framerate - self.framerate).abs() > f64::EPSILON {
      debug!("采集帧率调整为 {:.2} FPS", framerate);
      self.framerate = framerate;
    }
  }

  fn flush(&mut self) {
    debug!("清空采集队列");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn exhausts_after_frame_limit() {
    let mut source = StubFrameSource::new(4, 4, PixelFormat::Rgb).with_frame_limit(Some(2));
    let a = source.acquire_frame().unwrap();
    let b = source.acquire_frame().unwrap();
    assert_eq!((a.sequence(), b.sequence()), (0, 1));
    assert!(source.acquire_frame().is_none());
    assert_eq!(source.outstanding(), 2);

    source.release_frame(a);
    source.release_frame(b);
    assert_eq!(source.outstanding(), 0);
  }

  #[test]
  fn framerate_follows_processing_time() {
    let mut source = StubFrameSource::new(4, 4, PixelFormat::Nv12);
    source.update_framerate(Duration::from_millis(100));
    assert!((source.framerate() - 10.0).abs() < 1e-9);
    source.update_framerate(Duration::from_millis(1));
    assert_eq!(source.framerate(), DEFAULT_FRAMERATE);
  }

  #[test]
  fn parses_url_query() {
    let url = Url::parse("stub://camera?width=320&height=240&frames=5&format=rgb").unwrap();
    let mut source = StubFrameSource::from_url(&url).unwrap();
    let frame = source.acquire_frame().unwrap();
    assert_eq!((frame.width(), frame.height()), (320, 240));
    assert_eq!(frame.format(), PixelFormat::Rgb);
    assert_eq!(source.remaining, Some(4));
  }

  #[test]
  fn rejects_bad_query() {
    let url = Url::parse("stub://camera?width=wide").unwrap();
    assert!(matches!(
      StubFrameSource::from_url(&url),
      Err(StubSourceError::InvalidQuery(..))
    ));
    let url = Url::parse("image:///tmp/a.png").unwrap();
    assert!(matches!(
      StubFrameSource::from_url(&url),
      Err(StubSourceError::SchemeMismatch { .. })
    ));
  }
}
