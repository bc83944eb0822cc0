// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - 视频帧定义
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

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 采集流的像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
  /// 半平面 YUV 4:2:0
  Nv12,
  /// 交错 RGB
  Rgb,
}

impl PixelFormat {
  pub fn frame_len(&self, width: u32, height: u32) -> usize {
    let pixels = width as usize * height as usize;
    match self {
      PixelFormat::Nv12 => pixels * 3 / 2,
      PixelFormat::Rgb => pixels * 3,
    }
  }
}

/// 采集到的一帧图像，由当前周期独占
#[derive(Debug)]
pub struct VideoFrame {
  sequence: u64,
  width: u32,
  height: u32,
  format: PixelFormat,
  data: Box<[u8]>,
}

impl VideoFrame {
  pub fn new(
    sequence: u64,
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
  ) -> Result<Self, FrameError> {
    let expected = format.frame_len(width, height);
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      sequence,
      width,
      height,
      format,
      data: data.into_boxed_slice(),
    })
  }

  pub fn blank(sequence: u64, width: u32, height: u32, format: PixelFormat) -> Self {
    let data = vec![0u8; format.frame_len(width, height)].into_boxed_slice();
    Self {
      sequence,
      width,
      height,
      format,
      data,
    }
  }

  pub fn sequence(&self) -> u64 {
    self.sequence
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn format(&self) -> PixelFormat {
    self.format
  }

  pub fn data(&self) -> &[u8] {
    &self.data
  }
}

impl AsMut<[u8]> for VideoFrame {
  fn as_mut(&mut self) -> &mut [u8] {
    &mut self.data
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn frame_length_depends_on_format() {
    assert_eq!(PixelFormat::Nv12.frame_len(4, 2), 12);
    assert_eq!(PixelFormat::Rgb.frame_len(4, 2), 24);
  }

  #[test]
  fn rejects_mismatched_data() {
    let err = VideoFrame::new(0, 4, 2, PixelFormat::Rgb, vec![0; 12]).unwrap_err();
    assert_eq!(
      err,
      FrameError::LengthMismatch {
        expected: 24,
        actual: 12
      }
    );
  }

  #[test]
  fn blank_frame_is_zeroed() {
    let mut frame = VideoFrame::blank(7, 4, 4, PixelFormat::Nv12);
    assert_eq!(frame.sequence(), 7);
    assert_eq!(frame.data().len(), 24);
    assert!(frame.data().iter().all(|&b| b == 0));
    frame.as_mut()[0] = 1;
    assert_eq!(frame.data()[0], 1);
  }
}
