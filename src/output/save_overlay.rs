// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/save_overlay.rs - 保存叠加层图像
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

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, output::Render};

const DEFAULT_SIZE: u32 = 640;
const OUTLINE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]); // 红色细线
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Error, Debug)]
pub enum SaveOverlayError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("参数 {0} 无效: {1}")]
  InvalidQuery(String, String),
}

/// 把叠加层画在透明画布上，每次提交覆盖保存为 PNG
pub struct SaveOverlay {
  path: PathBuf,
  canvas: RgbaImage,
}

impl SaveOverlay {
  pub fn new<P: Into<PathBuf>>(path: P, width: u32, height: u32) -> Self {
    Self {
      path: path.into(),
      canvas: RgbaImage::from_pixel(width.max(1), height.max(1), TRANSPARENT),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl FromUrlWithScheme for SaveOverlay {
  const SCHEME: &'static str = "overlay";
}

impl FromUrl for SaveOverlay {
  type Error = SaveOverlayError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveOverlayError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let mut width = DEFAULT_SIZE;
    let mut height = DEFAULT_SIZE;
    for (k, v) in uri.query_pairs() {
      let value = v
        .parse::<u32>()
        .map_err(|e| SaveOverlayError::InvalidQuery(k.to_string(), e.to_string()));
      match &*k {
        "width" => width = value?,
        "height" => height = value?,
        _ => warn!("忽略未知参数: {}={}", k, v),
      }
    }

    Ok(SaveOverlay::new(uri.path(), width, height))
  }
}

impl Render for SaveOverlay {
  type Error = SaveOverlayError;

  fn clear(&mut self) -> Result<(), Self::Error> {
    for pixel in self.canvas.pixels_mut() {
      *pixel = TRANSPARENT;
    }
    Ok(())
  }

  // bbox 为归一化坐标 [x_min, y_min, x_max, y_max]
  fn rectangle(&mut self, bbox: [f32; 4]) -> Result<(), Self::Error> {
    let (w, h) = (self.canvas.width() as f32, self.canvas.height() as f32);

    let x_min = ((bbox[0] * w).floor() as i32).clamp(0, w as i32 - 1);
    let y_min = ((bbox[1] * h).floor() as i32).clamp(0, h as i32 - 1);
    let x_max = ((bbox[2] * w).ceil() as i32).clamp(0, w as i32 - 1);
    let y_max = ((bbox[3] * h).ceil() as i32).clamp(0, h as i32 - 1);

    if x_min >= x_max || y_min >= y_max {
      debug!("忽略退化矩形: {:?}", bbox);
      return Ok(());
    }

    let rect = Rect::at(x_min, y_min).of_size((x_max - x_min) as u32, (y_max - y_min) as u32);
    draw_hollow_rect_mut(&mut self.canvas, rect, OUTLINE_COLOR);
    Ok(())
  }

  fn commit(&mut self) -> Result<(), Self::Error> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(SaveOverlayError::IoError)?;
    }

    self
      .canvas
      .save(&self.path)
      .map_err(SaveOverlayError::ImageError)?;

    debug!("保存叠加层到文件: {}", self.path.display());

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn draws_outline_and_saves_png() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("overlay.png");
    let mut overlay = SaveOverlay::new(&path, 10, 10);

    overlay.clear().unwrap();
    overlay.rectangle([0.2, 0.2, 0.6, 0.6]).unwrap();
    overlay.commit().unwrap();

    let saved = image::open(&path).unwrap().to_rgba8();
    assert_eq!(saved.dimensions(), (10, 10));
    assert_eq!(*saved.get_pixel(2, 2), OUTLINE_COLOR);
    assert_eq!(*saved.get_pixel(4, 4), TRANSPARENT);

    overlay.clear().unwrap();
    overlay.commit().unwrap();
    let saved = image::open(&path).unwrap().to_rgba8();
    assert_eq!(*saved.get_pixel(2, 2), TRANSPARENT);
  }

  #[test]
  fn parses_canvas_size_from_url() {
    let url = Url::parse("overlay:///tmp/shanan/overlay.png?width=320&height=240").unwrap();
    let overlay = SaveOverlay::from_url(&url).unwrap();
    assert_eq!(overlay.path(), Path::new("/tmp/shanan/overlay.png"));
    assert_eq!(overlay.canvas.dimensions(), (320, 240));
  }
}
