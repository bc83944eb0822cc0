// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/overlay.rs - 日志叠加层
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

use std::convert::Infallible;

use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{OutputError, Render},
};

/// 只把矩形写进日志的叠加层
#[derive(Debug, Default)]
pub struct LogOverlay {
  pending: Vec<[f32; 4]>,
  commits: usize,
}

impl LogOverlay {
  pub fn pending(&self) -> &[[f32; 4]] {
    &self.pending
  }

  pub fn commits(&self) -> usize {
    self.commits
  }
}

impl FromUrlWithScheme for LogOverlay {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOverlay {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(LogOverlay::default())
  }
}

impl Render for LogOverlay {
  type Error = Infallible;

  fn clear(&mut self) -> Result<(), Self::Error> {
    self.pending.clear();
    Ok(())
  }

  fn rectangle(&mut self, bbox: [f32; 4]) -> Result<(), Self::Error> {
    debug!(
      "绘制矩形: [{:.3}, {:.3}, {:.3}, {:.3}]",
      bbox[0], bbox[1], bbox[2], bbox[3]
    );
    self.pending.push(bbox);
    Ok(())
  }

  fn commit(&mut self) -> Result<(), Self::Error> {
    self.commits += 1;
    info!("叠加层更新: {} 个矩形", self.pending.len());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clear_drops_previous_rectangles() {
    let mut overlay = LogOverlay::default();
    overlay.rectangle([0.0, 0.0, 0.5, 0.5]).unwrap();
    overlay.commit().unwrap();
    overlay.clear().unwrap();
    assert!(overlay.pending().is_empty());
    overlay.rectangle([0.1, 0.1, 0.2, 0.2]).unwrap();
    overlay.commit().unwrap();
    assert_eq!(overlay.pending(), &[[0.1, 0.1, 0.2, 0.2]]);
    assert_eq!(overlay.commits(), 2);
  }
}
