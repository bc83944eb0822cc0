// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess.rs - 检测后处理
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

//! 解码后的处理顺序固定为: 置信度过滤 -> 非极大值抑制 -> 类别解析。
//! 三步共享同一个有效性掩码，只标记不删除。

mod filter;
mod nms;
mod resolve;
mod scratch;

pub use self::filter::confidence_filter;
pub use self::nms::{TieBreak, intersection_over_union, non_maximum_suppression};
pub use self::resolve::{Detection, resolve};
pub use self::scratch::{DecodedRow, DetectionScratch, ValidityMask};
