// 该文件是 Qianli （千里眼） 项目的一部分。
// src/postprocess.rs - 检测后处理流水线
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

//! 多尺度 anchor-free 检测头的后处理：
//! 解码 → 打分 → 阈值过滤 → 非极大值抑制 → Top-K → 编码。
//!
//! 每一帧的处理都是输入的纯函数，不保留任何跨帧状态。

use thiserror::Error;
use tracing::debug;

use crate::{
  label::{LabelError, LabelTable},
  message::BoxRecord,
  model::DetectionSet,
  tensor::FeatureMaps,
};

mod assemble;
mod config;
mod decode;
mod encode;
mod nms;
mod score;
mod topk;

pub use self::config::{ConfigError, PostprocessConfig, SuppressionPolicy};
pub use self::decode::{ScaleFactor, anchor_point, decode_boxes, distance_to_bbox};
pub use self::encode::encode;
pub use self::nms::{iou, suppress};
pub use self::score::{best_class, fuse, sigmoid};
pub use self::topk::select_top_k;

#[derive(Error, Debug)]
pub enum PostprocessError {
  #[error("步长 {stride} 不在配置的步长集合中")]
  UnexpectedStride { stride: u32 },
  #[error("步长 {stride} 的网格应为 {expected:?}, 实际为 {actual:?}")]
  ShapeMismatch {
    stride: u32,
    expected: (usize, usize),
    actual: (usize, usize),
  },
  #[error("步长 {stride} 的分类通道数为 {actual}, 与标签表的 {expected} 个类别不一致")]
  ClassCountMismatch {
    stride: u32,
    expected: usize,
    actual: usize,
  },
  #[error("标签错误: {0}")]
  LabelError(#[from] LabelError),
}

/// 单帧后处理器，只持有只读配置
#[derive(Debug, Clone)]
pub struct Postprocessor {
  config: PostprocessConfig,
}

impl Postprocessor {
  pub fn new(config: PostprocessConfig) -> Result<Self, ConfigError> {
    config.validate()?;
    Ok(Self { config })
  }

  pub fn config(&self) -> &PostprocessConfig {
    &self.config
  }

  /// 对一帧的全部检测头输出执行解码、抑制与 Top-K，返回检测集合。
  ///
  /// `origin` 为原始图像的 `(width, height)`。没有任何特征图时返回空集合。
  pub fn detect(
    &self,
    maps: &FeatureMaps,
    origin: (u32, u32),
    labels: &LabelTable,
  ) -> Result<DetectionSet, PostprocessError> {
    if maps.is_empty() {
      debug!("没有检测头输出, 返回空结果");
      return Ok(DetectionSet::default());
    }

    let scale = ScaleFactor::new(origin.0, origin.1, self.config.input_size);
    let candidates = assemble::assemble(maps, &self.config, labels.len(), scale)?;
    debug!("阈值过滤后候选框数量: {}", candidates.len());

    let kept = suppress(
      candidates,
      self.config.policy,
      self.config.iou_threshold,
      self.config.soft_nms_sigma,
    );
    debug!("非极大值抑制后剩余: {}", kept.len());

    let selected = select_top_k(kept, self.config.top_k);
    debug!("Top-K 后剩余: {}", selected.len());

    Ok(DetectionSet::from(selected))
  }

  /// 完整的一帧处理：检测后立即编码为输出记录
  pub fn process(
    &self,
    maps: &FeatureMaps,
    origin: (u32, u32),
    labels: &LabelTable,
  ) -> Result<Vec<BoxRecord>, PostprocessError> {
    let detections = self.detect(maps, origin, labels)?;
    Ok(encode(&detections, labels)?)
  }
}
