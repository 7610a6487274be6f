// 该文件是 Qianli （千里眼） 项目的一部分。
// src/postprocess/score.rs - 分类与质量得分融合
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

use crate::tensor::Tensor;

// exp(88) 仍在 f32 可表示范围内
const LOGIT_CLAMP: f32 = 88.0;

#[inline]
pub fn sigmoid(x: f32) -> f32 {
  let x = x.clamp(-LOGIT_CLAMP, LOGIT_CLAMP);
  1.0 / (1.0 + (-x).exp())
}

/// 分类置信度与定位质量的几何平均
#[inline]
pub fn fuse(cls_logit: f32, quality_logit: f32) -> f32 {
  (sigmoid(quality_logit) * sigmoid(cls_logit)).sqrt()
}

/// 单元 `(y, x)` 上融合得分最高的类别，返回 `(class_id, score)`。
///
/// 得分相同时取较小的类别索引；NaN 得分永远不会胜出。
pub fn best_class(cls: &Tensor, quality: &Tensor, y: usize, x: usize) -> (u32, f32) {
  let quality = sigmoid(quality.at(y, x, 0));
  let mut class_id = 0u32;
  let mut best = f32::NEG_INFINITY;
  for c in 0..cls.channels() {
    let score = (quality * sigmoid(cls.at(y, x, c))).sqrt();
    if score > best {
      best = score;
      class_id = c as u32;
    }
  }
  (class_id, best)
}
