// 该文件是 Qianli （千里眼） 项目的一部分。
// src/postprocess/assemble.rs - 多尺度候选框汇总
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

use tracing::{debug, error, warn};

use super::{
  PostprocessConfig, PostprocessError,
  decode::{ScaleFactor, decode_cell},
  score::best_class,
};
use crate::{
  model::Candidate,
  tensor::{FeatureMap, FeatureMaps},
};

fn validate(
  map: &FeatureMap,
  config: &PostprocessConfig,
  num_classes: usize,
) -> Result<(), PostprocessError> {
  let stride = map.stride();
  if !config.strides.contains(&stride) {
    error!("步长 {} 不在配置 {:?} 中", stride, config.strides);
    return Err(PostprocessError::UnexpectedStride { stride });
  }

  let side = config.grid_size(stride);
  if map.grid() != (side, side) {
    error!(
      "步长 {}: 网格大小为 {:?}, 期望 {:?}",
      stride,
      map.grid(),
      (side, side)
    );
    return Err(PostprocessError::ShapeMismatch {
      stride,
      expected: (side, side),
      actual: map.grid(),
    });
  }

  if map.num_classes() != num_classes {
    error!(
      "步长 {}: 分类通道数为 {}, 标签表共 {} 个类别",
      stride,
      map.num_classes(),
      num_classes
    );
    return Err(PostprocessError::ClassCountMismatch {
      stride,
      expected: num_classes,
      actual: map.num_classes(),
    });
  }

  Ok(())
}

/// 遍历所有检测头（步长升序、单元行优先），收集融合得分超过阈值的候选框。
///
/// 所有特征图先整体校验，任何一个不合法都不会产生部分输出。
pub(crate) fn assemble(
  maps: &FeatureMaps,
  config: &PostprocessConfig,
  num_classes: usize,
  scale: ScaleFactor,
) -> Result<Vec<Candidate>, PostprocessError> {
  for map in maps.iter() {
    validate(map, config, num_classes)?;
  }

  let missing: Vec<u32> = config
    .strides
    .iter()
    .copied()
    .filter(|stride| maps.get(*stride).is_none())
    .collect();
  if !missing.is_empty() {
    warn!("缺少步长 {:?} 的检测头输出", missing);
  }

  let mut candidates = Vec::new();
  for map in maps.iter() {
    let stride = map.stride();
    let (height, width) = map.grid();
    let before = candidates.len();

    for y in 0..height {
      for x in 0..width {
        let (class_id, score) = best_class(map.cls(), map.quality(), y, x);
        if score <= config.score_threshold {
          continue;
        }
        candidates.push(Candidate {
          class_id,
          score,
          bbox: decode_cell(map.reg(), y, x, stride, scale),
        });
      }
    }

    debug!(
      "步长 {}: {}x{} 网格, 保留 {} 个候选",
      stride,
      height,
      width,
      candidates.len() - before
    );
  }

  Ok(candidates)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tensor::Tensor;

  fn map(stride: u32, side: usize, classes: usize, hot: &[(usize, usize, usize)]) -> FeatureMap {
    let mut cls = vec![-10.0; side * side * classes];
    for &(y, x, c) in hot {
      cls[(y * side + x) * classes + c] = 10.0;
    }
    FeatureMap::new(
      stride,
      Tensor::nhwc(cls, side, side, classes).unwrap(),
      Tensor::nhwc(vec![1.0; side * side * 4], side, side, 4).unwrap(),
      Tensor::nhwc(vec![10.0; side * side], side, side, 1).unwrap(),
    )
    .unwrap()
  }

  fn small_config() -> PostprocessConfig {
    PostprocessConfig::default()
      .input_size(32)
      .strides(vec![8, 16])
  }

  #[test]
  fn candidates_are_stride_then_raster_ordered() {
    let maps = FeatureMaps::new()
      .with(map(16, 2, 3, &[(1, 1, 2), (0, 1, 0)]))
      .unwrap()
      .with(map(8, 4, 3, &[(3, 0, 1), (0, 2, 1)]))
      .unwrap();

    let out = assemble(&maps, &small_config(), 3, ScaleFactor::identity()).unwrap();
    let order: Vec<(u32, f32, f32)> = out.iter().map(|c| (c.class_id, c.bbox.x1, c.bbox.y1)).collect();
    assert_eq!(
      order,
      vec![
        (1, 19.0, 3.0),
        (1, 3.0, 27.0),
        (0, 23.0, 7.0),
        (2, 23.0, 23.0)
      ]
    );
  }

  #[test]
  fn threshold_is_exclusive() {
    // 全部 logit 为 0 时融合得分正好是 0.5
    let maps = FeatureMaps::new()
      .with(
        FeatureMap::new(
          8,
          Tensor::nhwc(vec![0.0; 16], 4, 4, 1).unwrap(),
          Tensor::nhwc(vec![1.0; 64], 4, 4, 4).unwrap(),
          Tensor::nhwc(vec![0.0; 16], 4, 4, 1).unwrap(),
        )
        .unwrap(),
      )
      .unwrap();
    let out = assemble(&maps, &small_config(), 1, ScaleFactor::identity()).unwrap();
    assert!(out.is_empty());
  }

  #[test]
  fn rejects_class_count_mismatch() {
    let maps = FeatureMaps::new().with(map(8, 4, 3, &[])).unwrap();
    let err = assemble(&maps, &small_config(), 80, ScaleFactor::identity()).unwrap_err();
    assert!(matches!(
      err,
      PostprocessError::ClassCountMismatch {
        stride: 8,
        expected: 80,
        actual: 3
      }
    ));
  }

  #[test]
  fn rejects_wrong_grid_for_stride() {
    let maps = FeatureMaps::new().with(map(8, 2, 3, &[])).unwrap();
    let err = assemble(&maps, &small_config(), 3, ScaleFactor::identity()).unwrap_err();
    assert!(matches!(
      err,
      PostprocessError::ShapeMismatch {
        stride: 8,
        expected: (4, 4),
        actual: (2, 2)
      }
    ));
  }

  #[test]
  fn rejects_unknown_stride_without_partial_output() {
    let maps = FeatureMaps::new()
      .with(map(8, 4, 3, &[(0, 0, 0)]))
      .unwrap()
      .with(map(32, 1, 3, &[]))
      .unwrap();
    let err = assemble(&maps, &small_config(), 3, ScaleFactor::identity()).unwrap_err();
    assert!(matches!(err, PostprocessError::UnexpectedStride { stride: 32 }));
  }
}
