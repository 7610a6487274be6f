// 该文件是 Qianli （千里眼） 项目的一部分。
// src/tensor.rs - 检测头输出张量与特征图定义
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

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 回归分支的通道数：左、上、右、下四个距离
pub const REG_CHANNELS: usize = 4;
/// 质量（centerness）分支的通道数
pub const QUALITY_CHANNELS: usize = 1;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
  #[error("张量数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("张量尺寸不能为零: {height}x{width}x{channels}")]
  EmptyShape {
    height: usize,
    width: usize,
    channels: usize,
  },
  #[error("张量尺寸溢出: {height}x{width}x{channels}")]
  ShapeOverflow {
    height: usize,
    width: usize,
    channels: usize,
  },
  #[error("步长不能为零")]
  ZeroStride,
  #[error("步长 {stride} 的 {head} 分支网格为 {actual:?}, 与分类分支 {expected:?} 不一致")]
  GridMismatch {
    stride: u32,
    head: &'static str,
    expected: (usize, usize),
    actual: (usize, usize),
  },
  #[error("步长 {stride} 的 {head} 分支通道数应为 {expected}, 实际为 {actual}")]
  ChannelMismatch {
    stride: u32,
    head: &'static str,
    expected: usize,
    actual: usize,
  },
  #[error("步长 {0} 的特征图重复")]
  DuplicateStride(u32),
}

/// 张量内存布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
  /// 通道在最内层: `[y][x][c]`
  #[default]
  Nhwc,
  /// 通道在最外层: `[c][y][x]`
  Nchw,
}

/// 单张量（批大小为 1），形状为 H×W×C
#[derive(Debug, Clone)]
pub struct Tensor {
  data: Box<[f32]>,
  height: usize,
  width: usize,
  channels: usize,
  layout: Layout,
}

impl Tensor {
  pub fn new(
    data: Vec<f32>,
    height: usize,
    width: usize,
    channels: usize,
    layout: Layout,
  ) -> Result<Self, TensorError> {
    if height == 0 || width == 0 || channels == 0 {
      return Err(TensorError::EmptyShape {
        height,
        width,
        channels,
      });
    }

    let expected = height
      .checked_mul(width)
      .and_then(|n| n.checked_mul(channels))
      .ok_or(TensorError::ShapeOverflow {
        height,
        width,
        channels,
      })?;
    if data.len() != expected {
      return Err(TensorError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
      height,
      width,
      channels,
      layout,
    })
  }

  pub fn nhwc(
    data: Vec<f32>,
    height: usize,
    width: usize,
    channels: usize,
  ) -> Result<Self, TensorError> {
    Self::new(data, height, width, channels, Layout::Nhwc)
  }

  pub fn nchw(
    data: Vec<f32>,
    height: usize,
    width: usize,
    channels: usize,
  ) -> Result<Self, TensorError> {
    Self::new(data, height, width, channels, Layout::Nchw)
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    self.channels
  }

  pub fn layout(&self) -> Layout {
    self.layout
  }

  pub fn grid(&self) -> (usize, usize) {
    (self.height, self.width)
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  /// 读取第 `y` 行、第 `x` 列、第 `c` 通道的元素
  #[inline]
  pub fn at(&self, y: usize, x: usize, c: usize) -> f32 {
    let idx = match self.layout {
      Layout::Nhwc => (y * self.width + x) * self.channels + c,
      Layout::Nchw => (c * self.height + y) * self.width + x,
    };
    self.data[idx]
  }
}

/// 单个步长的检测头输出：分类、回归、质量三个分支
#[derive(Debug, Clone)]
pub struct FeatureMap {
  stride: u32,
  cls: Tensor,
  reg: Tensor,
  quality: Tensor,
}

impl FeatureMap {
  pub fn new(stride: u32, cls: Tensor, reg: Tensor, quality: Tensor) -> Result<Self, TensorError> {
    if stride == 0 {
      return Err(TensorError::ZeroStride);
    }

    let grid = cls.grid();
    for (head, tensor, channels) in [
      ("regression", &reg, REG_CHANNELS),
      ("quality", &quality, QUALITY_CHANNELS),
    ] {
      if tensor.grid() != grid {
        return Err(TensorError::GridMismatch {
          stride,
          head,
          expected: grid,
          actual: tensor.grid(),
        });
      }
      if tensor.channels() != channels {
        return Err(TensorError::ChannelMismatch {
          stride,
          head,
          expected: channels,
          actual: tensor.channels(),
        });
      }
    }

    Ok(Self {
      stride,
      cls,
      reg,
      quality,
    })
  }

  pub fn stride(&self) -> u32 {
    self.stride
  }

  pub fn grid(&self) -> (usize, usize) {
    self.cls.grid()
  }

  pub fn num_classes(&self) -> usize {
    self.cls.channels()
  }

  pub fn cls(&self) -> &Tensor {
    &self.cls
  }

  pub fn reg(&self) -> &Tensor {
    &self.reg
  }

  pub fn quality(&self) -> &Tensor {
    &self.quality
  }
}

/// 按步长索引的特征图集合，迭代顺序为步长升序
#[derive(Debug, Clone, Default)]
pub struct FeatureMaps {
  maps: BTreeMap<u32, FeatureMap>,
}

impl FeatureMaps {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, map: FeatureMap) -> Result<(), TensorError> {
    let stride = map.stride();
    if self.maps.contains_key(&stride) {
      return Err(TensorError::DuplicateStride(stride));
    }
    self.maps.insert(stride, map);
    Ok(())
  }

  pub fn with(mut self, map: FeatureMap) -> Result<Self, TensorError> {
    self.insert(map)?;
    Ok(self)
  }

  pub fn get(&self, stride: u32) -> Option<&FeatureMap> {
    self.maps.get(&stride)
  }

  pub fn iter(&self) -> impl Iterator<Item = &FeatureMap> {
    self.maps.values()
  }

  pub fn strides(&self) -> impl Iterator<Item = u32> + '_ {
    self.maps.keys().copied()
  }

  pub fn len(&self) -> usize {
    self.maps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.maps.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn layouts_address_the_same_element() {
    // 2x2 网格, 3 通道, 元素值编码为 c*100 + y*10 + x
    let mut nhwc = Vec::new();
    for y in 0..2 {
      for x in 0..2 {
        for c in 0..3 {
          nhwc.push((c * 100 + y * 10 + x) as f32);
        }
      }
    }
    let mut nchw = Vec::new();
    for c in 0..3 {
      for y in 0..2 {
        for x in 0..2 {
          nchw.push((c * 100 + y * 10 + x) as f32);
        }
      }
    }

    let a = Tensor::nhwc(nhwc, 2, 2, 3).unwrap();
    let b = Tensor::nchw(nchw, 2, 2, 3).unwrap();
    for y in 0..2 {
      for x in 0..2 {
        for c in 0..3 {
          assert_eq!(a.at(y, x, c), b.at(y, x, c));
          assert_eq!(a.at(y, x, c), (c * 100 + y * 10 + x) as f32);
        }
      }
    }
  }

  #[test]
  fn tensor_rejects_wrong_length() {
    let err = Tensor::nhwc(vec![0.0; 5], 2, 2, 1).unwrap_err();
    assert_eq!(
      err,
      TensorError::LengthMismatch {
        expected: 4,
        actual: 5
      }
    );
  }

  #[test]
  fn tensor_rejects_overflowing_shape() {
    let side = 1usize << (usize::BITS / 2);
    let err = Tensor::nhwc(Vec::new(), side, side, 1).unwrap_err();
    assert_eq!(
      err,
      TensorError::ShapeOverflow {
        height: side,
        width: side,
        channels: 1
      }
    );
  }

  #[test]
  fn feature_map_rejects_mismatched_heads() {
    let cls = Tensor::nhwc(vec![0.0; 4 * 3], 2, 2, 3).unwrap();
    let reg = Tensor::nhwc(vec![0.0; 3 * 4], 3, 1, 4).unwrap();
    let quality = Tensor::nhwc(vec![0.0; 4], 2, 2, 1).unwrap();
    let err = FeatureMap::new(8, cls.clone(), reg, quality.clone()).unwrap_err();
    assert!(matches!(err, TensorError::GridMismatch { stride: 8, .. }));

    let reg = Tensor::nhwc(vec![0.0; 4 * 2], 2, 2, 2).unwrap();
    let err = FeatureMap::new(8, cls, reg, quality).unwrap_err();
    assert_eq!(
      err,
      TensorError::ChannelMismatch {
        stride: 8,
        head: "regression",
        expected: 4,
        actual: 2
      }
    );
  }

  #[test]
  fn feature_maps_iterate_in_stride_order_and_reject_duplicates() {
    let make = |stride| {
      FeatureMap::new(
        stride,
        Tensor::nhwc(vec![0.0], 1, 1, 1).unwrap(),
        Tensor::nhwc(vec![0.0; 4], 1, 1, 4).unwrap(),
        Tensor::nhwc(vec![0.0], 1, 1, 1).unwrap(),
      )
      .unwrap()
    };

    let mut maps = FeatureMaps::new();
    maps.insert(make(32)).unwrap();
    maps.insert(make(8)).unwrap();
    maps.insert(make(16)).unwrap();
    assert_eq!(maps.strides().collect::<Vec<_>>(), vec![8, 16, 32]);
    assert_eq!(
      maps.insert(make(16)).unwrap_err(),
      TensorError::DuplicateStride(16)
    );
  }
}
