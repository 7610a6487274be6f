// 该文件是 Qianli （千里眼） 项目的一部分。
// src/model.rs - 模型
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

/// 推理协作者。模型加载与前向计算由外部实现，这里只约定输入输出。
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 轴对齐边界框，原图像素坐标
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BBox {
  pub x1: f32,
  pub y1: f32,
  pub x2: f32,
  pub y2: f32,
}

impl BBox {
  pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
    Self { x1, y1, x2, y2 }
  }

  /// 按坐标大小重排角点，保证 x1 <= x2, y1 <= y2
  pub fn normalized(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
    Self {
      x1: x1.min(x2),
      y1: y1.min(y2),
      x2: x1.max(x2),
      y2: y1.max(y2),
    }
  }

  // 退化框（x2 <= x1 或 y2 <= y1）的宽高截断为零
  pub fn width(&self) -> f32 {
    (self.x2 - self.x1).max(0.0)
  }

  pub fn height(&self) -> f32 {
    (self.y2 - self.y1).max(0.0)
  }

  pub fn area(&self) -> f32 {
    self.width() * self.height()
  }

  pub fn scale(&self, scale_w: f32, scale_h: f32) -> Self {
    Self {
      x1: self.x1 * scale_w,
      y1: self.y1 * scale_h,
      x2: self.x2 * scale_w,
      y2: self.y2 * scale_h,
    }
  }
}

/// 阈值过滤后保留的单个候选框
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub class_id: u32,
  pub score: f32,
  pub bbox: BBox,
}

/// 抑制与 Top-K 之后的最终检测集合
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSet {
  pub items: Box<[Candidate]>,
}

impl DetectionSet {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
    self.items.iter()
  }
}

impl From<Vec<Candidate>> for DetectionSet {
  fn from(items: Vec<Candidate>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

mod replay;
pub use self::replay::{ReplayModel, ReplayModelError};
