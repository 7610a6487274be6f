// 该文件是 Qianli （千里眼） 项目的一部分。
// src/postprocess/decode.rs - 距离回归解码
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

use crate::{model::BBox, tensor::Tensor};

/// 模型输入到原图的缩放系数。
///
/// 宽高各自独立缩放，不做 letterbox 补偿：模型输入是直接拉伸得到的，
/// 换成等比缩放会改变输出坐标。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor {
  pub w: f32,
  pub h: f32,
}

impl ScaleFactor {
  pub fn new(origin_width: u32, origin_height: u32, input_size: u32) -> Self {
    Self {
      w: origin_width as f32 / input_size as f32,
      h: origin_height as f32 / input_size as f32,
    }
  }

  pub fn identity() -> Self {
    Self { w: 1.0, h: 1.0 }
  }
}

/// 网格第 `y` 行、第 `x` 列单元的锚点，返回 `(水平, 垂直)` 坐标。
///
/// 张量按 行(y) × 列(x) 存储，因此水平坐标来自列号。
#[inline]
pub fn anchor_point(x: usize, y: usize, stride: u32) -> (f32, f32) {
  let s = stride as f32;
  ((x as f32 + 0.5) * s, (y as f32 + 0.5) * s)
}

/// 由锚点与 `[l, t, r, b]` 距离得到边界框。负距离会使角点交叉，这里重排以保证不反转。
#[inline]
pub fn distance_to_bbox(anchor: (f32, f32), distance: [f32; 4]) -> BBox {
  let (ax, ay) = anchor;
  let [l, t, r, b] = distance;
  BBox::normalized(ax - l, ay - t, ax + r, ay + b)
}

#[inline]
pub(crate) fn decode_cell(reg: &Tensor, y: usize, x: usize, stride: u32, scale: ScaleFactor) -> BBox {
  let distance = [reg.at(y, x, 0), reg.at(y, x, 1), reg.at(y, x, 2), reg.at(y, x, 3)];
  distance_to_bbox(anchor_point(x, y, stride), distance).scale(scale.w, scale.h)
}

/// 解码整张回归图，按行优先顺序返回原图坐标下的边界框
pub fn decode_boxes(reg: &Tensor, stride: u32, scale: ScaleFactor) -> Vec<BBox> {
  let (height, width) = reg.grid();
  let mut boxes = Vec::with_capacity(height * width);
  for y in 0..height {
    for x in 0..width {
      boxes.push(decode_cell(reg, y, x, stride, scale));
    }
  }
  boxes
}

#[cfg(test)]
mod tests {
  use super::*;

  fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
  }

  #[test]
  fn first_cell_at_stride_8() {
    let bbox = distance_to_bbox(anchor_point(0, 0, 8), [2.0, 2.0, 2.0, 2.0]);
    assert!(approx(bbox.x1, 2.0));
    assert!(approx(bbox.y1, 2.0));
    assert!(approx(bbox.x2, 6.0));
    assert!(approx(bbox.y2, 6.0));
  }

  #[test]
  fn column_drives_horizontal_coordinate() {
    // 第 0 行第 2 列
    assert_eq!(anchor_point(2, 0, 16), (40.0, 8.0));
  }

  #[test]
  fn scaling_is_anisotropic() {
    let scale = ScaleFactor::new(1920, 1080, 512);
    let reg = Tensor::nhwc(vec![4.0, 4.0, 4.0, 4.0], 1, 1, 4).unwrap();
    let boxes = decode_boxes(&reg, 8, scale);
    assert_eq!(boxes.len(), 1);
    // 锚点 (4, 4) → 框 (0, 0, 8, 8)
    assert!(approx(boxes[0].x2, 8.0 * 3.75));
    assert!(approx(boxes[0].y2, 8.0 * 2.109375));
  }

  #[test]
  fn negative_distances_never_invert() {
    let bbox = distance_to_bbox((10.0, 10.0), [-3.0, 1.0, 1.0, -4.0]);
    assert!(bbox.x1 <= bbox.x2);
    assert!(bbox.y1 <= bbox.y2);
    // 原始角点 (13, 9, 11, 6) 重排为 (11, 6, 13, 9)
    assert_eq!(bbox, BBox::new(11.0, 6.0, 13.0, 9.0));
  }

  #[test]
  fn decode_boxes_is_raster_ordered() {
    let reg = Tensor::nchw(vec![0.0; 2 * 3 * 4], 2, 3, 4).unwrap();
    let boxes = decode_boxes(&reg, 8, ScaleFactor::identity());
    let centers: Vec<(f32, f32)> = boxes.iter().map(|b| (b.x1, b.y1)).collect();
    assert_eq!(
      centers,
      vec![
        (4.0, 4.0),
        (12.0, 4.0),
        (20.0, 4.0),
        (4.0, 12.0),
        (12.0, 12.0),
        (20.0, 12.0)
      ]
    );
  }
}
