// 该文件是 Qianli （千里眼） 项目的一部分。
// src/postprocess/nms.rs - 非极大值抑制
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

use super::SuppressionPolicy;
use crate::model::{BBox, Candidate};

/// 计算两个边界框的 IoU。
///
/// 面积按截断为零的宽高计算，分母不大于零时以 `f32::EPSILON` 代替，
/// 因此退化框与任何框的 IoU 都是 0，不会产生 NaN 或负值。
pub fn iou(a: &BBox, b: &BBox) -> f32 {
  let inter = BBox::new(a.x1.max(b.x1), a.y1.max(b.y1), a.x2.min(b.x2), a.y2.min(b.y2)).area();
  let union = a.area() + b.area() - inter;
  if union > 0.0 {
    inter / union
  } else {
    inter / f32::EPSILON
  }
}

// 最高分的位置，同分取靠前者
fn argmax(candidates: &[Candidate]) -> Option<usize> {
  let mut best: Option<usize> = None;
  for (idx, candidate) in candidates.iter().enumerate() {
    match best {
      Some(b) if candidates[b].score >= candidate.score => {}
      _ => best = Some(idx),
    }
  }
  best
}

fn suppress_class(
  mut remaining: Vec<Candidate>,
  policy: SuppressionPolicy,
  iou_threshold: f32,
  sigma: f32,
  kept: &mut Vec<Candidate>,
) {
  while let Some(idx) = argmax(&remaining) {
    let best = remaining.remove(idx);
    kept.push(best);

    match policy {
      SuppressionPolicy::Hard => {
        remaining.retain(|c| iou(&best.bbox, &c.bbox) <= iou_threshold);
      }
      SuppressionPolicy::Soft => {
        for c in remaining.iter_mut() {
          let overlap = iou(&best.bbox, &c.bbox);
          c.score *= (-(overlap * overlap) / sigma).exp();
        }
        remaining.retain(|c| c.score > 0.0);
      }
    }
  }
}

/// 按类别分组执行贪心抑制。
///
/// 输出按类别索引升序排列，同一类别内按保留顺序（得分降序）排列。
pub fn suppress(
  candidates: Vec<Candidate>,
  policy: SuppressionPolicy,
  iou_threshold: f32,
  sigma: f32,
) -> Vec<Candidate> {
  let mut by_class: BTreeMap<u32, Vec<Candidate>> = BTreeMap::new();
  for candidate in candidates {
    by_class.entry(candidate.class_id).or_default().push(candidate);
  }

  let mut kept = Vec::new();
  for (_, class_candidates) in by_class {
    suppress_class(class_candidates, policy, iou_threshold, sigma, &mut kept);
  }
  kept
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cand(class_id: u32, score: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> Candidate {
    Candidate {
      class_id,
      score,
      bbox: BBox::new(x1, y1, x2, y2),
    }
  }

  #[test]
  fn iou_of_known_boxes() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BBox::new(5.0, 0.0, 15.0, 10.0);
    assert!((iou(&a, &b) - 50.0 / 150.0).abs() < 1e-6);
    assert_eq!(iou(&a, &a), 1.0);
    assert_eq!(iou(&a, &BBox::new(20.0, 20.0, 30.0, 30.0)), 0.0);
  }

  #[test]
  fn iou_of_degenerate_boxes_is_zero() {
    let point = BBox::new(3.0, 3.0, 3.0, 3.0);
    let inverted = BBox::new(10.0, 10.0, 0.0, 0.0);
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    assert_eq!(iou(&point, &point), 0.0);
    assert_eq!(iou(&inverted, &a), 0.0);
    assert_eq!(iou(&inverted, &inverted), 0.0);
  }

  #[test]
  fn hard_nms_removes_heavy_overlap_only() {
    let out = suppress(
      vec![
        cand(0, 0.7, 0.0, 0.0, 10.0, 10.0),
        cand(0, 0.9, 1.0, 0.0, 11.0, 10.0),
        cand(0, 0.8, 5.0, 0.0, 15.0, 10.0),
      ],
      SuppressionPolicy::Hard,
      0.6,
      0.3,
    );
    // 0.7 与 0.9 的 IoU 为 9/11，被移除；0.8 与 0.9 的 IoU 为 6/14，保留
    let scores: Vec<f32> = out.iter().map(|c| c.score).collect();
    assert_eq!(scores, vec![0.9, 0.8]);
  }

  #[test]
  fn classes_are_independent_and_class_major() {
    let out = suppress(
      vec![
        cand(3, 0.9, 0.0, 0.0, 10.0, 10.0),
        cand(1, 0.8, 0.0, 0.0, 10.0, 10.0),
        cand(1, 0.95, 20.0, 20.0, 30.0, 30.0),
      ],
      SuppressionPolicy::Hard,
      0.6,
      0.3,
    );
    let keys: Vec<(u32, f32)> = out.iter().map(|c| (c.class_id, c.score)).collect();
    assert_eq!(keys, vec![(1, 0.95), (1, 0.8), (3, 0.9)]);
  }

  #[test]
  fn equal_scores_keep_the_earlier_candidate() {
    let out = suppress(
      vec![
        cand(0, 0.8, 0.0, 0.0, 10.0, 10.0),
        cand(0, 0.8, 0.5, 0.0, 10.5, 10.0),
      ],
      SuppressionPolicy::Hard,
      0.6,
      0.3,
    );
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].bbox.x1, 0.0);
  }

  #[test]
  fn soft_nms_decays_instead_of_removing() {
    let out = suppress(
      vec![
        cand(0, 0.9, 0.0, 0.0, 10.0, 10.0),
        cand(0, 0.8, 1.0, 0.0, 11.0, 10.0),
        cand(0, 0.8, 5.0, 0.0, 15.0, 10.0),
        cand(0, 0.8, 50.0, 50.0, 60.0, 60.0),
      ],
      SuppressionPolicy::Soft,
      0.6,
      0.3,
    );
    assert_eq!(out.len(), 4);
    assert_eq!(out[0].score, 0.9);

    let score_of = |x1: f32| out.iter().find(|c| c.bbox.x1 == x1).unwrap().score;
    // 不重叠的框得分不变
    assert_eq!(score_of(50.0), 0.8);
    // 重叠越大衰减越多
    assert!(score_of(1.0) < score_of(5.0));
    assert!(score_of(5.0) < 0.8);
  }
}
