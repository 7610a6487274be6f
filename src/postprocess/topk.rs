// 该文件是 Qianli （千里眼） 项目的一部分。
// src/postprocess/topk.rs - Top-K 截断
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

use std::cmp::Ordering;

use crate::model::Candidate;

/// 保留得分最高的 `k` 个候选，不足 `k` 个时原样返回。
///
/// 使用部分选择而非全排序；同分时位置靠前者优先，
/// 保留下来的候选维持输入中的相对顺序。
pub fn select_top_k(candidates: Vec<Candidate>, k: usize) -> Vec<Candidate> {
  if candidates.len() <= k {
    return candidates;
  }
  if k == 0 {
    return Vec::new();
  }

  let by_score_desc = |&a: &usize, &b: &usize| -> Ordering {
    candidates[b]
      .score
      .total_cmp(&candidates[a].score)
      .then_with(|| a.cmp(&b))
  };

  let mut order: Vec<usize> = (0..candidates.len()).collect();
  order.select_nth_unstable_by(k - 1, by_score_desc);
  order.truncate(k);
  order.sort_unstable();

  let mut keep = vec![false; candidates.len()];
  for idx in order {
    keep[idx] = true;
  }
  candidates
    .into_iter()
    .zip(keep)
    .filter_map(|(candidate, keep)| keep.then_some(candidate))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::BBox;

  fn with_scores(scores: &[f32]) -> Vec<Candidate> {
    scores
      .iter()
      .enumerate()
      .map(|(i, &score)| Candidate {
        class_id: i as u32,
        score,
        bbox: BBox::default(),
      })
      .collect()
  }

  #[test]
  fn short_lists_pass_through() {
    let input = with_scores(&[0.6, 0.9]);
    assert_eq!(select_top_k(input.clone(), 2), input);
    assert_eq!(select_top_k(input.clone(), 1000), input);
  }

  #[test]
  fn keeps_highest_scores_in_input_order() {
    let out = select_top_k(with_scores(&[0.6, 0.9, 0.7, 0.95, 0.65]), 3);
    let ids: Vec<u32> = out.iter().map(|c| c.class_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
  }

  #[test]
  fn ties_prefer_earlier_candidates() {
    let out = select_top_k(with_scores(&[0.7, 0.7, 0.7, 0.7]), 2);
    let ids: Vec<u32> = out.iter().map(|c| c.class_id).collect();
    assert_eq!(ids, vec![0, 1]);
  }

  #[test]
  fn zero_k_yields_nothing() {
    assert!(select_top_k(with_scores(&[0.9]), 0).is_empty());
  }
}
