// 该文件是 Qianli （千里眼） 项目的一部分。
// src/postprocess/encode.rs - 检测结果编码
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

use tracing::error;

use crate::{
  label::{LabelError, LabelTable},
  message::{BoxRecord, Point},
  model::DetectionSet,
};

/// 把检测集合映射为有序的输出记录。类别索引越界视为配置错误。
pub fn encode(detections: &DetectionSet, labels: &LabelTable) -> Result<Vec<BoxRecord>, LabelError> {
  detections
    .iter()
    .map(|item| -> Result<BoxRecord, LabelError> {
      let name = labels.name(item.class_id).inspect_err(|e| error!("{}", e))?;
      Ok(BoxRecord {
        kind: name.to_string(),
        score: item.score,
        top_left: Point {
          x: item.bbox.x1,
          y: item.bbox.y1,
        },
        bottom_right: Point {
          x: item.bbox.x2,
          y: item.bbox.y2,
        },
      })
    })
    .collect()
}
