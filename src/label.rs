// 该文件是 Qianli （千里眼） 项目的一部分。
// src/label.rs - 类别标签表
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

use std::path::Path;

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("类别索引 {index} 超出标签表范围 (共 {len} 个类别)")]
  OutOfRange { index: u32, len: usize },
  #[error("标签表为空")]
  Empty,
  #[error("读取标签文件失败: {0}")]
  IoError(#[from] std::io::Error),
}

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

/// 类别索引到名称的只读映射，启动时构建，之后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
  names: Box<[String]>,
}

impl LabelTable {
  pub fn new<I, S>(names: I) -> Result<Self, LabelError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let names: Box<[String]> = names.into_iter().map(Into::into).collect();
    if names.is_empty() {
      return Err(LabelError::Empty);
    }
    Ok(Self { names })
  }

  pub fn coco() -> Self {
    Self {
      names: COCO_CLASSES.iter().map(|name| name.to_string()).collect(),
    }
  }

  /// 从文本文件加载标签表，每行一个类别名称，空行忽略
  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LabelError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let table = Self::new(
      content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty()),
    )?;
    debug!(
      "从 {} 加载 {} 个类别",
      path.as_ref().display(),
      table.len()
    );
    Ok(table)
  }

  pub fn name(&self, index: u32) -> Result<&str, LabelError> {
    self
      .names
      .get(index as usize)
      .map(String::as_str)
      .ok_or(LabelError::OutOfRange {
        index,
        len: self.names.len(),
      })
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}

impl Default for LabelTable {
  fn default() -> Self {
    Self::coco()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn coco_table_resolves_names() {
    let table = LabelTable::coco();
    assert_eq!(table.len(), 80);
    assert_eq!(table.name(0).unwrap(), "person");
    assert_eq!(table.name(79).unwrap(), "toothbrush");
    assert!(matches!(
      table.name(80),
      Err(LabelError::OutOfRange { index: 80, len: 80 })
    ));
  }

  #[test]
  fn empty_table_is_rejected() {
    assert!(matches!(
      LabelTable::new(Vec::<String>::new()),
      Err(LabelError::Empty)
    ));
  }

  #[test]
  fn label_file_skips_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.txt");
    std::fs::write(&path, "cat\n\n  dog \n").unwrap();
    let table = LabelTable::from_file(&path).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.name(1).unwrap(), "dog");
  }
}
