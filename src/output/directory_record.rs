// 该文件是 Qianli （千里眼） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::{
  path::PathBuf,
  sync::atomic::{AtomicU16, Ordering},
};

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;
use tracing::{debug, error};

use crate::{
  FromUrl, FromUrlWithScheme, frame::Frame, message::FrameMessage, output::Render,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 把每帧的检测结果写成文本记录，按 `年/月/日` 分目录保存。
///
/// 每行一个检测：`名称, 得分, x1, y1, x2, y2`。`?always` 时无检测的帧也写出空文件，
/// `?image` 时同时保存 JPEG 图像。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: AtomicU16,
  always: bool,
  save_image: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        uri.scheme()
      );
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");
    let save_image = uri.query_pairs().any(|(k, _)| k == "image");

    Ok(Self {
      directory: PathBuf::from(uri.path()),
      frame_counter: AtomicU16::new(0),
      always,
      save_image,
    })
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
      frame_counter: AtomicU16::new(0),
      always: false,
      save_image: false,
    }
  }

  pub fn always(mut self, always: bool) -> Self {
    self.always = always;
    self
  }

  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  /// 不带扩展名的记录路径
  fn frame_path(&self, timestamp: i64) -> Result<PathBuf, DirectoryRecordOutputError> {
    let time = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    let directory = self
      .directory
      .join(time.year().to_string())
      .join(format!("{:02}", time.month()))
      .join(format!("{:02}", time.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}",
      time.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

fn format_records(result: &FrameMessage) -> String {
  result
    .records()
    .map(|record| {
      format!(
        "{}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}",
        record.kind,
        record.score,
        record.top_left.x,
        record.top_left.y,
        record.bottom_right.x,
        record.bottom_right.y
      )
    })
    .collect::<Vec<_>>()
    .join("\n")
}

impl Render<Frame, FrameMessage> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &Frame, result: &FrameMessage) -> Result<(), Self::Error> {
    if !self.always && result.smart_msg.targets.is_empty() {
      return Ok(());
    }

    let path = self.frame_path(frame.timestamp())?;
    std::fs::write(path.with_extension("txt"), format_records(result))?;
    if self.save_image {
      std::fs::write(path.with_extension("jpg"), frame.jpeg())?;
    }
    debug!("记录第 {} 帧到 {}", frame.index(), path.display());

    Ok(())
  }
}
