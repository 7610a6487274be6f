// 该文件是 Qianli （千里眼） 项目的一部分。
// src/output/json_lines.rs - JSON Lines 帧消息输出
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
  fs::File,
  io::{BufWriter, Write},
  path::Path,
  sync::Mutex,
};

use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, frame::Frame, message::FrameMessage, output::Render,
};

#[derive(Error, Debug)]
pub enum JsonLinesOutputError {
  #[error("URI scheme mismatch")]
  SchemeMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Serialize error: {0}")]
  SerializeError(#[from] serde_json::Error),
  #[error("Writer lock poisoned")]
  LockPoisoned,
}

/// 每帧写一行 JSON 帧消息。路径为 `-` 时写到标准输出。
///
/// 默认不写入图像数据，`?image=true` 时包含 JPEG 字节。
pub struct JsonLinesOutput {
  writer: Mutex<Box<dyn Write + Send>>,
  with_image: bool,
}

impl FromUrlWithScheme for JsonLinesOutput {
  const SCHEME: &'static str = "jsonl";
}

impl FromUrl for JsonLinesOutput {
  type Error = JsonLinesOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(JsonLinesOutputError::SchemeMismatch);
    }

    let with_image = url
      .query_pairs()
      .any(|(k, v)| k == "image" && (v == "true" || v == "1"));

    let path = url.path();
    let writer: Box<dyn Write + Send> = if path == "-" || path.is_empty() {
      info!("帧消息写到标准输出");
      Box::new(std::io::stdout())
    } else {
      let path = Path::new(path);
      if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
      {
        std::fs::create_dir_all(parent)?;
      }
      info!("帧消息写到文件: {}", path.display());
      Box::new(BufWriter::new(File::create(path)?))
    };

    Ok(Self::new(writer, with_image))
  }
}

impl JsonLinesOutput {
  pub fn new(writer: Box<dyn Write + Send>, with_image: bool) -> Self {
    Self {
      writer: Mutex::new(writer),
      with_image,
    }
  }
}

impl Render<Frame, FrameMessage> for JsonLinesOutput {
  type Error = JsonLinesOutputError;

  fn render_result(&self, frame: &Frame, result: &FrameMessage) -> Result<(), Self::Error> {
    let mut writer = self
      .writer
      .lock()
      .map_err(|_| JsonLinesOutputError::LockPoisoned)?;

    if self.with_image {
      serde_json::to_writer(&mut *writer, result)?;
    } else {
      serde_json::to_writer(&mut *writer, &result.without_image())?;
    }
    writeln!(writer)?;
    writer.flush()?;

    debug!("第 {} 帧消息已写出", frame.index());
    Ok(())
  }
}
