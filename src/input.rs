// 该文件是 Qianli （千里眼） 项目的一部分。
// src/input.rs - 图像目录输入
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
  io::Cursor,
  path::{Path, PathBuf},
};

use image::{DynamicImage, ImageFormat, ImageReader};
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

#[derive(Error, Debug)]
pub enum ImageDirInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("No image found in {0}")]
  NoImage(String),
}

fn is_image(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    .unwrap_or(false)
}

fn is_jpeg(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "jpg" | "jpeg"))
    .unwrap_or(false)
}

/// 读取图像文件，返回 `(宽, 高, JPEG 数据)`；JPEG 文件原样使用，其他格式重新编码
pub fn load_jpeg(path: &Path) -> Result<(u32, u32, Vec<u8>), ImageDirInputError> {
  if is_jpeg(path) {
    let data = std::fs::read(path)?;
    let (width, height) = ImageReader::new(Cursor::new(&data))
      .with_guessed_format()?
      .into_dimensions()?;
    return Ok((width, height, data));
  }

  let image = ImageReader::open(path)?.decode()?;
  let (width, height) = (image.width(), image.height());
  let mut data = Vec::new();
  DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut Cursor::new(&mut data), ImageFormat::Jpeg)?;
  Ok((width, height, data))
}

/// 按文件名顺序逐帧读取目录中的图像；路径也可以直接指向单个图像文件
pub struct ImageDirInput {
  files: std::vec::IntoIter<PathBuf>,
  index: u64,
}

impl FromUrlWithScheme for ImageDirInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for ImageDirInput {
  type Error = ImageDirInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageDirInputError::SchemaMismatch);
    }

    Self::open(url.path())
  }
}

impl ImageDirInput {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ImageDirInputError> {
    let path = path.as_ref();
    let mut files = if path.is_file() {
      vec![path.to_path_buf()]
    } else {
      std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_image(p))
        .collect::<Vec<_>>()
    };
    files.sort();

    if files.is_empty() {
      return Err(ImageDirInputError::NoImage(path.display().to_string()));
    }

    info!("输入源 {} 共 {} 帧", path.display(), files.len());
    Ok(Self {
      files: files.into_iter(),
      index: 0,
    })
  }
}

impl Iterator for ImageDirInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    for path in self.files.by_ref() {
      let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

      match load_jpeg(&path) {
        Ok((width, height, jpeg)) => {
          let frame = Frame::new(self.index, name, width, height, jpeg);
          self.index += 1;
          return Some(frame);
        }
        Err(e) => warn!("跳过无法读取的图像 {}: {}", path.display(), e),
      }
    }
    None
  }
}
