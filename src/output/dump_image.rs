// 该文件是 Qianli （千里眼） 项目的一部分。
// src/output/dump_image.rs - 检测框绘制转储
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

use std::path::PathBuf;

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use thiserror::Error;
use tracing::{error, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  message::{BoxRecord, FrameMessage},
  output::Render,
};

const BOX_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const BOX_THICKNESS: i32 = 2;

#[derive(Error, Debug)]
pub enum DumpImageOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 把检测框画在原图上，保存为 `<目录>/<帧名>.png`
pub struct DumpImageOutput {
  directory: PathBuf,
  color: [u8; 3],
}

impl FromUrlWithScheme for DumpImageOutput {
  const SCHEME: &'static str = "dump";
}

impl FromUrl for DumpImageOutput {
  type Error = DumpImageOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        uri.scheme()
      );
      return Err(DumpImageOutputError::SchemeMismatch);
    }

    let directory = PathBuf::from(uri.path());
    std::fs::create_dir_all(&directory)?;

    Ok(Self {
      directory,
      color: BOX_COLOR,
    })
  }
}

impl DumpImageOutput {
  // 框在图像外的部分被裁掉，完全不可见的框跳过
  fn draw_box(&self, image: &mut RgbImage, record: &BoxRecord) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let x_min = (record.top_left.x.floor() as i32).clamp(0, w - 1);
    let y_min = (record.top_left.y.floor() as i32).clamp(0, h - 1);
    let x_max = (record.bottom_right.x.ceil() as i32).clamp(0, w - 1);
    let y_max = (record.bottom_right.y.ceil() as i32).clamp(0, h - 1);

    for t in 0..BOX_THICKNESS {
      let width = x_max - x_min - 2 * t;
      let height = y_max - y_min - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, Rgb(self.color));
    }
  }
}

impl Render<Frame, FrameMessage> for DumpImageOutput {
  type Error = DumpImageOutputError;

  fn render_result(&self, frame: &Frame, result: &FrameMessage) -> Result<(), Self::Error> {
    let mut image = image::load_from_memory(frame.jpeg())?.to_rgb8();
    if image.width() == 0 || image.height() == 0 {
      warn!("第 {} 帧图像为空, 跳过绘制", frame.index());
      return Ok(());
    }

    for record in result.records() {
      self.draw_box(&mut image, record);
    }

    let path = self.directory.join(format!("{}.png", frame.name()));
    image.save(&path)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use image::{DynamicImage, ImageFormat};

  use super::*;
  use crate::message::Point;

  #[test]
  fn draws_boxes_onto_frame() {
    let dir = tempfile::tempdir().unwrap();
    let mut jpeg = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([255, 255, 255])))
      .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
      .unwrap();
    let frame = Frame::new(0, "boxed", 40, 30, jpeg);
    let record = BoxRecord {
      kind: "cat".to_string(),
      score: 0.9,
      top_left: Point { x: 5.0, y: 5.0 },
      bottom_right: Point { x: 60.0, y: 20.0 },
    };

    let output = DumpImageOutput {
      directory: dir.path().to_path_buf(),
      color: BOX_COLOR,
    };
    output
      .render_result(&frame, &FrameMessage::new(&frame, vec![record]))
      .unwrap();

    let saved = image::open(dir.path().join("boxed.png")).unwrap().to_rgb8();
    assert_eq!(saved.dimensions(), (40, 30));
    // 左边框为蓝色，框内保持原样
    let edge = saved.get_pixel(5, 12);
    assert!(edge[2] > 200 && edge[0] < 60);
    let inside = saved.get_pixel(20, 12);
    assert!(inside[0] > 200);
  }
}
