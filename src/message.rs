// 该文件是 Qianli （千里眼） 项目的一部分。
// src/message.rs - 推送给客户端的帧消息
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

//! 帧消息的字段顺序与客户端 schema 一致；具体的字节编码由传输层负责。
//! 坐标均为原图像素坐标，不做归一化。

use serde::Serialize;

use crate::frame::Frame;

pub const IMAGE_KIND_JPEG: &str = "JPEG";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
  pub x: f32,
  pub y: f32,
}

/// 单个检测框记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxRecord {
  #[serde(rename = "type")]
  pub kind: String,
  pub score: f32,
  pub top_left: Point,
  pub bottom_right: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
  #[serde(rename = "type")]
  pub kind: String,
  pub boxes: Vec<BoxRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImagePayload {
  pub height: u32,
  pub width: u32,
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub buf: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmartMessage {
  pub timestamp: i64,
  pub targets: Vec<Target>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameMessage {
  pub img: ImagePayload,
  pub smart_msg: SmartMessage,
}

impl FrameMessage {
  /// 每个检测记录单独成为一个目标，顺序与检测集合一致
  pub fn new(frame: &Frame, records: Vec<BoxRecord>) -> Self {
    let targets = records
      .into_iter()
      .map(|record| Target {
        kind: record.kind.clone(),
        boxes: vec![record],
      })
      .collect();

    Self {
      img: ImagePayload {
        height: frame.height(),
        width: frame.width(),
        kind: IMAGE_KIND_JPEG.to_string(),
        buf: frame.jpeg().to_vec(),
      },
      smart_msg: SmartMessage {
        timestamp: frame.timestamp(),
        targets,
      },
    }
  }

  /// 去掉图像数据，只保留检测结果
  pub fn without_image(&self) -> Self {
    Self {
      img: ImagePayload {
        height: self.img.height,
        width: self.img.width,
        kind: self.img.kind.clone(),
        buf: Vec::new(),
      },
      smart_msg: self.smart_msg.clone(),
    }
  }

  pub fn records(&self) -> impl Iterator<Item = &BoxRecord> {
    self.smart_msg.targets.iter().flat_map(|t| t.boxes.iter())
  }
}
