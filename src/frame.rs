// 该文件是 Qianli （千里眼） 项目的一部分。
// src/frame.rs - 帧定义
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

use chrono::Utc;

/// 一帧已采集并压缩的图像
#[derive(Debug, Clone)]
pub struct Frame {
  index: u64,
  name: String,
  width: u32,
  height: u32,
  timestamp: i64,
  jpeg: Box<[u8]>,
}

impl Frame {
  /// 以当前时间作为采集时间戳创建帧
  pub fn new(index: u64, name: impl Into<String>, width: u32, height: u32, jpeg: Vec<u8>) -> Self {
    Self {
      index,
      name: name.into(),
      width,
      height,
      timestamp: Utc::now().timestamp(),
      jpeg: jpeg.into_boxed_slice(),
    }
  }

  pub fn with_timestamp(mut self, timestamp: i64) -> Self {
    self.timestamp = timestamp;
    self
  }

  pub fn index(&self) -> u64 {
    self.index
  }

  /// 帧名称，通常为源文件名去掉扩展名
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  /// 采集时间戳（Unix 秒）
  pub fn timestamp(&self) -> i64 {
    self.timestamp
  }

  pub fn jpeg(&self) -> &[u8] {
    &self.jpeg
  }
}
