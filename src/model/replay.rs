// 该文件是 Qianli （千里眼） 项目的一部分。
// src/model/replay.rs - 检测头输出回放
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

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  model::Model,
  tensor::{FeatureMap, FeatureMaps, Layout, Tensor, TensorError},
};

#[derive(Error, Debug)]
pub enum ReplayModelError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("回放文件解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("回放张量无效: {0}")]
  TensorError(#[from] TensorError),
}

#[derive(Deserialize, Debug)]
struct TensorDump {
  /// `[height, width, channels]`，与布局无关
  shape: [usize; 3],
  data: Vec<f32>,
}

#[derive(Deserialize, Debug)]
struct HeadDump {
  stride: u32,
  #[serde(default)]
  layout: Layout,
  cls: TensorDump,
  reg: TensorDump,
  quality: TensorDump,
}

#[derive(Deserialize, Debug)]
struct OutputDump {
  heads: Vec<HeadDump>,
}

impl TensorDump {
  fn into_tensor(self, layout: Layout) -> Result<Tensor, TensorError> {
    let [height, width, channels] = self.shape;
    Tensor::new(self.data, height, width, channels, layout)
  }
}

/// 从目录中回放事先记录的检测头输出，替代真实的推理后端。
///
/// 帧 `name` 对应的输出保存在 `<directory>/<name>.json` 中：
///
/// ```json
/// { "heads": [ { "stride": 8, "layout": "nhwc",
///                "cls": { "shape": [64, 64, 80], "data": [...] },
///                "reg": { "shape": [64, 64, 4], "data": [...] },
///                "quality": { "shape": [64, 64, 1], "data": [...] } } ] }
/// ```
#[derive(Debug, Clone)]
pub struct ReplayModel {
  directory: PathBuf,
}

impl FromUrlWithScheme for ReplayModel {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayModel {
  type Error = ReplayModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ReplayModelError::SchemeMismatch);
    }

    let directory = PathBuf::from(url.path());
    if !directory.is_dir() {
      return Err(ReplayModelError::ModelPathError(format!(
        "回放目录不存在: {}",
        directory.display()
      )));
    }

    info!("使用回放目录: {}", directory.display());
    Ok(Self::new(directory))
  }
}

impl ReplayModel {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
    }
  }

  pub fn load(&self, name: &str) -> Result<FeatureMaps, ReplayModelError> {
    let path = self.directory.join(format!("{}.json", name));
    debug!("读取回放文件: {}", path.display());
    let content = std::fs::read_to_string(&path)?;
    let dump: OutputDump = serde_json::from_str(&content)?;

    let mut maps = FeatureMaps::new();
    for head in dump.heads {
      let layout = head.layout;
      let map = FeatureMap::new(
        head.stride,
        head.cls.into_tensor(layout)?,
        head.reg.into_tensor(layout)?,
        head.quality.into_tensor(layout)?,
      )?;
      maps.insert(map)?;
    }
    debug!("回放检测头数量: {}", maps.len());

    Ok(maps)
  }
}

impl Model for ReplayModel {
  type Input = Frame;
  type Output = FeatureMaps;
  type Error = ReplayModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.load(input.name())
  }
}
