// 该文件是 Qianli （千里眼） 项目的一部分。
// src/detector.rs - 目标检测器
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

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::{
  frame::Frame,
  label::LabelTable,
  message::FrameMessage,
  model::Model,
  postprocess::{PostprocessError, Postprocessor},
  tensor::FeatureMaps,
};

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("推理失败: {0}")]
  InferenceError(Box<dyn std::error::Error + Send + Sync>),
  #[error("后处理失败: {0}")]
  PostprocessError(#[from] PostprocessError),
}

/// 把推理协作者与后处理流水线绑定在一起。
///
/// 检测器本身不保存跨帧状态，可以在多个线程间共享，
/// 对不同视频流的帧并行调用 [`Model::infer`]。
pub struct Detector<M> {
  model: M,
  postprocessor: Postprocessor,
  labels: Arc<LabelTable>,
}

impl<M> Detector<M> {
  pub fn new(model: M, postprocessor: Postprocessor, labels: Arc<LabelTable>) -> Self {
    Self {
      model,
      postprocessor,
      labels,
    }
  }

  pub fn postprocessor(&self) -> &Postprocessor {
    &self.postprocessor
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }
}

impl<M, E> Model for Detector<M>
where
  M: Model<Input = Frame, Output = FeatureMaps, Error = E>,
  E: std::error::Error + Send + Sync + 'static,
{
  type Input = Frame;
  type Output = FrameMessage;
  type Error = DetectorError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("执行模型推理");
    let maps = self
      .model
      .infer(input)
      .map_err(|e| DetectorError::InferenceError(Box::new(e)))?;

    debug!("后处理模型输出");
    let records = self.postprocessor.process(
      &maps,
      (input.width(), input.height()),
      &self.labels,
    )?;
    debug!("检测到 {} 个物体", records.len());

    Ok(FrameMessage::new(input, records))
  }
}
