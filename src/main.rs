// 该文件是 Qianli （千里眼） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use qianli::{
  FromUrl,
  detector::Detector,
  input::ImageDirInput,
  label::LabelTable,
  model::ReplayModel,
  output::OutputWrapper,
  postprocess::Postprocessor,
  task::{ContinuousTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt().with_writer(std::io::stderr).init();

  let args = args::Args::parse();

  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let config = args.postprocess_config();
  info!(
    "置信度阈值: {}, NMS 阈值: {}, Top-K: {}, 输入分辨率: {}, 抑制策略: {}",
    config.score_threshold, config.iou_threshold, config.top_k, config.input_size, config.policy
  );
  let postprocessor = Postprocessor::new(config).context("后处理配置无效")?;

  let labels = match &args.labels {
    Some(path) => LabelTable::from_file(path)
      .with_context(|| format!("无法加载标签文件: {}", path.display()))?,
    None => LabelTable::coco(),
  };
  info!("类别数量: {}", labels.len());

  let input = ImageDirInput::from_url(&args.input)?;
  let model = ReplayModel::from_url(&args.model)?;
  let output = OutputWrapper::from_url(&args.output)?;
  let detector = Detector::new(model, postprocessor, Arc::new(labels));

  let frame_number = (args.max_frames > 0).then_some(args.max_frames);
  let frames = ContinuousTask::default()
    .with_frame_number(frame_number)
    .with_interrupt(true)
    .run_task(input, detector, output)?;

  info!("处理完成, 总帧数: {}", frames);
  Ok(())
}
