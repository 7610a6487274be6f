// 该文件是 Qianli （千里眼） 项目的一部分。
// src/bin/oneshot.rs - 单帧推理测试代码
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use qianli::{
  FromUrl,
  detector::Detector,
  input::ImageDirInput,
  label::LabelTable,
  model::ReplayModel,
  output::OutputWrapper,
  postprocess::{PostprocessConfig, Postprocessor},
  task::{OneShotTask, Task},
};
use tracing::info;

/// Qianli 单帧推理
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 推理后端
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT", default_value = "jsonl:-")]
  pub output: Url,
  /// 后处理配置，例如 fcos://?score=0.5&iou=0.6&nms=soft
  #[arg(long, value_name = "CONFIG", default_value = "fcos://")]
  pub postprocess: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt().with_writer(std::io::stderr).init();

  let args = Args::parse();

  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("后处理配置: {}", args.postprocess);

  let input = ImageDirInput::from_url(&args.input)?;
  let model = ReplayModel::from_url(&args.model)?;
  let output = OutputWrapper::from_url(&args.output)?;
  let postprocessor = Postprocessor::new(PostprocessConfig::from_url(&args.postprocess)?)?;
  let detector = Detector::new(model, postprocessor, Arc::new(LabelTable::coco()));

  OneShotTask.run_task(input, detector, output)?;

  Ok(())
}
