// 该文件是 Qianli （千里眼） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use qianli::postprocess::{PostprocessConfig, SuppressionPolicy};
use url::Url;

/// Qianli 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 推理后端，例如 replay:///path/to/dumps
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源，例如 folder:///path/to/frames
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径
  /// 支持格式:
  /// - jsonl:- 或 jsonl:///path/out.jsonl
  /// - record:///path/to/dir
  /// - dump:///path/to/dir（需要 dump_image 特性）
  #[arg(long, value_name = "OUTPUT", default_value = "jsonl:-")]
  pub output: Url,

  /// 标签文件（每行一个类别），默认使用 COCO 类别
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub score_threshold: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.6", value_name = "THRESHOLD")]
  pub iou_threshold: f32,

  /// 每帧最多保留的检测数量
  #[arg(long, default_value = "1000", value_name = "COUNT")]
  pub top_k: usize,

  /// 模型输入分辨率（正方形边长）
  #[arg(long, default_value = "512", value_name = "PIXELS")]
  pub input_size: u32,

  /// 抑制策略: nms 或 soft-nms
  #[arg(long, default_value = "nms", value_name = "POLICY")]
  pub nms: SuppressionPolicy,

  /// Soft-NMS 高斯衰减参数
  #[arg(long, default_value = "0.3", value_name = "SIGMA")]
  pub sigma: f32,

  /// 最大处理帧数（0 表示无限制）
  #[arg(long, default_value = "0", value_name = "COUNT")]
  pub max_frames: usize,
}

impl Args {
  pub fn postprocess_config(&self) -> PostprocessConfig {
    PostprocessConfig::default()
      .score_threshold(self.score_threshold)
      .iou_threshold(self.iou_threshold)
      .top_k(self.top_k)
      .input_size(self.input_size)
      .policy(self.nms)
      .soft_nms_sigma(self.sigma)
  }
}
