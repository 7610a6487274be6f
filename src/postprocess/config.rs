// 该文件是 Qianli （千里眼） 项目的一部分。
// src/postprocess/config.rs - 后处理配置
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

use std::{fmt, str::FromStr};

use thiserror::Error;
use tracing::{error, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;
const DEFAULT_IOU_THRESHOLD: f32 = 0.6;
const DEFAULT_TOP_K: usize = 1000;
const DEFAULT_INPUT_SIZE: u32 = 512;
const DEFAULT_SOFT_NMS_SIGMA: f32 = 0.3;
const DEFAULT_STRIDES: [u32; 5] = [8, 16, 32, 64, 128];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("参数 {key} 的取值无效: {value}")]
  InvalidValue { key: String, value: String },
  #[error("{0} 必须位于 [0, 1] 区间内")]
  ThresholdOutOfRange(&'static str),
  #[error("输入分辨率必须大于零")]
  ZeroInputSize,
  #[error("Soft-NMS 的 sigma 必须大于零")]
  NonPositiveSigma,
  #[error("步长集合必须非空、非零且严格递增: {0:?}")]
  InvalidStrides(Vec<u32>),
  #[error("未知的抑制策略: {0}")]
  UnknownPolicy(String),
}

/// 重叠框的抑制策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuppressionPolicy {
  /// 与保留框 IoU 超过阈值的候选直接删除
  #[default]
  Hard,
  /// 按 `exp(-iou² / sigma)` 衰减候选的得分
  Soft,
}

impl FromStr for SuppressionPolicy {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "nms" | "hard" | "hard-nms" => Ok(SuppressionPolicy::Hard),
      "soft" | "soft-nms" => Ok(SuppressionPolicy::Soft),
      other => Err(ConfigError::UnknownPolicy(other.to_string())),
    }
  }
}

impl fmt::Display for SuppressionPolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SuppressionPolicy::Hard => write!(f, "nms"),
      SuppressionPolicy::Soft => write!(f, "soft-nms"),
    }
  }
}

/// 后处理可调参数，宿主程序在启动时构造
#[derive(Debug, Clone, PartialEq)]
pub struct PostprocessConfig {
  /// 最大融合得分必须严格大于该值才保留
  pub score_threshold: f32,
  /// IoU 严格大于该值的同类候选被抑制
  pub iou_threshold: f32,
  pub top_k: usize,
  /// 模型的正方形输入边长
  pub input_size: u32,
  pub policy: SuppressionPolicy,
  pub soft_nms_sigma: f32,
  /// 检测头步长，严格递增
  pub strides: Vec<u32>,
}

impl Default for PostprocessConfig {
  fn default() -> Self {
    Self {
      score_threshold: DEFAULT_SCORE_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      top_k: DEFAULT_TOP_K,
      input_size: DEFAULT_INPUT_SIZE,
      policy: SuppressionPolicy::default(),
      soft_nms_sigma: DEFAULT_SOFT_NMS_SIGMA,
      strides: DEFAULT_STRIDES.to_vec(),
    }
  }
}

impl PostprocessConfig {
  pub fn score_threshold(mut self, threshold: f32) -> Self {
    self.score_threshold = threshold;
    self
  }

  pub fn iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }

  pub fn top_k(mut self, top_k: usize) -> Self {
    self.top_k = top_k;
    self
  }

  pub fn input_size(mut self, input_size: u32) -> Self {
    self.input_size = input_size;
    self
  }

  pub fn policy(mut self, policy: SuppressionPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn soft_nms_sigma(mut self, sigma: f32) -> Self {
    self.soft_nms_sigma = sigma;
    self
  }

  pub fn strides(mut self, strides: Vec<u32>) -> Self {
    self.strides = strides;
    self
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&self.score_threshold) {
      return Err(ConfigError::ThresholdOutOfRange("score_threshold"));
    }
    if !(0.0..=1.0).contains(&self.iou_threshold) {
      return Err(ConfigError::ThresholdOutOfRange("iou_threshold"));
    }
    if self.input_size == 0 {
      return Err(ConfigError::ZeroInputSize);
    }
    // NaN 也会在这里被拒绝
    if !(self.soft_nms_sigma > 0.0) {
      return Err(ConfigError::NonPositiveSigma);
    }
    let ascending = self.strides.windows(2).all(|w| w[0] < w[1]);
    if self.strides.is_empty() || self.strides.contains(&0) || !ascending {
      return Err(ConfigError::InvalidStrides(self.strides.clone()));
    }
    Ok(())
  }

  /// 步长对应的特征图网格边长
  pub fn grid_size(&self, stride: u32) -> usize {
    self.input_size.div_ceil(stride) as usize
  }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
  value.parse().map_err(|_| ConfigError::InvalidValue {
    key: key.to_string(),
    value: value.to_string(),
  })
}

impl FromUrlWithScheme for PostprocessConfig {
  const SCHEME: &'static str = "fcos";
}

/// 例如 `fcos://?score=0.5&iou=0.6&topk=1000&input=512&nms=soft&sigma=0.3&strides=8,16,32`
impl FromUrl for PostprocessConfig {
  type Error = ConfigError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ConfigError::SchemeMismatch);
    }

    let mut config = PostprocessConfig::default();
    for (key, value) in url.query_pairs() {
      match &*key {
        "score" => config.score_threshold = parse_value(&key, &value)?,
        "iou" => config.iou_threshold = parse_value(&key, &value)?,
        "topk" => config.top_k = parse_value(&key, &value)?,
        "input" => config.input_size = parse_value(&key, &value)?,
        "nms" => config.policy = value.parse()?,
        "sigma" => config.soft_nms_sigma = parse_value(&key, &value)?,
        "strides" => {
          config.strides = value
            .split(',')
            .map(|s| parse_value(&key, s.trim()))
            .collect::<Result<_, _>>()?
        }
        other => warn!("忽略未知的后处理参数: {}", other),
      }
    }

    config.validate()?;
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_reference_values() {
    let config = PostprocessConfig::default();
    assert_eq!(config.score_threshold, 0.5);
    assert_eq!(config.iou_threshold, 0.6);
    assert_eq!(config.top_k, 1000);
    assert_eq!(config.input_size, 512);
    assert_eq!(config.policy, SuppressionPolicy::Hard);
    assert_eq!(config.strides, vec![8, 16, 32, 64, 128]);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn parses_from_url() {
    let url = Url::parse("fcos://?score=0.3&iou=0.45&topk=10&input=640&nms=soft&sigma=0.5").unwrap();
    let config = PostprocessConfig::from_url(&url).unwrap();
    assert_eq!(config.score_threshold, 0.3);
    assert_eq!(config.iou_threshold, 0.45);
    assert_eq!(config.top_k, 10);
    assert_eq!(config.input_size, 640);
    assert_eq!(config.policy, SuppressionPolicy::Soft);
    assert_eq!(config.soft_nms_sigma, 0.5);
  }

  #[test]
  fn rejects_bad_urls() {
    let url = Url::parse("yolo://?score=0.3").unwrap();
    assert_eq!(
      PostprocessConfig::from_url(&url).unwrap_err(),
      ConfigError::SchemeMismatch
    );

    let url = Url::parse("fcos://?score=abc").unwrap();
    assert!(matches!(
      PostprocessConfig::from_url(&url),
      Err(ConfigError::InvalidValue { .. })
    ));

    let url = Url::parse("fcos://?iou=1.5").unwrap();
    assert_eq!(
      PostprocessConfig::from_url(&url).unwrap_err(),
      ConfigError::ThresholdOutOfRange("iou_threshold")
    );

    let url = Url::parse("fcos://?strides=16,8").unwrap();
    assert!(matches!(
      PostprocessConfig::from_url(&url),
      Err(ConfigError::InvalidStrides(_))
    ));
  }

  #[test]
  fn policy_round_trips_through_strings() {
    assert_eq!("soft-nms".parse::<SuppressionPolicy>().unwrap(), SuppressionPolicy::Soft);
    assert_eq!("NMS".parse::<SuppressionPolicy>().unwrap(), SuppressionPolicy::Hard);
    assert!("greedy".parse::<SuppressionPolicy>().is_err());
    assert_eq!(SuppressionPolicy::Soft.to_string(), "soft-nms");
  }

  #[test]
  fn grid_size_rounds_up() {
    let config = PostprocessConfig::default();
    assert_eq!(config.grid_size(8), 64);
    assert_eq!(config.grid_size(128), 4);
    assert_eq!(config.clone().input_size(500).grid_size(128), 4);
  }
}
