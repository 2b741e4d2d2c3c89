// 该文件是 Xunwu（寻物）项目的一部分。
// src/model/replay.rs - 检测结果回放
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Xunwu contributors

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{DetectResult, Detection, Model},
  url_file_path, url_query_f32,
};

/// 从 JSON 文件读取预先计算好的检测结果，对任意图像都返回同一组结果
///
/// 文件内容为 `Detection` 数组：
/// `[{"label": "cup", "score": 0.91, "bbox": [10, 20, 110, 140]}]`
#[derive(Debug, Clone)]
pub struct ReplayDetector {
  detections: Vec<Detection>,
}

#[derive(Error, Debug)]
pub enum ReplayError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

impl FromUrlWithScheme for ReplayDetector {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayDetector {
  type Error = ReplayError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayError::SchemeMismatch);
    }

    let path = url_file_path(url);
    info!("加载回放检测结果: {}", path);
    let content = std::fs::read_to_string(&path)?;
    let detector = Self::from_json(&content)?;

    Ok(match url_query_f32(url, "confidence") {
      Some(threshold) => detector.with_confidence(threshold),
      None => detector,
    })
  }
}

impl ReplayDetector {
  pub fn new(detections: Vec<Detection>) -> Self {
    Self { detections }
  }

  pub fn from_json(content: &str) -> Result<Self, ReplayError> {
    let detections: Vec<Detection> = serde_json::from_str(content)?;
    debug!("回放检测结果数量: {}", detections.len());
    Ok(Self::new(detections))
  }

  /// 丢弃置信度低于阈值的结果
  pub fn with_confidence(mut self, threshold: f32) -> Self {
    self.detections.retain(|d| d.score >= threshold);
    self
  }
}

impl Model for ReplayDetector {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = ReplayError;

  fn infer(&mut self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
    Ok(DetectResult::from(self.detections.clone()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const JSON: &str = r#"[
    {"label": "cup", "score": 0.91, "bbox": [10, 20, 110, 140]},
    {"label": "wine bottle", "score": 0.3, "bbox": [0, 0, 5, 5]}
  ]"#;

  #[test]
  fn replays_the_same_detections() {
    let mut detector = ReplayDetector::from_json(JSON).unwrap();
    let image = RgbImage::new(4, 4);
    let first = detector.infer(&image).unwrap();
    let second = detector.infer(&image).unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert_eq!(first.items[0].bbox, [10.0, 20.0, 110.0, 140.0]);
  }

  #[test]
  fn confidence_filter_drops_weak_results() {
    let mut detector = ReplayDetector::from_json(JSON).unwrap().with_confidence(0.5);
    let result = detector.infer(&RgbImage::new(1, 1)).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.items[0].label, "cup");
  }

  #[test]
  fn malformed_json_is_an_error() {
    assert!(matches!(
      ReplayDetector::from_json("{not json"),
      Err(ReplayError::JsonError(_))
    ));
  }

  #[test]
  fn loads_from_url_with_query() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("detections.json");
    std::fs::write(&path, JSON).unwrap();

    let mut url = Url::from_file_path(&path).unwrap();
    url.set_query(Some("confidence=0.5"));
    let url = Url::parse(&url.as_str().replacen("file:", "replay:", 1)).unwrap();

    let mut detector = ReplayDetector::from_url(&url).unwrap();
    assert_eq!(detector.infer(&RgbImage::new(1, 1)).unwrap().len(), 1);
  }
}
