// 该文件是 Xunwu（寻物）项目的一部分。
// src/model.rs - 检测模型
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
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::FromUrl;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 单个检测结果，`bbox` 为像素坐标 [x_min, y_min, x_max, y_max]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub label: String,
  pub score: f32,
  pub bbox: [f32; 4],
}

impl Detection {
  pub fn area(&self) -> f32 {
    let [x_min, y_min, x_max, y_max] = self.bbox;
    (x_max - x_min).max(0.0) * (y_max - y_min).max(0.0)
  }

  pub fn iou(&self, other: &Detection) -> f32 {
    let x_min = self.bbox[0].max(other.bbox[0]);
    let y_min = self.bbox[1].max(other.bbox[1]);
    let x_max = self.bbox[2].min(other.bbox[2]);
    let y_max = self.bbox[3].min(other.bbox[3]);

    let intersection = (x_max - x_min).max(0.0) * (y_max - y_min).max(0.0);
    let union = self.area() + other.area() - intersection;
    if union <= 0.0 {
      0.0
    } else {
      intersection / union
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[Detection]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
    self.items.iter()
  }
}

impl From<Vec<Detection>> for DetectResult {
  fn from(items: Vec<Detection>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

pub mod labels;

#[cfg(feature = "model_onnx")]
mod yolov8;
#[cfg(feature = "model_onnx")]
pub use self::yolov8::{Yolov8, Yolov8Builder, Yolov8Error};

#[cfg(feature = "model_replay")]
mod replay;
#[cfg(feature = "model_replay")]
pub use self::replay::{ReplayDetector, ReplayError};

#[derive(Error, Debug)]
pub enum ModelError {
  #[cfg(feature = "model_onnx")]
  #[error("YOLOv8 模型错误: {0}")]
  Yolov8Error(#[from] Yolov8Error),
  #[cfg(feature = "model_replay")]
  #[error("回放检测错误: {0}")]
  ReplayError(#[from] ReplayError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum ModelWrapper {
  #[cfg(feature = "model_onnx")]
  Yolov8(Box<Yolov8>),
  #[cfg(feature = "model_replay")]
  Replay(ReplayDetector),
}

impl FromUrl for ModelWrapper {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "model_onnx")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == Yolov8Builder::SCHEME {
        let model = Yolov8Builder::from_url(url)?.build()?;
        return Ok(ModelWrapper::Yolov8(Box::new(model)));
      }
    }
    #[cfg(feature = "model_replay")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ReplayDetector::SCHEME {
        let model = ReplayDetector::from_url(url)?;
        return Ok(ModelWrapper::Replay(model));
      }
    }
    Err(ModelError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl Model for ModelWrapper {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = ModelError;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    match self {
      #[cfg(feature = "model_onnx")]
      ModelWrapper::Yolov8(model) => model.infer(input).map_err(ModelError::from),
      #[cfg(feature = "model_replay")]
      ModelWrapper::Replay(model) => model.infer(input).map_err(ModelError::from),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn detection(bbox: [f32; 4]) -> Detection {
    Detection {
      label: "cup".to_string(),
      score: 0.9,
      bbox,
    }
  }

  #[test]
  fn iou_of_identical_boxes_is_one() {
    let a = detection([10.0, 10.0, 20.0, 20.0]);
    assert!((a.iou(&a) - 1.0).abs() < 1e-6);
  }

  #[test]
  fn iou_of_disjoint_boxes_is_zero() {
    let a = detection([0.0, 0.0, 10.0, 10.0]);
    let b = detection([20.0, 20.0, 30.0, 30.0]);
    assert_eq!(a.iou(&b), 0.0);
  }

  #[test]
  fn iou_of_half_overlap() {
    let a = detection([0.0, 0.0, 10.0, 10.0]);
    let b = detection([5.0, 0.0, 15.0, 10.0]);
    assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
  }

  #[test]
  fn degenerate_boxes_have_no_area() {
    assert_eq!(detection([5.0, 5.0, 1.0, 1.0]).area(), 0.0);
    let d = detection([5.0, 5.0, 5.0, 5.0]);
    assert_eq!(d.iou(&d), 0.0);
  }

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = Url::parse("rknn:///model.rknn").unwrap();
    assert!(matches!(
      ModelWrapper::from_url(&url),
      Err(ModelError::SchemeMismatch(s)) if s == "rknn"
    ));
  }
}
