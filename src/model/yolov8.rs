// 该文件是 Xunwu（寻物）项目的一部分。
// src/model/yolov8.rs - YOLOv8 ONNX 检测模型
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

use std::collections::BTreeMap;

use image::{Rgb, RgbImage, imageops::FilterType};
use ndarray::{Array, ArrayViewD, IxDyn};
use ort::{
  session::Session,
  value::{Value, ValueType},
};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{DetectResult, Detection, Model, labels},
  url_file_path, url_query_f32,
};

const YOLOV8_INPUT_NAME: &str = "images";
const YOLOV8_OUTPUT_NAME: &str = "output0";
const YOLOV8_DEFAULT_INPUT_SIZE: u32 = 640;
const YOLOV8_OBJECT_THRESH: f32 = 0.25;
const YOLOV8_NMS_THRESH: f32 = 0.45;
const YOLOV8_BOX_CHANNELS: usize = 4;
const LETTERBOX_FILL: Rgb<u8> = Rgb([114, 114, 114]);

pub struct Yolov8 {
  session: Session,
  labels: Vec<String>,
  input_size: u32,
  confidence: f32,
  iou_threshold: f32,
}

#[derive(Error, Debug)]
pub enum Yolov8Error {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("ONNX Runtime 错误: {0}")]
  OnnxError(String),
  #[error("模型输出无效: {0}")]
  InvalidOutput(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl Yolov8Error {
  fn onnx(e: impl std::fmt::Display) -> Self {
    Yolov8Error::OnnxError(e.to_string())
  }
}

impl From<ndarray::ShapeError> for Yolov8Error {
  fn from(err: ndarray::ShapeError) -> Self {
    Yolov8Error::InvalidOutput(err.to_string())
  }
}

pub struct Yolov8Builder {
  model_path: String,
  labels_path: Option<String>,
  confidence: f32,
  iou_threshold: f32,
}

impl FromUrlWithScheme for Yolov8Builder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for Yolov8Builder {
  type Error = Yolov8Error;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(Yolov8Error::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let labels_path = url
      .query_pairs()
      .find(|(k, _)| k == "labels")
      .map(|(_, v)| v.into_owned());

    Ok(Yolov8Builder {
      model_path: url_file_path(url),
      labels_path,
      confidence: url_query_f32(url, "confidence").unwrap_or(YOLOV8_OBJECT_THRESH),
      iou_threshold: url_query_f32(url, "iou").unwrap_or(YOLOV8_NMS_THRESH),
    })
  }
}

impl Yolov8Builder {
  pub fn confidence(mut self, confidence: f32) -> Self {
    self.confidence = confidence;
    self
  }

  pub fn iou_threshold(mut self, iou_threshold: f32) -> Self {
    self.iou_threshold = iou_threshold;
    self
  }

  pub fn build(self) -> Result<Yolov8, Yolov8Error> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 ONNX Runtime 推理会话");
    let session = Session::builder()
      .map_err(Yolov8Error::onnx)?
      .commit_from_memory(&model_data)
      .map_err(Yolov8Error::onnx)?;

    let labels = match &self.labels_path {
      Some(path) => {
        info!("加载标签文件: {}", path);
        labels::load_label_file(path)?
      }
      None => labels::coco_labels(),
    };

    let input_size = session
      .inputs
      .first()
      .and_then(|input| tensor_shape(&input.input_type))
      .and_then(|shape| shape.get(3).copied())
      .filter(|&size| size > 0)
      .map(|size| size as u32)
      .unwrap_or(YOLOV8_DEFAULT_INPUT_SIZE);
    debug!("模型输入尺寸: {}x{}", input_size, input_size);

    if let Some(channels) = session
      .outputs
      .first()
      .and_then(|output| tensor_shape(&output.output_type))
      .and_then(|shape| shape.get(1).copied())
      .filter(|&c| c > YOLOV8_BOX_CHANNELS as i64)
    {
      let classes = channels as usize - YOLOV8_BOX_CHANNELS;
      if classes != labels.len() {
        warn!(
          "模型类别数 {} 与标签数 {} 不一致，缺失的类别将以编号命名",
          classes,
          labels.len()
        );
      }
    }

    info!("模型加载完成");
    Ok(Yolov8 {
      session,
      labels,
      input_size,
      confidence: self.confidence,
      iou_threshold: self.iou_threshold,
    })
  }
}

fn tensor_shape(value_type: &ValueType) -> Option<Vec<i64>> {
  match value_type {
    ValueType::Tensor { shape, .. } => Some(shape.to_vec()),
    _ => None,
  }
}

/// 信箱缩放参数，用于把模型坐标映射回原图
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
  scale: f32,
  pad_x: f32,
  pad_y: f32,
}

impl Letterbox {
  fn new(width: u32, height: u32, target: u32) -> Self {
    let scale = target as f32 / width.max(height).max(1) as f32;
    let new_width = ((width as f32 * scale) as u32).clamp(1, target);
    let new_height = ((height as f32 * scale) as u32).clamp(1, target);
    Self {
      scale,
      pad_x: ((target - new_width) / 2) as f32,
      pad_y: ((target - new_height) / 2) as f32,
    }
  }

  fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
    ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
  }
}

fn preprocess(image: &RgbImage, target: u32) -> Result<(Array<f32, IxDyn>, Letterbox), Yolov8Error> {
  let (width, height) = image.dimensions();
  let letterbox = Letterbox::new(width, height, target);
  let new_width = ((width as f32 * letterbox.scale) as u32).clamp(1, target);
  let new_height = ((height as f32 * letterbox.scale) as u32).clamp(1, target);

  let resized = image::imageops::resize(image, new_width, new_height, FilterType::Triangle);
  let mut canvas = RgbImage::from_pixel(target, target, LETTERBOX_FILL);
  image::imageops::overlay(
    &mut canvas,
    &resized,
    letterbox.pad_x as i64,
    letterbox.pad_y as i64,
  );

  // NCHW，归一化到 [0, 1]
  let plane = (target * target) as usize;
  let mut data = vec![0f32; 3 * plane];
  for (x, y, pixel) in canvas.enumerate_pixels() {
    let idx = (y * target + x) as usize;
    for c in 0..3 {
      data[c * plane + idx] = pixel[c] as f32 / 255.0;
    }
  }

  let input = Array::from_shape_vec(IxDyn(&[1, 3, target as usize, target as usize]), data)?;
  Ok((input, letterbox))
}

fn postprocess(
  output: &ArrayViewD<'_, f32>,
  letterbox: &Letterbox,
  labels: &[String],
  image_size: (u32, u32),
  confidence: f32,
  iou_threshold: f32,
) -> Result<Vec<Detection>, Yolov8Error> {
  // 输出形状 [1, 4 + 类别数, 候选框数]
  let shape = output.shape();
  if shape.len() != 3 || shape[1] <= YOLOV8_BOX_CHANNELS {
    return Err(Yolov8Error::InvalidOutput(format!(
      "期望形状 [1, 4+C, N]，实际 {:?}",
      shape
    )));
  }
  let num_classes = shape[1] - YOLOV8_BOX_CHANNELS;
  let num_boxes = shape[2];
  let (width, height) = (image_size.0 as f32, image_size.1 as f32);

  let mut candidates: BTreeMap<usize, Vec<Detection>> = BTreeMap::new();
  for i in 0..num_boxes {
    let (class_id, score) = (0..num_classes)
      .map(|c| (c, output[[0, YOLOV8_BOX_CHANNELS + c, i]]))
      .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

    if score <= confidence {
      continue;
    }

    let cx = output[[0, 0, i]];
    let cy = output[[0, 1, i]];
    let w = output[[0, 2, i]];
    let h = output[[0, 3, i]];
    let (x_min, y_min) = letterbox.unmap(cx - w / 2.0, cy - h / 2.0);
    let (x_max, y_max) = letterbox.unmap(cx + w / 2.0, cy + h / 2.0);

    let label = labels
      .get(class_id)
      .cloned()
      .unwrap_or_else(|| format!("class_{}", class_id));

    candidates.entry(class_id).or_default().push(Detection {
      label,
      score,
      bbox: [
        x_min.clamp(0.0, width),
        y_min.clamp(0.0, height),
        x_max.clamp(0.0, width),
        y_max.clamp(0.0, height),
      ],
    });
  }

  let mut detections: Vec<Detection> = candidates
    .into_values()
    .flat_map(|group| nms(group, iou_threshold))
    .collect();
  detections.sort_by(|a, b| b.score.total_cmp(&a.score));
  Ok(detections)
}

/// 单一类别内的非极大值抑制
fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
  detections.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
  for detection in detections {
    if keep.iter().all(|kept| kept.iou(&detection) <= iou_threshold) {
      keep.push(detection);
    }
  }
  keep
}

impl Model for Yolov8 {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = Yolov8Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let (tensor, letterbox) = preprocess(input, self.input_size)?;
    let input_value = Value::from_array(tensor).map_err(Yolov8Error::onnx)?;

    let now = std::time::Instant::now();
    let outputs = self
      .session
      .run(ort::inputs![YOLOV8_INPUT_NAME => &input_value])
      .map_err(Yolov8Error::onnx)?;
    debug!("ONNX 推理耗时: {:.2?}", now.elapsed());

    let output = outputs[YOLOV8_OUTPUT_NAME]
      .try_extract_array::<f32>()
      .map_err(Yolov8Error::onnx)?;

    let detections = postprocess(
      &output,
      &letterbox,
      &self.labels,
      input.dimensions(),
      self.confidence,
      self.iou_threshold,
    )?;
    debug!("检测到 {} 个对象", detections.len());

    Ok(DetectResult::from(detections))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn labels() -> Vec<String> {
    vec!["cup".to_string(), "laptop".to_string()]
  }

  /// 构造 [1, 6, N] 的输出，每个候选为 (cx, cy, w, h, score_cup, score_laptop)
  fn output(candidates: &[[f32; 6]]) -> Array<f32, IxDyn> {
    let n = candidates.len();
    let mut out = Array::zeros(IxDyn(&[1, 6, n]));
    for (i, candidate) in candidates.iter().enumerate() {
      for (c, value) in candidate.iter().enumerate() {
        out[[0, c, i]] = *value;
      }
    }
    out
  }

  #[test]
  fn letterbox_pads_the_short_side() {
    let letterbox = Letterbox::new(1280, 640, 640);
    assert_eq!(letterbox.scale, 0.5);
    assert_eq!(letterbox.pad_x, 0.0);
    assert_eq!(letterbox.pad_y, 160.0);
    assert_eq!(letterbox.unmap(100.0, 260.0), (200.0, 200.0));
  }

  #[test]
  fn preprocess_produces_nchw_tensor() {
    let image = RgbImage::from_pixel(32, 16, Rgb([255, 0, 0]));
    let (tensor, letterbox) = preprocess(&image, 64).unwrap();
    assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
    assert_eq!(letterbox.pad_y, 16.0);
    // 中心是原图的红色，顶部是填充灰色
    assert!((tensor[[0, 0, 32, 32]] - 1.0).abs() < 1e-2);
    assert!(tensor[[0, 1, 32, 32]].abs() < 1e-2);
    assert!((tensor[[0, 0, 0, 0]] - 114.0 / 255.0).abs() < 1e-6);
  }

  #[test]
  fn postprocess_thresholds_and_maps_boxes() {
    let out = output(&[
      [320.0, 320.0, 100.0, 100.0, 0.9, 0.1],
      [100.0, 100.0, 20.0, 20.0, 0.1, 0.2],
    ]);
    let letterbox = Letterbox::new(640, 640, 640);
    let detections =
      postprocess(&out.view(), &letterbox, &labels(), (640, 640), 0.25, 0.45).unwrap();

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label, "cup");
    assert_eq!(detections[0].bbox, [270.0, 270.0, 370.0, 370.0]);
  }

  #[test]
  fn nms_keeps_the_stronger_overlapping_box() {
    let out = output(&[
      [320.0, 320.0, 100.0, 100.0, 0.6, 0.0],
      [322.0, 322.0, 100.0, 100.0, 0.8, 0.0],
      [322.0, 322.0, 100.0, 100.0, 0.0, 0.7],
    ]);
    let letterbox = Letterbox::new(640, 640, 640);
    let detections =
      postprocess(&out.view(), &letterbox, &labels(), (640, 640), 0.25, 0.45).unwrap();

    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].label, "cup");
    assert!((detections[0].score - 0.8).abs() < 1e-6);
    assert_eq!(detections[1].label, "laptop");
  }

  #[test]
  fn boxes_are_clamped_to_the_image() {
    let out = output(&[[5.0, 5.0, 40.0, 40.0, 0.9, 0.0]]);
    let letterbox = Letterbox::new(640, 640, 640);
    let detections =
      postprocess(&out.view(), &letterbox, &labels(), (640, 640), 0.25, 0.45).unwrap();
    assert_eq!(detections[0].bbox[0], 0.0);
    assert_eq!(detections[0].bbox[1], 0.0);
  }

  #[test]
  fn unknown_class_gets_numbered_label() {
    let out = output(&[[50.0, 50.0, 10.0, 10.0, 0.0, 0.9]]);
    let letterbox = Letterbox::new(640, 640, 640);
    let detections =
      postprocess(&out.view(), &letterbox, &labels()[..1], (640, 640), 0.25, 0.45).unwrap();
    assert_eq!(detections[0].label, "class_1");
  }

  #[test]
  fn rejects_malformed_output() {
    let out = Array::<f32, IxDyn>::zeros(IxDyn(&[1, 4, 3]));
    let letterbox = Letterbox::new(640, 640, 640);
    assert!(matches!(
      postprocess(&out.view(), &letterbox, &labels(), (640, 640), 0.25, 0.45),
      Err(Yolov8Error::InvalidOutput(_))
    ));
  }

  #[test]
  fn rejects_foreign_scheme() {
    let url = Url::parse("replay:///tmp/x.json").unwrap();
    assert!(matches!(
      Yolov8Builder::from_url(&url),
      Err(Yolov8Error::ModelPathError(_))
    ));
  }

  #[test]
  fn reads_thresholds_from_query() {
    let url = Url::parse("onnx:///models/yolov8n.onnx?confidence=0.5&iou=0.3&labels=/l.txt").unwrap();
    let builder = Yolov8Builder::from_url(&url).unwrap();
    assert_eq!(builder.model_path, "/models/yolov8n.onnx");
    assert_eq!(builder.confidence, 0.5);
    assert_eq!(builder.iou_threshold, 0.3);
    assert_eq!(builder.labels_path.as_deref(), Some("/l.txt"));
  }
}
