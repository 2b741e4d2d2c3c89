// 该文件是 Xunwu（寻物）项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::Detection;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_PADDING: u32 = 2;
const LABEL_TEXT_COLOR: [u8; 3] = [0, 0, 0];
const BOX_THICKNESS: u32 = 2;
const BOX_COLOR: [u8; 3] = [0, 255, 0]; // 绿色

// 未指定字体时依次尝试的系统字体
const DEFAULT_FONT_PATHS: &[&str] = &[
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
  "/System/Library/Fonts/Supplemental/Arial.ttf",
  "/Library/Fonts/Arial.ttf",
  "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法读取字体文件: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(String),
}

pub struct Draw {
  font_size: f32,
  thickness: u32,
  color: [u8; 3],
  text_color: [u8; 3],
  font: Option<FontVec>,
}

impl Default for Draw {
  fn default() -> Self {
    let font = DEFAULT_FONT_PATHS
      .iter()
      .filter(|path| Path::new(path).exists())
      .find_map(|path| match load_font(path) {
        Ok(font) => {
          debug!("使用字体: {}", path);
          Some(font)
        }
        Err(e) => {
          warn!("字体 {} 加载失败: {}", path, e);
          None
        }
      });

    if font.is_none() {
      warn!("未找到可用字体，只绘制检测框，不绘制标签文字");
    }

    Self::with_font(font)
  }
}

fn load_font(path: impl AsRef<Path>) -> Result<FontVec, DrawError> {
  let data = std::fs::read(path)?;
  FontVec::try_from_vec(data).map_err(|e| DrawError::InvalidFont(e.to_string()))
}

impl Draw {
  fn with_font(font: Option<FontVec>) -> Self {
    Self {
      font_size: LABEL_FONT_SIZE,
      thickness: BOX_THICKNESS,
      color: BOX_COLOR,
      text_color: LABEL_TEXT_COLOR,
      font,
    }
  }

  /// 只画检测框
  pub fn without_font() -> Self {
    Self::with_font(None)
  }

  pub fn from_font_file(path: impl AsRef<Path>) -> Result<Self, DrawError> {
    Ok(Self::with_font(Some(load_font(path)?)))
  }

  pub fn with_color(mut self, color: [u8; 3]) -> Self {
    self.color = color;
    self
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  pub fn draw_detections(&self, image: &mut RgbImage, detections: &[Detection]) {
    for detection in detections {
      self.draw_bbox_with_label(image, detection);
    }
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, detection: &Detection) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let [x_min, y_min, x_max, y_max] = detection.bbox;
    let x_min = (x_min.floor() as i32).clamp(0, w - 1);
    let y_min = (y_min.floor() as i32).clamp(0, h - 1);
    let x_max = (x_max.ceil() as i32).clamp(0, w - 1);
    let y_max = (y_max.ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let color = Rgb(self.color);
    let box_width = (x_max - x_min + 1) as u32;
    let box_height = (y_max - y_min + 1) as u32;
    for t in 0..self.thickness {
      if box_width <= 2 * t || box_height <= 2 * t {
        break;
      }
      let rect = Rect::at(x_min + t as i32, y_min + t as i32)
        .of_size(box_width - 2 * t, box_height - 2 * t);
      draw_hollow_rect_mut(image, rect, color);
    }

    let Some(font) = &self.font else {
      return;
    };

    let label = format!("{} {:.2}", detection.label, detection.score);
    let scale = PxScale::from(self.font_size);
    let (text_width, text_height) = text_size(scale, font, &label);

    let label_width = (text_width + 2 * LABEL_TEXT_PADDING).min(w as u32);
    let label_height = (text_height + 2 * LABEL_TEXT_PADDING).min(h as u32);
    if label_width == 0 || label_height == 0 {
      return;
    }

    // 标签放在边框上方，空间不够时放在框内顶部
    let label_x = x_min.min(w - label_width as i32).max(0);
    let label_y = if y_min >= label_height as i32 {
      y_min - label_height as i32
    } else {
      y_min
    };

    let rect = Rect::at(label_x, label_y).of_size(label_width, label_height);
    draw_filled_rect_mut(image, rect, color);
    draw_text_mut(
      image,
      Rgb(self.text_color),
      label_x + LABEL_TEXT_PADDING as i32,
      label_y + LABEL_TEXT_PADDING as i32,
      scale,
      font,
      &label,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const BACKGROUND: Rgb<u8> = Rgb([40, 40, 40]);

  fn detection(bbox: [f32; 4]) -> Detection {
    Detection {
      label: "cup".to_string(),
      score: 0.87,
      bbox,
    }
  }

  #[test]
  fn draws_two_pixel_border() {
    let mut image = RgbImage::from_pixel(50, 50, BACKGROUND);
    Draw::without_font().draw_detections(&mut image, &[detection([10.0, 10.0, 30.0, 30.0])]);

    let green = Rgb(BOX_COLOR);
    assert_eq!(image.get_pixel(10, 10), &green);
    assert_eq!(image.get_pixel(11, 20), &green);
    assert_eq!(image.get_pixel(30, 20), &green);
    assert_eq!(image.get_pixel(29, 29), &green);
    assert_eq!(image.get_pixel(12, 20), &BACKGROUND);
    assert_eq!(image.get_pixel(20, 20), &BACKGROUND);
    assert_eq!(image.get_pixel(5, 5), &BACKGROUND);
  }

  #[test]
  fn boxes_outside_the_image_are_clamped() {
    let mut image = RgbImage::from_pixel(20, 20, BACKGROUND);
    Draw::without_font().draw_detections(&mut image, &[detection([-5.0, -5.0, 100.0, 100.0])]);
    assert_eq!(image.get_pixel(0, 0), &Rgb(BOX_COLOR));
    assert_eq!(image.get_pixel(19, 19), &Rgb(BOX_COLOR));
  }

  #[test]
  fn degenerate_boxes_are_skipped() {
    let mut image = RgbImage::from_pixel(20, 20, BACKGROUND);
    let original = image.clone();
    Draw::without_font().draw_detections(
      &mut image,
      &[detection([5.0, 5.0, 5.0, 15.0]), detection([15.0, 15.0, 2.0, 2.0])],
    );
    assert_eq!(image, original);
  }

  #[test]
  fn custom_color_is_used() {
    let mut image = RgbImage::from_pixel(20, 20, BACKGROUND);
    Draw::without_font()
      .with_color([255, 0, 0])
      .draw_detections(&mut image, &[detection([2.0, 2.0, 12.0, 12.0])]);
    assert_eq!(image.get_pixel(2, 2), &Rgb([255, 0, 0]));
  }

  #[test]
  fn drawing_is_deterministic() {
    let draw = Draw::default();
    let detections = [detection([5.0, 30.0, 40.0, 60.0])];
    let mut a = RgbImage::from_pixel(64, 64, BACKGROUND);
    let mut b = a.clone();
    draw.draw_detections(&mut a, &detections);
    draw.draw_detections(&mut b, &detections);
    assert_eq!(a, b);
  }

  #[test]
  fn invalid_font_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("font.ttf");
    std::fs::write(&path, b"definitely not a font").unwrap();
    assert!(matches!(
      Draw::from_font_file(&path),
      Err(DrawError::InvalidFont(_))
    ));
    assert!(matches!(
      Draw::from_font_file(dir.path().join("missing.ttf")),
      Err(DrawError::IoError(_))
    ));
  }
}
