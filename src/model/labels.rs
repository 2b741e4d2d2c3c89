// 该文件是 Xunwu（寻物）项目的一部分。
// src/model/labels.rs - 类别名称表
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

/// COCO 数据集类别名称
pub const COCO_LABELS: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

pub fn coco_labels() -> Vec<String> {
  COCO_LABELS.iter().map(|s| s.to_string()).collect()
}

/// 读取标签文件，第 N 行即类别 N 的名称；
/// 中间的空行保留位置并记为 `class_N`，末尾空行忽略
pub fn load_label_file(path: impl AsRef<Path>) -> std::io::Result<Vec<String>> {
  let content = std::fs::read_to_string(path)?;
  Ok(parse_labels(&content))
}

fn parse_labels(content: &str) -> Vec<String> {
  let mut lines: Vec<&str> = content.lines().map(str::trim).collect();
  while lines.last().is_some_and(|line| line.is_empty()) {
    lines.pop();
  }
  lines
    .into_iter()
    .enumerate()
    .map(|(i, line)| {
      if line.is_empty() {
        format!("class_{}", i)
      } else {
        line.to_lowercase()
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn coco_table_has_expected_entries() {
    assert_eq!(COCO_LABELS[0], "person");
    assert_eq!(COCO_LABELS[39], "bottle");
    assert_eq!(COCO_LABELS[79], "toothbrush");
  }

  #[test]
  fn blank_lines_keep_class_positions() {
    let labels = parse_labels("Bird\n\n  head \r\neye\n\n\n");
    assert_eq!(labels, vec!["bird", "class_1", "head", "eye"]);

    let labels = parse_labels("cat\n\ndog\n");
    assert_eq!(labels.get(2).map(String::as_str), Some("dog"));
  }
}
