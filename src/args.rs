// 该文件是 Xunwu（寻物）项目的一部分。
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
// Copyright (C) 2026 Xunwu contributors

use std::path::PathBuf;

use clap::Parser;
use url::Url;
use xunwu::prompt::{MatchRule, Strategy};

/// Xunwu 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测模型
  /// 支持格式:
  /// - onnx:///path/yolov8n.onnx?confidence=0.25&iou=0.45&labels=/path/labels.txt
  /// - replay:///path/detections.json?confidence=0.5
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入图像（文件路径或 image:///path/photo.jpg）
  #[arg(long, value_name = "SOURCE")]
  pub input: Option<String>,

  /// 输出位置
  /// 支持格式:
  /// - image:///path/result.png（每次覆盖）
  /// - folder:///path/records?record（按日期保存，可附带文本记录）
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 提示词解析策略
  #[arg(long, value_enum, default_value_t = Strategy::Substring)]
  pub strategy: Strategy,

  /// 匹配规则，默认取决于解析策略
  #[arg(long, value_enum)]
  pub match_rule: Option<MatchRule>,

  /// 单次提示词；不指定时从标准输入逐行读取
  #[arg(long, value_name = "TEXT")]
  pub prompt: Option<String>,

  /// 标签字体文件
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,
}
