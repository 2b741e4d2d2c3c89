// 该文件是 Xunwu（寻物）项目的一部分。
// src/session.rs - 检测会话与请求流水线
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

//! 一次"寻物"请求按阶段推进：
//! 提示词输入 → 解析目标 → 运行检测 → 匹配 → {标注完成 | 未找到 | 无法解析}。
//!
//! 每个阶段是一个独立的结构体，按值传递给下一个阶段；会话本身只保存
//! 已加载的图像、检测模型、解析策略和绘制参数。

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  matcher::DetectionMatcher,
  model::{DetectResult, Detection, Model},
  output::draw::Draw,
  prompt::{MatchRule, PromptResolver, Resolver, TargetLabelSet},
};

#[derive(Error, Debug)]
pub enum FindError {
  #[error("Please load an image first.")]
  NoImageLoaded,
  #[error("Please type an object to detect.")]
  EmptyPrompt,
  #[error("Could not understand '{0}', please rephrase.")]
  UnparsablePrompt(String),
  #[error("No '{0}' found in image.")]
  NoMatchFound(TargetLabelSet),
  #[error("检测失败: {0}")]
  Model(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl FindError {
  /// 是否为可以直接提示给用户的状态（而非检测器故障）
  pub fn is_status(&self) -> bool {
    !matches!(self, FindError::Model(_))
  }
}

/// 标注结果
#[derive(Debug, Clone)]
pub struct Annotated {
  pub image: RgbImage,
  pub matches: DetectResult,
  pub targets: TargetLabelSet,
}

pub struct FindRequest<'a> {
  image: &'a RgbImage,
  prompt: &'a str,
}

impl<'a> FindRequest<'a> {
  pub fn new(image: Option<&'a RgbImage>, prompt: &'a str) -> Result<Self, FindError> {
    let image = image.ok_or(FindError::NoImageLoaded)?;
    if prompt.trim().is_empty() {
      return Err(FindError::EmptyPrompt);
    }
    Ok(Self { image, prompt })
  }

  pub fn resolve<R: Resolver>(self, resolver: &R) -> Result<ResolvedRequest<'a>, FindError> {
    let targets = resolver.resolve(self.prompt);
    if targets.is_empty() {
      return Err(FindError::UnparsablePrompt(self.prompt.trim().to_string()));
    }
    debug!("提示词 '{}' 解析为目标: {}", self.prompt, targets);
    Ok(ResolvedRequest {
      image: self.image,
      targets,
    })
  }
}

pub struct ResolvedRequest<'a> {
  image: &'a RgbImage,
  targets: TargetLabelSet,
}

impl<'a> ResolvedRequest<'a> {
  pub fn targets(&self) -> &TargetLabelSet {
    &self.targets
  }

  pub fn detect<M>(self, model: &mut M) -> Result<DetectedRequest<'a>, FindError>
  where
    M: Model<Input = RgbImage, Output = DetectResult>,
    M::Error: std::error::Error + Send + Sync + 'static,
  {
    let now = std::time::Instant::now();
    let detections = model
      .infer(self.image)
      .map_err(|e| FindError::Model(Box::new(e)))?;
    info!(
      "推理完成，耗时: {:.2?}，检测到 {} 个对象",
      now.elapsed(),
      detections.len()
    );
    Ok(DetectedRequest {
      image: self.image,
      targets: self.targets,
      detections,
    })
  }
}

pub struct DetectedRequest<'a> {
  image: &'a RgbImage,
  targets: TargetLabelSet,
  detections: DetectResult,
}

impl<'a> DetectedRequest<'a> {
  pub fn detections(&self) -> &DetectResult {
    &self.detections
  }

  pub fn select(self, matcher: &DetectionMatcher) -> Result<MatchedRequest<'a>, FindError> {
    let matches = matcher.select(&self.targets, &self.detections);
    if matches.is_empty() {
      return Err(FindError::NoMatchFound(self.targets));
    }
    for det in &matches {
      debug!(
        "  - {}: {:.2}% at ({:.0}, {:.0}, {:.0}, {:.0})",
        det.label,
        det.score * 100.0,
        det.bbox[0],
        det.bbox[1],
        det.bbox[2],
        det.bbox[3]
      );
    }
    Ok(MatchedRequest {
      image: self.image,
      targets: self.targets,
      matches,
    })
  }
}

pub struct MatchedRequest<'a> {
  image: &'a RgbImage,
  targets: TargetLabelSet,
  matches: Vec<Detection>,
}

impl MatchedRequest<'_> {
  pub fn render(self, draw: &Draw) -> Annotated {
    let mut image = self.image.clone();
    draw.draw_detections(&mut image, &self.matches);
    Annotated {
      image,
      matches: DetectResult::from(self.matches),
      targets: self.targets,
    }
  }
}

pub struct Session<M> {
  model: M,
  resolver: PromptResolver,
  matcher: DetectionMatcher,
  draw: Draw,
  image: Option<RgbImage>,
}

impl<M> Session<M>
where
  M: Model<Input = RgbImage, Output = DetectResult>,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  /// 匹配规则默认取解析策略自身的规则
  pub fn new(model: M, resolver: PromptResolver) -> Self {
    let matcher = DetectionMatcher::new(resolver.match_rule());
    Self {
      model,
      resolver,
      matcher,
      draw: Draw::default(),
      image: None,
    }
  }

  pub fn with_draw(mut self, draw: Draw) -> Self {
    self.draw = draw;
    self
  }

  pub fn with_match_rule(mut self, rule: MatchRule) -> Self {
    self.matcher = DetectionMatcher::new(rule);
    self
  }

  pub fn load_image(&mut self, image: RgbImage) {
    info!("已加载图像: {}x{}", image.width(), image.height());
    self.image = Some(image);
  }

  pub fn has_image(&self) -> bool {
    self.image.is_some()
  }

  pub fn find_objects(&mut self, prompt: &str) -> Result<Annotated, FindError> {
    let annotated = FindRequest::new(self.image.as_ref(), prompt)?
      .resolve(&self.resolver)?
      .detect(&mut self.model)?
      .select(&self.matcher)?
      .render(&self.draw);
    info!(
      "目标 '{}' 共找到 {} 个",
      annotated.targets,
      annotated.matches.len()
    );
    Ok(annotated)
  }
}
