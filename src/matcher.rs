// 该文件是 Xunwu（寻物）项目的一部分。
// src/matcher.rs - 检测结果与目标标签匹配
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

use tracing::debug;

use crate::{
  model::{DetectResult, Detection},
  prompt::{MatchRule, TargetLabelSet},
};

/// 按匹配规则从检测结果中挑选与目标标签相符的项
#[derive(Debug, Clone, Copy)]
pub struct DetectionMatcher {
  rule: MatchRule,
}

impl DetectionMatcher {
  pub fn new(rule: MatchRule) -> Self {
    Self { rule }
  }

  pub fn rule(&self) -> MatchRule {
    self.rule
  }

  /// 保持检测器给出的顺序；目标为空时总是返回空结果
  pub fn select(&self, targets: &TargetLabelSet, result: &DetectResult) -> Vec<Detection> {
    if targets.is_empty() {
      return Vec::new();
    }

    let selected: Vec<Detection> = result
      .iter()
      .filter(|d| self.rule.matches(&d.label.to_lowercase(), targets))
      .cloned()
      .collect();

    debug!(
      "匹配规则 {:?}: {} 个检测中选中 {} 个",
      self.rule,
      result.len(),
      selected.len()
    );
    selected
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn detection(label: &str) -> Detection {
    Detection {
      label: label.to_string(),
      score: 0.8,
      bbox: [0.0, 0.0, 10.0, 10.0],
    }
  }

  fn result(labels: &[&str]) -> DetectResult {
    DetectResult::from(labels.iter().map(|l| detection(l)).collect::<Vec<_>>())
  }

  #[test]
  fn exact_rule_requires_membership() {
    let targets: TargetLabelSet = ["bottle", "chair"].into_iter().collect();
    let selected = DetectionMatcher::new(MatchRule::Exact)
      .select(&targets, &result(&["Chair", "wine bottle", "bottle", "person"]));
    let labels: Vec<_> = selected.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(labels, vec!["Chair", "bottle"]);
  }

  #[test]
  fn contains_rule_accepts_substrings() {
    let targets: TargetLabelSet = ["bottle"].into_iter().collect();
    let selected = DetectionMatcher::new(MatchRule::Contains)
      .select(&targets, &result(&["wine bottle", "cup", "bottle"]));
    assert_eq!(selected.len(), 2);
    assert_eq!(selected[0].label, "wine bottle");
  }

  #[test]
  fn empty_targets_select_nothing() {
    let detections = result(&["person", "cup", ""]);
    for rule in [MatchRule::Exact, MatchRule::Contains] {
      let selected = DetectionMatcher::new(rule).select(&TargetLabelSet::new(), &detections);
      assert!(selected.is_empty());
    }
  }

  #[test]
  fn no_detections_select_nothing() {
    let targets: TargetLabelSet = ["cup"].into_iter().collect();
    let selected = DetectionMatcher::new(MatchRule::Contains).select(&targets, &result(&[]));
    assert!(selected.is_empty());
  }
}
