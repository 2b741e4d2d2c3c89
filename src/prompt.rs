// 该文件是 Xunwu（寻物）项目的一部分。
// src/prompt.rs - 提示词解析
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

use std::collections::BTreeSet;
use std::fmt;

use clap::ValueEnum;

/// 目标标签集合，元素均为小写且非空
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetLabelSet {
  labels: BTreeSet<String>,
}

impl TargetLabelSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// 插入一个标签，会先去除首尾空白并转为小写，空标签被忽略
  pub fn insert(&mut self, label: &str) -> bool {
    let label = label.trim().to_lowercase();
    if label.is_empty() {
      return false;
    }
    self.labels.insert(label)
  }

  pub fn contains(&self, label: &str) -> bool {
    self.labels.contains(label)
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.labels.iter().map(String::as_str)
  }
}

impl<'a> FromIterator<&'a str> for TargetLabelSet {
  fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
    let mut set = TargetLabelSet::new();
    for label in iter {
      set.insert(label);
    }
    set
  }
}

impl fmt::Display for TargetLabelSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let joined = self.iter().collect::<Vec<_>>().join(", ");
    f.write_str(&joined)
  }
}

/// 检测标签与目标集合的匹配规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MatchRule {
  /// 标签必须与某个目标完全相同
  Exact,
  /// 标签包含某个目标即可
  Contains,
}

impl MatchRule {
  /// `label` 需为小写
  pub fn matches(&self, label: &str, targets: &TargetLabelSet) -> bool {
    match self {
      MatchRule::Exact => targets.contains(label),
      MatchRule::Contains => targets.iter().any(|target| label.contains(target)),
    }
  }
}

/// 提示词解析策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
  /// 整个提示词作为一个子串目标
  #[default]
  Substring,
  /// "find <objects> in the image" 固定句式
  FixedPattern,
  /// 词性标注后提取名词
  NounExtraction,
  /// 逗号分隔的列表
  DelimitedList,
}

pub trait Resolver {
  fn resolve(&self, prompt: &str) -> TargetLabelSet;
  fn match_rule(&self) -> MatchRule;
}

mod delimited_list;
mod fixed_pattern;
mod noun_extraction;
mod substring;
pub mod tagger;

pub use self::delimited_list::DelimitedListResolver;
pub use self::fixed_pattern::FixedPatternResolver;
pub use self::noun_extraction::NounExtractionResolver;
pub use self::substring::SubstringResolver;

pub enum PromptResolver {
  Substring(SubstringResolver),
  FixedPattern(FixedPatternResolver),
  NounExtraction(NounExtractionResolver),
  DelimitedList(DelimitedListResolver),
}

impl From<Strategy> for PromptResolver {
  fn from(strategy: Strategy) -> Self {
    match strategy {
      Strategy::Substring => PromptResolver::Substring(SubstringResolver),
      Strategy::FixedPattern => PromptResolver::FixedPattern(FixedPatternResolver::default()),
      Strategy::NounExtraction => {
        PromptResolver::NounExtraction(NounExtractionResolver::default())
      }
      Strategy::DelimitedList => PromptResolver::DelimitedList(DelimitedListResolver),
    }
  }
}

impl Resolver for PromptResolver {
  fn resolve(&self, prompt: &str) -> TargetLabelSet {
    match self {
      PromptResolver::Substring(r) => r.resolve(prompt),
      PromptResolver::FixedPattern(r) => r.resolve(prompt),
      PromptResolver::NounExtraction(r) => r.resolve(prompt),
      PromptResolver::DelimitedList(r) => r.resolve(prompt),
    }
  }

  fn match_rule(&self) -> MatchRule {
    match self {
      PromptResolver::Substring(r) => r.match_rule(),
      PromptResolver::FixedPattern(r) => r.match_rule(),
      PromptResolver::NounExtraction(r) => r.match_rule(),
      PromptResolver::DelimitedList(r) => r.match_rule(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn label_set_normalizes_and_skips_empty() {
    let set: TargetLabelSet = ["  Bottle ", "", "CHAIR", "bottle"].into_iter().collect();
    assert_eq!(set.len(), 2);
    assert!(set.contains("bottle"));
    assert!(set.contains("chair"));
    assert_eq!(set.to_string(), "bottle, chair");
  }

  #[test]
  fn contains_rule_matches_inside_longer_labels() {
    let targets: TargetLabelSet = ["bottle"].into_iter().collect();
    assert!(MatchRule::Contains.matches("wine bottle", &targets));
    assert!(!MatchRule::Exact.matches("wine bottle", &targets));
    assert!(MatchRule::Exact.matches("bottle", &targets));
  }

  #[test]
  fn empty_targets_match_nothing() {
    let targets = TargetLabelSet::new();
    assert!(!MatchRule::Contains.matches("person", &targets));
    assert!(!MatchRule::Exact.matches("", &targets));
  }

  #[test]
  fn resolution_is_repeatable_for_every_strategy() {
    let prompts = [
      "find chair and bottle in the image",
      "bottle, Vase , chair",
      "Please show me the Dog",
      "",
    ];
    for strategy in Strategy::value_variants() {
      let resolver = PromptResolver::from(*strategy);
      for prompt in prompts {
        assert_eq!(resolver.resolve(prompt), resolver.resolve(prompt));
      }
    }
  }

  #[test]
  fn default_rules_per_strategy() {
    assert_eq!(
      PromptResolver::from(Strategy::Substring).match_rule(),
      MatchRule::Contains
    );
    for strategy in [
      Strategy::FixedPattern,
      Strategy::NounExtraction,
      Strategy::DelimitedList,
    ] {
      assert_eq!(PromptResolver::from(strategy).match_rule(), MatchRule::Exact);
    }
  }
}
