// 该文件是 Xunwu（寻物）项目的一部分。
// src/prompt/noun_extraction.rs - 名词提取策略
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

use super::{
  MatchRule, Resolver, TargetLabelSet,
  tagger::{Tagger, Token},
};

/// 提取提示词中所有名词（含专有名词）作为目标
///
/// 相邻名词还会拼成复合词（"teddy bear"），以便与多词类别名精确匹配。
#[derive(Debug, Default, Clone, Copy)]
pub struct NounExtractionResolver {
  tagger: Tagger,
}

impl Resolver for NounExtractionResolver {
  fn resolve(&self, prompt: &str) -> TargetLabelSet {
    let tokens = self.tagger.tag(prompt);
    let mut targets = TargetLabelSet::new();

    for run in tokens.split(|t| !t.tag.is_noun()) {
      for Token { text, .. } in run {
        targets.insert(text);
      }
      if run.len() > 1 {
        let compound = run.iter().map(|t| t.text).collect::<Vec<_>>().join(" ");
        targets.insert(&compound);
      }
    }

    targets
  }

  fn match_rule(&self) -> MatchRule {
    MatchRule::Exact
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn resolve(prompt: &str) -> TargetLabelSet {
    NounExtractionResolver::default().resolve(prompt)
  }

  #[test]
  fn picks_nouns_from_a_sentence() {
    let expected: TargetLabelSet = ["cup", "laptop"].into_iter().collect();
    assert_eq!(resolve("Please find the cup near the laptop"), expected);
  }

  #[test]
  fn contractions_are_not_targets() {
    let expected: TargetLabelSet = ["dog"].into_iter().collect();
    assert_eq!(resolve("where's the dog"), expected);
    let expected: TargetLabelSet = ["cup"].into_iter().collect();
    assert_eq!(resolve("Here's a cup?"), expected);
  }

  #[test]
  fn proper_nouns_are_lowercased() {
    assert!(resolve("where is the TV").contains("tv"));
  }

  #[test]
  fn adjacent_nouns_form_compounds() {
    let targets = resolve("show me a teddy bear");
    assert!(targets.contains("teddy"));
    assert!(targets.contains("bear"));
    assert!(targets.contains("teddy bear"));
    assert_eq!(targets.len(), 3);
  }

  #[test]
  fn no_nouns_means_unparsable() {
    assert!(resolve("find it for me please").is_empty());
    assert!(resolve("").is_empty());
  }
}
