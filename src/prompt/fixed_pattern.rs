// 该文件是 Xunwu（寻物）项目的一部分。
// src/prompt/fixed_pattern.rs - 固定句式策略
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

use std::sync::LazyLock;

use regex::Regex;

use super::{MatchRule, Resolver, TargetLabelSet};

// 句尾允许标点，句首允许空白
const FIND_PATTERN: &str = r"(?i)^\s*find\s+(?P<objects>.+?)\s+in\s+the\s+image\s*[.!?]*\s*$";

static FIND_REGEX: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(FIND_PATTERN).expect("固定句式正则表达式无效"));

/// 只接受 "find <objects> in the image" 句式，句子必须以 "find" 开头，
/// "please find ..." 之类带前缀的说法不被接受
#[derive(Debug, Clone)]
pub struct FixedPatternResolver {
  pattern: &'static Regex,
}

impl Default for FixedPatternResolver {
  fn default() -> Self {
    Self {
      pattern: &FIND_REGEX,
    }
  }
}

impl Resolver for FixedPatternResolver {
  fn resolve(&self, prompt: &str) -> TargetLabelSet {
    let Some(captures) = self.pattern.captures(prompt) else {
      return TargetLabelSet::new();
    };
    let objects = captures["objects"].to_lowercase().replace(" and ", ",");
    objects.split(',').collect()
  }

  fn match_rule(&self) -> MatchRule {
    MatchRule::Exact
  }
}
