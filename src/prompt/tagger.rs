// 该文件是 Xunwu（寻物）项目的一部分。
// src/prompt/tagger.rs - 轻量词性标注器
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

//! 基于词典与词形规则的英文词性标注器。
//!
//! 提示词通常是很短的祈使句（"find the red cup"），封闭词类（限定词、
//! 代词、介词、连词、助动词）可以穷举，剩余的实词再按词形和上下文判断，
//! 无法归类的词默认视为普通名词。

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosTag {
  Noun,
  ProperNoun,
  Verb,
  Auxiliary,
  Determiner,
  Pronoun,
  Adposition,
  Conjunction,
  Adjective,
  Adverb,
  Numeral,
  Interjection,
}

impl PosTag {
  pub fn is_noun(&self) -> bool {
    matches!(self, PosTag::Noun | PosTag::ProperNoun)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
  pub text: &'a str,
  pub tag: PosTag,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Tagger;

impl Tagger {
  pub fn tag<'a>(&self, text: &'a str) -> Vec<Token<'a>> {
    let mut tokens: Vec<Token<'a>> = Vec::new();
    for word in tokenize(text) {
      let previous = tokens.last().map(|t| t.tag);
      let tag = tag_word(word, previous, tokens.is_empty());
      tokens.push(Token { text: word, tag });
    }
    tokens
  }
}

fn tokenize(text: &str) -> impl Iterator<Item = &str> {
  text
    .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-'))
    .map(|word| word.trim_matches(|c| c == '\'' || c == '-'))
    .filter(|word| !word.is_empty())
}

fn tag_word(word: &str, previous: Option<PosTag>, sentence_start: bool) -> PosTag {
  if word.chars().all(|c| c.is_ascii_digit()) {
    return PosTag::Numeral;
  }

  let lower = word.to_lowercase();
  if let Some(tag) = lexicon_tag(&lower) {
    return tag;
  }

  // 限定词、形容词、数词之后的实词按名词处理
  let after_modifier = matches!(
    previous,
    Some(PosTag::Determiner | PosTag::Adjective | PosTag::Numeral)
  );

  if !after_modifier {
    if lower.len() > 3 && lower.ends_with("ly") {
      return PosTag::Adverb;
    }
    if lower.ends_with("ing") && matches!(previous, Some(PosTag::Auxiliary | PosTag::Pronoun)) {
      return PosTag::Verb;
    }
  }

  if !sentence_start && word.chars().next().is_some_and(char::is_uppercase) {
    return PosTag::ProperNoun;
  }

  PosTag::Noun
}

fn lexicon_tag(word: &str) -> Option<PosTag> {
  let tag = match word {
    "a" | "an" | "the" | "this" | "that" | "these" | "those" | "some" | "any" | "every"
    | "each" | "all" | "no" | "another" | "my" | "your" | "his" | "her" | "its" | "our"
    | "their" | "which" | "both" | "either" | "neither" | "many" | "much" | "few"
    | "several" => PosTag::Determiner,

    "i" | "me" | "you" | "he" | "she" | "it" | "we" | "they" | "them" | "us" | "him"
    | "something" | "anything" | "everything" | "nothing" | "someone" | "anyone"
    | "everyone" | "what" | "who" | "whom" | "whatever" | "myself" | "yourself" | "mine"
    | "yours" | "there" | "what's" | "there's" | "it's" | "i'm" | "let's" | "where's"
    | "here's" | "who's" | "that's" | "how's" => PosTag::Pronoun,

    "in" | "on" | "at" | "of" | "for" | "with" | "from" | "to" | "by" | "near" | "under"
    | "over" | "inside" | "around" | "behind" | "between" | "into" | "onto" | "within"
    | "across" | "beside" | "next" | "above" | "below" | "among" | "through" | "without"
    | "outside" | "along" | "against" | "toward" | "towards" | "like" | "about" => {
      PosTag::Adposition
    }

    "and" | "or" | "but" | "nor" | "plus" | "if" | "as" | "than" => PosTag::Conjunction,

    "is" | "are" | "am" | "was" | "were" | "be" | "been" | "being" | "do" | "does" | "did"
    | "can" | "could" | "would" | "should" | "will" | "may" | "might" | "must" | "have"
    | "has" | "had" | "don't" | "can't" | "isn't" | "aren't" | "won't" => PosTag::Auxiliary,

    "find" | "show" | "detect" | "locate" | "highlight" | "spot" | "identify" | "see"
    | "look" | "search" | "mark" | "get" | "give" | "tell" | "point" | "want" | "need"
    | "display" | "count" | "draw" | "help" | "check" | "seek" | "select" | "pick"
    | "let" | "make" | "outline" | "circle" => PosTag::Verb,

    "please" | "hey" | "hi" | "ok" | "okay" | "thanks" => PosTag::Interjection,

    "also" | "here" | "where" | "only" | "just" | "too" | "very" | "really" | "maybe" | "somewhere"
    | "anywhere" | "now" | "then" | "not" => PosTag::Adverb,

    "red" | "green" | "blue" | "yellow" | "black" | "white" | "brown" | "gray" | "grey"
    | "pink" | "purple" | "big" | "small" | "large" | "little" | "tiny" | "huge" | "tall"
    | "short" | "old" | "new" | "young" | "other" => PosTag::Adjective,

    "one" | "two" | "three" | "four" | "five" | "six" | "seven" | "eight" | "nine" | "ten" => {
      PosTag::Numeral
    }

    _ => return None,
  };
  Some(tag)
}
