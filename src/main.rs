// 该文件是 Xunwu（寻物）项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::io::BufRead;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use xunwu::{
  FromUrl,
  input::ImageFileInput,
  model::ModelWrapper,
  output::{OutputWrapper, draw::Draw},
  session::Session,
  task::{InteractiveTask, OneShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .init();

  let args = args::Args::parse();

  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input.as_deref().unwrap_or("-"));
  info!("输出位置: {}", args.output);
  info!("解析策略: {:?}", args.strategy);

  info!("正在加载模型...");
  let model = ModelWrapper::from_url(&args.model)?;
  info!("模型加载完成");

  let input = args
    .input
    .as_deref()
    .map(ImageFileInput::from_location)
    .transpose()?;
  let output = OutputWrapper::from_url(&args.output)?;

  let draw = match &args.font {
    Some(path) => Draw::from_font_file(path)?,
    None => Draw::default(),
  };

  let mut session = Session::new(model, args.strategy.into()).with_draw(draw);
  if let Some(rule) = args.match_rule {
    session = session.with_match_rule(rule);
  }

  match args.prompt {
    Some(prompt) => OneShotTask::new(prompt).run_task(session, input, output),
    None => {
      if let Some(input) = input {
        session.load_image(input.into_image());
      }
      let lines = std::io::stdin().lock().lines().map_while(|line| line.ok());
      InteractiveTask.run_task(session, lines, output)
    }
  }
}
