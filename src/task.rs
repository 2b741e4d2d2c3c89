// 该文件是 Xunwu（寻物）项目的一部分。
// src/task.rs - 任务定义
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

use image::RgbImage;
use tracing::{error, info, warn};

use crate::{
  input::ImageFileInput,
  model::{DetectResult, Model},
  output::Render,
  session::Session,
};

pub trait Task<S, I, O>: Sized {
  type Error;
  fn run_task(self, session: S, input: I, output: O) -> Result<(), Self::Error>;
}

/// 交互输入的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  /// `:load <path>`，加载图像
  Load(String),
  /// `:quit`
  Quit,
  /// 其余任何内容都作为提示词
  Find(String),
}

impl Command {
  pub fn parse(line: &str) -> Self {
    let trimmed = line.trim();
    if let Some(location) = trimmed.strip_prefix(":load") {
      if location.is_empty() || location.starts_with(char::is_whitespace) {
        return Command::Load(location.trim().to_string());
      }
    }
    match trimmed {
      ":quit" | ":q" | ":exit" => Command::Quit,
      _ => Command::Find(line.to_string()),
    }
  }
}

/// 执行一次寻物请求。状态类错误打印给用户并视为成功，其余错误向上传递
fn find_and_render<M, O>(
  session: &mut Session<M>,
  prompt: &str,
  output: &O,
) -> anyhow::Result<()>
where
  M: Model<Input = RgbImage, Output = DetectResult>,
  M::Error: std::error::Error + Send + Sync + 'static,
  O: Render<RgbImage, DetectResult>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  match session.find_objects(prompt) {
    Ok(annotated) => {
      println!(
        "Found {} object(s) matching '{}':",
        annotated.matches.len(),
        annotated.targets
      );
      for det in annotated.matches.iter() {
        println!(
          "  - {}: {:.2}% at ({:.0}, {:.0}, {:.0}, {:.0})",
          det.label,
          det.score * 100.0,
          det.bbox[0],
          det.bbox[1],
          det.bbox[2],
          det.bbox[3]
        );
      }
      output.render_result(&annotated.image, &annotated.matches)?;
      Ok(())
    }
    Err(e) if e.is_status() => {
      warn!("{}", e);
      println!("{}", e);
      Ok(())
    }
    Err(e) => Err(e.into()),
  }
}

/// 单条提示词
pub struct OneShotTask {
  prompt: String,
}

impl OneShotTask {
  pub fn new(prompt: impl Into<String>) -> Self {
    Self {
      prompt: prompt.into(),
    }
  }
}

impl<M, O> Task<Session<M>, Option<ImageFileInput>, O> for OneShotTask
where
  M: Model<Input = RgbImage, Output = DetectResult>,
  M::Error: std::error::Error + Send + Sync + 'static,
  O: Render<RgbImage, DetectResult>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut session: Session<M>,
    input: Option<ImageFileInput>,
    output: O,
  ) -> Result<(), Self::Error> {
    info!("开始任务...");
    if let Some(input) = input {
      session.load_image(input.into_image());
    }
    find_and_render(&mut session, &self.prompt, &output)?;
    info!("任务完成");
    Ok(())
  }
}

/// 逐行读取命令，直到输入结束或 `:quit`
#[derive(Default, Debug)]
pub struct InteractiveTask;

impl<M, I, O> Task<Session<M>, I, O> for InteractiveTask
where
  M: Model<Input = RgbImage, Output = DetectResult>,
  M::Error: std::error::Error + Send + Sync + 'static,
  I: Iterator<Item = String>,
  O: Render<RgbImage, DetectResult>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut session: Session<M>, input: I, output: O) -> Result<(), Self::Error> {
    info!("开始交互任务...");
    for (line_index, line) in input.enumerate() {
      match Command::parse(&line) {
        Command::Quit => {
          info!("收到退出命令");
          break;
        }
        Command::Load(location) if location.is_empty() => {
          println!("Usage: :load <path>");
        }
        Command::Load(location) => match ImageFileInput::from_location(&location) {
          Ok(input) => {
            session.load_image(input.into_image());
            println!("Loaded {}", location);
          }
          Err(e) => {
            error!("第 {} 行: 图像加载失败: {}", line_index + 1, e);
            println!("Could not load '{}': {}", location, e);
          }
        },
        Command::Find(prompt) => {
          info!("处理第 {} 行提示词", line_index + 1);
          find_and_render(&mut session, &prompt, &output)?;
        }
      }
    }

    info!("任务完成，退出");
    Ok(())
  }
}
