// 该文件是 Shanan Lite （山南西风·轻） 项目的一部分。
// src/output/console.rs - 控制台输出
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::io::Write;
use std::sync::Mutex;

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, model::DetectResult, output::Render};

#[derive(Error, Debug)]
pub enum ConsoleOutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("输出已被锁定")]
  Poisoned,
}

/// 打印输出张量形状，以及每个超过阈值的候选下标和置信度
pub struct ConsoleOutput<W> {
  writer: Mutex<W>,
}

impl FromUrlWithScheme for ConsoleOutput<std::io::Stdout> {
  const SCHEME: &'static str = "console";
}

impl FromUrl for ConsoleOutput<std::io::Stdout> {
  type Error = ConsoleOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ConsoleOutputError::SchemeMismatch(format!(
        "期望输出方式 '{}', 实际输出方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    Ok(Self::stdout())
  }
}

impl ConsoleOutput<std::io::Stdout> {
  pub fn stdout() -> Self {
    Self::with_writer(std::io::stdout())
  }
}

impl<W: Write> ConsoleOutput<W> {
  pub fn with_writer(writer: W) -> Self {
    ConsoleOutput {
      writer: Mutex::new(writer),
    }
  }

  pub fn into_inner(self) -> Result<W, ConsoleOutputError> {
    self
      .writer
      .into_inner()
      .map_err(|_| ConsoleOutputError::Poisoned)
  }
}

impl<F, W: Write> Render<F, DetectResult> for ConsoleOutput<W> {
  type Error = ConsoleOutputError;

  fn render_result(&self, _frame: &F, result: &DetectResult) -> Result<(), Self::Error> {
    let mut writer = self
      .writer
      .lock()
      .map_err(|_| ConsoleOutputError::Poisoned)?;

    let [batch, channels, candidates] = result.shape;
    writeln!(writer, "输出形状: ({}, {}, {})", batch, channels, candidates)?;
    for item in result.items.iter() {
      writeln!(writer, "检测 {} → confidence={}", item.index, item.confidence)?;
    }
    writer.flush()?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Candidate;

  #[test]
  fn test_console_lines() {
    let output = ConsoleOutput::with_writer(Vec::new());
    let result = DetectResult {
      shape: [1, 7, 3549],
      threshold: 0.5,
      items: vec![
        Candidate {
          index: 12,
          confidence: 0.75,
        },
        Candidate {
          index: 3000,
          confidence: 0.5625,
        },
      ]
      .into_boxed_slice(),
    };

    output.render_result(&(), &result).unwrap();
    let text = String::from_utf8(output.into_inner().unwrap()).unwrap();
    assert_eq!(
      text,
      "输出形状: (1, 7, 3549)\n检测 12 → confidence=0.75\n检测 3000 → confidence=0.5625\n"
    );
  }
}
