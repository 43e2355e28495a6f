// 该文件是 Shanan Lite （山南西风·轻） 项目的一部分。
// src/output/json_record.rs - JSON 结果记录
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

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, model::DetectResult, output::Render};

#[derive(Error, Debug)]
pub enum JsonRecordError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 把一次推理的候选列表写成 JSON 文件
pub struct JsonRecordOutput {
  path: PathBuf,
}

impl FromUrlWithScheme for JsonRecordOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonRecordOutput {
  type Error = JsonRecordError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonRecordError::SchemeMismatch);
    }

    Ok(Self::new(uri.path()))
  }
}

impl JsonRecordOutput {
  pub fn new(path: impl AsRef<Path>) -> Self {
    JsonRecordOutput {
      path: path.as_ref().to_path_buf(),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

/// `f32` 直接转 `f64` 会带出多余位数（0.9 变成 0.8999999761581421），
/// 这里取 `f32` 的最短十进制表示，与控制台输出保持一致。
fn shortest_decimal(value: f32) -> f64 {
  value.to_string().parse().unwrap_or(value as f64)
}

pub fn to_json(result: &DetectResult) -> serde_json::Value {
  let candidates: Vec<_> = result
    .items
    .iter()
    .map(|item| {
      json!({
        "index": item.index,
        "confidence": shortest_decimal(item.confidence),
      })
    })
    .collect();

  json!({
    "timestamp": Utc::now().to_rfc3339(),
    "shape": result.shape,
    "threshold": shortest_decimal(result.threshold),
    "candidates": candidates,
  })
}

impl<F> Render<F, DetectResult> for JsonRecordOutput {
  type Error = JsonRecordError;

  fn render_result(&self, _frame: &F, result: &DetectResult) -> Result<(), Self::Error> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let text = serde_json::to_string_pretty(&to_json(result))?;
    std::fs::write(&self.path, text)?;

    warn!("保存检测记录到文件: {}", self.path.display());
    Ok(())
  }
}
