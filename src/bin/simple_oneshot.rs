// 该文件是 Shanan Lite （山南西风·轻） 项目的一部分。
// src/bin/simple_oneshot.rs - 单张图像推理
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use shanan_lite::{
  FromUrl,
  frame::NormalizedNhwcFrame,
  input::InputWrapper,
  model::{DEFAULT_CONFIDENCE_THRESHOLD, TfliteDetector, TfliteDetectorBuilder},
  output::OutputWrapper,
  task::{OneShotTask, Task},
};
use tracing::info;

/// Shanan Lite 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// TFLite 模型文件路径，例如 tflite:///models/best_float32.tflite?channel=0
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，例如 image:///data/test.jpeg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，console: 或 json:///path/result.json
  #[arg(long, value_name = "OUTPUT", default_value = "console:")]
  pub output: Url,
  /// 置信度阈值，严格大于该值的候选才会输出
  #[arg(long, value_name = "THRESHOLD", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
  pub confidence: f32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("置信度阈值: {}", args.confidence);

  let input_image = InputWrapper::<416, 416>::from_url(&args.input)?;
  let model: TfliteDetector<NormalizedNhwcFrame<416, 416>> = TfliteDetectorBuilder::from_url(&args.model)?
    .threshold(args.confidence)
    .build()?;
  let output = OutputWrapper::from_url(&args.output)?;

  OneShotTask.run_task(input_image.into_nhwc(), model, output)?;

  Ok(())
}
