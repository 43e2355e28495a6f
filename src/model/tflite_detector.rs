// 该文件是 Shanan Lite （山南西风·轻） 项目的一部分。
// src/model/tflite_detector.rs - TFLite 检测模型
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

use thiserror::Error;
use tflite::context::{ElemKindOf, ElementKind};
use tflite::ops::builtin::BuiltinOpResolver;
use tflite::{FlatBufferModel, Interpreter, InterpreterBuilder};
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::AsNhwcTensor,
  model::{DEFAULT_CONFIDENCE_THRESHOLD, DetectResult, Model},
  tensor::{OutputTensor, TensorError},
};

const TFLITE_NUM_INPUTS: usize = 1;
const TFLITE_INPUT_RANK: usize = 4;
const TFLITE_OUTPUT_RANK: usize = 3;
const TFLITE_INPUT_CHANNELS: usize = 3;
/// 置信度所在通道，由模型决定
const TFLITE_DEFAULT_CONFIDENCE_CHANNEL: usize = 0;

#[derive(Error, Debug)]
pub enum TfliteError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型解析错误: {0}, 错误: {1}")]
  ModelParseError(String, String),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("张量形状不匹配: 期望 {expected:?}, 实际 {actual:?}")]
  ShapeMismatch {
    expected: Vec<usize>,
    actual: Vec<usize>,
  },
  #[error("输出张量错误: {0}")]
  Tensor(#[from] TensorError),
  #[error("TFLite 推理错误: {0}")]
  Inference(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("参数错误: {0}")]
  InvalidParameter(String),
}

impl From<tflite::Error> for TfliteError {
  fn from(err: tflite::Error) -> Self {
    TfliteError::Inference(format!("{:?}", err))
  }
}

impl TfliteError {
  pub fn parse(msg: &str, e: tflite::Error) -> Self {
    TfliteError::ModelParseError(msg.to_string(), format!("{:?}", e))
  }

  pub fn invalid(msg: String) -> Self {
    error!("{}", msg);
    TfliteError::ModelInvalid(msg)
  }
}

/// 已加载的 TFLite 检测模型
///
/// 只能由 [`TfliteDetectorBuilder::build`] 构造，加载失败时不会产生任何检测器实例。
pub struct TfliteDetector<Frame> {
  interpreter: Interpreter<'static, BuiltinOpResolver>,
  input_index: i32,
  output_index: i32,
  input_dims: Vec<usize>,
  output_dims: Vec<usize>,
  channel: usize,
  threshold: f32,
  _phantom: std::marker::PhantomData<Frame>,
}

#[derive(Debug, Clone)]
pub struct TfliteDetectorBuilder {
  model_path: String,
  channel: usize,
  threads: Option<usize>,
  threshold: f32,
}

impl FromUrlWithScheme for TfliteDetectorBuilder {
  const SCHEME: &'static str = "tflite";
}

impl FromUrl for TfliteDetectorBuilder {
  type Error = TfliteError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(TfliteError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut builder = TfliteDetectorBuilder::new(url.path());
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "channel" => builder.channel = parse_param(&k, &v)?,
        "threads" => builder.threads = Some(parse_param(&k, &v)?),
        "threshold" => builder.threshold = parse_param(&k, &v)?,
        _ => debug!("忽略未知参数: {}={}", k, v),
      }
    }

    Ok(builder)
  }
}

fn parse_param<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, TfliteError> {
  value
    .parse()
    .map_err(|_| TfliteError::InvalidParameter(format!("{}={}", key, value)))
}

impl TfliteDetectorBuilder {
  pub fn new(model_path: impl Into<String>) -> Self {
    TfliteDetectorBuilder {
      model_path: model_path.into(),
      channel: TFLITE_DEFAULT_CONFIDENCE_CHANNEL,
      threads: None,
      threshold: DEFAULT_CONFIDENCE_THRESHOLD,
    }
  }

  pub fn channel(mut self, channel: usize) -> Self {
    self.channel = channel;
    self
  }

  pub fn threads(mut self, threads: usize) -> Self {
    self.threads = Some(threads);
    self
  }

  pub fn threshold(mut self, threshold: f32) -> Self {
    self.threshold = threshold;
    self
  }

  pub fn model_path(&self) -> &str {
    &self.model_path
  }

  pub fn build<Frame>(self) -> Result<TfliteDetector<Frame>, TfliteError> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let model = FlatBufferModel::build_from_buffer(model_data)
      .map_err(|e| TfliteError::parse("无法解析 FlatBuffer 模型", e))?;

    info!("创建 TFLite 解释器");
    let resolver = BuiltinOpResolver::default();
    let builder = InterpreterBuilder::new(model, resolver)
      .map_err(|e| TfliteError::parse("无法创建解释器构建器", e))?;
    let mut interpreter = builder
      .build()
      .map_err(|e| TfliteError::parse("无法创建解释器", e))?;

    if let Some(threads) = self.threads {
      debug!("解释器线程数: {}", threads);
      interpreter.set_num_threads(threads as i32);
    }

    interpreter
      .allocate_tensors()
      .map_err(|e| TfliteError::parse("无法分配张量", e))?;

    let inputs = interpreter.inputs().to_vec();
    let outputs = interpreter.outputs().to_vec();
    debug!("模型输入数量: {}", inputs.len());
    debug!("模型输出数量: {}", outputs.len());

    if inputs.len() != TFLITE_NUM_INPUTS {
      return Err(TfliteError::invalid(format!(
        "预期模型输入数量为 {}, 实际为 {}",
        TFLITE_NUM_INPUTS,
        inputs.len()
      )));
    }
    let Some(&output_index) = outputs.first() else {
      return Err(TfliteError::invalid("模型没有输出".to_string()));
    };
    let input_index = inputs[0];

    let input_info = interpreter
      .tensor_info(input_index)
      .ok_or_else(|| TfliteError::invalid("无法获取输入张量信息".to_string()))?;
    let output_info = interpreter
      .tensor_info(output_index)
      .ok_or_else(|| TfliteError::invalid("无法获取输出张量信息".to_string()))?;
    check_float32("输入", input_info.element_kind)?;
    check_float32("输出", output_info.element_kind)?;

    let input_dims = input_info.dims;
    let output_dims = output_info.dims;
    debug!("模型输入形状: {:?}", input_dims);
    debug!("模型输出形状: {:?}", output_dims);

    validate_dims(&input_dims, &output_dims, self.channel)?;

    info!("模型加载完成");
    Ok(TfliteDetector {
      interpreter,
      input_index,
      output_index,
      input_dims,
      output_dims,
      channel: self.channel,
      threshold: self.threshold,
      _phantom: std::marker::PhantomData,
    })
  }
}

/// 输入须为 `(1, H, W, 3)`，输出须为 `(1, C, N)` 且置信度通道小于 `C`
fn validate_dims(input: &[usize], output: &[usize], channel: usize) -> Result<(), TfliteError> {
  if input.len() != TFLITE_INPUT_RANK || input[0] != 1 || input[3] != TFLITE_INPUT_CHANNELS {
    return Err(TfliteError::invalid(format!(
      "预期输入形状为 (1, H, W, {}), 实际为 {:?}",
      TFLITE_INPUT_CHANNELS, input
    )));
  }
  if output.len() != TFLITE_OUTPUT_RANK || output[0] != 1 {
    return Err(TfliteError::invalid(format!(
      "预期输出形状为 (1, C, N), 实际为 {:?}",
      output
    )));
  }
  if channel >= output[1] {
    return Err(TfliteError::invalid(format!(
      "置信度通道 {} 超出输出通道数 {}",
      channel, output[1]
    )));
  }
  Ok(())
}

/// 只支持 float32 模型
fn check_float32(role: &str, kind: ElementKind) -> Result<(), TfliteError> {
  if kind != f32::elem_kind_of() {
    return Err(TfliteError::invalid(format!(
      "预期{}张量类型为 float32, 实际为 {:?}",
      role, kind
    )));
  }
  Ok(())
}

fn check_input_shape(expected: &[usize], actual: &[usize]) -> Result<(), TfliteError> {
  if expected != actual {
    error!("输入形状不匹配: 期望 {:?}, 实际 {:?}", expected, actual);
    return Err(TfliteError::ShapeMismatch {
      expected: expected.to_vec(),
      actual: actual.to_vec(),
    });
  }
  Ok(())
}

impl<Frame> TfliteDetector<Frame> {
  pub fn input_dims(&self) -> &[usize] {
    &self.input_dims
  }

  pub fn output_dims(&self) -> &[usize] {
    &self.output_dims
  }

  pub fn channel(&self) -> usize {
    self.channel
  }

  pub fn threshold(&self) -> f32 {
    self.threshold
  }

  /// 执行一次前向推理，返回原始输出张量
  pub fn forward<T: AsNhwcTensor>(&mut self, input: &T) -> Result<OutputTensor, TfliteError> {
    check_input_shape(&self.input_dims, &input.shape())?;

    debug!("设置模型输入");
    let data = input.as_nhwc();
    let buffer: &mut [f32] = self.interpreter.tensor_data_mut(self.input_index)?;
    if buffer.len() != data.len() {
      return Err(TfliteError::ShapeMismatch {
        expected: vec![buffer.len()],
        actual: vec![data.len()],
      });
    }
    buffer.copy_from_slice(data);

    debug!("执行模型推理");
    self.interpreter.invoke()?;

    debug!("获取模型输出");
    let raw: &[f32] = self.interpreter.tensor_data(self.output_index)?;
    let dims = self
      .interpreter
      .tensor_info(self.output_index)
      .map(|info| info.dims)
      .unwrap_or_else(|| self.output_dims.clone());
    let output = OutputTensor::from_dims(&dims, raw.to_vec())?;
    debug!("模型输出形状: {}", output);

    Ok(output)
  }
}

impl<Frame: AsNhwcTensor> Model for TfliteDetector<Frame> {
  type Input = Frame;
  type Output = DetectResult;
  type Error = TfliteError;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let output = self.forward(input)?;
    let result = DetectResult::from_output(&output, self.channel, self.threshold)?;
    debug!("检测到 {} 个候选", result.len());
    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::NormalizedNhwcFrame;

  #[test]
  fn test_builder_from_url() {
    let url = Url::parse("tflite:///models/best_float32.tflite?channel=4&threads=2&threshold=0.25")
      .unwrap();
    let builder = TfliteDetectorBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_path(), "/models/best_float32.tflite");
    assert_eq!(builder.channel, 4);
    assert_eq!(builder.threads, Some(2));
    assert_eq!(builder.threshold, 0.25);
  }

  #[test]
  fn test_builder_defaults() {
    let url = Url::parse("tflite:///models/best_float32.tflite?unknown=1").unwrap();
    let builder = TfliteDetectorBuilder::from_url(&url).unwrap();
    assert_eq!(builder.channel, TFLITE_DEFAULT_CONFIDENCE_CHANNEL);
    assert_eq!(builder.threads, None);
    assert_eq!(builder.threshold, DEFAULT_CONFIDENCE_THRESHOLD);
  }

  #[test]
  fn test_builder_scheme_mismatch() {
    let url = Url::parse("rknn:///models/best.rknn").unwrap();
    assert!(matches!(
      TfliteDetectorBuilder::from_url(&url),
      Err(TfliteError::ModelPathError(_))
    ));
  }

  #[test]
  fn test_builder_invalid_parameter() {
    let url = Url::parse("tflite:///models/best.tflite?channel=abc").unwrap();
    assert!(matches!(
      TfliteDetectorBuilder::from_url(&url),
      Err(TfliteError::InvalidParameter(_))
    ));
  }

  #[test]
  fn test_load_missing_model() {
    let result = TfliteDetectorBuilder::new("/nonexistent/shanan-lite/best_float32.tflite")
      .build::<NormalizedNhwcFrame<416, 416>>();
    assert!(matches!(result, Err(TfliteError::ModelLoadError(_))));
  }

  #[test]
  fn test_check_input_shape() {
    let frame = NormalizedNhwcFrame::<416, 416>::default();
    assert!(check_input_shape(&[1, 416, 416, 3], &frame.shape()).is_ok());

    let small = NormalizedNhwcFrame::<320, 320>::default();
    match check_input_shape(&[1, 416, 416, 3], &small.shape()) {
      Err(TfliteError::ShapeMismatch { expected, actual }) => {
        assert_eq!(expected, vec![1, 416, 416, 3]);
        assert_eq!(actual, vec![1, 320, 320, 3]);
      }
      other => panic!("Expected ShapeMismatch, got {:?}", other),
    }
  }

  #[test]
  fn test_check_float32() {
    assert!(check_float32("输入", f32::elem_kind_of()).is_ok());
    assert!(matches!(
      check_float32("输入", u8::elem_kind_of()),
      Err(TfliteError::ModelInvalid(_))
    ));
    assert!(matches!(
      check_float32("输出", i32::elem_kind_of()),
      Err(TfliteError::ModelInvalid(_))
    ));
  }

  #[test]
  fn test_validate_dims() {
    assert!(validate_dims(&[1, 416, 416, 3], &[1, 7, 3549], 0).is_ok());
    assert!(validate_dims(&[1, 416, 416, 3], &[1, 7, 3549], 6).is_ok());
    assert!(validate_dims(&[1, 416, 416, 3], &[1, 7, 3549], 7).is_err());
    assert!(validate_dims(&[1, 3, 416, 416], &[1, 7, 3549], 0).is_err());
    assert!(validate_dims(&[416, 416, 3], &[1, 7, 3549], 0).is_err());
    assert!(validate_dims(&[1, 416, 416, 3], &[7, 3549], 0).is_err());
  }
}
