//! 模型加载失败路径测试，不需要真实模型文件

#![cfg(feature = "model_tflite")]

use shanan_lite::{
  FromUrl,
  frame::NormalizedNhwcFrame,
  model::{TfliteDetector, TfliteDetectorBuilder, TfliteError},
};
use url::Url;

type Frame = NormalizedNhwcFrame<416, 416>;

#[test]
fn missing_model_fails_with_load_error() {
  let url = Url::parse("tflite:///nonexistent/shanan-lite/best_float32.tflite").unwrap();
  let result: Result<TfliteDetector<Frame>, _> = TfliteDetectorBuilder::from_url(&url)
    .unwrap()
    .build();
  assert!(matches!(result, Err(TfliteError::ModelLoadError(_))));
}

#[test]
fn wrong_scheme_is_rejected_before_loading() {
  let url = Url::parse("image:///nonexistent/shanan-lite/best_float32.tflite").unwrap();
  assert!(matches!(
    TfliteDetectorBuilder::from_url(&url),
    Err(TfliteError::ModelPathError(_))
  ));
}
