// 该文件是 Shanan Lite （山南西风·轻） 项目的一部分。
// src/model.rs - 模型
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

use crate::tensor::{OutputTensor, TensorError};

/// 默认置信度阈值
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

pub trait Model {
  type Input;
  type Output;
  type Error;

  /// 推理会改写解释器内部缓冲区，因此需要独占访问
  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 超过阈值的候选位置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub index: usize,
  pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectResult {
  /// 原始输出张量形状 `(1, C, N)`
  pub shape: [usize; 3],
  pub threshold: f32,
  pub items: Box<[Candidate]>,
}

impl DetectResult {
  pub fn from_output(
    output: &OutputTensor,
    channel: usize,
    threshold: f32,
  ) -> Result<Self, TensorError> {
    let items = output.candidates(channel, threshold)?.collect::<Vec<_>>();
    Ok(DetectResult {
      shape: output.shape(),
      threshold,
      items: items.into_boxed_slice(),
    })
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

#[cfg(feature = "model_tflite")]
mod tflite_detector;
#[cfg(feature = "model_tflite")]
pub use self::tflite_detector::{TfliteDetector, TfliteDetectorBuilder, TfliteError};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_detect_result_from_output() {
    let mut data = vec![0.0f32; 3 * 4];
    data[..4].copy_from_slice(&[0.7, 0.1, 0.3, 0.8]);
    let output = OutputTensor::from_dims(&[1, 3, 4], data).unwrap();

    let result = DetectResult::from_output(&output, 0, 0.25).unwrap();
    assert_eq!(result.shape, [1, 3, 4]);
    assert_eq!(result.len(), 3);
    assert_eq!(
      result.items.iter().map(|c| c.index).collect::<Vec<_>>(),
      vec![0, 2, 3]
    );

    let empty = DetectResult::from_output(&output, 1, 0.25).unwrap();
    assert!(empty.is_empty());
  }
}
