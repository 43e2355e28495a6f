// 该文件是 Shanan Lite （山南西风·轻） 项目的一部分。
// src/tensor.rs - 模型输出张量与置信度筛选
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

use std::fmt;

use thiserror::Error;

use crate::model::Candidate;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
  #[error("张量布局不匹配: 期望 {layout}, 实际 {actual:?}")]
  UnexpectedLayout {
    layout: &'static str,
    actual: Vec<usize>,
  },
  #[error("张量数据长度不匹配: 期望 {expected}, 实际 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("置信度通道越界: 通道 {channel}, 通道数 {channels}")]
  ChannelOutOfRange { channel: usize, channels: usize },
}

/// 检测模型的原始输出，形状为 `(1, C, N)`。
///
/// `C` 为每个候选位置的通道数，`N` 为候选位置数量。数据按行优先存放，
/// 即 `data[c * N + i]` 对应 `output[0][c][i]`。
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
  channels: usize,
  candidates: usize,
  data: Box<[f32]>,
}

impl OutputTensor {
  /// 按模型声明的维度构造输出张量，维度必须是 `[1, C, N]`。
  pub fn from_dims(dims: &[usize], data: Vec<f32>) -> Result<Self, TensorError> {
    let layout = || TensorError::UnexpectedLayout {
      layout: "(1, C, N)",
      actual: dims.to_vec(),
    };
    let &[1, channels, candidates] = dims else {
      return Err(layout());
    };
    let expected = channels.checked_mul(candidates).ok_or_else(layout)?;
    if expected != data.len() {
      return Err(TensorError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }
    Ok(Self {
      channels,
      candidates,
      data: data.into_boxed_slice(),
    })
  }

  pub fn shape(&self) -> [usize; 3] {
    [1, self.channels, self.candidates]
  }

  pub fn channels(&self) -> usize {
    self.channels
  }

  pub fn num_candidates(&self) -> usize {
    self.candidates
  }

  /// `output[0][channel]` 整行
  pub fn row(&self, channel: usize) -> Option<&[f32]> {
    if channel >= self.channels {
      return None;
    }
    let start = channel * self.candidates;
    Some(&self.data[start..start + self.candidates])
  }

  /// 扫描置信度通道，按下标升序产出置信度严格大于 `threshold` 的候选。
  ///
  /// 阈值不做范围校验，超出 `[0, 1]` 时结果为空或全部。
  pub fn candidates(&self, channel: usize, threshold: f32) -> Result<Candidates<'_>, TensorError> {
    let row = self.row(channel).ok_or(TensorError::ChannelOutOfRange {
      channel,
      channels: self.channels,
    })?;
    Ok(Candidates {
      row: row.iter().enumerate(),
      threshold,
    })
  }
}

impl fmt::Display for OutputTensor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "(1, {}, {})", self.channels, self.candidates)
  }
}

/// 候选筛选迭代器，见 [`OutputTensor::candidates`]。
pub struct Candidates<'a> {
  row: std::iter::Enumerate<std::slice::Iter<'a, f32>>,
  threshold: f32,
}

impl Iterator for Candidates<'_> {
  type Item = Candidate;

  fn next(&mut self) -> Option<Self::Item> {
    let threshold = self.threshold;
    self
      .row
      .by_ref()
      .find(|(_, confidence)| **confidence > threshold)
      .map(|(index, &confidence)| Candidate { index, confidence })
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (0, self.row.size_hint().1)
  }
}
