// 该文件是 Shanan Lite （山南西风·轻） 项目的一部分。
// src/frame.rs - NHWC 归一化帧定义
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

use crate::{input::AsNhwcTensor, tensor::TensorError};

const RGB_CHANNELS: usize = 3;

/// 模型输入张量，形状为 `(1, H, W, 3)`，取值归一化到 `[0, 1]`。
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedNhwcFrame<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

impl<const W: u32, const H: u32> TryFrom<Vec<f32>> for NormalizedNhwcFrame<W, H> {
  type Error = TensorError;

  fn try_from(data: Vec<f32>) -> Result<Self, Self::Error> {
    let expected = RGB_CHANNELS * W as usize * H as usize;
    if data.len() != expected {
      return Err(TensorError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

impl<const W: u32, const H: u32> Default for NormalizedNhwcFrame<W, H> {
  fn default() -> Self {
    let size = RGB_CHANNELS * (W as usize) * (H as usize);
    let data = vec![0f32; size].into_boxed_slice();
    Self { data }
  }
}

impl<const W: u32, const H: u32> NormalizedNhwcFrame<W, H> {
  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn shape(&self) -> [usize; 4] {
    [1, H as usize, W as usize, RGB_CHANNELS]
  }
}

impl<const W: u32, const H: u32> AsMut<[f32]> for NormalizedNhwcFrame<W, H> {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

impl<const W: u32, const H: u32> AsNhwcTensor for NormalizedNhwcFrame<W, H> {
  fn shape(&self) -> [usize; 4] {
    NormalizedNhwcFrame::shape(self)
  }

  fn as_nhwc(&self) -> &[f32] {
    &self.data
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_shape() {
    let frame = NormalizedNhwcFrame::<416, 416>::default();
    assert_eq!(frame.shape(), [1, 416, 416, 3]);
    assert_eq!(frame.as_nhwc().len(), 416 * 416 * 3);
  }

  #[test]
  fn test_try_from_length() {
    let ok = NormalizedNhwcFrame::<2, 1>::try_from(vec![0.5; 6]);
    assert!(ok.is_ok());

    let err = NormalizedNhwcFrame::<2, 1>::try_from(vec![0.5; 5]);
    assert_eq!(
      err,
      Err(TensorError::LengthMismatch {
        expected: 6,
        actual: 5
      })
    );
  }
}
