// 该文件是 Shanan Lite （山南西风·轻） 项目的一部分。
// src/input.rs - 图像输入
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

use crate::{FromUrl, frame::NormalizedNhwcFrame};

/// 可直接写入模型输入张量的 NHWC 浮点数据
pub trait AsNhwcTensor {
  fn shape(&self) -> [usize; 4];
  fn as_nhwc(&self) -> &[f32];
}

/// 通道排列顺序
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelOrder {
  #[default]
  Rgb,
  Bgr,
}

impl std::str::FromStr for ChannelOrder {
  type Err = InputError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "rgb" => Ok(ChannelOrder::Rgb),
      "bgr" => Ok(ChannelOrder::Bgr),
      other => Err(InputError::InvalidParameter(format!("未知通道顺序: {}", other))),
    }
  }
}

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError, ImageFileInputNhwc};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("图像文件输入错误: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("参数错误: {0}")]
  InvalidParameter(String),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum InputWrapper<const W: u32, const H: u32> {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput<W, H>),
}

impl<const W: u32, const H: u32> FromUrl for InputWrapper<W, H> {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::<W, H>::SCHEME {
        let input = ImageFileInput::from_url(url)?;
        return Ok(InputWrapper::ReadImageFile(input));
      }
    }
    let _ = url;
    Err(InputError::SchemeMismatch)
  }
}

impl<const W: u32, const H: u32> InputWrapper<W, H> {
  pub fn into_nhwc(self) -> InputWrapperNhwcIter<W, H> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => InputWrapperNhwcIter::ReadImageFile(input.into_nhwc()),
    }
  }
}

pub enum InputWrapperNhwcIter<const W: u32, const H: u32> {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInputNhwc<W, H>),
}

impl<const W: u32, const H: u32> Iterator for InputWrapperNhwcIter<W, H> {
  type Item = NormalizedNhwcFrame<W, H>;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapperNhwcIter::ReadImageFile(input) => input.next(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_channel_order_parse() {
    assert_eq!("rgb".parse::<ChannelOrder>().unwrap(), ChannelOrder::Rgb);
    assert_eq!("BGR".parse::<ChannelOrder>().unwrap(), ChannelOrder::Bgr);
    assert!("rgba".parse::<ChannelOrder>().is_err());
  }

  #[test]
  fn test_unknown_scheme() {
    let url = url::Url::parse("camera:///dev/video0").unwrap();
    assert!(matches!(
      InputWrapper::<416, 416>::from_url(&url),
      Err(InputError::SchemeMismatch)
    ));
  }
}
