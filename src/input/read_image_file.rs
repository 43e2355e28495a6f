// 该文件是 Shanan Lite （山南西风·轻） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::Path;

use image::{ImageReader, RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::NormalizedNhwcFrame,
  input::ChannelOrder,
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemaMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("参数错误: {0}")]
  InvalidParameter(String),
}

/// 单张图像输入，读取后缩放到 `W x H`
pub struct ImageFileInput<const W: u32, const H: u32> {
  image: Option<RgbImage>,
  order: ChannelOrder,
}

impl<const W: u32, const H: u32> FromUrlWithScheme for ImageFileInput<W, H> {
  const SCHEME: &'static str = "image";
}

impl<const W: u32, const H: u32> FromUrl for ImageFileInput<W, H> {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let mut order = ChannelOrder::default();
    for (k, v) in url.query_pairs() {
      if k == "order" {
        order = v
          .parse()
          .map_err(|e: crate::input::InputError| ImageFileInputError::InvalidParameter(e.to_string()))?;
      }
    }

    Self::open(url.path(), order)
  }
}

impl<const W: u32, const H: u32> ImageFileInput<W, H> {
  pub fn open(path: impl AsRef<Path>, order: ChannelOrder) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    info!("读取图像文件: {}", path.display());
    let image = ImageReader::open(path)?.decode()?;
    debug!("原始图像尺寸: {}x{}", image.width(), image.height());
    Ok(Self::from_image(image.to_rgb8(), order))
  }

  pub fn from_image(image: RgbImage, order: ChannelOrder) -> Self {
    ImageFileInput {
      image: Some(image),
      order,
    }
  }

  pub fn into_nhwc(self) -> ImageFileInputNhwc<W, H> {
    ImageFileInputNhwc { inner: self }
  }
}

pub struct ImageFileInputNhwc<const W: u32, const H: u32> {
  inner: ImageFileInput<W, H>,
}

impl<const W: u32, const H: u32> Iterator for ImageFileInputNhwc<W, H> {
  type Item = NormalizedNhwcFrame<W, H>;

  fn next(&mut self) -> Option<Self::Item> {
    let order = self.inner.order;
    self
      .inner
      .image
      .take()
      .map(|image| normalize::<W, H>(&image, order))
  }
}

/// 缩放到 `W x H` 后逐像素除以 255
///
/// 放大时与 OpenCV `INTER_LINEAR` 一致；缩小时三角滤波会覆盖更多源像素，
/// 结果带抗锯齿，与 `INTER_LINEAR` 不同。
fn normalize<const W: u32, const H: u32>(
  image: &RgbImage,
  order: ChannelOrder,
) -> NormalizedNhwcFrame<W, H> {
  let resized = if image.dimensions() == (W, H) {
    image.clone()
  } else {
    image::imageops::resize(image, W, H, FilterType::Triangle)
  };

  let mut frame = NormalizedNhwcFrame::<W, H>::default();
  let channels = frame.channels();
  let slice = frame.as_mut();

  for (w, h, pixel) in resized.enumerate_pixels() {
    let base = (h as usize * W as usize + w as usize) * channels;
    for c in 0..channels {
      let src = match order {
        ChannelOrder::Rgb => c,
        ChannelOrder::Bgr => channels - 1 - c,
      };
      slice[base + c] = pixel[src] as f32 / 255.0;
    }
  }

  debug!("输入张量形状: {:?}", frame.shape());
  frame
}
