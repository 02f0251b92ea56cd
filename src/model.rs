// 该文件是 THC Counter （虾血细胞计数） 项目的一部分。
// src/model.rs - 检测模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::RgbImage;
use thiserror::Error;
use url::Url;

use crate::FromUrl;

/// 检测后端的统一错误，分为模型加载与推理两类
#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(String),
  #[error("模型推理错误: {0}")]
  InferenceError(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 血细胞检测器
///
/// 输入一幅图像，输出若干个轴对齐的检测框，顺序不作保证。
pub trait Detector {
  type Error: Into<DetectorError>;

  fn detect(&self, image: &RgbImage) -> Result<DetectionSet, Self::Error>;
}

/// 单个检测框，像素坐标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
}

impl Detection {
  /// 构造检测框，退化框（宽或高不为正）返回 `None`
  pub fn new(bbox: [f32; 4], score: f32) -> Option<Self> {
    let [x_min, y_min, x_max, y_max] = bbox;
    if x_min < x_max && y_min < y_max {
      Some(Self { score, bbox })
    } else {
      None
    }
  }

  pub fn x_min(&self) -> f32 {
    self.bbox[0]
  }

  pub fn y_min(&self) -> f32 {
    self.bbox[1]
  }

  pub fn x_max(&self) -> f32 {
    self.bbox[2]
  }

  pub fn y_max(&self) -> f32 {
    self.bbox[3]
  }
}

/// 一幅图像的全部检测结果，元素个数即血细胞计数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSet {
  pub items: Box<[Detection]>,
}

impl DetectionSet {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
    self.items.iter()
  }
}

impl From<Vec<Detection>> for DetectionSet {
  fn from(items: Vec<Detection>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

impl FromIterator<Detection> for DetectionSet {
  fn from_iter<I: IntoIterator<Item = Detection>>(iter: I) -> Self {
    iter.into_iter().collect::<Vec<_>>().into()
  }
}

#[cfg(feature = "model_record")]
mod record;
#[cfg(feature = "model_record")]
pub use self::record::{RecordDetector, RecordError};

#[cfg(feature = "model_yolo26")]
mod yolo26;
#[cfg(feature = "model_yolo26")]
pub use self::yolo26::{Yolo26, Yolo26Builder, Yolo26Error};

/// 按 URL 方案选择的检测后端
pub enum DetectorWrapper {
  #[cfg(feature = "model_record")]
  Record(RecordDetector),
  #[cfg(feature = "model_yolo26")]
  Yolo26(Yolo26),
}

impl FromUrl for DetectorWrapper {
  type Error = DetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "model_record")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == RecordDetector::SCHEME {
        let detector = RecordDetector::from_url(url)?;
        return Ok(DetectorWrapper::Record(detector));
      }
    }
    #[cfg(feature = "model_yolo26")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == Yolo26Builder::SCHEME {
        let detector = Yolo26Builder::from_url(url)?.build()?;
        return Ok(DetectorWrapper::Yolo26(detector));
      }
    }
    Err(DetectorError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl Detector for DetectorWrapper {
  type Error = DetectorError;

  fn detect(&self, image: &RgbImage) -> Result<DetectionSet, Self::Error> {
    match self {
      #[cfg(feature = "model_record")]
      DetectorWrapper::Record(detector) => detector.detect(image).map_err(DetectorError::from),
      #[cfg(feature = "model_yolo26")]
      DetectorWrapper::Yolo26(detector) => detector.detect(image).map_err(DetectorError::from),
    }
  }
}
