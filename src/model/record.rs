// 该文件是 THC Counter （虾血细胞计数） 项目的一部分。
// src/model/record.rs - 检测记录回放
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

//! 从记录文件回放检测结果
//!
//! 记录文件每行一个检测框：
//!
//! ```text
//! [label, ]score, x_min, y_min, x_max, y_max
//! ```
//!
//! 空行与 `#` 开头的行会被忽略。默认坐标为像素坐标；URL 带 `normalized`
//! 查询参数时坐标按 `[0, 1]` 归一化，检测时再按图像尺寸换算。
//!
//! - `record:///path/to/boxes.txt`
//! - `record:///path/to/boxes.txt?normalized`

use std::path::Path;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{Detection, DetectionSet, Detector, DetectorError},
};

#[derive(Error, Debug)]
pub enum RecordError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("记录文件路径无效: {0}")]
  InvalidPath(String),
  #[error("第 {line} 行格式错误: {reason}")]
  ParseError { line: usize, reason: String },
  #[error("检测框超出图像范围 {width}x{height}: {bbox:?}")]
  OutOfBounds {
    bbox: [f32; 4],
    width: u32,
    height: u32,
  },
}

impl From<RecordError> for DetectorError {
  fn from(err: RecordError) -> Self {
    match err {
      RecordError::SchemeMismatch(scheme) => DetectorError::SchemeMismatch(scheme),
      RecordError::IoError(_) | RecordError::InvalidPath(_) | RecordError::ParseError { .. } => {
        DetectorError::ModelLoadError(err.to_string())
      }
      RecordError::OutOfBounds { .. } => DetectorError::InferenceError(err.to_string()),
    }
  }
}

pub struct RecordDetector {
  detections: DetectionSet,
  normalized: bool,
}

impl FromUrlWithScheme for RecordDetector {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordDetector {
  type Error = RecordError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RecordError::SchemeMismatch(format!(
        "期望方案 '{}', 实际方案 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let normalized = url.query_pairs().any(|(k, _)| k == "normalized");
    let path = url
      .to_file_path()
      .map_err(|_| RecordError::InvalidPath(url.to_string()))?;
    Self::open(path, normalized)
  }
}

impl RecordDetector {
  pub fn open(path: impl AsRef<Path>, normalized: bool) -> Result<Self, RecordError> {
    let path = path.as_ref();
    info!("加载检测记录: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    let detector = Self::parse(&text, normalized)?;
    info!("检测记录加载完成，共 {} 个检测框", detector.detections.len());
    Ok(detector)
  }

  pub fn parse(text: &str, normalized: bool) -> Result<Self, RecordError> {
    let mut items = Vec::new();
    for (index, line) in text.lines().enumerate() {
      let line = line.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }
      items.push(parse_line(index + 1, line)?);
    }

    Ok(Self {
      detections: items.into(),
      normalized,
    })
  }
}

fn parse_line(line_no: usize, line: &str) -> Result<Detection, RecordError> {
  let fields: Vec<&str> = line.split(',').map(str::trim).collect();
  // 首列可能是类别名或类别编号，与检测结果无关
  let numbers = match fields.len() {
    5 => &fields[..],
    6 => &fields[1..],
    n => {
      return Err(RecordError::ParseError {
        line: line_no,
        reason: format!("期望 5 或 6 列，实际 {} 列", n),
      });
    }
  };

  let mut values = [0f32; 5];
  for (value, field) in values.iter_mut().zip(numbers) {
    *value = field.parse().map_err(|e| RecordError::ParseError {
      line: line_no,
      reason: format!("无法解析数值 '{}': {}", field, e),
    })?;
  }

  let [score, x_min, y_min, x_max, y_max] = values;
  Detection::new([x_min, y_min, x_max, y_max], score).ok_or_else(|| RecordError::ParseError {
    line: line_no,
    reason: "检测框宽或高不为正".to_string(),
  })
}

impl Detector for RecordDetector {
  type Error = RecordError;

  fn detect(&self, image: &RgbImage) -> Result<DetectionSet, Self::Error> {
    let (width, height) = image.dimensions();
    let (w, h) = (width as f32, height as f32);

    let mut items = Vec::with_capacity(self.detections.len());
    for item in self.detections.iter() {
      let bbox = if self.normalized {
        [
          item.x_min() * w,
          item.y_min() * h,
          item.x_max() * w,
          item.y_max() * h,
        ]
      } else {
        item.bbox
      };

      let out_of_bounds = RecordError::OutOfBounds {
        bbox,
        width,
        height,
      };
      if bbox[0] < 0.0 || bbox[1] < 0.0 || bbox[2] > w || bbox[3] > h {
        return Err(out_of_bounds);
      }

      // 归一化坐标在极小图像上可能缩成零宽或零高
      items.push(Detection::new(bbox, item.score).ok_or(out_of_bounds)?);
    }

    debug!("回放 {} 个检测框", items.len());
    Ok(items.into())
  }
}
