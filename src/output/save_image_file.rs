// 该文件是 THC Counter （虾血细胞计数） 项目的一部分。
// src/output/save_image_file.rs - 保存标注图像
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

use std::path::PathBuf;

use image::RgbImage;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{Render, draw::Draw},
  report::Analysis,
};

pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Draw,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("图像路径无效: {0}")]
  InvalidPath(String),
  #[error("边框宽度无效: {0}")]
  InvalidThickness(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let path = uri
      .to_file_path()
      .map_err(|_| SaveImageFileError::InvalidPath(uri.to_string()))?;

    let mut draw = Draw::default();
    for (k, v) in uri.query_pairs() {
      if k == "thickness" {
        let thickness = v
          .parse()
          .map_err(|_| SaveImageFileError::InvalidThickness(v.to_string()))?;
        draw = draw.with_thickness(thickness);
      }
    }

    Ok(SaveImageFileOutput { path, draw })
  }
}

impl SaveImageFileOutput {
  fn save_image(&self, image: RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(&self.path)?;

    info!("保存标注图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render<RgbImage, Analysis> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &RgbImage, result: &Analysis) -> Result<(), Self::Error> {
    let image = self.draw.draw_detections(frame, &result.detections);
    self.save_image(image)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Local;
  use image::Rgb;
  use tempfile::TempDir;

  use crate::{
    model::{Detection, DetectionSet},
    status::classify,
    thc::calculate_concentration,
  };

  fn one_box_analysis() -> Analysis {
    let detections: DetectionSet = vec![Detection::new([2.0, 2.0, 10.0, 10.0], 0.8).unwrap()].into();
    let concentration = calculate_concentration(1, 1.0).unwrap();
    let (category, guidance) = classify(concentration.cells_per_milliliter).unwrap();
    Analysis {
      analyzed_at: Local::now(),
      dilution_factor: 1.0,
      count: detections.len(),
      detections,
      concentration,
      category,
      guidance,
    }
  }

  #[test]
  fn saves_annotated_copy() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("annotated.png");
    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();

    let frame = RgbImage::from_pixel(16, 16, Rgb([255, 255, 255]));
    output.render_result(&frame, &one_box_analysis()).unwrap();

    let saved = image::open(&path).unwrap().to_rgb8();
    assert_eq!(saved.get_pixel(2, 2), &Rgb([0, 255, 0]));
    assert_eq!(saved.get_pixel(6, 6), &Rgb([255, 255, 255]));
  }

  #[test]
  fn saves_into_directory_with_space() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("pond A").join("标注 1.png");
    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    assert!(url.path().contains("%20"));
    let output = SaveImageFileOutput::from_url(&url).unwrap();

    let frame = RgbImage::from_pixel(16, 16, Rgb([255, 255, 255]));
    output.render_result(&frame, &one_box_analysis()).unwrap();
    assert!(path.exists());
  }

  #[test]
  fn thickness_query_widens_border() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("thick.png");
    let url = Url::parse(&format!("image://{}?thickness=4", path.display())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();

    let frame = RgbImage::from_pixel(16, 16, Rgb([255, 255, 255]));
    output.render_result(&frame, &one_box_analysis()).unwrap();

    let saved = image::open(&path).unwrap().to_rgb8();
    assert_eq!(saved.get_pixel(5, 5), &Rgb([0, 255, 0]));
    assert_eq!(saved.get_pixel(6, 6), &Rgb([255, 255, 255]));
  }

  #[test]
  fn invalid_thickness_is_rejected() {
    let url = Url::parse("image:///tmp/annotated.png?thickness=wide").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::InvalidThickness(_))
    ));
  }
}
