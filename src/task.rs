// 该文件是 THC Counter （虾血细胞计数） 项目的一部分。
// src/task.rs - 分析流程编排
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

use chrono::Local;
use image::RgbImage;
use thiserror::Error;
use tracing::{error, info};

use crate::{
  model::{Detector, DetectorError},
  output::Render,
  report::Analysis,
  status::classify,
  thc::{ThcError, calculate_concentration},
};

#[derive(Error, Debug)]
pub enum AnalysisError {
  #[error("{0}")]
  InvalidInput(#[from] ThcError),
  #[error("检测不可用: {0}")]
  DetectionUnavailable(#[source] DetectorError),
}

/// 检测 → 计数 → 浓度 → 分级
///
/// 检测器由调用方构建后传入；检测失败时直接返回，不会进入浓度计算。
pub fn analyze<D: Detector>(
  detector: &D,
  image: &RgbImage,
  dilution_factor: f64,
) -> Result<Analysis, AnalysisError> {
  let now = std::time::Instant::now();
  let detections = detector.detect(image).map_err(|e| {
    let e: DetectorError = e.into();
    error!("血细胞检测失败: {}", e);
    AnalysisError::DetectionUnavailable(e)
  })?;
  info!("检测完成，耗时: {:.2?}", now.elapsed());

  let count = detections.len();
  let signed_count = i64::try_from(count)
    .map_err(|_| ThcError::invalid(format!("细胞计数超出范围: {}", count)))?;
  let concentration = calculate_concentration(signed_count, dilution_factor)?;
  let (category, guidance) = classify(concentration.cells_per_milliliter)?;

  info!(
    "检测到 {} 个血细胞，THC: {:.2e} cells/μL, {:.2e} cells/mL, 状态: {}",
    count, concentration.cells_per_microliter, concentration.cells_per_milliliter, category
  );

  Ok(Analysis {
    analyzed_at: Local::now(),
    dilution_factor,
    detections,
    count,
    concentration,
    category,
    guidance,
  })
}

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 单幅图像分析任务
#[derive(Debug, Clone, Copy)]
pub struct AnalysisTask {
  dilution_factor: f64,
}

impl AnalysisTask {
  pub fn new(dilution_factor: f64) -> Self {
    Self { dilution_factor }
  }
}

impl<
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = RgbImage>,
  M: Detector,
  O: Render<RgbImage, Analysis, Error = RE>,
> Task<I, M, O> for AnalysisTask
{
  type Output = Analysis;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始分析，稀释倍数: {}x", self.dilution_factor);
    let image = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    let analysis = analyze(&model, &image, self.dilution_factor)?;
    output.render_result(&image, &analysis)?;
    info!("结果输出完成");

    Ok(analysis)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;

  use crate::{
    model::{Detection, DetectionSet},
    status::StatusCategory,
  };

  struct FixedDetector(usize);

  impl Detector for FixedDetector {
    type Error = DetectorError;

    fn detect(&self, _image: &RgbImage) -> Result<DetectionSet, Self::Error> {
      Ok(
        (0..self.0)
          .filter_map(|i| {
            let x = (i % 20) as f32 * 12.0;
            let y = (i / 20) as f32 * 12.0;
            Detection::new([x, y, x + 10.0, y + 10.0], 0.9)
          })
          .collect(),
      )
    }
  }

  struct BrokenDetector;

  impl Detector for BrokenDetector {
    type Error = DetectorError;

    fn detect(&self, _image: &RgbImage) -> Result<DetectionSet, Self::Error> {
      Err(DetectorError::ModelLoadError("model.pt 不存在".to_string()))
    }
  }

  #[test]
  fn fourteen_cells_double_dilution_is_medium() {
    let image = RgbImage::new(256, 256);
    let analysis = analyze(&FixedDetector(14), &image, 2.0).unwrap();
    assert_eq!(analysis.count, 14);
    assert_relative_eq!(
      analysis.concentration.cells_per_microliter,
      2000.0,
      max_relative = 1e-9
    );
    assert_relative_eq!(
      analysis.concentration.cells_per_milliliter,
      2.0e6,
      max_relative = 1e-9
    );
    assert_eq!(analysis.category, StatusCategory::Medium);
    assert_eq!(analysis.guidance.status_label, "🟡 MODERATE IMMUNITY");
  }

  #[test]
  fn empty_image_is_low() {
    let image = RgbImage::new(64, 64);
    let analysis = analyze(&FixedDetector(0), &image, 1.0).unwrap();
    assert_eq!(analysis.count, 0);
    assert_eq!(analysis.concentration.cells_per_milliliter, 0.0);
    assert_eq!(analysis.category, StatusCategory::Low);
  }

  #[test]
  fn detector_failure_aborts() {
    let image = RgbImage::new(64, 64);
    let err = analyze(&BrokenDetector, &image, 1.0).unwrap_err();
    assert!(matches!(
      err,
      AnalysisError::DetectionUnavailable(DetectorError::ModelLoadError(_))
    ));
  }

  #[test]
  fn invalid_dilution_propagates() {
    let image = RgbImage::new(64, 64);
    let err = analyze(&FixedDetector(3), &image, 0.0).unwrap_err();
    assert!(matches!(
      err,
      AnalysisError::InvalidInput(ThcError::InvalidInput(_))
    ));
  }

  #[test]
  fn repeated_runs_agree() {
    let image = RgbImage::new(64, 64);
    let a = analyze(&FixedDetector(200), &image, 5.0).unwrap();
    let b = analyze(&FixedDetector(200), &image, 5.0).unwrap();
    assert_eq!(a.concentration, b.concentration);
    assert_eq!(a.category, b.category);
    assert_eq!(a.category, StatusCategory::High);
  }

  struct NullRender;

  impl Render<RgbImage, Analysis> for NullRender {
    type Error = std::io::Error;

    fn render_result(&self, _frame: &RgbImage, _result: &Analysis) -> Result<(), Self::Error> {
      Ok(())
    }
  }

  #[test]
  fn task_requires_an_input_image() {
    let task = AnalysisTask::new(1.0);
    let result = task.run_task(std::iter::empty::<RgbImage>(), FixedDetector(1), NullRender);
    assert!(result.is_err());

    let analysis = task
      .run_task(std::iter::once(RgbImage::new(32, 32)), FixedDetector(1), NullRender)
      .unwrap();
    assert_eq!(analysis.count, 1);
  }
}
