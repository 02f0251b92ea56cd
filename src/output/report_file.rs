// 该文件是 THC Counter （虾血细胞计数） 项目的一部分。
// src/output/report_file.rs - 保存分析报告
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

//! 分析报告输出
//!
//! - `report:///path/to/THC_analysis_results.txt` - 纯文本报告
//! - `report:///path/to/dir/` - 目录下的 `THC_analysis_results.txt`
//! - `report:///path/to/result.json?format=json` - JSON 报告

use std::path::PathBuf;

use image::RgbImage;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, output::Render, report::Analysis};

pub const DEFAULT_REPORT_FILE_NAME: &str = "THC_analysis_results.txt";

#[derive(Error, Debug)]
pub enum ReportFileError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("未知的报告格式: {0}")]
  UnknownFormat(String),
  #[error("报告路径无效: {0}")]
  InvalidPath(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
  #[default]
  Text,
  Json,
}

pub struct ReportFileOutput {
  path: PathBuf,
  format: ReportFormat,
}

impl FromUrlWithScheme for ReportFileOutput {
  const SCHEME: &'static str = "report";
}

impl FromUrl for ReportFileOutput {
  type Error = ReportFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(ReportFileError::SchemeMismatch(uri.scheme().to_string()));
    }

    let mut format = ReportFormat::default();
    for (k, v) in uri.query_pairs() {
      if k == "format" {
        format = match v.as_ref() {
          "text" | "txt" => ReportFormat::Text,
          "json" => ReportFormat::Json,
          other => return Err(ReportFileError::UnknownFormat(other.to_string())),
        };
      }
    }

    let mut path = uri
      .to_file_path()
      .map_err(|_| ReportFileError::InvalidPath(uri.to_string()))?;
    if uri.path().ends_with('/') {
      path.push(DEFAULT_REPORT_FILE_NAME);
    }

    Ok(ReportFileOutput { path, format })
  }
}

impl ReportFileOutput {
  pub fn path(&self) -> &std::path::Path {
    &self.path
  }
}

impl Render<RgbImage, Analysis> for ReportFileOutput {
  type Error = ReportFileError;

  fn render_result(&self, _frame: &RgbImage, result: &Analysis) -> Result<(), Self::Error> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let content = match self.format {
      ReportFormat::Text => result.to_text(),
      ReportFormat::Json => serde_json::to_string_pretty(&result.to_json())?,
    };
    std::fs::write(&self.path, content)?;

    info!("保存分析报告到文件: {}", self.path.display());
    Ok(())
  }
}
