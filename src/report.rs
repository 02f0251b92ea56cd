// 该文件是 THC Counter （虾血细胞计数） 项目的一部分。
// src/report.rs - 分析结果与导出格式
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

use chrono::{DateTime, Local};
use serde_json::{Value, json};

use crate::{
  model::DetectionSet,
  status::{GuidanceBundle, StatusCategory},
  thc::ConcentrationResult,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 一次分析的完整结果，交给展示层
#[derive(Debug, Clone)]
pub struct Analysis {
  pub analyzed_at: DateTime<Local>,
  pub dilution_factor: f64,
  pub detections: DetectionSet,
  pub count: usize,
  pub concentration: ConcentrationResult,
  pub category: StatusCategory,
  pub guidance: &'static GuidanceBundle,
}

impl Analysis {
  /// 纯文本导出记录
  pub fn to_text(&self) -> String {
    let g = self.guidance;
    format!(
      "HEMOCYTE COUNT ANALYSIS RESULTS\n\
       ================================\n\
       Analysis Date: {date}\n\
       Dilution Factor: {dilution}x\n\
       \n\
       COUNTS:\n\
       - Hemocytes Detected: {count}\n\
       - THC (cells/μL): {per_ul}\n\
       - THC (cells/mL): {per_ml}\n\
       \n\
       STATUS: {status}\n\
       THC Range: {range}\n\
       \n\
       RECOMMENDATIONS:\n\
       Water Management: {water}\n\
       Pond Bottom Management: {pond}\n\
       Feeding Management: {feeding}\n",
      date = self.analyzed_at.format(TIMESTAMP_FORMAT),
      dilution = self.dilution_factor,
      count = self.count,
      per_ul = scientific(self.concentration.cells_per_microliter),
      per_ml = scientific(self.concentration.cells_per_milliliter),
      status = g.status_label,
      range = g.range_label,
      water = g.water_guidance,
      pond = g.pond_guidance,
      feeding = g.feeding_guidance,
    )
  }

  pub fn to_json(&self) -> Value {
    let g = self.guidance;
    json!({
      "analysis_date": self.analyzed_at.format(TIMESTAMP_FORMAT).to_string(),
      "dilution_factor": self.dilution_factor,
      "count": self.count,
      "cells_per_ul": self.concentration.cells_per_microliter,
      "cells_per_ml": self.concentration.cells_per_milliliter,
      "category": self.category.as_str(),
      "guidance": {
        "range": g.range_label,
        "status": g.status_label,
        "color": g.color,
        "water": g.water_guidance,
        "pond": g.pond_guidance,
        "feeding": g.feeding_guidance,
      },
      "detections": self
        .detections
        .iter()
        .map(|d| json!({ "score": d.score, "bbox": d.bbox }))
        .collect::<Vec<_>>(),
    })
  }
}

/// 两位小数的科学计数法，指数带符号且至少两位，如 `2.00e+03`
pub fn scientific(value: f64) -> String {
  let formatted = format!("{:.2e}", value);
  match formatted.split_once('e') {
    Some((mantissa, exponent)) => match exponent.parse::<i32>() {
      Ok(exp) => {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
      }
      Err(_) => formatted,
    },
    // inf / NaN
    None => formatted,
  }
}
