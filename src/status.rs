// 该文件是 THC Counter （虾血细胞计数） 项目的一部分。
// src/status.rs - 免疫状态分级与管理建议
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
use std::ops::{Bound, RangeBounds};

use tracing::debug;

use crate::thc::ThcError;

/// 免疫状态分级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCategory {
  Low,
  Medium,
  High,
}

impl StatusCategory {
  pub fn as_str(&self) -> &'static str {
    match self {
      StatusCategory::Low => "low",
      StatusCategory::Medium => "medium",
      StatusCategory::High => "high",
    }
  }
}

impl fmt::Display for StatusCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 每个分级对应的固定建议文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuidanceBundle {
  pub range_label: &'static str,
  pub status_label: &'static str,
  pub color: &'static str,
  pub water_guidance: &'static str,
  pub pond_guidance: &'static str,
  pub feeding_guidance: &'static str,
}

/// 阈值表中的一行，区间单位为 cells/mL
#[derive(Debug)]
pub struct StatusEntry {
  pub category: StatusCategory,
  pub lower: Bound<f64>,
  pub upper: Bound<f64>,
  pub guidance: GuidanceBundle,
}

impl StatusEntry {
  pub fn contains(&self, cells_per_ml: f64) -> bool {
    (self.lower, self.upper).contains(&cells_per_ml)
  }
}

const LOW_IMMUNITY_THRESHOLD: f64 = 1.0e6;
const GOOD_IMMUNITY_THRESHOLD: f64 = 1.0e7;

const STRESS_WATER_GUIDANCE: &str =
  "Monitor parameters that stress shrimp, especially Vibrio counts, ammonia and nitrites.";
const STRESS_POND_GUIDANCE: &str = "Central drain flushing and disinfectant application advised.";

// 区间首尾相接：[0, 1e6) / [1e6, 1e7] / (1e7, +inf)
static STATUS_TABLE: [StatusEntry; 3] = [
  StatusEntry {
    category: StatusCategory::Low,
    lower: Bound::Included(0.0),
    upper: Bound::Excluded(LOW_IMMUNITY_THRESHOLD),
    guidance: GuidanceBundle {
      range_label: "<1.0×10⁶ cells/mL",
      status_label: "🔴 LOW IMMUNITY",
      color: "#ff6b6b",
      water_guidance: STRESS_WATER_GUIDANCE,
      pond_guidance: STRESS_POND_GUIDANCE,
      feeding_guidance: "Immune stimulant feed coating at a minimum rate of 50%.",
    },
  },
  StatusEntry {
    category: StatusCategory::Medium,
    lower: Bound::Included(LOW_IMMUNITY_THRESHOLD),
    upper: Bound::Included(GOOD_IMMUNITY_THRESHOLD),
    guidance: GuidanceBundle {
      range_label: "1.0×10⁶ - 1.0×10⁷ cells/mL",
      status_label: "🟡 MODERATE IMMUNITY",
      color: "#ffa500",
      water_guidance: STRESS_WATER_GUIDANCE,
      pond_guidance: STRESS_POND_GUIDANCE,
      feeding_guidance: "Immune-enhance feed inclusion in the range of 25 to 50%.",
    },
  },
  StatusEntry {
    category: StatusCategory::High,
    lower: Bound::Excluded(GOOD_IMMUNITY_THRESHOLD),
    upper: Bound::Unbounded,
    guidance: GuidanceBundle {
      range_label: ">1.0×10⁷ cells/mL",
      status_label: "🟢 GOOD IMMUNITY",
      color: "#51cf66",
      water_guidance: "Maintain regular water monitoring.",
      pond_guidance: "Continue with current management.",
      feeding_guidance: "Continue with existing feeding unless unstable weather is forecasted or disease season is starting.",
    },
  },
];

/// 全部分级及其建议，按浓度从低到高排列
pub fn guidelines() -> &'static [StatusEntry] {
  &STATUS_TABLE
}

/// 根据 THC（cells/mL）给出免疫状态分级
pub fn classify(
  cells_per_ml: f64,
) -> Result<(StatusCategory, &'static GuidanceBundle), ThcError> {
  if cells_per_ml.is_nan() || cells_per_ml < 0.0 {
    return Err(ThcError::invalid(format!(
      "THC 浓度必须为非负数: {}",
      cells_per_ml
    )));
  }

  let entry = STATUS_TABLE
    .iter()
    .find(|entry| entry.contains(cells_per_ml))
    .ok_or_else(|| ThcError::invalid(format!("THC 浓度不在任何分级区间内: {}", cells_per_ml)))?;

  debug!("THC {:.2e} cells/mL 分级为 {}", cells_per_ml, entry.category);

  Ok((entry.category, &entry.guidance))
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::{Rng, SeedableRng};

  fn category(v: f64) -> StatusCategory {
    classify(v).unwrap().0
  }

  #[test]
  fn boundaries() {
    assert_eq!(category(0.0), StatusCategory::Low);
    assert_eq!(category(999_999.999), StatusCategory::Low);
    assert_eq!(category(1_000_000.0), StatusCategory::Medium);
    assert_eq!(category(10_000_000.0), StatusCategory::Medium);
    assert_eq!(category(10_000_000.0001), StatusCategory::High);
    assert_eq!(category(f64::INFINITY), StatusCategory::High);
  }

  #[test]
  fn values_next_to_thresholds() {
    let below_low = f64::from_bits(LOW_IMMUNITY_THRESHOLD.to_bits() - 1);
    let above_good = f64::from_bits(GOOD_IMMUNITY_THRESHOLD.to_bits() + 1);
    assert_eq!(category(below_low), StatusCategory::Low);
    assert_eq!(category(above_good), StatusCategory::High);
  }

  #[test]
  fn exactly_one_category_matches() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut samples: Vec<f64> = vec![0.0, LOW_IMMUNITY_THRESHOLD, GOOD_IMMUNITY_THRESHOLD];
    // 按数量级均匀采样，覆盖 [0, 1e15)
    for _ in 0..5000 {
      let exponent = rng.gen_range(-3.0..15.0f64);
      samples.push(10f64.powf(exponent));
    }
    for _ in 0..1000 {
      samples.push(rng.gen_range(0.0..2.0e7f64));
    }

    for v in samples {
      let matched = guidelines().iter().filter(|entry| entry.contains(v)).count();
      assert_eq!(matched, 1, "{} 匹配了 {} 个分级", v, matched);
      assert!(classify(v).is_ok());
    }
  }

  #[test]
  fn negative_or_nan_is_invalid() {
    for v in [-1.0, -1.0e-9, f64::NEG_INFINITY, f64::NAN] {
      assert!(matches!(classify(v), Err(ThcError::InvalidInput(_))));
    }
  }

  #[test]
  fn guidance_text_is_verbatim() {
    let (_, low) = classify(5.0e5).unwrap();
    assert_eq!(low.status_label, "🔴 LOW IMMUNITY");
    assert_eq!(low.range_label, "<1.0×10⁶ cells/mL");
    assert_eq!(
      low.feeding_guidance,
      "Immune stimulant feed coating at a minimum rate of 50%."
    );

    let (_, medium) = classify(5.0e6).unwrap();
    assert_eq!(medium.status_label, "🟡 MODERATE IMMUNITY");
    assert_eq!(medium.water_guidance, low.water_guidance);
    assert_eq!(medium.pond_guidance, low.pond_guidance);

    let (_, high) = classify(5.0e7).unwrap();
    assert_eq!(high.status_label, "🟢 GOOD IMMUNITY");
    assert_eq!(high.water_guidance, "Maintain regular water monitoring.");
    assert_eq!(high.pond_guidance, "Continue with current management.");
  }

  #[test]
  fn table_is_ordered_and_complete() {
    let categories: Vec<_> = guidelines().iter().map(|entry| entry.category).collect();
    assert_eq!(
      categories,
      vec![
        StatusCategory::Low,
        StatusCategory::Medium,
        StatusCategory::High
      ]
    );
    assert_eq!(
      guidelines()[1].guidance.range_label,
      "1.0×10⁶ - 1.0×10⁷ cells/mL"
    );
  }
}
