// 该文件是 THC Counter （虾血细胞计数） 项目的一部分。
// src/thc.rs - 血细胞浓度计算
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

/// 血细胞计数板换算系数（cells/μL）
///
/// 40x 物镜下单个视野在 Neubauer 计数板中约占 0.014 μL，取其倒数。
pub const CHAMBER_CONSTANT: f64 = 71.42857142857;

/// μL 到 mL 的换算
pub const MICROLITERS_PER_MILLILITER: f64 = 1000.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThcError {
  #[error("输入无效: {0}")]
  InvalidInput(String),
}

impl ThcError {
  pub fn invalid(msg: impl Into<String>) -> Self {
    ThcError::InvalidInput(msg.into())
  }
}

/// 总血细胞浓度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConcentrationResult {
  pub cells_per_microliter: f64,
  pub cells_per_milliliter: f64,
}

/// 由细胞计数与稀释倍数计算 THC
///
/// `count` 为负数或 `dilution_factor` 非正、非有限值时返回 [`ThcError::InvalidInput`]，
/// 不会进入计算公式；乘积溢出为无穷大时同样返回该错误。
pub fn calculate_concentration(
  count: i64,
  dilution_factor: f64,
) -> Result<ConcentrationResult, ThcError> {
  if count < 0 {
    return Err(ThcError::invalid(format!("细胞计数不能为负数: {}", count)));
  }
  if !dilution_factor.is_finite() || dilution_factor <= 0.0 {
    return Err(ThcError::invalid(format!(
      "稀释倍数必须为正数: {}",
      dilution_factor
    )));
  }

  let cells_per_microliter = count as f64 * dilution_factor * CHAMBER_CONSTANT;
  let cells_per_milliliter = cells_per_microliter * MICROLITERS_PER_MILLILITER;
  if !cells_per_milliliter.is_finite() {
    return Err(ThcError::invalid(format!(
      "浓度超出可表示范围: count = {}, dilution = {}",
      count, dilution_factor
    )));
  }

  Ok(ConcentrationResult {
    cells_per_microliter,
    cells_per_milliliter,
  })
}
