// 该文件是 THC Counter （虾血细胞计数） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use clap::Parser;
use url::Url;

/// 对虾血淋巴总血细胞计数（THC）分析
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测模型
  /// 支持格式:
  /// - 检测记录: record:///path/to/boxes.txt[?normalized]
  /// - RKNN 模型: yolo26:///path/to/model.rknn[?conf=0.5]
  #[arg(long, value_name = "MODEL", required_unless_present = "guidelines")]
  pub model: Option<Url>,

  /// 输入图像，如 image:///path/to/sample.jpg
  #[arg(long, value_name = "SOURCE", required_unless_present = "guidelines")]
  pub input: Option<Url>,

  /// 输出（可重复）
  /// 支持格式:
  /// - 标注图像: image:///path/to/annotated.png
  /// - 文本报告: report:///path/to/THC_analysis_results.txt 或 report:///path/to/dir/
  /// - JSON 报告: report:///path/to/result.json?format=json
  #[arg(long, value_name = "OUTPUT")]
  pub output: Vec<Url>,

  /// 样品稀释倍数（1 表示未稀释）
  #[arg(
    long,
    default_value = "1",
    value_name = "FACTOR",
    value_parser = clap::value_parser!(u8).range(1..=10)
  )]
  pub dilution: u8,

  /// 打印各免疫状态的 THC 区间与管理建议后退出
  #[arg(long)]
  pub guidelines: bool,
}
