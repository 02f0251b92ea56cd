// 该文件是 THC Counter （虾血细胞计数） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use thc_counter::{
  FromUrl,
  input::InputWrapper,
  model::DetectorWrapper,
  output::OutputWrapper,
  status::guidelines,
  task::{AnalysisTask, Task},
};

fn print_guidelines() {
  for entry in guidelines() {
    let g = &entry.guidance;
    println!("{}", g.status_label);
    println!("Range: {}", g.range_label);
    println!("Color: {}", g.color);
    println!("Water Management: {}", g.water_guidance);
    println!("Pond Bottom Management: {}", g.pond_guidance);
    println!("Feeding Management: {}", g.feeding_guidance);
    println!();
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  if args.guidelines {
    print_guidelines();
    return Ok(());
  }

  let (Some(model_url), Some(input_url)) = (args.model, args.input) else {
    anyhow::bail!("缺少 --model 或 --input 参数");
  };

  info!("模型: {}", model_url);
  info!("输入来源: {}", input_url);
  for output in &args.output {
    info!("输出路径: {}", output);
  }
  info!("稀释倍数: {}x", args.dilution);

  let input = InputWrapper::from_url(&input_url).context("无法打开输入图像")?;
  // 检测器只加载一次，之后以引用形式交给分析流程
  let detector = DetectorWrapper::from_url(&model_url).context("无法加载检测模型")?;
  let outputs = args
    .output
    .iter()
    .map(OutputWrapper::from_url)
    .collect::<Result<Vec<_>, _>>()
    .context("无法创建输出")?;

  let analysis = AnalysisTask::new(f64::from(args.dilution)).run_task(input, detector, outputs)?;

  print!("{}", analysis.to_text());

  Ok(())
}
