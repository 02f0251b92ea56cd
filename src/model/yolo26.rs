// 该文件是 THC Counter （虾血细胞计数） 项目的一部分。
// src/model/yolo26.rs - YOLO26 血细胞检测模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use image::RgbImage;
use rknpu::{Context, InitFlags, TensorType};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbNhwcFrame,
  input::AsNhwcFrame,
  model::{Detection, DetectionSet, Detector, DetectorError},
};

const YOLO26_NUM_INPUTS: u32 = 1;
const YOLO26_NUM_OUTPUTS: u32 = 6;
// 单类别模型：hemocyte
const YOLO26_CLASS_NUM: usize = 1;
const YOLO26_INPUT_W: u32 = 640;
const YOLO26_INPUT_H: u32 = 640;
const YOLO26_HEAD_SIZES: [(usize, usize); 3] = [(80, 80), (40, 40), (20, 20)];
const YOLO26_STRIDES: [f32; 3] = [8.0, 16.0, 32.0];
const YOLO26_OBJECT_THRESH: f32 = 0.5;

type Yolo26Frame = RgbNhwcFrame<YOLO26_INPUT_W, YOLO26_INPUT_H>;

pub struct Yolo26 {
  context: Context,
  object_thresh: f32,
}

#[derive(Error, Debug)]
pub enum Yolo26Error {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[error("RKNN 错误: {0}")]
  RknnError(rknpu::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl From<std::io::Error> for Yolo26Error {
  fn from(err: std::io::Error) -> Self {
    Yolo26Error::ModelLoadError(err)
  }
}

impl From<rknpu::Error> for Yolo26Error {
  fn from(err: rknpu::Error) -> Self {
    Yolo26Error::RknnError(err)
  }
}

impl Yolo26Error {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    Yolo26Error::ModelInvalid(msg.to_string(), e)
  }
}

impl From<Yolo26Error> for DetectorError {
  fn from(err: Yolo26Error) -> Self {
    match err {
      Yolo26Error::RknnError(_) => DetectorError::InferenceError(err.to_string()),
      _ => DetectorError::ModelLoadError(err.to_string()),
    }
  }
}

pub struct Yolo26Builder {
  model_path: PathBuf,
  object_thresh: f32,
}

impl FromUrlWithScheme for Yolo26Builder {
  const SCHEME: &'static str = "yolo26";
}

impl FromUrl for Yolo26Builder {
  type Error = Yolo26Error;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(Yolo26Error::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut object_thresh = YOLO26_OBJECT_THRESH;
    for (k, v) in url.query_pairs() {
      if k == "conf" {
        object_thresh = v
          .parse()
          .map_err(|_| Yolo26Error::ModelPathError(format!("置信度阈值无效: {}", v)))?;
      }
    }

    Ok(Yolo26Builder {
      model_path: url
        .to_file_path()
        .map_err(|_| Yolo26Error::ModelPathError(format!("模型路径无效: {}", url)))?,
      object_thresh,
    })
  }
}

impl Yolo26Builder {
  pub fn build(self) -> Result<Yolo26, Yolo26Error> {
    info!("加载模型文件: {}", self.model_path.display());
    let mode_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      mode_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 RKNN 推理上下文");
    let context = Context::new(&mode_data, InitFlags::default())
      .map_err(|e| Yolo26Error::invalid("无法创建推理上下文", e))?;

    match context.sdk_version() {
      Ok(version) => {
        if let Ok(api_ver) = version.api_version() {
          debug!("模型 API 版本: {}", api_ver);
        }
        if let Ok(drv_ver) = version.driver_version() {
          debug!("模型驱动版本: {}", drv_ver);
        }
      }
      Err(e) => {
        error!("查询 SDK 版本失败: {}", e);
        return Err(Yolo26Error::invalid("无法查询 SDK 版本", e));
      }
    }

    let num_inputs = context
      .num_inputs()
      .map_err(|e| Yolo26Error::invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| Yolo26Error::invalid("无法获取输出数量", e))?;

    if num_inputs != YOLO26_NUM_INPUTS || num_outputs != YOLO26_NUM_OUTPUTS {
      let msg = format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        YOLO26_NUM_INPUTS, YOLO26_NUM_OUTPUTS, num_inputs, num_outputs
      );
      error!("{}", msg);
      return Err(Yolo26Error::invalid(&msg, rknpu::Error::InvalidModel));
    }

    info!("模型加载完成，置信度阈值: {}", self.object_thresh);
    Ok(Yolo26 {
      context,
      object_thresh: self.object_thresh,
    })
  }
}

/// 根据张量大小匹配回归和分类输出
fn match_reg_cls_tensors<'a>(
  tensor1: &'a [f32],
  tensor2: &'a [f32],
  reg_expected: usize,
  cls_expected: usize,
) -> Option<(&'a [f32], &'a [f32])> {
  if tensor1.len() == reg_expected && tensor2.len() == cls_expected {
    Some((tensor1, tensor2))
  } else if tensor1.len() == cls_expected && tensor2.len() == reg_expected {
    Some((tensor2, tensor1))
  } else {
    None
  }
}

impl Yolo26 {
  /// 解码各检测头输出，返回归一化坐标的检测框
  fn postprocess(&self, output: rknpu::Output) -> Result<Vec<Detection>, Yolo26Error> {
    debug!("后处理模型输出");
    let input_w = YOLO26_INPUT_W as f32;
    let input_h = YOLO26_INPUT_H as f32;
    let mut items = Vec::new();

    for (head_idx, (&(map_h, map_w), stride)) in
      YOLO26_HEAD_SIZES.iter().zip(YOLO26_STRIDES).enumerate()
    {
      let spatial = map_h * map_w;
      let reg_expected = 4 * spatial;
      let cls_expected = YOLO26_CLASS_NUM * spatial;

      let tensor1 = output.get_f32(head_idx * 2)?;
      let tensor2 = output.get_f32(head_idx * 2 + 1)?;

      // RKNN 输出顺序不固定，按大小区分回归与分类
      let (reg, cls) = match_reg_cls_tensors(tensor1, tensor2, reg_expected, cls_expected)
        .ok_or_else(|| {
          error!(
            "检测头 {}: 输出大小不匹配 - 张量1: {}, 张量2: {}",
            head_idx,
            tensor1.len(),
            tensor2.len()
          );
          Yolo26Error::invalid(
            &format!("检测头 {} 输出大小不匹配", head_idx),
            rknpu::Error::InvalidModel,
          )
        })?;

      for h in 0..map_h {
        for w in 0..map_w {
          let idx = h * map_w + w;

          let max_logit = (0..YOLO26_CLASS_NUM)
            .map(|c| cls[c * spatial + idx])
            .fold(f32::MIN, f32::max);
          let score = sigmoid(max_logit);
          if score <= self.object_thresh {
            continue;
          }

          let grid_x = (w as f32) + 0.5;
          let grid_y = (h as f32) + 0.5;

          let xmin = ((grid_x - reg[idx]) * stride).clamp(0.0, input_w);
          let ymin = ((grid_y - reg[spatial + idx]) * stride).clamp(0.0, input_h);
          let xmax = ((grid_x + reg[2 * spatial + idx]) * stride).clamp(0.0, input_w);
          let ymax = ((grid_y + reg[3 * spatial + idx]) * stride).clamp(0.0, input_h);

          if let Some(item) = Detection::new(
            [
              xmin / input_w,
              ymin / input_h,
              xmax / input_w,
              ymax / input_h,
            ],
            score,
          ) {
            items.push(item);
          }
        }
      }
    }

    debug!("检测到 {} 个血细胞", items.len());
    Ok(items)
  }
}

impl Detector for Yolo26 {
  type Error = Yolo26Error;

  fn detect(&self, image: &RgbImage) -> Result<DetectionSet, Self::Error> {
    let frame = Yolo26Frame::from_rgb_image(image);

    debug!("设置模型输入");
    self.context.set_input(
      0,
      frame.as_nhwc(),
      rknpu::TensorFormat::NHWC,
      TensorType::UInt8,
    )?;

    debug!("执行模型推理");
    self.context.run()?;

    let output = self.context.get_outputs()?;
    let items = self.postprocess(output)?;

    Ok(scale_to_image(items, image.width(), image.height()))
  }
}

/// 归一化坐标换算回原图像素坐标，换算后退化的检测框被丢弃
fn scale_to_image(items: Vec<Detection>, width: u32, height: u32) -> DetectionSet {
  let (w, h) = (width as f32, height as f32);
  items
    .into_iter()
    .filter_map(|item| {
      Detection::new(
        [
          item.x_min() * w,
          item.y_min() * h,
          item.x_max() * w,
          item.y_max() * h,
        ],
        item.score,
      )
    })
    .collect()
}

fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}
