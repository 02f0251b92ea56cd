// 该文件是 THC Counter （虾血细胞计数） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::model::DetectionSet;

const BOX_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const BOX_THICKNESS: u32 = 2;

pub struct Draw {
  color: Rgb<u8>,
  thickness: u32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      color: Rgb(BOX_COLOR),
      thickness: BOX_THICKNESS,
    }
  }
}

impl Draw {
  pub fn with_color(mut self, color: [u8; 3]) -> Self {
    self.color = Rgb(color);
    self
  }

  pub fn with_thickness(mut self, thickness: u32) -> Self {
    self.thickness = thickness.max(1);
    self
  }

  /// 在图像上绘制检测框，检测框为像素坐标 [x_min, y_min, x_max, y_max]
  pub fn draw_detections_on_image(&self, image: &mut RgbImage, detections: &DetectionSet) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    for item in detections.iter() {
      let x_min = (item.x_min().floor() as i32).clamp(0, w - 1);
      let y_min = (item.y_min().floor() as i32).clamp(0, h - 1);
      let x_max = (item.x_max().ceil() as i32).clamp(0, w - 1);
      let y_max = (item.y_max().ceil() as i32).clamp(0, h - 1);

      // 向内加粗
      for t in 0..self.thickness as i32 {
        let width = x_max - x_min - 2 * t + 1;
        let height = y_max - y_min - 2 * t + 1;
        if width <= 0 || height <= 0 {
          break;
        }
        let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(image, rect, self.color);
      }
    }
  }

  pub fn draw_detections(&self, image: &RgbImage, detections: &DetectionSet) -> RgbImage {
    let mut annotated = image.clone();
    self.draw_detections_on_image(&mut annotated, detections);
    annotated
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Detection;

  #[test]
  fn draws_two_pixel_green_border() {
    let image = RgbImage::new(20, 20);
    let set: DetectionSet = vec![Detection::new([4.0, 4.0, 12.0, 12.0], 0.9).unwrap()].into();
    let annotated = Draw::default().draw_detections(&image, &set);

    let green = Rgb([0, 255, 0]);
    assert_eq!(annotated.get_pixel(4, 4), &green);
    assert_eq!(annotated.get_pixel(5, 8), &green);
    assert_eq!(annotated.get_pixel(12, 12), &green);
    assert_eq!(annotated.get_pixel(8, 8), &Rgb([0, 0, 0]));
    assert_eq!(annotated.get_pixel(2, 2), &Rgb([0, 0, 0]));
    // 原图不变
    assert_eq!(image.get_pixel(4, 4), &Rgb([0, 0, 0]));
  }

  #[test]
  fn boxes_past_the_edge_are_clamped() {
    let mut image = RgbImage::new(10, 10);
    let set: DetectionSet = vec![Detection::new([5.0, 5.0, 30.0, 30.0], 0.9).unwrap()].into();
    Draw::default()
      .with_color([255, 0, 0])
      .draw_detections_on_image(&mut image, &set);
    assert_eq!(image.get_pixel(9, 9), &Rgb([255, 0, 0]));
  }
}
