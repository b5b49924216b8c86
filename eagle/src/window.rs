use anyhow::{Context, Result};
use image::RgbImage;
use opencv::{
    core::{Mat, Point, Scalar},
    highgui, imgproc,
    prelude::MatTraitConst,
};

use crate::MarkerDetection;

/// On-screen view of the camera stream with the detected tags outlined.
pub struct Window {
    name: String,
}

impl Window {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        highgui::named_window(&name, highgui::WINDOW_AUTOSIZE)?;
        Ok(Window { name })
    }

    pub fn show(&self, color_img: &RgbImage, detections: &[MarkerDetection]) -> Result<()> {
        let bgr: Vec<u8> = color_img
            .pixels()
            .flat_map(|pixel| pixel.0.into_iter().rev())
            .collect();
        let mut mat = Mat::from_slice_rows_cols(
            &bgr,
            color_img.height() as usize,
            color_img.width() as usize * 3,
        )?
        .reshape(3, color_img.height() as i32)?
        .try_clone()
        .context("failed to copy frame")?;

        let green = Scalar::new(0.0, 255.0, 0.0, 0.0);
        let blue = Scalar::new(255.0, 0.0, 0.0, 0.0);
        for detection in detections {
            let corners: Vec<Point> = detection
                .corners
                .iter()
                .map(|[x, y]| Point::new(*x as i32, *y as i32))
                .collect();
            for i in 0..corners.len() {
                let next = corners[(i + 1) % corners.len()];
                imgproc::line(&mut mat, corners[i], next, green, 2, imgproc::LINE_8, 0)?;
            }
            let (cx, cy) = detection.center();
            imgproc::put_text(
                &mut mat,
                &detection.id.to_string(),
                Point::new(cx as i32, cy as i32),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.8,
                blue,
                2,
                imgproc::LINE_8,
                false,
            )?;
        }

        highgui::imshow(&self.name, &mat)?;
        highgui::wait_key(1)?;
        Ok(())
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        let _ = highgui::destroy_window(&self.name);
    }
}
