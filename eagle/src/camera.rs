use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

/// Pinhole parameters of the camera, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub px: f64,
    pub py: f64,
}

impl CameraIntrinsics {
    pub const DEFAULT_WIDTH: u32 = 640;
    pub const DEFAULT_HEIGHT: u32 = 360;
    pub const DEFAULT_FX: f64 = 623.709;
    pub const DEFAULT_FY: f64 = 582.226;

    /// Default focal lengths with the principal point in the middle of a `width` x `height` image.
    pub fn centered(width: u32, height: u32) -> Self {
        CameraIntrinsics {
            fx: Self::DEFAULT_FX,
            fy: Self::DEFAULT_FY,
            px: (width / 2) as f64,
            py: (height / 2) as f64,
        }
    }

    pub fn matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.fx, 0.0, self.px],
            [0.0, self.fy, self.py],
            [0.0, 0.0, 1.0],
        ]
    }
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self::centered(Self::DEFAULT_WIDTH, Self::DEFAULT_HEIGHT)
    }
}

/// Side length in meters of the black square of a printed tag.
pub const DEFAULT_TAG_SIZE: f64 = 0.099;

pub fn grayscale(color_img: &RgbImage) -> GrayImage {
    image::imageops::grayscale(color_img)
}

#[cfg(feature = "opencv")]
pub use self::capture::Camera;

#[cfg(feature = "opencv")]
mod capture {
    use anyhow::{bail, Context, Result};
    use image::{ImageBuffer, RgbImage};
    use opencv::{
        core::{Mat, VecN},
        prelude::{MatTraitConst, MatTraitConstManual, VideoCaptureTrait, VideoCaptureTraitConst},
        videoio,
    };

    pub struct Camera {
        cam: videoio::VideoCapture,
        frame: Mat,
    }

    impl Camera {
        pub fn open(device_id: u32, width: u32, height: u32) -> Result<Self> {
            let mut cam = videoio::VideoCapture::new(device_id as i32, videoio::CAP_ANY)
                .context("failed to get video capture")?;
            if !cam.is_opened()? {
                bail!("camera {device_id} could not be opened");
            }
            cam.set(videoio::CAP_PROP_FRAME_WIDTH, width as f64)?;
            cam.set(videoio::CAP_PROP_FRAME_HEIGHT, height as f64)?;
            Ok(Camera {
                cam,
                frame: Mat::default(),
            })
        }

        /// Grabs the next frame, `None` once the stream has ended.
        pub fn grab(&mut self) -> Result<Option<RgbImage>> {
            if !self.cam.read(&mut self.frame)? || self.frame.empty() {
                return Ok(None);
            }
            let data: Vec<_> = self
                .frame
                .iter::<VecN<u8, 3>>()?
                .flat_map(|(_, v)| v.0.into_iter().rev()) // .rev() to go from BGR to RGB.
                .collect();
            let image = ImageBuffer::from_vec(self.frame.cols() as u32, self.frame.rows() as u32, data)
                .context("frame size does not match its data")?;
            Ok(Some(image))
        }
    }

    impl Iterator for Camera {
        type Item = Result<RgbImage>;

        fn next(&mut self) -> Option<Self::Item> {
            self.grab().transpose()
        }
    }
}
