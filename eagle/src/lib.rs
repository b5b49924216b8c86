mod camera;
mod family;
mod markers;
pub mod pose;
#[cfg(feature = "opencv")]
mod window;

pub use crate::camera::{grayscale, CameraIntrinsics, DEFAULT_TAG_SIZE};
pub use crate::family::{TagFamily, UnknownFamily};
pub use crate::markers::{Detect, MarkerDetection};
pub use image::{GrayImage, RgbImage};

#[cfg(feature = "opencv")]
pub use crate::camera::Camera;
#[cfg(feature = "opencv")]
pub use crate::markers::Detector;
#[cfg(feature = "opencv")]
pub use crate::window::Window;
