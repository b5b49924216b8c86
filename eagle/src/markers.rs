use anyhow::Result;
use glam::DVec3;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// One tag found in a frame, with its pose relative to the camera.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub id: i32,
    /// Image corners in pixels, starting at the top left and going clockwise.
    pub corners: [[f64; 2]; 4],
    /// Tag center in the camera frame, meters.
    pub translation: [f64; 3],
    /// Row-major rotation, camera <- tag.
    pub rotation: [[f64; 3]; 3],
}

impl MarkerDetection {
    pub fn new(id: i32, translation: [f64; 3]) -> Self {
        MarkerDetection {
            id,
            corners: [[0.0; 2]; 4],
            translation,
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    pub fn position(&self) -> DVec3 {
        DVec3::from_array(self.translation)
    }

    pub fn distance(&self) -> f64 {
        self.position().length()
    }

    pub fn center(&self) -> (f64, f64) {
        let (sx, sy) = self
            .corners
            .iter()
            .fold((0.0, 0.0), |(sx, sy), [x, y]| (sx + x, sy + y));
        (sx / 4.0, sy / 4.0)
    }
}

/// Finds tags in a gray image.
pub trait Detect {
    fn detect(&mut self, image: &GrayImage) -> Result<Vec<MarkerDetection>>;
}

impl<D: Detect + ?Sized> Detect for Box<D> {
    fn detect(&mut self, image: &GrayImage) -> Result<Vec<MarkerDetection>> {
        (**self).detect(image)
    }
}

#[cfg(feature = "opencv")]
pub use self::aruco::Detector;

#[cfg(feature = "opencv")]
mod aruco {
    use anyhow::{bail, Context, Result};
    use image::GrayImage;
    use opencv::{
        calib3d::{rodrigues_def, solve_pnp_def},
        core::{no_array, Mat, Point2d, Point2f, Point3d, Vector},
        objdetect::{
            get_predefined_dictionary, ArucoDetector, DetectorParameters, PredefinedDictionaryType,
            RefineParameters,
        },
        prelude::{ArucoDetectorTraitConst, MatTraitConst},
    };

    use tracing::warn;

    use super::{Detect, MarkerDetection};
    use crate::{CameraIntrinsics, TagFamily};

    pub struct Detector {
        detector: ArucoDetector,
        camera_matrix: Mat,
        dist_coeffs: Vector<f64>,
        object_points: Vector<Point3d>,
    }

    fn dictionary(family: TagFamily) -> Result<PredefinedDictionaryType> {
        Ok(match family {
            TagFamily::Tag16h5 => PredefinedDictionaryType::DICT_APRILTAG_16h5,
            TagFamily::Tag25h9 => PredefinedDictionaryType::DICT_APRILTAG_25h9,
            TagFamily::Tag36h11 => PredefinedDictionaryType::DICT_APRILTAG_36h11,
            TagFamily::Tag25h7 | TagFamily::Tag36h9 => {
                bail!("tag family {family} is not available in OpenCV")
            }
        })
    }

    impl Detector {
        pub fn new(family: TagFamily, camera: CameraIntrinsics, tag_size: f64) -> Result<Self> {
            let aruco_dict = get_predefined_dictionary(dictionary(family)?)?;
            let detec_params = DetectorParameters::default()?;
            let detector = ArucoDetector::new(
                &aruco_dict,
                &detec_params,
                RefineParameters::new(10., 6., true)?,
            )?;

            let matrix = camera.matrix();
            let camera_matrix = Mat::from_slice_2d(&[&matrix[0], &matrix[1], &matrix[2]])?;

            // Tag model in the order the detector reports corners.
            let half = tag_size / 2.0;
            let object_points: Vector<Point3d> = vec![
                Point3d::new(-half, half, 0.0),
                Point3d::new(half, half, 0.0),
                Point3d::new(half, -half, 0.0),
                Point3d::new(-half, -half, 0.0),
            ]
            .into();

            Ok(Detector {
                detector,
                camera_matrix,
                dist_coeffs: Vector::from_slice(&[0.0; 5]),
                object_points,
            })
        }

        fn pose(&self, corners: &Vector<Point2f>) -> Result<([f64; 3], [[f64; 3]; 3])> {
            let image_points: Vector<Point2d> = corners
                .iter()
                .map(|p| Point2d::new(p.x as f64, p.y as f64))
                .collect();
            let mut rvec: Vector<f64> = Vector::new();
            let mut tvec: Vector<f64> = Vector::new();
            if !solve_pnp_def(
                &self.object_points,
                &image_points,
                &self.camera_matrix,
                &self.dist_coeffs,
                &mut rvec,
                &mut tvec,
            )? {
                bail!("no pose for tag corners");
            }
            let mut rmat = Mat::default();
            rodrigues_def(&rvec, &mut rmat)?;

            let mut rotation = [[0.0; 3]; 3];
            for (r, row) in rotation.iter_mut().enumerate() {
                for (c, value) in row.iter_mut().enumerate() {
                    *value = *rmat.at_2d::<f64>(r as i32, c as i32)?;
                }
            }
            Ok(([tvec.get(0)?, tvec.get(1)?, tvec.get(2)?], rotation))
        }
    }

    impl Detect for Detector {
        fn detect(&mut self, image: &GrayImage) -> Result<Vec<MarkerDetection>> {
            let mut corners: Vector<Vector<Point2f>> = Vector::new();
            let mut ids: Vector<i32> = Vector::new();
            let mut rejected = no_array();

            let mat = Mat::from_slice_rows_cols(
                image.as_raw(),
                image.height() as usize,
                image.width() as usize,
            )?;
            self.detector
                .detect_markers(&mat, &mut corners, &mut ids, &mut rejected)
                .context("marker detection failed")?;

            let mut detections = Vec::with_capacity(ids.len());
            for (id, corners) in ids.into_iter().zip(corners) {
                let (translation, rotation) = match self.pose(&corners) {
                    Ok(pose) => pose,
                    Err(err) => {
                        warn!(id, "skipping tag without a pose: {err:#}");
                        continue;
                    }
                };
                let mut points = [[0.0; 2]; 4];
                for (dst, src) in points.iter_mut().zip(corners.iter()) {
                    *dst = [src.x as f64, src.y as f64];
                }
                detections.push(MarkerDetection {
                    id,
                    corners: points,
                    translation,
                    rotation,
                });
            }
            Ok(detections)
        }
    }
}
