use std::collections::HashMap;
use std::time::SystemTime;

use glam::{DAffine3, DQuat, DVec3};
use thiserror::Error;

/// Time at which a transform is requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stamp {
    /// Whatever is most recent.
    Latest,
    At(SystemTime),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TransformError {
    #[error("frame {0:?} does not exist")]
    UnknownFrame(String),

    #[error("{from:?} and {to:?} are not part of the same tree")]
    Disconnected { from: String, to: String },

    #[error("frame {child:?} already has parent {parent:?}")]
    Reparent { child: String, parent: String },

    #[error("linking {child:?} under {parent:?} would form a cycle")]
    Cycle { parent: String, child: String },

    #[error("no transform available: {0}")]
    Unavailable(String),
}

/// Moves points between coordinate frames.
pub trait TransformLookup {
    fn transform_point(
        &self,
        point: DVec3,
        source: &str,
        target: &str,
        stamp: Stamp,
    ) -> Result<DVec3, TransformError>;
}

impl<T: TransformLookup + ?Sized> TransformLookup for &T {
    fn transform_point(
        &self,
        point: DVec3,
        source: &str,
        target: &str,
        stamp: Stamp,
    ) -> Result<DVec3, TransformError> {
        (**self).transform_point(point, source, target, stamp)
    }
}

// Frame names may carry the old leading slash ("/map").
pub(crate) fn frame_name(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}

/// A tree of fixed transforms between named frames, valid at every stamp.
#[derive(Clone, Debug, Default)]
pub struct StaticTransforms {
    // child -> (parent, child to parent)
    links: HashMap<String, (String, DAffine3)>,
}

impl StaticTransforms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `child` in `parent` with the given pose of the child origin in the parent frame.
    pub fn insert(
        &mut self,
        parent: &str,
        child: &str,
        translation: DVec3,
        rotation: DQuat,
    ) -> Result<(), TransformError> {
        let (parent, child) = (frame_name(parent), frame_name(child));
        if let Some((existing, _)) = self.links.get(child) {
            return Err(TransformError::Reparent {
                child: child.to_string(),
                parent: existing.clone(),
            });
        }
        if self.root_of(parent) == child {
            return Err(TransformError::Cycle {
                parent: parent.to_string(),
                child: child.to_string(),
            });
        }
        self.links.insert(
            child.to_string(),
            (
                parent.to_string(),
                DAffine3::from_rotation_translation(rotation, translation),
            ),
        );
        Ok(())
    }

    pub fn contains(&self, frame: &str) -> bool {
        let frame = frame_name(frame);
        self.links.contains_key(frame) || self.links.values().any(|(parent, _)| parent == frame)
    }

    fn root_of<'a>(&'a self, mut frame: &'a str) -> &'a str {
        while let Some((parent, _)) = self.links.get(frame) {
            frame = parent;
        }
        frame
    }

    /// Root of the tree containing `frame` and the transform from `frame` to that root.
    fn to_root<'a>(&'a self, frame: &'a str) -> Result<(&'a str, DAffine3), TransformError> {
        if !self.contains(frame) {
            return Err(TransformError::UnknownFrame(frame.to_string()));
        }
        let mut current = frame_name(frame);
        let mut transform = DAffine3::IDENTITY;
        while let Some((parent, link)) = self.links.get(current) {
            transform = *link * transform;
            current = parent;
        }
        Ok((current, transform))
    }
}

impl TransformLookup for StaticTransforms {
    fn transform_point(
        &self,
        point: DVec3,
        source: &str,
        target: &str,
        _stamp: Stamp,
    ) -> Result<DVec3, TransformError> {
        if frame_name(source) == frame_name(target) {
            return Ok(point);
        }
        let (source_root, source_to_root) = self.to_root(source)?;
        let (target_root, target_to_root) = self.to_root(target)?;
        if source_root != target_root {
            return Err(TransformError::Disconnected {
                from: source.to_string(),
                to: target.to_string(),
            });
        }
        Ok(target_to_root
            .inverse()
            .transform_point3(source_to_root.transform_point3(point)))
    }
}
