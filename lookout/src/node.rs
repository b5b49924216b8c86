use std::ops::AddAssign;

use eagle::{pose::euler, MarkerDetection};
use glam::DVec3;
use tagwatch::{Flag, LocatedObject, Point, Publish, Request, Response, VisualizationMarker};
use tracing::{debug, error, info};

use crate::memory::{DetectionMemory, TagId};
use crate::transform::{Stamp, TransformLookup};

/// What happened to the detections of one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSummary {
    /// First sightings.
    pub new: usize,
    /// Tags already in memory.
    pub repeated: usize,
    /// Unseen tags that did not fit in a full memory.
    pub dropped: usize,
    /// First sightings whose position could not be transformed.
    pub unresolved: usize,
}

impl AddAssign for FrameSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.new += rhs.new;
        self.repeated += rhs.repeated;
        self.dropped += rhs.dropped;
        self.unresolved += rhs.unresolved;
    }
}

/// Frame the detector reports positions in and frame they are published in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frames {
    pub source: String,
    pub target: String,
}

/// Reports every tag once: the first time it is seen after startup or a reset.
///
/// The node is meant to be driven from a single dispatch thread. `on_frame` and `on_reset`
/// take `&mut self`, so sharing a node between threads requires wrapping it in a lock.
pub struct Node<T, L, M> {
    memory: DetectionMemory,
    frames: Frames,
    lookup: T,
    located: L,
    markers: M,
}

impl<T, L, M> Node<T, L, M>
where
    T: TransformLookup,
    L: Publish<LocatedObject>,
    M: Publish<VisualizationMarker>,
{
    pub fn new(memory: DetectionMemory, frames: Frames, lookup: T, located: L, markers: M) -> Self {
        Node {
            memory,
            frames,
            lookup,
            located,
            markers,
        }
    }

    /// Handles the detections of one frame, in detector order.
    ///
    /// A tag is recorded before its position is transformed. If the transform fails nothing
    /// is published for it and it stays recorded until the next reset.
    pub fn on_frame(&mut self, detections: &[MarkerDetection]) -> FrameSummary {
        let mut summary = FrameSummary::default();
        for detection in detections {
            let id = detection.id;
            if !self.memory.record(id) {
                if self.memory.seen(id) {
                    summary.repeated += 1;
                } else {
                    summary.dropped += 1;
                }
                info!(id, full = self.memory.is_full(), "No new victim detected");
                continue;
            }
            summary.new += 1;
            info!(id, "New victim detected");

            let (yaw, pitch, roll) = euler(&detection.rotation);
            debug!(id, distance = detection.distance(), yaw, pitch, roll, "tag pose");

            let tag_point = detection.position();
            match self.lookup.transform_point(
                tag_point,
                &self.frames.source,
                &self.frames.target,
                Stamp::Latest,
            ) {
                Ok(victim_point) => {
                    info!(
                        "{}: ({:.2}, {:.2}, {:.2}) -----> {}: ({:.2}, {:.2}, {:.2})",
                        self.frames.source,
                        tag_point.x,
                        tag_point.y,
                        tag_point.z,
                        self.frames.target,
                        victim_point.x,
                        victim_point.y,
                        victim_point.z,
                    );
                    self.emit(id, victim_point);
                }
                Err(err) => {
                    summary.unresolved += 1;
                    error!(
                        id,
                        %err,
                        "failed to transform a point from {:?} to {:?}",
                        self.frames.source,
                        self.frames.target,
                    );
                }
            }
        }
        if summary.new > 0 {
            debug!(slots = ?self.memory.slots().collect::<Vec<_>>(), "detection memory");
        }
        summary
    }

    fn emit(&mut self, id: TagId, position: DVec3) {
        let location = LocatedObject::new(
            id,
            self.frames.target.clone(),
            Point::from(position.to_array()),
        );
        if let Err(err) = self.located.publish(&location) {
            error!(id, "failed to publish location: {err:#}");
        }
        if let Err(err) = self.markers.publish(&location.marker(id)) {
            error!(id, "failed to publish marker: {err:#}");
        }
    }

    /// Clears the memory if `flag` is set. The request is acknowledged either way.
    pub fn on_reset(&mut self, flag: Flag) -> Response {
        info!("Reset request received: {flag}");
        if flag.0 {
            self.memory.reset();
            info!("Reset confirmed: {flag}");
        }
        Response::ResetDone(flag)
    }

    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::Reset(flag) => self.on_reset(flag),
        }
    }

    pub fn memory(&self) -> &DetectionMemory {
        &self.memory
    }

    pub fn frames(&self) -> &Frames {
        &self.frames
    }

    pub fn lookup(&self) -> &T {
        &self.lookup
    }

    pub fn located(&self) -> &L {
        &self.located
    }

    pub fn markers(&self) -> &M {
        &self.markers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::StaticTransforms;
    use glam::DQuat;

    type TestNode = Node<StaticTransforms, Vec<LocatedObject>, Vec<VisualizationMarker>>;

    fn node(capacity: usize) -> TestNode {
        let mut tf = StaticTransforms::new();
        tf.insert(
            "map",
            "base_footprint",
            DVec3::new(10.0, 0.0, 0.0),
            DQuat::IDENTITY,
        )
        .unwrap();
        Node::new(
            DetectionMemory::new(capacity).unwrap(),
            Frames {
                source: "base_footprint".to_string(),
                target: "map".to_string(),
            },
            tf,
            Vec::new(),
            Vec::new(),
        )
    }

    #[test]
    fn publishes_transformed_position() {
        let mut node = node(5);
        let summary = node.on_frame(&[MarkerDetection::new(7, [0.5, -0.25, 2.0])]);
        assert_eq!(summary.new, 1);
        assert_eq!(
            node.located(),
            &vec![LocatedObject::new(7, "map", Point::new(10.5, -0.25, 2.0))]
        );
        let marker = &node.markers()[0];
        assert_eq!(marker.id, 7);
        assert_eq!(marker.frame, "map");
        assert_eq!(marker.position, Point::new(10.5, -0.25, 0.0));
    }

    #[test]
    fn counts_repeats_and_drops_separately() {
        let mut node = node(1);
        let frame = [
            MarkerDetection::new(1, [0.0; 3]),
            MarkerDetection::new(1, [0.0; 3]),
            MarkerDetection::new(2, [0.0; 3]),
        ];
        assert_eq!(
            node.on_frame(&frame),
            FrameSummary {
                new: 1,
                repeated: 1,
                dropped: 1,
                unresolved: 0,
            }
        );
    }

    #[test]
    fn reset_request_is_dispatched() {
        let mut node = node(5);
        node.on_frame(&[MarkerDetection::new(3, [0.0; 3])]);
        assert_eq!(
            node.handle(Request::Reset(Flag(true))),
            Response::ResetDone(Flag(true))
        );
        assert!(node.memory().is_empty());
    }

    #[test]
    fn summaries_add_up() {
        let mut total = FrameSummary::default();
        total += FrameSummary {
            new: 1,
            repeated: 2,
            dropped: 0,
            unresolved: 1,
        };
        total += FrameSummary {
            new: 1,
            ..Default::default()
        };
        assert_eq!(total.new, 2);
        assert_eq!(total.repeated, 2);
        assert_eq!(total.unresolved, 1);
    }
}
