use std::cell::Cell;

use eagle::MarkerDetection;
use glam::DVec3;
use lookout::{DetectionMemory, FrameSummary, Frames, Node, Stamp, TransformError, TransformLookup};
use tagwatch::{Flag, LocatedObject, Point, Response, VisualizationMarker};

/// Shifts points by a fixed offset, failing for points whose x is negative.
#[derive(Default)]
struct Scripted {
    calls: Cell<usize>,
}

impl TransformLookup for Scripted {
    fn transform_point(
        &self,
        point: DVec3,
        source: &str,
        target: &str,
        _stamp: Stamp,
    ) -> Result<DVec3, TransformError> {
        self.calls.set(self.calls.get() + 1);
        if point.x < 0.0 {
            return Err(TransformError::Disconnected {
                from: source.to_string(),
                to: target.to_string(),
            });
        }
        Ok(point + DVec3::new(100.0, 0.0, 0.0))
    }
}

type TestNode = Node<Scripted, Vec<LocatedObject>, Vec<VisualizationMarker>>;

fn node(capacity: usize) -> TestNode {
    Node::new(
        DetectionMemory::new(capacity).unwrap(),
        Frames {
            source: "base_footprint".to_string(),
            target: "map".to_string(),
        },
        Scripted::default(),
        Vec::new(),
        Vec::new(),
    )
}

fn tag(id: i32) -> MarkerDetection {
    MarkerDetection::new(id, [id as f64, 0.0, 1.0])
}

fn labels(node: &TestNode) -> Vec<&str> {
    node.located().iter().map(|o| o.label.as_str()).collect()
}

#[test]
fn duplicate_in_one_frame_is_reported_once() {
    let mut node = node(5);
    let summary = node.on_frame(&[tag(1), tag(2), tag(1)]);

    assert_eq!(labels(&node), ["1", "2"]);
    assert_eq!(
        node.markers().iter().map(|m| m.id).collect::<Vec<_>>(),
        [1, 2]
    );
    assert_eq!(summary.new, 2);
    assert_eq!(summary.repeated, 1);
}

#[test]
fn tags_stay_silent_across_frames() {
    let mut node = node(5);
    node.on_frame(&[tag(4)]);
    for _ in 0..3 {
        assert_eq!(
            node.on_frame(&[tag(4)]),
            FrameSummary {
                repeated: 1,
                ..Default::default()
            }
        );
    }
    assert_eq!(labels(&node), ["4"]);
    assert_eq!(node.located()[0].position, Point::new(104.0, 0.0, 1.0));
}

#[test]
fn full_memory_drops_novel_tags() {
    let mut node = node(3);
    node.on_frame(&[tag(1), tag(2), tag(3)]);
    assert!(node.memory().is_full());

    let summary = node.on_frame(&[tag(9)]);
    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.new, 0);
    assert!(!node.memory().seen(9));
    assert_eq!(node.located().len(), 3);
    assert_eq!(node.markers().len(), 3);
}

#[test]
fn failed_transform_publishes_nothing_but_stays_recorded() {
    let mut node = node(5);
    let summary = node.on_frame(&[tag(-3), tag(5)]);

    assert_eq!(summary.unresolved, 1);
    assert_eq!(summary.new, 2);
    assert_eq!(labels(&node), ["5"]);
    assert!(node.memory().seen(-3));

    // Not eligible again until a reset.
    let summary = node.on_frame(&[tag(-3)]);
    assert_eq!(summary.repeated, 1);
    assert_eq!(node.located().len(), 1);
}

#[test]
fn transform_is_requested_only_for_first_sightings() {
    let mut node = node(2);
    node.on_frame(&[tag(1), tag(1), tag(2), tag(3), tag(-1)]);
    node.on_frame(&[tag(1), tag(2)]);
    assert_eq!(node.lookup().calls.get(), 2);

    node.on_reset(Flag(true));
    node.on_frame(&[tag(3)]);
    assert_eq!(node.lookup().calls.get(), 3);
}

#[test]
fn reset_makes_every_tag_new_again() {
    let mut node = node(2);
    node.on_frame(&[tag(1), tag(2)]);

    assert_eq!(node.on_reset(Flag(true)), Response::ResetDone(Flag(true)));
    assert!(node.memory().is_empty());

    let summary = node.on_frame(&[tag(2), tag(1)]);
    assert_eq!(summary.new, 2);
    assert_eq!(labels(&node), ["1", "2", "2", "1"]);
}

#[test]
fn reset_without_flag_changes_nothing() {
    let mut node = node(5);
    node.on_frame(&[tag(1), tag(2)]);
    let before = node.memory().clone();

    assert_eq!(node.on_reset(Flag(false)), Response::ResetDone(Flag(false)));
    assert_eq!(node.memory(), &before);
    assert_eq!(node.on_frame(&[tag(1)]).repeated, 1);
}

#[test]
fn empty_frame_does_nothing() {
    let mut node = node(5);
    assert_eq!(node.on_frame(&[]), FrameSummary::default());
    assert!(node.memory().is_empty());
    assert!(node.located().is_empty());
}
