use std::io::{Read, Write};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Instant;

use anyhow::{Context, Result};
use eagle::{Detect, MarkerDetection, RgbImage};
use parrot::{JsonLines, Topic};
use tagwatch::{LocatedObject, Publish, Request, VisualizationMarker};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::node::{FrameSummary, Node};
use crate::transform::TransformLookup;

/// Draws a frame together with the tags found in it.
pub type Overlay = Box<dyn FnMut(&RgbImage, &[MarkerDetection]) -> Result<()>>;

/// Where the detections of each frame come from.
pub enum Source {
    /// Detections recorded earlier, one JSON array per frame.
    Replay(Box<dyn Iterator<Item = Result<Vec<MarkerDetection>>>>),
    /// Images run through a detector as they arrive.
    Live {
        frames: Box<dyn Iterator<Item = Result<RgbImage>>>,
        detector: Box<dyn Detect>,
        overlay: Option<Overlay>,
    },
}

impl Source {
    pub fn replay(reader: impl Read + 'static) -> Self {
        Source::Replay(Box::new(parrot::read_lines(reader)))
    }

    #[cfg(feature = "opencv")]
    pub fn camera(config: &Config) -> Result<Self> {
        let camera = eagle::Camera::open(
            config.camera.device,
            config.camera.width,
            config.camera.height,
        )?;
        let detector = eagle::Detector::new(
            config.detector.family,
            config.camera.intrinsics(),
            config.detector.tag_size,
        )?;
        let overlay: Option<Overlay> = if config.node.draw {
            let window = eagle::Window::new("apriltags_demo")?;
            Some(Box::new(move |image: &RgbImage, detections: &[MarkerDetection]| {
                window.show(image, detections)
            }))
        } else {
            None
        };
        Ok(Source::Live {
            frames: Box::new(camera),
            detector: Box::new(detector),
            overlay,
        })
    }

    #[cfg(not(feature = "opencv"))]
    pub fn camera(_config: &Config) -> Result<Self> {
        anyhow::bail!("built without camera support, enable the `opencv` feature or use --replay")
    }

    /// Detections of the next frame, `None` when the source is exhausted.
    ///
    /// A live frame that cannot be grabbed, searched or drawn is logged and the loop moves
    /// on. A recording that cannot be read is an error.
    pub fn next_frame(&mut self, timing: bool) -> Result<Option<Vec<MarkerDetection>>> {
        match self {
            Source::Replay(frames) => frames
                .next()
                .transpose()
                .context("failed to read recorded frame"),
            Source::Live {
                frames,
                detector,
                overlay,
            } => {
                let image = match frames.next() {
                    None => return Ok(None),
                    Some(Ok(image)) => image,
                    Some(Err(err)) => {
                        error!("failed to grab a frame: {err:#}");
                        return Ok(Some(Vec::new()));
                    }
                };
                let gray = eagle::grayscale(&image);
                let t0 = Instant::now();
                let detections = detector.detect(&gray).unwrap_or_else(|err| {
                    error!("tag detection failed: {err:#}");
                    Vec::new()
                });
                if timing {
                    debug!("Extracting tags took {:?}", t0.elapsed());
                }
                if let Some(overlay) = overlay {
                    if let Err(err) = overlay(&image, &detections) {
                        error!("failed to draw detections: {err:#}");
                    }
                }
                Ok(Some(detections))
            }
        }
    }
}

/// Totals over a whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    pub resets: usize,
    pub detections: FrameSummary,
}

/// Runs the node until `source` is exhausted, writing every outbound message to `out`.
///
/// Service requests are answered between frames, on the same thread that processes the
/// frames, so the detection memory is never touched concurrently.
pub fn run<W: Write>(
    config: &Config,
    mut source: Source,
    requests: Receiver<Result<Request, String>>,
    out: W,
) -> Result<RunSummary> {
    let lines = JsonLines::new(out);
    let mut service = lines.topic(config.topics.reset.as_str());

    #[cfg(not(feature = "vis"))]
    let markers = lines.topic(config.topics.marker.as_str());
    #[cfg(feature = "vis")]
    let markers = (
        lines.topic(config.topics.marker.as_str()),
        crate::vis::Rerun::spawn("lookout")?,
    );

    let mut node = Node::new(
        config.memory()?,
        config.frames(),
        config.transforms()?,
        lines.topic(config.topics.located.as_str()),
        markers,
    );
    info!(
        family = %config.detector.family,
        bits = config.detector.family.bits(),
        min_hamming = config.detector.family.min_hamming(),
        capacity = config.node.capacity,
        "Ready to detect tags"
    );

    let mut summary = RunSummary::default();
    loop {
        summary.resets += serve(&mut node, &requests, &mut service);
        let Some(detections) = source.next_frame(config.node.timing)? else {
            break;
        };
        let frame = node.on_frame(&detections);
        debug!(?frame, "frame processed");
        summary.frames += 1;
        summary.detections += frame;
    }
    summary.resets += serve(&mut node, &requests, &mut service);
    Ok(summary)
}

/// Answers every pending request without blocking.
fn serve<T, L, M, W>(
    node: &mut Node<T, L, M>,
    requests: &Receiver<Result<Request, String>>,
    service: &mut Topic<W>,
) -> usize
where
    T: TransformLookup,
    L: Publish<LocatedObject>,
    M: Publish<VisualizationMarker>,
    W: Write,
{
    let mut served = 0;
    loop {
        match requests.try_recv() {
            Ok(Ok(request)) => {
                let response = node.handle(request);
                if let Err(err) = service.publish(&response.to_string()) {
                    error!("failed to answer {}: {err:#}", service.name());
                }
                served += 1;
            }
            Ok(Err(err)) => warn!("ignoring service request: {err}"),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => return served,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::sync::mpsc;

    fn frames(json: &'static str) -> Source {
        Source::replay(json.as_bytes())
    }

    fn messages(out: &[u8]) -> Vec<Value> {
        std::str::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    const TWO_FRAMES: &str = r#"
        [{"id": 1, "corners": [[0,0],[1,0],[1,1],[0,1]], "translation": [0.5, 0.0, 2.0],
          "rotation": [[1,0,0],[0,1,0],[0,0,1]]}]
        [{"id": 1, "corners": [[0,0],[1,0],[1,1],[0,1]], "translation": [0.5, 0.0, 2.0],
          "rotation": [[1,0,0],[0,1,0],[0,0,1]]},
         {"id": 2, "corners": [[0,0],[1,0],[1,1],[0,1]], "translation": [0.0, 1.0, 3.0],
          "rotation": [[1,0,0],[0,1,0],[0,0,1]]}]
    "#;

    #[test]
    fn replays_recorded_frames() {
        let (_sender, receiver) = mpsc::channel();
        let mut out = Vec::new();
        let summary = run(&Config::default(), frames(TWO_FRAMES), receiver, &mut out).unwrap();

        assert_eq!(summary.frames, 2);
        assert_eq!(summary.detections.new, 2);
        assert_eq!(summary.detections.repeated, 1);

        let messages = messages(&out);
        let topics: Vec<_> = messages.iter().map(|m| m["topic"].clone()).collect();
        assert_eq!(
            topics,
            [
                "WASP_planner/Explore_result",
                "visualization_marker",
                "WASP_planner/Explore_result",
                "visualization_marker",
            ]
        );
        assert_eq!(messages[0]["msg"]["label"], "1");
        assert_eq!(messages[0]["msg"]["position"]["z"], 2.0);
        assert_eq!(messages[3]["msg"]["id"], 2);
        assert_eq!(messages[3]["msg"]["position"]["z"], 0.0);
    }

    #[test]
    fn answers_pending_requests_before_frames() {
        let (sender, receiver) = mpsc::channel();
        sender.send(Ok(Request::Reset(true.into()))).unwrap();
        sender.send(Err("failed to parse: \"bogus\"".to_string())).unwrap();
        sender.send(Ok(Request::Reset(false.into()))).unwrap();
        drop(sender);

        let mut out = Vec::new();
        let summary = run(&Config::default(), frames("[]"), receiver, &mut out).unwrap();
        assert_eq!(summary.resets, 2);
        assert_eq!(summary.frames, 1);

        let messages = messages(&out);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["topic"], "reset_tag_detection");
        assert_eq!(messages[0]["msg"], "reset_done 1");
        assert_eq!(messages[1]["msg"], "reset_done 0");
    }

    /// Fails on every call listed in `failing`, otherwise sees one tag with the call's number.
    struct Flaky {
        calls: i32,
        failing: Vec<i32>,
    }

    impl Detect for Flaky {
        fn detect(&mut self, _image: &eagle::GrayImage) -> Result<Vec<MarkerDetection>> {
            self.calls += 1;
            if self.failing.contains(&self.calls) {
                anyhow::bail!("no pose for tag corners");
            }
            Ok(vec![MarkerDetection::new(self.calls, [0.0, 0.0, 1.0])])
        }
    }

    #[test]
    fn live_frame_failures_are_skipped() {
        let frames: Vec<Result<RgbImage>> = vec![
            Ok(RgbImage::new(4, 4)),
            Err(anyhow::anyhow!("camera hiccup")),
            Ok(RgbImage::new(4, 4)),
            Ok(RgbImage::new(4, 4)),
        ];
        let source = Source::Live {
            frames: Box::new(frames.into_iter()),
            detector: Box::new(Flaky {
                calls: 0,
                failing: vec![2],
            }),
            overlay: Some(Box::new(|_: &RgbImage, _: &[MarkerDetection]| -> Result<()> {
                anyhow::bail!("no display")
            })),
        };

        let (_sender, receiver) = mpsc::channel();
        let mut out = Vec::new();
        let summary = run(&Config::default(), source, receiver, &mut out).unwrap();
        assert_eq!(summary.frames, 4);
        assert_eq!(summary.detections.new, 2);

        let labels: Vec<_> = messages(&out)
            .into_iter()
            .filter(|m| m["topic"] == "WASP_planner/Explore_result")
            .map(|m| m["msg"]["label"].clone())
            .collect();
        assert_eq!(labels, ["1", "3"]);
    }

    #[test]
    fn broken_recording_is_an_error() {
        let (_sender, receiver) = mpsc::channel();
        let result = run(&Config::default(), frames("[{\"id\": 1}]"), receiver, Vec::new());
        assert!(result.is_err());
    }
}
