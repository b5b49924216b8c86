use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use anyhow::{Context, Result};
use serde::Serialize;
use tagwatch::Publish;

mod stream;

pub use crate::stream::{listen, read_lines};

#[derive(Serialize)]
struct Envelope<'a, M> {
    topic: &'a str,
    msg: &'a M,
}

/// Writes every published message as one JSON object per line.
///
/// Several topics can share one writer, each line carries the topic it was published on:
/// `{"topic":"visualization_marker","msg":{...}}`.
pub struct JsonLines<W: Write> {
    out: Rc<RefCell<W>>,
}

impl<W: Write> JsonLines<W> {
    pub fn new(out: W) -> Self {
        JsonLines {
            out: Rc::new(RefCell::new(out)),
        }
    }

    pub fn topic(&self, name: impl Into<String>) -> Topic<W> {
        Topic {
            name: name.into(),
            out: self.out.clone(),
        }
    }
}

pub struct Topic<W: Write> {
    name: String,
    out: Rc<RefCell<W>>,
}

impl<W: Write> Topic<W> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<W: Write, M: Serialize> Publish<M> for Topic<W> {
    fn publish(&mut self, msg: &M) -> Result<()> {
        let mut out = self.out.borrow_mut();
        let envelope = Envelope {
            topic: &self.name,
            msg,
        };
        serde_json::to_writer(&mut *out, &envelope)
            .with_context(|| format!("failed to encode message for {}", self.name))?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tagwatch::{LocatedObject, Point, Response};

    #[test]
    fn topics_share_one_stream() {
        let lines = JsonLines::new(Vec::new());
        let mut located = lines.topic("WASP_planner/Explore_result");
        let mut service = lines.topic("reset_tag_detection");

        located
            .publish(&LocatedObject::new(4, "map", Point::new(1.0, 2.0, 0.5)))
            .unwrap();
        service
            .publish(&Response::ResetDone(true.into()).to_string())
            .unwrap();
        assert_eq!(located.name(), "WASP_planner/Explore_result");

        drop((located, service));
        let out = Rc::try_unwrap(lines.out).ok().unwrap().into_inner();
        let text = String::from_utf8(out).unwrap();
        let values: Vec<Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0]["topic"], "WASP_planner/Explore_result");
        assert_eq!(values[0]["msg"]["label"], "4");
        assert_eq!(values[0]["msg"]["position"]["z"], 0.5);
        assert_eq!(values[1]["msg"], "reset_done 1");
    }
}
