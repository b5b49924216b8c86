use std::fmt;
use std::str::FromStr;

use burktelefon::Burk;
use serde::{Deserialize, Serialize};
extern crate alloc;

mod messages;

pub use crate::messages::{
    Color, LocatedObject, MarkerAction, MarkerKind, Point, Quaternion, VisualizationMarker,
};

/// Boolean as it travels over the service line: `1`/`0`, also accepting `true`/`false`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag(pub bool);

impl FromStr for Flag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" | "true" => Ok(Flag(true)),
            "0" | "false" => Ok(Flag(false)),
            _ => Err(format!("not a flag: {s:?}")),
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0 as u8)
    }
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        Flag(value)
    }
}

#[derive(Burk, Clone, Copy, Debug, PartialEq)]
pub enum Request {
    #[burk(name = "reset")]
    Reset(Flag),
}

#[derive(Burk, Clone, Copy, Debug, PartialEq)]
pub enum Response {
    #[burk(name = "reset_done")]
    ResetDone(Flag), // echoes the request flag, 1 means the memory was cleared
}

/// Outbound stream of messages of one type.
pub trait Publish<M> {
    fn publish(&mut self, msg: &M) -> anyhow::Result<()>;
}

impl<M: Clone> Publish<M> for Vec<M> {
    fn publish(&mut self, msg: &M) -> anyhow::Result<()> {
        self.push(msg.clone());
        Ok(())
    }
}

impl<M, P: Publish<M> + ?Sized> Publish<M> for &mut P {
    fn publish(&mut self, msg: &M) -> anyhow::Result<()> {
        (**self).publish(msg)
    }
}

/// Publishes to both streams, the second one even when the first fails.
impl<M, A: Publish<M>, B: Publish<M>> Publish<M> for (A, B) {
    fn publish(&mut self, msg: &M) -> anyhow::Result<()> {
        let first = self.0.publish(msg);
        let second = self.1.publish(msg);
        first.and(second)
    }
}
