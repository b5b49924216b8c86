use std::io::{BufRead, ErrorKind, Read};
use std::sync::mpsc::{self, Receiver};

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::Deserializer;
use tagwatch::Request;

/// Lazily decodes consecutive JSON values, e.g. one recorded frame of detections per line.
pub fn read_lines<T: DeserializeOwned, R: Read>(reader: R) -> impl Iterator<Item = Result<T>> {
    Deserializer::from_reader(reader)
        .into_iter()
        .map(|r| r.map_err(Into::into))
}

/// Reads service requests line by line on a background thread.
///
/// Blank lines are skipped, lines that do not parse (or are not UTF-8) are handed on as
/// errors. The thread stops at the end of the input, on a read error, or once the receiver
/// is dropped.
pub fn listen<R: BufRead + Send + 'static>(reader: R) -> Receiver<Result<Request, String>> {
    let (sender, receiver) = mpsc::channel();
    std::thread::spawn(move || {
        for line in reader.lines() {
            let (request, broken) = match line {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => (line.trim().parse::<Request>(), false),
                // The offending line has been consumed, the next one can still be read.
                Err(err) if err.kind() == ErrorKind::InvalidData => (Err(err.to_string()), false),
                Err(err) => (Err(err.to_string()), true),
            };
            if sender.send(request).is_err() || broken {
                break;
            }
        }
    });
    receiver
}
