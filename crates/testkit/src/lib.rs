#![warn(missing_docs)]
//! Deterministic testing surfaces: stand-in combatants, world fixtures and a
//! JSONL message log for headless runs.

mod fighter;
mod fixtures;

use anyhow::Result;
use mudsim_core::{GameMessage, MessageKind, SimTick};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

pub use fighter::*;
pub use fixtures::*;

/// One delivered message captured by a headless test.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// World tick when the message was observed.
    pub tick: SimTick,
    /// Topic the message travelled on.
    pub topic: &'a str,
    /// Message category.
    pub kind: MessageKind,
    /// Rendered text.
    pub text: &'a str,
}

impl<'a> EventRecord<'a> {
    /// Record `message` as seen on `topic` at `tick`.
    pub fn new(tick: SimTick, topic: &'a str, message: &'a GameMessage) -> Self {
        Self {
            tick,
            topic,
            kind: message.kind,
            text: &message.text,
        }
    }
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    file: File,
}

impl JsonlSink {
    /// Create a new sink at `path`, creating parent directories if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self { file })
    }

    /// Append an event to the log.
    pub fn write(&mut self, event: &EventRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        Ok(())
    }
}
