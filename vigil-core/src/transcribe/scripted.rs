//! `ScriptedTranscriber` — deterministic backend that replays a fixed script.
//!
//! One script entry per chunk, in order; `None` entries model silent chunks
//! and anything past the end of the script is silence too. Drives the replay
//! harness and most of the engine tests: pair it with a scripted audio
//! source and a whole session becomes reproducible.

use tracing::debug;

use crate::buffering::chunk::AudioChunk;
use crate::error::Result;
use crate::transcribe::TranscriptionEngine;

pub struct ScriptedTranscriber {
    script: Vec<Option<String>>,
    cursor: usize,
    resets: usize,
}

impl ScriptedTranscriber {
    pub fn new(script: Vec<Option<String>>) -> Self {
        Self {
            script,
            cursor: 0,
            resets: 0,
        }
    }

    /// Builds a script from plain lines; blank lines become silent chunks.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let script = lines
            .into_iter()
            .map(|line| {
                let line = line.into();
                if line.trim().is_empty() {
                    None
                } else {
                    Some(line)
                }
            })
            .collect();
        Self::new(script)
    }

    /// Number of times `reset` has been called. Sessions reset their
    /// transcriber on every exit path, so tests assert on this.
    pub fn resets(&self) -> usize {
        self.resets
    }
}

impl TranscriptionEngine for ScriptedTranscriber {
    fn initialize(&mut self) -> Result<()> {
        debug!(entries = self.script.len(), "ScriptedTranscriber::initialize");
        Ok(())
    }

    fn transcribe(&mut self, _chunk: &AudioChunk) -> Result<Option<String>> {
        let entry = self.script.get(self.cursor).cloned().flatten();
        self.cursor += 1;
        Ok(entry)
    }

    fn reset(&mut self) {
        debug!("ScriptedTranscriber::reset");
        self.cursor = 0;
        self.resets += 1;
    }
}
