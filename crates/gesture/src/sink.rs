//! Command sinks

use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use tracing::info;

use crate::GestureError;

/// A finalized command leaving the session controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedCommand {
    /// Command class index
    pub index: usize,
    /// Command name from the vocabulary
    pub label: String,
    /// Votes the command received
    pub votes: usize,
    /// Command votes cast in the window
    pub total_votes: usize,
    /// Vote count that had to be exceeded
    pub threshold: f64,
}

/// Destination for finalized commands
pub trait CommandSink {
    fn emit(&mut self, command: &EmittedCommand) -> Result<(), GestureError>;
}

impl<T: CommandSink + ?Sized> CommandSink for Box<T> {
    fn emit(&mut self, command: &EmittedCommand) -> Result<(), GestureError> {
        (**self).emit(command)
    }
}

/// Logs commands through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl CommandSink for LogSink {
    fn emit(&mut self, command: &EmittedCommand) -> Result<(), GestureError> {
        info!(
            command = %command.label,
            index = command.index,
            votes = command.votes,
            "Command recognised"
        );
        Ok(())
    }
}

/// Writes one line per command: the bare label, or a JSON object
pub struct WriterSink<W: Write> {
    writer: W,
    json: bool,
}

impl WriterSink<io::Stdout> {
    pub fn stdout(json: bool) -> Self {
        Self::new(io::stdout(), json)
    }
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, json: bool) -> Self {
        Self { writer, json }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> CommandSink for WriterSink<W> {
    fn emit(&mut self, command: &EmittedCommand) -> Result<(), GestureError> {
        let line = if self.json {
            serde_json::to_string(command).map_err(|e| GestureError::Sink(e.to_string()))?
        } else {
            command.label.clone()
        };
        writeln!(self.writer, "{}", line)
            .and_then(|_| self.writer.flush())
            .map_err(|e| GestureError::Sink(e.to_string()))
    }
}

/// Keeps every emitted command in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    commands: Vec<EmittedCommand>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[EmittedCommand] {
        &self.commands
    }

    pub fn labels(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.label.as_str()).collect()
    }
}

impl CommandSink for MemorySink {
    fn emit(&mut self, command: &EmittedCommand) -> Result<(), GestureError> {
        self.commands.push(command.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> EmittedCommand {
        EmittedCommand {
            index: 2,
            label: "TEMP_UP".into(),
            votes: 12,
            total_votes: 15,
            threshold: 10.0,
        }
    }

    #[test]
    fn test_plain_writer() {
        let mut sink = WriterSink::new(Vec::new(), false);
        sink.emit(&command()).unwrap();
        assert_eq!(String::from_utf8(sink.into_inner()).unwrap(), "TEMP_UP\n");
    }

    #[test]
    fn test_json_writer() {
        let mut sink = WriterSink::new(Vec::new(), true);
        sink.emit(&command()).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let parsed: EmittedCommand = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(parsed, command());
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.emit(&command()).unwrap();
        LogSink.emit(&command()).unwrap();
        assert_eq!(sink.labels(), vec!["TEMP_UP"]);
    }
}
