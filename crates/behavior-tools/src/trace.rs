#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Tags recorded by the graph runtime for node lifecycle transitions.
///
/// For all of them `a` is the node's arena index and `b` the numeric status
/// the node reported.
pub mod tags {
    pub const NODE_START: &str = "node.start";
    pub const NODE_UPDATE: &str = "node.update";
    pub const NODE_AWAKE: &str = "node.awake";
    pub const NODE_END: &str = "node.end";
}

/// A small trace event: a tick, a tag and two integer payloads.
///
/// Plain data so it can be recorded while a graph runs and rendered later.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceEvent {
    pub tick: u64,
    pub tag: Cow<'static, str>,
    pub a: u64,
    pub b: u64,
}

impl TraceEvent {
    pub fn new(tick: u64, tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tick,
            tag: tag.into(),
            a: 0,
            b: 0,
        }
    }

    pub fn with_a(mut self, a: u64) -> Self {
        self.a = a;
        self
    }

    pub fn with_b(mut self, b: u64) -> Self {
        self.b = b;
        self
    }
}

pub trait TraceSink: Send {
    fn emit(&mut self, event: TraceEvent);
}

#[derive(Debug, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn emit(&mut self, _event: TraceEvent) {}
}

#[derive(Debug, Default)]
pub struct VecTraceSink {
    pub events: Vec<TraceEvent>,
}

impl TraceSink for VecTraceSink {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a TraceEvent> + 'a {
        self.events.iter().filter(move |e| e.tag == tag)
    }
}

/// Where a running graph sends its trace events: an in-memory log, a
/// user-provided sink, both, or neither.
#[derive(Default)]
pub struct TraceRecorder {
    log: Option<TraceLog>,
    sink: Option<Box<dyn TraceSink>>,
}

impl fmt::Debug for TraceRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceRecorder")
            .field("log", &self.log)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts collecting into an in-memory log (keeps an existing one).
    pub fn enable_log(&mut self) {
        self.log.get_or_insert_with(TraceLog::default);
    }

    pub fn set_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.sink = Some(sink);
    }

    pub fn clear_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        self.sink.take()
    }

    pub fn is_enabled(&self) -> bool {
        self.log.is_some() || self.sink.is_some()
    }

    pub fn log(&self) -> Option<&TraceLog> {
        self.log.as_ref()
    }

    pub fn take_log(&mut self) -> Option<TraceLog> {
        self.log.as_mut().map(std::mem::take)
    }

    pub fn emit(&mut self, event: TraceEvent) {
        match (&mut self.log, &mut self.sink) {
            (Some(log), Some(sink)) => {
                log.push(event.clone());
                sink.emit(event);
            }
            (Some(log), None) => log.push(event),
            (None, Some(sink)) => sink.emit(event),
            (None, None) => {}
        }
    }
}
