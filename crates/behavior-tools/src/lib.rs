//! Tooling primitives for behavior graphs.
//!
//! Engine-agnostic trace capture: the graph runtime reports node lifecycle
//! transitions as [`TraceEvent`]s and inspectors render them afterwards.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod trace;

pub use trace::{
    tags, NullTraceSink, TraceEvent, TraceLog, TraceRecorder, TraceSink, VecTraceSink,
};
