//! vc-av: external tool discovery and child-process execution.
//!
//! The transcoder (ffmpeg) and the player (ffplay) are external processes;
//! this crate locates them, builds their argument lists, and runs them with
//! cooperative cancellation so a shutting-down session never leaks a child.

pub mod command;
pub mod encode;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use tools::{ToolInfo, ToolRegistry};
