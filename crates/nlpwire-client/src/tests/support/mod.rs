//! Test harness utilities for the client behavioural suite.

mod recording_channel;
mod world;

pub use recording_channel::{ChannelCall, FailurePoint, RecordingChannel, response_to};
pub use world::{SERVICE_ID, TestWorld, poll_once, world};
