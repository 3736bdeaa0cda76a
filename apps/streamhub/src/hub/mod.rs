//! The message hub: first-frame dispatch, streamer registry, viewer fanout.

pub mod fanout;
pub mod protocol;
pub mod registry;
pub mod server;
