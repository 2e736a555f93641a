//! In-process group simulation
//!
//! Builds small groups of stacks connected through a lossless in-memory
//! network, so that the only message loss comes from the discard layers.

pub mod app;
pub mod error;
pub mod network;
pub mod node;
pub mod transport;

pub use app::RecordingApp;
pub use error::{SimError, SimResult};
pub use network::{NetworkStats, SimNetwork};
pub use node::{start_group, SimNode};
pub use transport::SimTransport;
