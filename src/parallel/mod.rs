//! Distributed-memory plumbing: process grid, transport, halo exchange and
//! the wire format shared by all exchanged buffers.

pub mod grid;
pub mod halo;
pub mod transport;
pub mod wire;

pub use grid::NodeGrid;
pub use halo::halo_exchange;
pub use transport::{CommTag, LocalCluster, LocalTransport, Transport};
pub use wire::{WireReader, WireWriter};
