//! Rank-to-rank transport.
//!
//! The engine talks to its peers through this trait alone: tagged
//! point-to-point messages plus three collectives (barrier, gather to a
//! root, broadcast from a root). Every operation is blocking and every
//! failure is fatal to the step.
//!
//! [`LocalCluster`] provides the in-process implementation used by the
//! tests and the demo binary: one endpoint per rank, each driven by its own
//! thread, connected by buffered channels.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Barrier};

use crate::error::{EngineError, Result};

/// Message tags, one per exchange kind.
///
/// A mismatch between the expected and received tag means the ranks fell
/// out of lockstep, which is unrecoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommTag {
    Candidates,
    Ghosts,
    Gather,
    Broadcast,
}

/// Blocking MPI-style transport endpoint for one rank.
pub trait Transport: Send {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn send(&self, to: usize, tag: CommTag, payload: Vec<u8>) -> Result<()>;
    fn recv(&self, from: usize, tag: CommTag) -> Result<Vec<u8>>;

    /// Wait until every rank reached this point.
    fn barrier(&self) -> Result<()>;

    /// Collect one buffer per rank at `root`, in rank order.
    /// Returns `Some(buffers)` at the root, `None` elsewhere.
    fn gather(&self, root: usize, payload: Vec<u8>) -> Result<Option<Vec<Vec<u8>>>>;

    /// Distribute a buffer from `root` to every rank. Only the root passes
    /// `Some(payload)`; every rank returns the distributed buffer.
    fn broadcast(&self, root: usize, payload: Option<Vec<u8>>) -> Result<Vec<u8>>;
}

type Message = (CommTag, Vec<u8>);

/// Channel-backed transport for running several ranks inside one process.
pub struct LocalTransport {
    rank: usize,
    size: usize,
    /// Sender to each peer, indexed by destination rank
    txs: Vec<Sender<Message>>,
    /// Receiver from each peer, indexed by source rank
    rxs: Vec<Receiver<Message>>,
    barrier: Arc<Barrier>,
}

/// Builder for a fully connected set of [`LocalTransport`] endpoints.
pub struct LocalCluster;

impl LocalCluster {
    /// One endpoint per rank; hand each to its rank's thread.
    pub fn new(size: usize) -> Vec<LocalTransport> {
        assert!(size > 0, "cluster needs at least one rank");

        let barrier = Arc::new(Barrier::new(size));

        // txs[src][dst] pairs with rxs[dst][src].
        let mut txs: Vec<Vec<Sender<Message>>> = (0..size).map(|_| Vec::new()).collect();
        let mut rxs: Vec<Vec<Receiver<Message>>> = (0..size).map(|_| Vec::new()).collect();

        for src in 0..size {
            for dst in 0..size {
                let (tx, rx) = channel();
                txs[src].push(tx);
                rxs[dst].push(rx);
            }
        }

        // rxs was filled dst-major above but pushed in src order per dst,
        // so rxs[dst][src] already holds the receiver from src.
        txs.into_iter()
            .zip(rxs)
            .enumerate()
            .map(|(rank, (txs, rxs))| LocalTransport {
                rank,
                size,
                txs,
                rxs,
                barrier: barrier.clone(),
            })
            .collect()
    }
}

impl Transport for LocalTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, to: usize, tag: CommTag, payload: Vec<u8>) -> Result<()> {
        if to >= self.size {
            return Err(EngineError::comm(format!("send to unknown rank {}", to)));
        }
        self.txs[to]
            .send((tag, payload))
            .map_err(|_| EngineError::comm(format!("rank {} is gone", to)))
    }

    fn recv(&self, from: usize, tag: CommTag) -> Result<Vec<u8>> {
        if from >= self.size {
            return Err(EngineError::comm(format!("recv from unknown rank {}", from)));
        }
        let (got, payload) = self.rxs[from]
            .recv()
            .map_err(|_| EngineError::comm(format!("rank {} is gone", from)))?;
        if got != tag {
            return Err(EngineError::comm(format!(
                "tag mismatch from rank {}: expected {:?}, got {:?}",
                from, tag, got
            )));
        }
        Ok(payload)
    }

    fn barrier(&self) -> Result<()> {
        self.barrier.wait();
        Ok(())
    }

    fn gather(&self, root: usize, payload: Vec<u8>) -> Result<Option<Vec<Vec<u8>>>> {
        if self.rank == root {
            let mut buffers = Vec::with_capacity(self.size);
            for src in 0..self.size {
                if src == self.rank {
                    buffers.push(payload.clone());
                } else {
                    buffers.push(self.recv(src, CommTag::Gather)?);
                }
            }
            Ok(Some(buffers))
        } else {
            self.send(root, CommTag::Gather, payload)?;
            Ok(None)
        }
    }

    fn broadcast(&self, root: usize, payload: Option<Vec<u8>>) -> Result<Vec<u8>> {
        if self.rank == root {
            let data =
                payload.ok_or_else(|| EngineError::comm("broadcast root without payload"))?;
            for dst in 0..self.size {
                if dst != self.rank {
                    self.send(dst, CommTag::Broadcast, data.clone())?;
                }
            }
            Ok(data)
        } else {
            self.recv(root, CommTag::Broadcast)
        }
    }
}
