//! Neighbor halo exchange.
//!
//! Two-phase, three-axis exchange of an opaque payload with the six
//! axis-aligned grid neighbors. The payload is serialized once by the
//! caller; received buffers are handed to a merge closure after both
//! directions of an axis have completed. Parity along the axis decides
//! send-before-receive versus receive-before-send so paired ranks never
//! deadlock.

use super::grid::NodeGrid;
use super::transport::{CommTag, Transport};
use crate::error::Result;

/// Exchange `payload` with all grid neighbors, merging every received
/// buffer through `merge`.
///
/// Axes with a single rank are skipped; axes with exactly two ranks
/// exchange only once to avoid sending the same buffer twice over the
/// wrapped link.
pub fn halo_exchange<F>(
    comm: &dyn Transport,
    grid: &NodeGrid,
    tag: CommTag,
    payload: &[u8],
    mut merge: F,
) -> Result<()>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    for axis in 0..3 {
        let axis_size = grid.grid_size(axis);
        if axis_size == 1 {
            continue;
        }

        let mut inbox: [Option<Vec<u8>>; 2] = [None, None];

        for lr in 0..2 {
            if axis_size == 2 && lr == 1 {
                continue;
            }

            let receiver = grid.neighbor_rank(2 * axis + lr);
            let sender = grid.neighbor_rank(2 * axis + (1 - lr));

            if grid.node_position(axis) % 2 == 0 {
                comm.send(receiver, tag, payload.to_vec())?;
                inbox[lr] = Some(comm.recv(sender, tag)?);
            } else {
                inbox[lr] = Some(comm.recv(sender, tag)?);
                comm.send(receiver, tag, payload.to_vec())?;
            }
        }

        for buffer in inbox.iter().flatten() {
            merge(buffer)?;
        }
    }

    Ok(())
}
