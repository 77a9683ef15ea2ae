//! Logical 3D process grid.
//!
//! Ranks are arranged in a periodic grid, x fastest:
//! `rank = x + dims[0] * (y + dims[1] * z)`. Each rank has up to six
//! axis-aligned neighbors, addressed as `2 * axis + lr` with `lr = 0` for
//! the negative direction and `lr = 1` for the positive one.

use crate::error::{EngineError, Result};

/// Position of one rank inside the process grid.
#[derive(Debug, Clone)]
pub struct NodeGrid {
    dims: [usize; 3],
    pos: [usize; 3],
    rank: usize,
}

impl NodeGrid {
    pub fn new(dims: [usize; 3], rank: usize) -> Result<Self> {
        if dims.iter().any(|&d| d == 0) {
            return Err(EngineError::config("node grid dimensions must be nonzero"));
        }
        let size = dims[0] * dims[1] * dims[2];
        if rank >= size {
            return Err(EngineError::config(format!(
                "rank {} outside {}x{}x{} grid",
                rank, dims[0], dims[1], dims[2]
            )));
        }

        let pos = [
            rank % dims[0],
            (rank / dims[0]) % dims[1],
            rank / (dims[0] * dims[1]),
        ];
        Ok(Self { dims, pos, rank })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    pub fn grid_size(&self, axis: usize) -> usize {
        self.dims[axis]
    }

    pub fn node_position(&self, axis: usize) -> usize {
        self.pos[axis]
    }

    fn rank_of(&self, pos: [usize; 3]) -> usize {
        pos[0] + self.dims[0] * (pos[1] + self.dims[1] * pos[2])
    }

    /// Rank of the neighbor addressed as `2 * axis + lr`, with periodic wrap.
    pub fn neighbor_rank(&self, index: usize) -> usize {
        let axis = index / 2;
        let lr = index % 2;
        let d = self.dims[axis];

        let mut pos = self.pos;
        pos[axis] = if lr == 0 {
            (pos[axis] + d - 1) % d
        } else {
            (pos[axis] + 1) % d
        };
        self.rank_of(pos)
    }
}
