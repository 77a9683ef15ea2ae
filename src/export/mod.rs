//! Export of collected statistics.

mod csv_export;

pub use csv_export::{
    export_intra_inter_counters, export_reaction_counters, export_reaction_counters_timestamped,
};
