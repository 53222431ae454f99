//! Bounded, bidirectional message window.
//!
//! Holds a contiguous, size-capped slice of one chat's history:
//! - `index`: ordered set of resident message ids
//! - `window`: the store plus cached bounds
//! - `direction`: classifies an unlabelled batch against the window
//! - `eviction`: trims the edge opposite to the batch just merged
//! - `chunk`: splits id ranges into fixed-size reprocessing batches

pub mod chunk;
pub mod direction;
pub mod error;
pub mod eviction;
pub mod index;
pub mod window;

pub use chunk::{IdRange, chunk_ranges};
pub use direction::{BoundaryPolicy, infer_direction, infer_direction_with};
pub use error::WindowError;
pub use index::SortedIds;
pub use tgsearch_types::Direction;
pub use window::{BatchReport, MessageWindow};
