//! Catalog data: element set feeds and predicted trajectories

mod feed;
mod space_object;
mod trajectory;

pub use feed::*;
pub use space_object::*;
pub use trajectory::*;
