mod features;
mod geometry;
mod projection;
mod renderer;

pub use features::FeatureIndex;
pub use geometry::{draw_disc, draw_line, draw_ring};
pub use projection::{centroid, Projection, MAX_LATITUDE};
pub use renderer::{BoundaryLayer, LineString};
