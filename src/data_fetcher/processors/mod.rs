pub mod heuristic;
pub mod mountain;
pub mod normalize;

pub use heuristic::{scan_lifts, scan_webcams};
pub use mountain::classify;
pub use normalize::{Normalized, RawLift, normalize, normalize_webcams, normalized_key};
