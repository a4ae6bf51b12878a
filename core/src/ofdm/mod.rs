pub mod channel;
pub mod frame;
pub mod reference;

pub use channel::{ChannelEstimator, Periodogram, PeriodogramSize};
pub use frame::{FrameGeometry, OfdmTransform};
pub use reference::ReferenceFrame;
