pub mod constellation;

pub use constellation::{Constellation, ConstellationScheme};
