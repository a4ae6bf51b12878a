pub mod array;
pub mod channel;
