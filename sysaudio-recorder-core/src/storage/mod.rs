pub mod recordings;
pub mod sink;
