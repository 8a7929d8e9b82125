pub mod quiz;
pub mod stats;
