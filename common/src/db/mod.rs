pub mod region;
pub mod step;
