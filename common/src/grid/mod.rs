pub mod io;
pub mod map;

pub use map::GridMap;
