//! Reference handlers shipped with the relay.

pub mod baidu;
pub mod maps;
pub mod offline;

pub use baidu::BaiduMaps;
pub use maps::{Coordinates, MapsBackend, MapsTool, Place, Route};
pub use offline::OfflineMaps;
