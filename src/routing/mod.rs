// Route table construction from declarative method maps

pub mod builder;
pub mod method_map;

pub use builder::{build_routes, normalize_base_path, Route, RouteTable, SUPPORTED_METHODS};
pub use method_map::{base_method_map, MethodMap, RouteSpec};
