pub mod camera;
pub mod core;
pub mod error;
pub mod material;
pub mod math;
pub mod model;
pub mod parser;
pub mod render;
pub mod shading;
pub mod transform;

pub use math::*;
