#[allow(non_snake_case)]
pub mod box3D;
pub mod mat3;
pub mod quaternion;
pub mod ray;
pub mod vec3;

pub use box3D::*;
pub use mat3::*;
pub use quaternion::*;
pub use ray::*;
pub use vec3::*;
