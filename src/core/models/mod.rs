pub mod display;
pub mod subscription;
