pub mod compat;
pub mod config;
pub mod display;
pub mod export;
pub mod geom;
pub mod model;
pub mod npy;
pub mod predict;
pub mod zoo;
