pub mod app;
#[cfg(feature = "audio")]
pub mod audio;
pub mod camera;
pub mod cli;
pub mod config;
pub mod controller;
pub mod controls;
pub mod core;
pub mod error;
pub mod geometry;
pub mod loaders;
pub mod material;
pub mod math;
pub mod pointer;
pub mod raycaster;
pub mod render;
pub mod scene;
pub mod stats;

pub use config::ControllerConfig;
pub use controller::{FrameContext, MeshObject, SceneBuilder, SceneController, SceneHooks};
pub use error::{Result, SceneError};
