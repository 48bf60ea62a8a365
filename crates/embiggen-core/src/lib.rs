pub mod backend;
pub mod consts;
pub mod error;
pub mod fetch;
pub mod geometry;
pub mod level;
pub mod overlay;
pub mod refresh;
pub mod renderer;
pub mod resource;
pub mod session;
pub mod settings;
pub mod source;
