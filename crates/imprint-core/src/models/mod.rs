//! Data models shared by the pipeline, the stores and the lifecycle service.

mod color;
mod template;
mod upload;

pub use color::HexColor;
pub use template::*;
pub use upload::*;
