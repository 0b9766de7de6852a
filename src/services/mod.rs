//! OneDrive API service implementations.

mod copy;
mod delta;
mod drives;
mod items;
mod upload;

pub use copy::*;
pub use delta::*;
pub use drives::*;
pub use items::*;
pub use upload::*;
