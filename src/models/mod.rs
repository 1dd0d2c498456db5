pub mod artifacts;
pub mod label;
pub mod labels;
pub mod span;

pub use artifacts::*;
pub use label::*;
pub use labels::*;
pub use span::*;
