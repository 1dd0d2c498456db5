pub mod entities;
pub mod keywords;
pub mod spans;
pub mod text;

pub use entities::*;
pub use keywords::*;
pub use spans::*;
pub use text::*;
