pub mod client;
pub mod decode;
pub mod prompts;
pub mod template;
#[cfg(test)]
pub(crate) mod testing;

pub use client::*;
pub use decode::*;
pub use prompts::*;
pub use template::*;
