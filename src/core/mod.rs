pub mod catalog;
pub mod config;
pub mod error;
pub mod media;
pub mod sampler;
pub mod scanner;


pub use catalog::*;
pub use config::*;
pub use error::*;
pub use media::*;
pub use sampler::*;
pub use scanner::*;
