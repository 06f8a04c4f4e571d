pub mod backend;
pub mod coordinator;
pub mod layout;
pub mod overlay;
pub mod pool;
pub mod session;

#[cfg(test)]
pub mod testing;


pub use backend::*;
pub use coordinator::*;
pub use layout::*;
pub use overlay::*;
pub use pool::*;
pub use session::*;
