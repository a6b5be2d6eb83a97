mod device;
mod history;
mod in_memory_namespace_store;
mod namespace_store;
mod result;

pub use device::*;
pub use history::*;
pub use in_memory_namespace_store::*;
pub use namespace_store::*;
pub use result::*;
