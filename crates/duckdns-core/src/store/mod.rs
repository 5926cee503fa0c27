// # Config Store Implementations
//
// Implementations of the ConfigStore trait for different persistence
// strategies.

pub mod file;
pub mod memory;

pub use file::FileConfigStore;
pub use memory::MemoryConfigStore;
