pub mod actor;
pub mod memory;
pub mod store;

#[cfg(all(feature = "store-memory", not(feature = "store-actor")))]
pub use memory::MemoryStore as ActiveStore;

#[cfg(feature = "store-actor")]
pub use actor::ActorStore as ActiveStore;
