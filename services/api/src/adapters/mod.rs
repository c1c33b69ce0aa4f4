pub mod delay;
pub mod file_store;

pub use delay::TokioDelay;
pub use file_store::FileStore;
