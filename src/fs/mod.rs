pub mod storage;

pub use storage::JsonFileStorage;
