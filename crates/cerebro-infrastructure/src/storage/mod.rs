pub mod atomic_file;
pub mod file_key_value_store;
pub mod toml_file;

pub use atomic_file::{FileLock, write_atomic};
pub use file_key_value_store::FileKeyValueStore;
pub use toml_file::{load_toml, save_toml};
