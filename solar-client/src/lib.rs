pub mod db;
pub mod domain;

pub use db::{StorageTarget, Store, UnsupportedStorage};
