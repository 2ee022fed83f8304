pub mod backend;
pub mod error;
pub mod object;
mod path;

pub use crate::backend::ObjectStore;
pub use crate::object::{CONTENT_MD5_KEY, Headed, Headers, Listed, ObjectInfo, ObjectMeta, PutAttributes};
pub use crate::path::{key_for, validate as validate_path, validate_key};
use std::sync::Arc;

pub type StoreHandle = Arc<dyn ObjectStore + Send + Sync>;
