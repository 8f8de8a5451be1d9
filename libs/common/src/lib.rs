pub mod id;

pub use id::connection_id;
