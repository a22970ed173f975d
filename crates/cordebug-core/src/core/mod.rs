pub mod cast;
pub mod com_ptr;
pub mod enumerator;
pub mod error;
pub mod interface;
pub mod registry;
pub mod session;
