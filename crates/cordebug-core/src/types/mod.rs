pub mod flags;
pub mod kind;
