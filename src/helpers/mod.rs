pub mod header_flags;
pub mod helper;
