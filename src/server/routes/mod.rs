pub mod modules;
pub mod mounted;
