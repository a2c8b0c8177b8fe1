pub mod file;
pub mod process;
pub mod sha;
