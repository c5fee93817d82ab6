pub mod file;
pub mod quotes;
pub mod stdin;
