pub mod buildinfo;
pub mod sub;
