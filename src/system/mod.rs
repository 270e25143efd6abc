pub mod expand;
pub mod tool;
