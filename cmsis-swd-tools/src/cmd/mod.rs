pub mod info;
pub mod list;
pub mod read;
pub mod regs;
pub mod reset;
pub mod write;
