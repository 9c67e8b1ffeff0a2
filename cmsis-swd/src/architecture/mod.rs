//! All the architecture specific code lives here.

pub mod arm;
