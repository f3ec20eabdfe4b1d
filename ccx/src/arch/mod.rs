//! Architecture-specific code
//!
//! Byte images and tables whose layout is fixed by the processor rather than
//! by this crate.

pub mod x86_64;
