//! One execute method per opcode family, each an `impl Machine` block
//!
//! Every method documents its stack effect as `inputs -> outputs`, with the
//! top of the stack on the right.

pub mod access;
pub mod assign;
pub mod binary;
pub mod call;
pub mod create;
