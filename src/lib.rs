pub mod builtins;
pub mod bytecode;
pub mod diagnostic;
pub mod value;
pub mod vm;
