//! Command system: shared types, the selector registry, and the built-ins.

mod builtins;
mod registry;
mod types;

pub use builtins::register_builtins;
pub use registry::CommandRegistry;
pub use types::{Command, CommandCategory, CommandError, CommandKind, CommandSpec, NativeHandler};
