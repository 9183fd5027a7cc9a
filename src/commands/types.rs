//! Command system types.

use crate::save::SaveError;
use crate::script::ScriptCommand;
use crate::session::SessionContext;

/// Category for grouping commands in help output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCategory {
    General,
    World,
    Combat,
    Session,
    Scripted,
}

impl CommandCategory {
    /// Display name for help headers.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::General => "GENERAL",
            Self::World => "WORLD",
            Self::Combat => "COMBAT",
            Self::Session => "SESSION",
            Self::Scripted => "SCRIPTED",
        }
    }

    /// Stable lowercase label, used by script descriptors.
    pub fn label(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::World => "world",
            Self::Combat => "combat",
            Self::Session => "session",
            Self::Scripted => "scripted",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "general" => Some(Self::General),
            "world" => Some(Self::World),
            "combat" => Some(Self::Combat),
            "session" => Some(Self::Session),
            "scripted" => Some(Self::Scripted),
            _ => None,
        }
    }

    /// All categories in help display order.
    pub fn all() -> [CommandCategory; 5] {
        [
            Self::General,
            Self::World,
            Self::Combat,
            Self::Session,
            Self::Scripted,
        ]
    }
}

/// Descriptor shared by every command regardless of where it came from.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    pub usage: String,
    pub category: CommandCategory,
    pub aliases: Vec<String>,
}

impl CommandSpec {
    pub fn new(name: &str, description: &str, usage: &str, category: CommandCategory) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            description: description.to_string(),
            usage: usage.to_string(),
            category,
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.trim().to_lowercase()).collect();
        self
    }
}

/// A fault escaping a command body. Converted into exactly one error log
/// entry at the dispatch boundary. Argument mistakes are not faults; those
/// are ordinary log entries from the command itself.
#[derive(Debug)]
pub enum CommandError {
    Script(String),
    Save(SaveError),
    Failed(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Script(msg) => write!(f, "script error: {}", msg),
            CommandError::Save(e) => write!(f, "save error: {}", e),
            CommandError::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<SaveError> for CommandError {
    fn from(e: SaveError) -> Self {
        CommandError::Save(e)
    }
}

/// A native command body.
pub type NativeHandler = Box<dyn Fn(&str, &mut SessionContext) -> Result<(), CommandError>>;

/// How a command executes: compiled in, or adapted from a script module.
pub enum CommandKind {
    Native(NativeHandler),
    Script(ScriptCommand),
}

/// The unit of invocable behavior.
pub struct Command {
    pub spec: CommandSpec,
    pub kind: CommandKind,
}

impl Command {
    pub fn native(
        spec: CommandSpec,
        handler: impl Fn(&str, &mut SessionContext) -> Result<(), CommandError> + 'static,
    ) -> Self {
        Self {
            spec,
            kind: CommandKind::Native(Box::new(handler)),
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self.kind, CommandKind::Script(_))
    }
}

// Hand-written because the native kind holds a closure.
impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.kind {
            CommandKind::Native(_) => "native",
            CommandKind::Script(_) => "script",
        };
        f.debug_struct("Command")
            .field("spec", &self.spec)
            .field("kind", &kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_round_trip() {
        for category in CommandCategory::all() {
            assert_eq!(CommandCategory::from_label(category.label()), Some(category));
        }
        assert_eq!(CommandCategory::from_label("arcane"), None);
    }

    #[test]
    fn spec_normalizes_name_and_aliases() {
        let spec = CommandSpec::new(" Attack ", "Strike a target", "attack <target>", CommandCategory::Combat)
            .with_aliases(&["Hit", " SMITE "]);

        assert_eq!(spec.name, "attack");
        assert_eq!(spec.aliases, vec!["hit", "smite"]);
    }

    #[test]
    fn native_command_is_not_script() {
        let command = Command::native(
            CommandSpec::new("wave", "Wave", "wave", CommandCategory::General),
            |_args, _session| Ok(()),
        );
        assert!(!command.is_script());
    }

    #[test]
    fn command_debug_shows_spec_and_kind() {
        let command = Command::native(
            CommandSpec::new("wave", "Wave", "wave", CommandCategory::General),
            |_args, _session| Ok(()),
        );
        let rendered = format!("{:?}", command);
        assert!(rendered.contains("wave"));
        assert!(rendered.contains("native"));
    }

    #[test]
    fn command_error_display() {
        let fault = CommandError::Script("missing semicolon".to_string());
        assert_eq!(fault.to_string(), "script error: missing semicolon");

        let plain = CommandError::Failed("the floor gave way".to_string());
        assert_eq!(plain.to_string(), "the floor gave way");
    }
}
