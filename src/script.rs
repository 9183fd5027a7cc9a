//! Script command modules: engine setup, loading, validation, execution.
//!
//! A script module is a `.rhai` file that declares a descriptor through
//! top-level constants (`NAME`, `DESCRIPTION`, `USAGE`, `CATEGORY`, and
//! optionally `ALIASES`) and a two-argument function `execute(args, host)`.
//! Loading compiles the file once and reads the descriptor; each dispatch
//! then calls `execute` with a fresh scope and a fresh bridge, so nothing a
//! script does outlives the call except what it changed through the bridge.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use rhai::{AST, CallFnOptions, Dynamic, Engine, Scope};

use crate::bridge::{self, Bridge};
use crate::commands::{Command, CommandCategory, CommandError, CommandKind, CommandSpec};
use crate::dispatch::Dispatcher;
use crate::session::SharedSession;

/// Operation budget per script call. Keeps a runaway script from wedging
/// the session.
const MAX_OPERATIONS: u64 = 100_000;

#[derive(Debug)]
pub enum ScriptError {
    Io(std::io::Error),
    Compile(String),
    Eval(String),
    MissingField(PathBuf, &'static str),
    MissingExecute(PathBuf),
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptError::Io(e) => write!(f, "IO error reading script: {}", e),
            ScriptError::Compile(msg) => write!(f, "script failed to compile: {}", msg),
            ScriptError::Eval(msg) => write!(f, "script descriptor failed to evaluate: {}", msg),
            ScriptError::MissingField(path, field) => {
                write!(f, "script {} declares no {}", path.display(), field)
            }
            ScriptError::MissingExecute(path) => {
                write!(f, "script {} has no execute(args, host)", path.display())
            }
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<std::io::Error> for ScriptError {
    fn from(e: std::io::Error) -> Self {
        ScriptError::Io(e)
    }
}

/// Build the one engine all script commands share: a raw engine with only
/// the core language packages and the bridge registered. No file, network,
/// environment, or process access exists for scripts at all.
pub fn build_engine() -> Engine {
    use rhai::packages::Package;

    let mut engine = Engine::new_raw();

    let core = rhai::packages::LanguageCorePackage::new();
    let arithmetic = rhai::packages::ArithmeticPackage::new();
    let logic = rhai::packages::LogicPackage::new();
    let basic_string = rhai::packages::BasicStringPackage::new();
    let more_string = rhai::packages::MoreStringPackage::new();
    let basic_array = rhai::packages::BasicArrayPackage::new();
    let basic_map = rhai::packages::BasicMapPackage::new();
    let basic_iterator = rhai::packages::BasicIteratorPackage::new();

    core.register_into_engine(&mut engine);
    arithmetic.register_into_engine(&mut engine);
    logic.register_into_engine(&mut engine);
    basic_string.register_into_engine(&mut engine);
    more_string.register_into_engine(&mut engine);
    basic_array.register_into_engine(&mut engine);
    basic_map.register_into_engine(&mut engine);
    basic_iterator.register_into_engine(&mut engine);

    bridge::register(&mut engine);

    // Script print/debug go to diagnostics, not the event log. Scripts talk
    // to the player through host.log.
    engine.on_print(|text| tracing::debug!(target: "script", "{}", text));
    engine.on_debug(|text, source, pos| {
        tracing::debug!(target: "script", ?source, %pos, "{}", text);
    });

    engine.set_max_operations(MAX_OPERATIONS);
    engine
}

/// A loaded script module exposed as a command body.
pub struct ScriptCommand {
    engine: Rc<Engine>,
    ast: AST,
    source: PathBuf,
}

impl ScriptCommand {
    /// Run the script's `execute(args, host)` with a fresh scope and a
    /// fresh bridge. Top-level statements do not re-run here; they were
    /// evaluated once at load time. Any evaluation error comes back as a
    /// fault for the dispatcher's boundary.
    pub fn execute(
        &self,
        args: &str,
        session: &SharedSession,
        dispatcher: &Rc<Dispatcher>,
    ) -> Result<(), CommandError> {
        let host = Bridge::new(Rc::clone(session), Rc::clone(dispatcher));
        let mut scope = Scope::new();
        let options = CallFnOptions::new().eval_ast(false);

        self.engine
            .call_fn_with_options::<Dynamic>(
                options,
                &mut scope,
                &self.ast,
                "execute",
                (args.to_string(), host),
            )
            .map(|_| ())
            .map_err(|e| {
                tracing::debug!(script = %self.source.display(), error = %e, "script execution failed");
                CommandError::Script(e.to_string())
            })
    }
}

fn required_string(scope: &Scope, path: &Path, field: &'static str) -> Result<String, ScriptError> {
    scope
        .get_value::<String>(field)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ScriptError::MissingField(path.to_path_buf(), field))
}

/// Compile a script and read its descriptor into a Command. NAME,
/// DESCRIPTION, USAGE and CATEGORY are required; ALIASES is not.
pub fn load_source(engine: &Rc<Engine>, path: &Path, source: &str) -> Result<Command, ScriptError> {
    let ast = engine
        .compile(source)
        .map_err(|e| ScriptError::Compile(e.to_string()))?;

    // One top-level evaluation materializes the descriptor constants.
    let mut scope = Scope::new();
    engine
        .run_ast_with_scope(&mut scope, &ast)
        .map_err(|e| ScriptError::Eval(e.to_string()))?;

    let name = required_string(&scope, path, "NAME")?.to_lowercase();

    if !ast
        .iter_functions()
        .any(|f| f.name == "execute" && f.params.len() == 2)
    {
        return Err(ScriptError::MissingExecute(path.to_path_buf()));
    }

    let description = required_string(&scope, path, "DESCRIPTION")?;
    let usage = required_string(&scope, path, "USAGE")?;
    let category_label = required_string(&scope, path, "CATEGORY")?;
    let category = CommandCategory::from_label(&category_label).unwrap_or_else(|| {
        tracing::warn!(script = %path.display(), label = %category_label, "unknown category label");
        CommandCategory::Scripted
    });
    let aliases: Vec<String> = scope
        .get_value::<rhai::Array>("ALIASES")
        .map(|items| {
            items
                .into_iter()
                .filter_map(|item| item.into_string().ok())
                .map(|alias| alias.trim().to_lowercase())
                .filter(|alias| !alias.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let mut spec = CommandSpec::new(&name, &description, &usage, category);
    spec.aliases = aliases;

    Ok(Command {
        spec,
        kind: CommandKind::Script(ScriptCommand {
            engine: Rc::clone(engine),
            ast,
            source: path.to_path_buf(),
        }),
    })
}

pub fn load_file(engine: &Rc<Engine>, path: &Path) -> Result<Command, ScriptError> {
    let source = std::fs::read_to_string(path)?;
    load_source(engine, path, &source)
}

/// Load every `*.rhai` file in a directory, skipping files that fail with a
/// warning so one bad script never takes the session down. A missing
/// directory just yields nothing.
pub fn load_dir(engine: &Rc<Engine>, dir: &Path) -> Vec<Command> {
    if !dir.exists() {
        tracing::info!(dir = %dir.display(), "no script directory, skipping");
        return Vec::new();
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "could not read script directory");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "rhai"))
        .collect();
    paths.sort();

    let mut commands = Vec::new();
    for path in paths {
        match load_file(engine, &path) {
            Ok(command) => {
                tracing::debug!(command = %command.spec.name, file = %path.display(), "loaded script command");
                commands.push(command);
            }
            Err(e) => tracing::warn!(file = %path.display(), error = %e, "skipping script"),
        }
    }
    commands
}
