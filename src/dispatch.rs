//! Input parsing, command dispatch, and the fault boundary.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::commands::{Command, CommandError, CommandKind, CommandRegistry};
use crate::log::Severity;
use crate::session::{SessionContext, SharedSession};

/// How deep dispatch may nest before it faults. Scripts re-enter through
/// the bridge's `invoke`, and each level stacks a fresh engine call that
/// the script operation budget cannot see across.
const MAX_INVOKE_DEPTH: usize = 32;

/// What a prompt override wants done with itself after handling a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptFlow {
    /// Keep consuming input lines.
    Retain,
    /// Restore the default parse-and-dispatch strategy.
    Done,
}

/// A temporarily-installed raw-input consumer. While one is active the
/// dispatcher routes whole input lines (including blank ones) to it instead
/// of parsing them.
pub trait PromptHandler {
    fn handle(&mut self, raw: &str, session: &mut SessionContext) -> PromptFlow;
}

/// Owns the registry and the parse-and-dispatch pipeline.
///
/// Input lines are split on the first whitespace run: the first token,
/// lowercased, selects the command; everything after the run is handed to it
/// verbatim. Faults raised by a command body are caught here and converted
/// into exactly one error log entry, after which the dispatcher is ready for
/// the next line. Dispatch may nest when a script invokes another command;
/// nesting past [`MAX_INVOKE_DEPTH`] is a fault like any other.
pub struct Dispatcher {
    registry: RefCell<CommandRegistry>,
    prompt: RefCell<Option<Box<dyn PromptHandler>>>,
    depth: Cell<usize>,
    self_ref: Weak<Dispatcher>,
}

impl Dispatcher {
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            registry: RefCell::new(CommandRegistry::new()),
            prompt: RefCell::new(None),
            depth: Cell::new(0),
            self_ref: weak.clone(),
        })
    }

    pub fn register(&self, command: Command) {
        self.registry.borrow_mut().register(command);
    }

    pub fn lookup(&self, selector: &str) -> Option<Rc<Command>> {
        self.registry.borrow().lookup(selector)
    }

    pub fn commands(&self) -> Vec<Rc<Command>> {
        self.registry.borrow().list()
    }

    /// Fire-and-forget pathway. Blank input and unknown selectors do
    /// nothing; callers wanting unknown-command feedback use
    /// [`execute_command`](Self::execute_command) instead.
    pub fn process_input(&self, raw: &str, session: &SharedSession) {
        if self.route_to_prompt(raw, session) {
            return;
        }
        self.dispatch(raw, session);
    }

    /// Outcome pathway: like [`process_input`](Self::process_input) but
    /// reports whether the line was consumed, either by a command (even one
    /// that faulted) or by an active prompt override.
    pub fn execute_command(&self, raw: &str, session: &SharedSession) -> bool {
        if self.route_to_prompt(raw, session) {
            return true;
        }
        self.dispatch(raw, session)
    }

    /// Run one command by selector, under the fault boundary. This is the
    /// path the script bridge re-enters, so a scripted invocation behaves
    /// exactly like a typed one. Returns whether a command was matched.
    pub fn invoke(&self, selector: &str, args: &str, session: &SharedSession) -> bool {
        let Some(command) = self.lookup(selector) else {
            tracing::debug!(selector, "no command matched");
            return false;
        };

        if let Err(fault) = self.run(&command, args, session) {
            tracing::warn!(command = %command.spec.name, error = %fault, "command faulted");
            session
                .borrow_mut()
                .log
                .push(Severity::Error, format!("{}: {}", command.spec.name, fault));
        }
        true
    }

    /// Install a prompt override. Call between input events only; commands
    /// use [`SessionContext::request_prompt`] instead.
    pub fn set_prompt(&self, handler: Box<dyn PromptHandler>) {
        *self.prompt.borrow_mut() = Some(handler);
    }

    pub fn clear_prompt(&self) {
        self.prompt.borrow_mut().take();
    }

    pub fn prompt_active(&self) -> bool {
        self.prompt.borrow().is_some()
    }

    fn route_to_prompt(&self, raw: &str, session: &SharedSession) -> bool {
        let Some(mut handler) = self.prompt.borrow_mut().take() else {
            return false;
        };

        let flow = handler.handle(raw, &mut session.borrow_mut());
        if flow == PromptFlow::Retain {
            let mut slot = self.prompt.borrow_mut();
            if slot.is_none() {
                *slot = Some(handler);
            }
        }
        true
    }

    fn dispatch(&self, raw: &str, session: &SharedSession) -> bool {
        let Some((selector, args)) = split_input(raw) else {
            return false;
        };
        self.invoke(&selector, args, session)
    }

    fn run(
        &self,
        command: &Rc<Command>,
        args: &str,
        session: &SharedSession,
    ) -> Result<(), CommandError> {
        let depth = self.depth.get();
        if depth >= MAX_INVOKE_DEPTH {
            return Err(CommandError::Failed("command recursion too deep".to_string()));
        }

        self.depth.set(depth + 1);
        let result = match &command.kind {
            CommandKind::Native(handler) => handler(args, &mut session.borrow_mut()),
            CommandKind::Script(script) => match self.self_ref.upgrade() {
                Some(dispatcher) => script.execute(args, session, &dispatcher),
                None => Err(CommandError::Failed("dispatcher is gone".to_string())),
            },
        };
        self.depth.set(depth);
        result
    }
}

/// Split a raw line into (lowercased selector, verbatim remainder). The
/// remainder starts after the first whitespace run and is not trimmed at the
/// end. Returns None for blank input.
fn split_input(raw: &str) -> Option<(String, &str)> {
    let raw = raw.trim_start();
    if raw.is_empty() {
        return None;
    }
    match raw.find(char::is_whitespace) {
        Some(index) => {
            let (selector, rest) = raw.split_at(index);
            Some((selector.to_lowercase(), rest.trim_start()))
        }
        None => Some((raw.to_lowercase(), "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Command, CommandCategory, CommandSpec};
    use crate::session::Player;
    use crate::world::World;

    fn test_session() -> SharedSession {
        SessionContext::shared(Player::new("Tester"), World::starter())
    }

    fn echo_command() -> Command {
        Command::native(
            CommandSpec::new("echo", "Repeat the arguments", "echo <text>", CommandCategory::General),
            |args, session| {
                session.log.push(Severity::Info, format!("echo:{}", args));
                Ok(())
            },
        )
    }

    fn failing_command() -> Command {
        Command::native(
            CommandSpec::new("boom", "Always faults", "boom", CommandCategory::General),
            |_args, _session| Err(CommandError::Failed("it broke".to_string())),
        )
    }

    #[test]
    fn split_keeps_remainder_verbatim() {
        let (selector, args) = split_input("attack   goblin  king ").unwrap();
        assert_eq!(selector, "attack");
        assert_eq!(args, "goblin  king ");
    }

    #[test]
    fn split_lowercases_selector_only() {
        let (selector, args) = split_input("Say Hello There").unwrap();
        assert_eq!(selector, "say");
        assert_eq!(args, "Hello There");
    }

    #[test]
    fn split_without_arguments_yields_empty_remainder() {
        let (selector, args) = split_input("look").unwrap();
        assert_eq!(selector, "look");
        assert_eq!(args, "");
    }

    #[test]
    fn split_rejects_blank_lines() {
        assert!(split_input("").is_none());
        assert!(split_input("   ").is_none());
        assert!(split_input("\t").is_none());
    }

    #[test]
    fn known_command_runs_and_reports_true() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(echo_command());
        let session = test_session();

        assert!(dispatcher.execute_command("echo hello", &session));

        let session = session.borrow();
        assert_eq!(session.log.len(), 1);
        assert_eq!(session.log.entries()[0].message, "echo:hello");
    }

    #[test]
    fn unknown_selector_reports_false_and_logs_nothing() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(echo_command());
        let session = test_session();

        assert!(!dispatcher.execute_command("frobnicate now", &session));
        assert!(session.borrow().log.is_empty());
    }

    #[test]
    fn blank_input_reports_false_and_logs_nothing() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(echo_command());
        let session = test_session();

        assert!(!dispatcher.execute_command("", &session));
        assert!(!dispatcher.execute_command("   ", &session));
        assert!(session.borrow().log.is_empty());
    }

    #[test]
    fn dispatch_is_case_insensitive() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(echo_command());
        let session = test_session();

        assert!(dispatcher.execute_command("ECHO loud", &session));
        assert_eq!(session.borrow().log.entries()[0].message, "echo:loud");
    }

    #[test]
    fn fault_becomes_exactly_one_error_entry() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(failing_command());
        let session = test_session();

        assert!(dispatcher.execute_command("boom", &session));

        let session = session.borrow();
        assert_eq!(session.log.len(), 1);
        let entry = &session.log.entries()[0];
        assert_eq!(entry.severity, Severity::Error);
        assert!(entry.message.contains("boom"));
        assert!(entry.message.contains("it broke"));
    }

    #[test]
    fn next_command_runs_normally_after_a_fault() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(failing_command());
        dispatcher.register(echo_command());
        let session = test_session();

        dispatcher.execute_command("boom", &session);
        assert!(dispatcher.execute_command("echo still here", &session));

        let session = session.borrow();
        assert_eq!(session.log.len(), 2);
        assert_eq!(session.log.entries()[1].severity, Severity::Info);
        assert_eq!(session.log.entries()[1].message, "echo:still here");
    }

    #[test]
    fn process_input_is_fire_and_forget() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(echo_command());
        let session = test_session();

        dispatcher.process_input("nonsense", &session);
        dispatcher.process_input("echo ran", &session);

        let session = session.borrow();
        assert_eq!(session.log.len(), 1);
        assert_eq!(session.log.entries()[0].message, "echo:ran");
    }

    struct Recorder {
        lines: Rc<RefCell<Vec<String>>>,
    }

    impl PromptHandler for Recorder {
        fn handle(&mut self, raw: &str, _session: &mut SessionContext) -> PromptFlow {
            self.lines.borrow_mut().push(raw.to_string());
            if raw == "done" {
                PromptFlow::Done
            } else {
                PromptFlow::Retain
            }
        }
    }

    #[test]
    fn prompt_override_consumes_lines_until_done() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(echo_command());
        let session = test_session();

        let lines = Rc::new(RefCell::new(Vec::new()));
        dispatcher.set_prompt(Box::new(Recorder {
            lines: Rc::clone(&lines),
        }));

        // Routed to the override, not parsed. Even blank lines go there.
        assert!(dispatcher.execute_command("echo hijacked", &session));
        assert!(dispatcher.execute_command("", &session));
        assert!(dispatcher.execute_command("done", &session));
        assert!(!dispatcher.prompt_active());

        assert_eq!(
            *lines.borrow(),
            vec!["echo hijacked".to_string(), String::new(), "done".to_string()]
        );
        assert!(session.borrow().log.is_empty());

        // Default strategy restored.
        assert!(dispatcher.execute_command("echo back", &session));
        assert_eq!(session.borrow().log.entries()[0].message, "echo:back");
    }

    #[test]
    fn clear_prompt_restores_dispatch() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(echo_command());
        let session = test_session();

        let lines = Rc::new(RefCell::new(Vec::new()));
        dispatcher.set_prompt(Box::new(Recorder {
            lines: Rc::clone(&lines),
        }));
        assert!(dispatcher.prompt_active());

        dispatcher.clear_prompt();
        assert!(!dispatcher.prompt_active());

        assert!(dispatcher.execute_command("echo free", &session));
        assert_eq!(session.borrow().log.len(), 1);
    }

    #[test]
    fn invoke_matches_like_typed_input() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(echo_command());
        let session = test_session();

        assert!(dispatcher.invoke("ECHO", "from invoke", &session));
        assert!(!dispatcher.invoke("missing", "", &session));

        let session = session.borrow();
        assert_eq!(session.log.len(), 1);
        assert_eq!(session.log.entries()[0].message, "echo:from invoke");
    }
}
