use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::Parser;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use dialoguer::{theme::ColorfulTheme, Input, Select};
use grimvale::commands::register_builtins;
use grimvale::config::{self, ConfigError, GameConfig};
use grimvale::dispatch::Dispatcher;
use grimvale::gate::Gate;
use grimvale::log::Severity;
use grimvale::save;
use grimvale::script;
use grimvale::session::{Player, SessionContext, SharedSession};
use grimvale::world::World;
use reedline::{DefaultPrompt, DefaultPromptSegment, Reedline, Signal};

#[derive(Parser)]
#[command(name = "grimvale", version, about = "A scriptable console adventure")]
struct Cli {
    /// Directory to load script commands from
    #[arg(long)]
    scripts: Option<PathBuf>,
    /// Directory save slots are stored in
    #[arg(long)]
    save_dir: Option<PathBuf>,
    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let config = match config::load_config() {
        Ok(cfg) => cfg,
        Err(ConfigError::NotFound(_)) => GameConfig::default(),
        Err(e) => {
            print_colored_message(&format!("Warning: {}\n", e), Color::DarkYellow);
            GameConfig::default()
        }
    };
    let (scripts_dir, save_dir, color) = effective_settings(cli, &config);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            print_colored_message(&format!("Could not start runtime: {}\n", e), Color::Red);
            return;
        }
    };
    // The session loop itself stays on this thread, outside the runtime, so
    // the gate can block on async work.
    let gate = Gate::new(runtime.handle().clone());

    let config = Rc::new(RefCell::new(config));

    let Some(session) = start_session(&gate, &save_dir) else {
        print_colored_message("Until next time.\n", Color::DarkMagenta);
        return;
    };

    let dispatcher = Dispatcher::new();
    register_builtins(&dispatcher, &gate, &save_dir, &config);

    let engine = Rc::new(script::build_engine());
    for command in script::load_dir(&engine, &scripts_dir) {
        dispatcher.register(command);
    }

    {
        let mut session_ref = session.borrow_mut();
        let name = session_ref.player.name.clone();
        session_ref.log.push(
            Severity::Story,
            format!("The gates of Grimvale creak open for {}.", name),
        );
        session_ref
            .log
            .push(Severity::Info, "Type help to see what you can do.");
    }
    dispatcher.execute_command("look", &session);
    flush_log(&session, color);

    let mut rl = Reedline::create();
    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic("grimvale".to_string()),
        DefaultPromptSegment::Empty,
    );

    loop {
        let raw = match rl.read_line(&prompt) {
            Ok(Signal::Success(input)) => input,
            Ok(Signal::CtrlD) | Ok(Signal::CtrlC) | Err(_) => break,
        };

        // Blank lines are ignored unless a prompt override is waiting on an
        // answer. The line itself is passed on untrimmed.
        let blank = raw.trim().is_empty();
        if blank && !dispatcher.prompt_active() {
            continue;
        }

        let handled = dispatcher.execute_command(&raw, &session);
        if !handled && !blank {
            print_colored_message(
                "Unknown command. Type help to see what you can do.\n",
                Color::DarkMagenta,
            );
        }

        flush_log(&session, color);

        let request = session.borrow_mut().take_prompt_request();
        if let Some(handler) = request {
            dispatcher.set_prompt(handler);
        }

        if session.borrow().is_ended() {
            break;
        }
    }

    if let Err(e) = config.borrow().save() {
        print_colored_message(
            &format!("Warning: could not save config: {}\n", e),
            Color::DarkYellow,
        );
    }
    print_colored_message("Farewell, traveler.\n", Color::DarkMagenta);
}

/// Settings for this run. CLI flags win over the config file, but the
/// stored config is left alone: the only thing written back at exit is
/// whatever `last_slot` the session updated.
fn effective_settings(cli: Cli, config: &GameConfig) -> (PathBuf, PathBuf, bool) {
    let scripts_dir = cli.scripts.unwrap_or_else(|| config.scripts_path());
    let save_dir = cli.save_dir.unwrap_or_else(|| config.saves_path());
    let color = config.color && !cli.no_color;
    (scripts_dir, save_dir, color)
}

fn start_session(gate: &Gate, save_dir: &Path) -> Option<SharedSession> {
    let choices = ["New game", "Load game", "Quit"];
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Welcome to Grimvale")
        .items(&choices)
        .default(0)
        .interact_opt();

    match selection {
        Ok(Some(0)) => Some(new_session()),
        Ok(Some(1)) => load_session(gate, save_dir),
        Ok(Some(_)) | Ok(None) => None,
        Err(_) => {
            print_colored_message("Selection failed.\n", Color::Red);
            None
        }
    }
}

fn new_session() -> SharedSession {
    let name = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("What is your name?")
        .default("Wanderer".to_string())
        .interact_text()
        .unwrap_or_else(|_| "Wanderer".to_string());

    let trimmed = name.trim();
    let player = if trimmed.is_empty() {
        Player::new("Wanderer")
    } else {
        Player::new(trimmed)
    };
    SessionContext::shared(player, World::starter())
}

fn load_session(gate: &Gate, save_dir: &Path) -> Option<SharedSession> {
    let slots = save::list_slots(save_dir);
    if slots.is_empty() {
        print_colored_message("No saves yet. Starting a new game.\n", Color::DarkYellow);
        return Some(new_session());
    }

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Load which slot?")
        .items(&slots)
        .default(0)
        .interact_opt();
    let slot = match selection {
        Ok(Some(index)) => slots[index].clone(),
        Ok(None) => {
            print_colored_message("Selection cancelled.\n", Color::DarkMagenta);
            return None;
        }
        Err(_) => {
            print_colored_message("Selection failed.\n", Color::Red);
            return None;
        }
    };

    match gate.wait(save::read_save(save_dir, &slot)) {
        Ok(loaded) => {
            let session = SessionContext::shared(Player::new("Wanderer"), World::starter());
            loaded.apply(&mut session.borrow_mut());
            Some(session)
        }
        Err(e) => {
            print_colored_message(&format!("Could not load {}: {}\n", slot, e), Color::Red);
            None
        }
    }
}

fn flush_log(session: &SharedSession, color: bool) {
    let mut session = session.borrow_mut();
    for entry in session.log.take_unrendered() {
        if color {
            print_colored_message(&format!("{}\n", entry.message), entry.severity.color());
        } else {
            println!("{}", entry.message);
        }
    }
}

fn print_colored_message(message: &str, color: Color) {
    let mut stdout = io::stdout();
    execute!(
        stdout,
        SetForegroundColor(color),
        Print(message),
        ResetColor
    )
    .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_apply_to_the_run_without_touching_config() {
        let config = GameConfig {
            script_dir: Some(PathBuf::from("/etc/grimvale/scripts")),
            save_dir: None,
            color: true,
            last_slot: Some("camp".to_string()),
        };
        let cli = Cli {
            scripts: Some(PathBuf::from("/tmp/mods")),
            save_dir: Some(PathBuf::from("/tmp/slots")),
            no_color: true,
        };

        let (scripts_dir, save_dir, color) = effective_settings(cli, &config);
        assert_eq!(scripts_dir, PathBuf::from("/tmp/mods"));
        assert_eq!(save_dir, PathBuf::from("/tmp/slots"));
        assert!(!color);

        // The stored config still holds its own values; those are what a
        // later save() writes back.
        assert_eq!(config.script_dir, Some(PathBuf::from("/etc/grimvale/scripts")));
        assert!(config.save_dir.is_none());
        assert!(config.color);
        assert_eq!(config.last_slot, Some("camp".to_string()));
    }

    #[test]
    fn absent_flags_fall_back_to_config() {
        let config = GameConfig::default();
        let cli = Cli {
            scripts: None,
            save_dir: None,
            no_color: false,
        };

        let (scripts_dir, save_dir, color) = effective_settings(cli, &config);
        assert_eq!(scripts_dir, PathBuf::from("scripts"));
        assert_eq!(save_dir, config.saves_path());
        assert!(color);
    }
}
