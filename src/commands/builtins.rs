//! The native command set every session starts with.
//!
//! Handlers never print; they append to the session's event log and the
//! loop renders afterwards. Bad arguments are warnings in the log, not
//! faults, so only genuine failures (IO, script errors) reach the
//! dispatcher's error boundary.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use crate::commands::{Command, CommandCategory, CommandError, CommandSpec};
use crate::config::GameConfig;
use crate::dispatch::{Dispatcher, PromptFlow, PromptHandler};
use crate::gate::Gate;
use crate::log::Severity;
use crate::save::{self, SaveError, SaveGame};
use crate::session::SessionContext;
use crate::world::{TargetKind, resolve_attack};

/// Register the whole built-in set on a dispatcher.
pub fn register_builtins(
    dispatcher: &Rc<Dispatcher>,
    gate: &Gate,
    save_dir: &Path,
    config: &Rc<RefCell<GameConfig>>,
) {
    dispatcher.register(look_command());
    dispatcher.register(go_command());
    dispatcher.register(attack_command(gate.clone()));
    dispatcher.register(status_command());
    dispatcher.register(say_command());
    dispatcher.register(help_command(Rc::downgrade(dispatcher)));
    dispatcher.register(save_command(gate.clone(), save_dir.to_path_buf(), Rc::clone(config)));
    dispatcher.register(load_command(gate.clone(), save_dir.to_path_buf(), Rc::clone(config)));
    dispatcher.register(quit_command());
}

fn describe_location(session: &mut SessionContext) {
    let Some(location) = session.world.location(&session.location) else {
        session.log.push(Severity::Warning, "You are nowhere at all.");
        return;
    };

    let mut lines = vec![
        (Severity::Info, location.name.clone()),
        (Severity::Story, location.description.clone()),
    ];
    if !location.exits.is_empty() {
        let words: Vec<&str> = location.exits.keys().map(String::as_str).collect();
        lines.push((Severity::Info, format!("Exits: {}.", words.join(", "))));
    }
    for creature in &location.creatures {
        if creature.hostile {
            lines.push((
                Severity::Warning,
                format!("A {} snarls at you.", creature.name),
            ));
        } else {
            lines.push((Severity::Info, format!("A {} lingers nearby.", creature.name)));
        }
    }

    for (severity, message) in lines {
        session.log.push(severity, message);
    }
}

fn describe_target(session: &mut SessionContext, token: &str) {
    let Some(target) = session.world.resolve(&session.location, token) else {
        session
            .log
            .push(Severity::Warning, format!("You see no {} here.", token.trim()));
        return;
    };

    let line = match target.kind {
        TargetKind::Creature => {
            let creature = session
                .world
                .location(&session.location)
                .and_then(|loc| loc.creatures.iter().find(|c| c.name == target.name));
            match creature {
                Some(c) if c.hostile => (
                    Severity::Warning,
                    format!(
                        "The {} bares its teeth. It has {} of {} health.",
                        c.name, c.health, c.max_health
                    ),
                ),
                Some(c) => (
                    Severity::Info,
                    format!("The {} pays you little mind.", c.name),
                ),
                None => (Severity::Warning, format!("You see no {} here.", token.trim())),
            }
        }
        TargetKind::Exit => {
            let destination = session
                .world
                .location(&session.location)
                .and_then(|loc| loc.exits.get(&target.name))
                .and_then(|id| session.world.location(id))
                .map(|loc| loc.name.clone());
            match destination {
                Some(name) => (
                    Severity::Info,
                    format!("The way {} leads to {}.", target.name, name),
                ),
                None => (Severity::Info, format!("A way {} lies open.", target.name)),
            }
        }
        TargetKind::Location => (Severity::Info, format!("{} lies that way.", target.name)),
    };

    session.log.push(line.0, line.1);
}

pub fn look_command() -> Command {
    Command::native(
        CommandSpec::new(
            "look",
            "Look around, or inspect something nearby",
            "look [target]",
            CommandCategory::World,
        )
        .with_aliases(&["l"]),
        |args, session| {
            let token = args.trim();
            if token.is_empty() {
                describe_location(session);
            } else {
                describe_target(session, token);
            }
            Ok(())
        },
    )
}

pub fn go_command() -> Command {
    Command::native(
        CommandSpec::new("go", "Travel through an exit", "go <direction>", CommandCategory::World)
            .with_aliases(&["move"]),
        |args, session| {
            let word = args.trim().to_lowercase();
            if word.is_empty() {
                session
                    .log
                    .push(Severity::Warning, "Go where? Try: go <direction>.");
                return Ok(());
            }

            let destination = session
                .world
                .location(&session.location)
                .and_then(|loc| loc.exits.get(&word))
                .cloned();
            let Some(destination) = destination else {
                session
                    .log
                    .push(Severity::Warning, format!("You can't go {} from here.", word));
                return Ok(());
            };

            session.location = destination;
            let Some(arrived) = session.world.location(&session.location) else {
                return Ok(());
            };
            let name = arrived.name.clone();
            let description = arrived.description.clone();
            session
                .log
                .push(Severity::Story, format!("You head {} to {}.", word, name));
            session.log.push(Severity::Info, description);
            Ok(())
        },
    )
}

pub fn attack_command(gate: Gate) -> Command {
    Command::native(
        CommandSpec::new("attack", "Attack a creature", "attack <target>", CommandCategory::Combat)
            .with_aliases(&["hit"]),
        move |args, session| {
            let token = args.trim();
            if token.is_empty() {
                session
                    .log
                    .push(Severity::Warning, "Attack what? Try: attack <target>.");
                return Ok(());
            }

            let Some(target) = session.world.resolve(&session.location, token) else {
                session
                    .log
                    .push(Severity::Warning, format!("You see no {} here.", token));
                return Ok(());
            };
            if target.kind != TargetKind::Creature {
                session
                    .log
                    .push(Severity::Warning, format!("You can't attack {}.", target.name));
                return Ok(());
            }

            let report = {
                let creature = session
                    .world
                    .location(&session.location)
                    .and_then(|loc| loc.creatures.iter().find(|c| c.name == target.name));
                let Some(creature) = creature else {
                    return Ok(());
                };
                gate.wait(resolve_attack(&session.player, creature))
            };

            session.log.push(
                Severity::Combat,
                format!("You attack the {} for {} damage.", target.name, report.damage),
            );
            if let Some(location) = session.world.location_mut(&session.location) {
                if report.defeated {
                    location.creatures.retain(|c| c.name != target.name);
                } else if let Some(creature) =
                    location.creatures.iter_mut().find(|c| c.name == target.name)
                {
                    creature.health -= report.damage;
                }
            }
            if report.defeated {
                session.log.push(
                    Severity::Success,
                    format!("The {} collapses, defeated.", target.name),
                );
            }
            Ok(())
        },
    )
}

pub fn status_command() -> Command {
    Command::native(
        CommandSpec::new("status", "Show your vitals", "status", CommandCategory::Session)
            .with_aliases(&["stats", "hp"]),
        |_args, session| {
            let line = format!(
                "{}, level {}. Health {}/{}.",
                session.player.name,
                session.player.level,
                session.player.health,
                session.player.max_health
            );
            session.log.push(Severity::Info, line);
            let here = session
                .world
                .location(&session.location)
                .map(|loc| loc.name.clone());
            if let Some(name) = here {
                session.log.push(Severity::Info, format!("You are in {}.", name));
            }
            Ok(())
        },
    )
}

pub fn say_command() -> Command {
    Command::native(
        CommandSpec::new("say", "Say something out loud", "say <words>", CommandCategory::General),
        |args, session| {
            if args.trim().is_empty() {
                session.log.push(Severity::Warning, "Say what?");
            } else {
                // The remainder is kept verbatim, spacing and all.
                session.log.push(Severity::Story, format!("You say: \"{}\"", args));
            }
            Ok(())
        },
    )
}

pub fn help_command(dispatcher: Weak<Dispatcher>) -> Command {
    Command::native(
        CommandSpec::new(
            "help",
            "List commands, or show one in detail",
            "help [command]",
            CommandCategory::General,
        )
        .with_aliases(&["?"]),
        move |args, session| {
            let Some(dispatcher) = dispatcher.upgrade() else {
                return Ok(());
            };

            let token = args.trim().to_lowercase();
            if token.is_empty() {
                let mut commands = dispatcher.commands();
                commands.sort_by(|a, b| a.spec.name.cmp(&b.spec.name));
                for category in CommandCategory::all() {
                    let in_category: Vec<_> = commands
                        .iter()
                        .filter(|c| c.spec.category == category)
                        .collect();
                    if in_category.is_empty() {
                        continue;
                    }
                    session.log.push(Severity::Info, category.display_name());
                    for command in in_category {
                        session.log.push(
                            Severity::Info,
                            format!("  {:<20} {}", command.spec.usage, command.spec.description),
                        );
                    }
                }
                return Ok(());
            }

            match dispatcher.lookup(&token) {
                Some(command) => {
                    session.log.push(
                        Severity::Info,
                        format!("{}: {}", command.spec.name, command.spec.description),
                    );
                    session
                        .log
                        .push(Severity::Info, format!("Usage: {}", command.spec.usage));
                    if !command.spec.aliases.is_empty() {
                        session.log.push(
                            Severity::Info,
                            format!("Aliases: {}", command.spec.aliases.join(", ")),
                        );
                    }
                }
                None => session
                    .log
                    .push(Severity::Warning, format!("No command named {}.", token)),
            }
            Ok(())
        },
    )
}

/// Slot the save/load pair falls back to: the explicit argument, then the
/// last slot used this or any previous run, then "quicksave".
fn choose_slot(args: &str, config: &RefCell<GameConfig>) -> String {
    let requested = args.trim().to_lowercase();
    if !requested.is_empty() {
        return requested;
    }
    config
        .borrow()
        .last_slot
        .clone()
        .unwrap_or_else(|| "quicksave".to_string())
}

pub fn save_command(gate: Gate, save_dir: PathBuf, config: Rc<RefCell<GameConfig>>) -> Command {
    Command::native(
        CommandSpec::new("save", "Save the session to a slot", "save [slot]", CommandCategory::Session),
        move |args, session| {
            let slot = choose_slot(args, &config);
            let snapshot = SaveGame::capture(session);
            match gate.wait(save::write_save(&save_dir, &slot, &snapshot)) {
                Ok(path) => {
                    tracing::debug!(path = %path.display(), "wrote save");
                    session
                        .log
                        .push(Severity::Success, format!("Saved to slot {}.", slot));
                    config.borrow_mut().set_last_slot(&slot);
                    Ok(())
                }
                Err(SaveError::InvalidSlot(bad)) => {
                    session.log.push(
                        Severity::Warning,
                        format!("\"{}\" is not a usable slot name.", bad),
                    );
                    Ok(())
                }
                Err(e) => Err(CommandError::Save(e)),
            }
        },
    )
}

pub fn load_command(gate: Gate, save_dir: PathBuf, config: Rc<RefCell<GameConfig>>) -> Command {
    Command::native(
        CommandSpec::new("load", "Load a saved session", "load [slot]", CommandCategory::Session),
        move |args, session| {
            let slot = choose_slot(args, &config);
            match gate.wait(save::read_save(&save_dir, &slot)) {
                Ok(loaded) => {
                    loaded.apply(session);
                    session.log.push(
                        Severity::Success,
                        format!("Loaded slot {}. Welcome back, {}.", slot, session.player.name),
                    );
                    config.borrow_mut().set_last_slot(&slot);
                    Ok(())
                }
                Err(SaveError::InvalidSlot(bad)) => {
                    session.log.push(
                        Severity::Warning,
                        format!("\"{}\" is not a usable slot name.", bad),
                    );
                    Ok(())
                }
                Err(SaveError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    session
                        .log
                        .push(Severity::Warning, format!("No save named \"{}\".", slot));
                    Ok(())
                }
                Err(e) => Err(CommandError::Save(e)),
            }
        },
    )
}

struct ConfirmQuit;

impl PromptHandler for ConfirmQuit {
    fn handle(&mut self, raw: &str, session: &mut SessionContext) -> PromptFlow {
        let answer = raw.trim().to_lowercase();
        if answer == "y" || answer == "yes" {
            session
                .log
                .push(Severity::Story, "You take your leave of Grimvale.");
            session.end();
        } else {
            session
                .log
                .push(Severity::Info, "You decide to stay a while longer.");
        }
        PromptFlow::Done
    }
}

pub fn quit_command() -> Command {
    Command::native(
        CommandSpec::new("quit", "Leave the game", "quit", CommandCategory::Session)
            .with_aliases(&["exit"]),
        |_args, session| {
            session.log.push(Severity::Info, "Leave Grimvale? (y/n)");
            session.request_prompt(Box::new(ConfirmQuit));
            Ok(())
        },
    )
}
