//! The capability surface a script sees.
//!
//! One `Bridge` value is built per script invocation and passed to the
//! script's `execute` as an argument. It is the only way a script touches
//! the session: read the player snapshot, append log entries, re-enter the
//! dispatcher, resolve targets. The engine registers nothing else, so
//! anything outside this vocabulary is not merely discouraged, it does not
//! exist in the script's world.

use std::rc::Rc;

use rhai::{Dynamic, Engine, Map};

use crate::dispatch::Dispatcher;
use crate::log::Severity;
use crate::session::SharedSession;

#[derive(Clone)]
pub struct Bridge {
    session: SharedSession,
    dispatcher: Rc<Dispatcher>,
}

impl Bridge {
    pub fn new(session: SharedSession, dispatcher: Rc<Dispatcher>) -> Self {
        Self {
            session,
            dispatcher,
        }
    }

    /// Read-only snapshot of the player vitals. Mutating the returned map
    /// changes nothing in the session.
    fn player(&mut self) -> Map {
        let session = self.session.borrow();
        let mut map = Map::new();
        map.insert("name".into(), session.player.name.clone().into());
        map.insert(
            "health".into(),
            Dynamic::from_int(i64::from(session.player.health)),
        );
        map.insert(
            "max_health".into(),
            Dynamic::from_int(i64::from(session.player.max_health)),
        );
        map.insert(
            "level".into(),
            Dynamic::from_int(i64::from(session.player.level)),
        );
        map
    }

    /// Append a story-severity entry to the session log.
    fn log(&mut self, message: &str) {
        self.session.borrow_mut().log.push(Severity::Story, message);
    }

    /// Append an entry with an explicit severity label. Unknown labels fall
    /// back to story so a cosmetic typo never aborts a working script.
    fn log_as(&mut self, label: &str, message: &str) {
        let severity = match Severity::from_label(label) {
            Some(severity) => severity,
            None => {
                tracing::warn!(label, "unknown severity label from script");
                Severity::Story
            }
        };
        self.session.borrow_mut().log.push(severity, message);
    }

    /// Re-enter the dispatcher: full lookup, fault boundary, logging. A
    /// fault in the invoked command is that command's own affair (one error
    /// entry there); this still returns true because a command ran.
    fn invoke(&mut self, selector: &str, args: &str) -> bool {
        self.dispatcher.invoke(selector, args, &self.session)
    }

    /// Resolve a free-text token against the player's surroundings. Returns
    /// a map with `name` and `kind`, or unit when nothing matches. Never
    /// mutates state.
    fn resolve_target(&mut self, token: &str) -> Dynamic {
        let session = self.session.borrow();
        match session.world.resolve(&session.location, token) {
            Some(target) => {
                let mut map = Map::new();
                map.insert("name".into(), target.name.into());
                map.insert("kind".into(), target.kind.label().into());
                Dynamic::from(map)
            }
            None => Dynamic::UNIT,
        }
    }
}

/// Register the bridge type and its methods with a script engine.
pub fn register(engine: &mut Engine) {
    engine.register_type_with_name::<Bridge>("Host");
    engine.register_fn("player", Bridge::player);
    engine.register_fn("log", Bridge::log);
    engine.register_fn("log_as", Bridge::log_as);
    engine.register_fn("invoke", Bridge::invoke);
    engine.register_fn("resolve_target", Bridge::resolve_target);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Command, CommandCategory, CommandSpec};
    use crate::session::{Player, SessionContext};
    use crate::world::World;

    fn fixture() -> (SharedSession, Rc<Dispatcher>) {
        let session = SessionContext::shared(Player::new("Tester"), World::starter());
        let dispatcher = Dispatcher::new();
        (session, dispatcher)
    }

    #[test]
    fn player_snapshot_carries_vitals() {
        let (session, dispatcher) = fixture();
        let mut bridge = Bridge::new(Rc::clone(&session), dispatcher);

        let snapshot = bridge.player();
        assert_eq!(
            snapshot.get("name").unwrap().clone().into_string().unwrap(),
            "Tester"
        );
        assert_eq!(snapshot.get("health").unwrap().as_int().unwrap(), 20);
        assert_eq!(snapshot.get("level").unwrap().as_int().unwrap(), 1);
    }

    #[test]
    fn mutating_snapshot_leaves_session_untouched() {
        let (session, dispatcher) = fixture();
        let mut bridge = Bridge::new(Rc::clone(&session), dispatcher);

        let mut snapshot = bridge.player();
        snapshot.insert("health".into(), Dynamic::from_int(999));

        assert_eq!(session.borrow().player.health, 20);
    }

    #[test]
    fn log_appends_story_entry() {
        let (session, dispatcher) = fixture();
        let mut bridge = Bridge::new(Rc::clone(&session), dispatcher);

        bridge.log("The wind picks up.");

        let session = session.borrow();
        assert_eq!(session.log.len(), 1);
        assert_eq!(session.log.entries()[0].severity, Severity::Story);
        assert_eq!(session.log.entries()[0].message, "The wind picks up.");
    }

    #[test]
    fn log_as_honors_known_labels() {
        let (session, dispatcher) = fixture();
        let mut bridge = Bridge::new(Rc::clone(&session), dispatcher);

        bridge.log_as("combat", "Sparks fly.");
        assert_eq!(session.borrow().log.entries()[0].severity, Severity::Combat);
    }

    #[test]
    fn log_as_falls_back_to_story_on_unknown_label() {
        let (session, dispatcher) = fixture();
        let mut bridge = Bridge::new(Rc::clone(&session), dispatcher);

        bridge.log_as("shouting", "Hello?");
        assert_eq!(session.borrow().log.entries()[0].severity, Severity::Story);
    }

    #[test]
    fn invoke_reaches_registered_commands() {
        let (session, dispatcher) = fixture();
        dispatcher.register(Command::native(
            CommandSpec::new("ping", "Ping", "ping", CommandCategory::General),
            |args, session| {
                session.log.push(Severity::Info, format!("pong:{}", args));
                Ok(())
            },
        ));
        let mut bridge = Bridge::new(Rc::clone(&session), Rc::clone(&dispatcher));

        assert!(bridge.invoke("ping", "now"));
        assert!(!bridge.invoke("absent", ""));

        let session = session.borrow();
        assert_eq!(session.log.len(), 1);
        assert_eq!(session.log.entries()[0].message, "pong:now");
    }

    #[test]
    fn resolve_target_returns_map_or_unit() {
        let (session, dispatcher) = fixture();
        session.borrow_mut().location = "forest".to_string();
        let mut bridge = Bridge::new(Rc::clone(&session), dispatcher);

        let found = bridge.resolve_target("goblin");
        let map = found.cast::<Map>();
        assert_eq!(
            map.get("name").unwrap().clone().into_string().unwrap(),
            "goblin"
        );
        assert_eq!(
            map.get("kind").unwrap().clone().into_string().unwrap(),
            "creature"
        );

        let missing = bridge.resolve_target("dragon");
        assert!(missing.is_unit());
    }

    #[test]
    fn resolve_target_does_not_mutate() {
        let (session, dispatcher) = fixture();
        session.borrow_mut().location = "forest".to_string();
        let mut bridge = Bridge::new(Rc::clone(&session), dispatcher);

        bridge.resolve_target("goblin");
        bridge.resolve_target("dragon");

        let session = session.borrow();
        assert!(session.log.is_empty());
        assert_eq!(session.location, "forest");
        assert_eq!(session.world.location("forest").unwrap().creatures.len(), 1);
    }
}
