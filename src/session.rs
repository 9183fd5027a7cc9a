//! Shared session state: the player, the world, and the event log.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dispatch::PromptHandler;
use crate::log::EventLog;
use crate::world::World;

/// The player character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub health: i32,
    pub max_health: i32,
    pub level: i32,
}

impl Player {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            health: 20,
            max_health: 20,
            level: 1,
        }
    }

    pub fn take_damage(&mut self, amount: i32) {
        self.health = (self.health - amount).max(0);
    }

    pub fn heal(&mut self, amount: i32) {
        self.health = (self.health + amount).min(self.max_health);
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }
}

/// All mutable state one session runs against. Commands receive a mutable
/// borrow of this for the duration of a single call and must not keep it.
pub struct SessionContext {
    /// Unique session ID (UUID)
    pub id: String,
    pub player: Player,
    /// Id of the location the player is currently in.
    pub location: String,
    pub world: World,
    pub log: EventLog,
    pending_prompt: Option<Box<dyn PromptHandler>>,
    ended: bool,
}

/// The handle the loop, the dispatcher, and the script bridge share.
pub type SharedSession = Rc<RefCell<SessionContext>>;

impl SessionContext {
    pub fn new(player: Player, world: World) -> Self {
        let location = world.start_location().to_string();
        Self {
            id: Uuid::new_v4().to_string(),
            player,
            location,
            world,
            log: EventLog::new(),
            pending_prompt: None,
            ended: false,
        }
    }

    pub fn shared(player: Player, world: World) -> SharedSession {
        Rc::new(RefCell::new(Self::new(player, world)))
    }

    /// Ask for a prompt override to be installed after the current input
    /// event completes. Commands use this; the session loop applies it.
    pub fn request_prompt(&mut self, handler: Box<dyn PromptHandler>) {
        self.pending_prompt = Some(handler);
    }

    pub fn take_prompt_request(&mut self) -> Option<Box<dyn PromptHandler>> {
        self.pending_prompt.take()
    }

    /// Mark the session as finished. The loop checks this between inputs.
    pub fn end(&mut self) {
        self.ended = true;
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}
