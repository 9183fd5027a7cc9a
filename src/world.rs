//! The game world: locations, the creatures in them, and target resolution.

use std::collections::{BTreeMap, HashMap};

use crate::session::Player;

#[derive(Debug, Clone)]
pub struct Creature {
    pub name: String,
    pub health: i32,
    pub max_health: i32,
    pub hostile: bool,
}

impl Creature {
    pub fn new(name: &str, health: i32, hostile: bool) -> Self {
        Self {
            name: name.to_string(),
            health,
            max_health: health,
            hostile,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }
}

#[derive(Debug, Clone)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Exit word -> destination location id. BTreeMap so listings are stable.
    pub exits: BTreeMap<String, String>,
    pub creatures: Vec<Creature>,
}

impl Location {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            exits: BTreeMap::new(),
            creatures: Vec::new(),
        }
    }

    pub fn with_exit(mut self, word: &str, to: &str) -> Self {
        self.exits.insert(word.to_lowercase(), to.to_string());
        self
    }

    pub fn with_creature(mut self, creature: Creature) -> Self {
        self.creatures.push(creature);
        self
    }
}

/// What a free-text token resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Creature,
    Exit,
    Location,
}

impl TargetKind {
    pub fn label(&self) -> &'static str {
        match self {
            TargetKind::Creature => "creature",
            TargetKind::Exit => "exit",
            TargetKind::Location => "location",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub kind: TargetKind,
}

#[derive(Debug, Clone)]
pub struct World {
    locations: HashMap<String, Location>,
    start: String,
}

impl World {
    pub fn start_location(&self) -> &str {
        &self.start
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.get(id)
    }

    pub fn location_mut(&mut self, id: &str) -> Option<&mut Location> {
        self.locations.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.locations.contains_key(id)
    }

    fn add(&mut self, location: Location) {
        self.locations.insert(location.id.clone(), location);
    }

    /// Resolve a free-text token against the given location. The match is
    /// case-insensitive and exact, checked against creature names first,
    /// then exit words, then the names of the locations those exits lead to.
    /// Never mutates anything.
    pub fn resolve(&self, location_id: &str, token: &str) -> Option<Target> {
        let location = self.location(location_id)?;
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            return None;
        }

        for creature in &location.creatures {
            if creature.name.to_lowercase() == token {
                return Some(Target {
                    name: creature.name.clone(),
                    kind: TargetKind::Creature,
                });
            }
        }

        for word in location.exits.keys() {
            if word.to_lowercase() == token {
                return Some(Target {
                    name: word.clone(),
                    kind: TargetKind::Exit,
                });
            }
        }

        for destination_id in location.exits.values() {
            if let Some(destination) = self.location(destination_id) {
                if destination.name.to_lowercase() == token {
                    return Some(Target {
                        name: destination.name.clone(),
                        kind: TargetKind::Location,
                    });
                }
            }
        }

        None
    }

    /// The built-in demo world.
    pub fn starter() -> Self {
        let mut world = World {
            locations: HashMap::new(),
            start: "square".to_string(),
        };

        world.add(
            Location::new(
                "square",
                "Village Square",
                "Rain-slick cobbles ring a dry fountain. Shuttered stalls lean \
                 against each other under a grey sky.",
            )
            .with_exit("north", "forest")
            .with_exit("east", "chapel"),
        );

        world.add(
            Location::new(
                "forest",
                "Darkpine Forest",
                "Black pines crowd the path. Somewhere above, a crow keeps \
                 count of your steps.",
            )
            .with_exit("south", "square")
            .with_exit("west", "shrine")
            .with_creature(Creature::new("goblin", 10, true)),
        );

        world.add(
            Location::new(
                "chapel",
                "Mosswater Chapel",
                "Candle stubs gutter along the pews. The air tastes of wet \
                 stone and old incense.",
            )
            .with_exit("west", "square")
            .with_creature(Creature::new("hermit", 8, false)),
        );

        world.add(
            Location::new(
                "shrine",
                "Sunken Shrine",
                "Worn steps descend to a flooded altar. Coins glint under the \
                 still water, long past spending.",
            )
            .with_exit("east", "forest"),
        );

        world
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AttackReport {
    pub damage: i32,
    pub defeated: bool,
}

/// Combat resolution. Logically asynchronous; callers reach it through the
/// gate so the session loop stays sequential.
pub async fn resolve_attack(attacker: &Player, defender: &Creature) -> AttackReport {
    let damage = 2 + attacker.level;
    AttackReport {
        damage,
        defeated: defender.health <= damage,
    }
}
