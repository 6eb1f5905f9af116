//! # Quests Module
//!
//! Quest generation and the ledger that tracks progress. The ledger never
//! touches entities; it reports completions and the turn engine pays rewards.

use crate::{config, Biome, DelveError, DelveResult, EnemyKind, Item, RandomStream};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Quest identifier, unique within one ledger.
pub type QuestId = u32;

/// What a quest asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    /// Kill `count` enemies of a kind
    Kill { enemy: EnemyKind, count: u32 },
    /// Pick up `count` quest items carrying `tag`
    Fetch { tag: String, count: u32 },
    /// Descend to `depth`
    Reach { depth: u32 },
    /// Enter `rooms` rooms not entered before
    Explore { rooms: u32 },
}

impl Objective {
    /// Progress value at which the quest completes.
    pub fn required(&self) -> u32 {
        match self {
            Objective::Kill { count, .. } | Objective::Fetch { count, .. } => *count,
            Objective::Reach { depth } => *depth,
            Objective::Explore { rooms } => *rooms,
        }
    }
}

/// What a completed quest pays out.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reward {
    pub xp: u32,
    pub gold: u32,
    pub item: Option<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub id: QuestId,
    pub name: String,
    pub description: String,
    pub objective: Objective,
    pub progress: u32,
    pub completed: bool,
    pub reward: Reward,
}

impl Quest {
    /// Progress as `"done/required"`.
    pub fn progress_text(&self) -> String {
        format!("{}/{}", self.progress.min(self.objective.required()), self.objective.required())
    }
}

/// Gameplay occurrences that can advance quests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestTrigger {
    EnemyKilled(EnemyKind),
    ItemCollected(String),
    DepthReached(u32),
    RoomEntered { depth: u32, room: u32 },
}

/// Progress change reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestUpdate {
    pub quest_id: QuestId,
    pub progress: u32,
    pub required: u32,
    /// Set when this update completed the quest; the reward must be paid now
    pub completed_reward: Option<Reward>,
}

/// Active and finished quests keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestLedger {
    next_id: QuestId,
    active: BTreeMap<QuestId, Quest>,
    completed: Vec<Quest>,
    entered_rooms: BTreeSet<(u32, u32)>,
}

impl QuestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rolls a new quest suited to the current depth, tier and biome.
    ///
    /// The quest is not tracked until passed to [`QuestLedger::accept`].
    pub fn generate_quest(
        &self,
        depth: u32,
        tier: u32,
        biome: Biome,
        rng: &mut RandomStream,
    ) -> Quest {
        let tier = tier.max(1);
        let scale = 1.0 + (tier - 1) as f64 * 0.2;
        let scaled = |value: u32| (value as f64 * scale).floor() as u32;

        let roll = rng.weighted_index(&[0.5, 0.2, 0.2, 0.1]);
        let (name, description, objective, xp, gold) = match roll {
            Some(1) => {
                let target = depth + rng.gen_range(1..=2);
                (
                    "Into the Depths".to_string(),
                    format!("Descend to depth {}.", target),
                    Objective::Reach { depth: target },
                    rng.gen_range(80..=200),
                    rng.gen_range(40..=120),
                )
            }
            Some(2) => {
                let rooms = rng.gen_range(3..=6);
                (
                    "Map the Unknown".to_string(),
                    format!("Explore {} rooms you have not entered before.", rooms),
                    Objective::Explore { rooms },
                    rng.gen_range(80..=250),
                    rng.gen_range(40..=150),
                )
            }
            Some(3) => {
                let interval = config::ARTIFACT_TIER_INTERVAL;
                let artifact_tier = tier.div_ceil(interval) * interval;
                let tag = artifact_tag(artifact_tier);
                (
                    "Recover the Lost Artifact".to_string(),
                    format!("Find the artifact hidden at tier {}.", artifact_tier),
                    Objective::Fetch { tag, count: 1 },
                    rng.gen_range(200..=400),
                    rng.gen_range(100..=300),
                )
            }
            _ => {
                let candidates = biome.enemy_kinds();
                let enemy = candidates[rng.gen_range(0..candidates.len())];
                let count = rng.gen_range(3..=6);
                (
                    format!("Hunt: {} Threat", enemy.name()),
                    format!("Eliminate {} {}s.", count, enemy.name()),
                    Objective::Kill { enemy, count },
                    rng.gen_range(100..=300),
                    rng.gen_range(50..=200),
                )
            }
        };

        Quest {
            id: self.next_id,
            name,
            description,
            objective,
            progress: 0,
            completed: false,
            reward: Reward {
                xp: scaled(xp),
                gold: scaled(gold),
                item: None,
            },
        }
    }

    /// Starts tracking a quest. At most [`config::MAX_ACTIVE_QUESTS`] can be active.
    pub fn accept(&mut self, mut quest: Quest) -> DelveResult<QuestId> {
        if self.active.len() >= config::MAX_ACTIVE_QUESTS {
            return Err(DelveError::InvalidAction(format!(
                "Quest log is full ({} active)",
                self.active.len()
            )));
        }
        quest.id = self.next_id;
        self.next_id += 1;
        let id = quest.id;
        self.active.insert(id, quest);
        Ok(id)
    }

    pub fn is_full(&self) -> bool {
        self.active.len() >= config::MAX_ACTIVE_QUESTS
    }

    pub fn get(&self, id: QuestId) -> Option<&Quest> {
        self.active
            .get(&id)
            .or_else(|| self.completed.iter().find(|quest| quest.id == id))
    }

    /// Active quests in id order.
    pub fn active_quests(&self) -> impl Iterator<Item = &Quest> {
        self.active.values()
    }

    pub fn completed_quests(&self) -> &[Quest] {
        &self.completed
    }

    /// Applies a trigger to every active quest.
    ///
    /// Completed quests move out of the active set; their rewards are returned
    /// in the updates for the caller to pay.
    pub fn record(&mut self, trigger: &QuestTrigger) -> Vec<QuestUpdate> {
        if let QuestTrigger::RoomEntered { depth, room } = trigger {
            if !self.entered_rooms.insert((*depth, *room)) {
                return Vec::new();
            }
        }

        let mut updates = Vec::new();
        let mut finished = Vec::new();

        for quest in self.active.values_mut() {
            let advanced = match (&quest.objective, trigger) {
                (Objective::Kill { enemy, .. }, QuestTrigger::EnemyKilled(killed)) => {
                    if enemy == killed {
                        quest.progress += 1;
                        true
                    } else {
                        false
                    }
                }
                (Objective::Fetch { tag, .. }, QuestTrigger::ItemCollected(collected)) => {
                    if tag == collected {
                        quest.progress += 1;
                        true
                    } else {
                        false
                    }
                }
                (Objective::Reach { .. }, QuestTrigger::DepthReached(depth)) => {
                    if *depth > quest.progress {
                        quest.progress = *depth;
                        true
                    } else {
                        false
                    }
                }
                (Objective::Explore { .. }, QuestTrigger::RoomEntered { .. }) => {
                    quest.progress += 1;
                    true
                }
                _ => false,
            };

            if !advanced {
                continue;
            }

            let required = quest.objective.required();
            let completed_reward = if quest.progress >= required {
                quest.completed = true;
                finished.push(quest.id);
                Some(quest.reward.clone())
            } else {
                None
            };

            updates.push(QuestUpdate {
                quest_id: quest.id,
                progress: quest.progress.min(required),
                required,
                completed_reward,
            });
        }

        for id in finished {
            if let Some(quest) = self.active.remove(&id) {
                self.completed.push(quest);
            }
        }

        updates
    }
}

/// Quest tag carried by the artifact placed at a tier.
pub fn artifact_tag(tier: u32) -> String {
    format!("artifact_{}", tier)
}
