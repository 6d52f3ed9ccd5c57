use crate::core::MoveOutcome;
use crate::persist::PersistError;
use serde::{Deserialize, Serialize};

/// Kinds of move the player can attach a reward to. The integer codes are the ones the solver
/// reads from the parameters file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ActionKind {
    EmptySpace = 0,
    MoveIntoWall = 1,
    MoveBox = 2,
    WinGame = 3,
    PushBoxIntoWall = 4,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::EmptySpace,
        ActionKind::MoveIntoWall,
        ActionKind::MoveBox,
        ActionKind::WinGame,
        ActionKind::PushBoxIntoWall,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            ActionKind::EmptySpace => "Move into empty space",
            ActionKind::MoveIntoWall => "Move into a wall",
            ActionKind::MoveBox => "Push a box",
            ActionKind::WinGame => "Solve the level",
            ActionKind::PushBoxIntoWall => "Push a box that cannot move",
        }
    }

    /// Classifies a simulated move. A push that leaves the level solved counts as winning.
    pub fn from_outcome(outcome: MoveOutcome, solved_after: bool) -> ActionKind {
        match outcome {
            MoveOutcome::Walked => ActionKind::EmptySpace,
            MoveOutcome::BumpedWall => ActionKind::MoveIntoWall,
            MoveOutcome::PushBlocked => ActionKind::PushBoxIntoWall,
            MoveOutcome::Pushed { .. } if solved_after => ActionKind::WinGame,
            MoveOutcome::Pushed { .. } => ActionKind::MoveBox,
        }
    }
}

impl From<ActionKind> for u8 {
    fn from(kind: ActionKind) -> u8 {
        kind as u8
    }
}

impl TryFrom<u8> for ActionKind {
    type Error = PersistError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| *kind as u8 == code)
            .ok_or(PersistError::UnknownAction(code))
    }
}

/// One player-authored rule: an action kind and the reward for performing it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct RewardRule {
    #[serde(rename = "Action")]
    pub action: ActionKind,
    #[serde(rename = "Reward")]
    pub reward: i32,
}

/// Rewards keyed by action kind. Each kind holds at most one reward; a kind without one is
/// worth zero.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct RewardTable {
    rewards: [Option<i32>; ActionKind::ALL.len()],
}

impl RewardTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: &[RewardRule]) -> Self {
        let mut table = Self::new();
        for rule in rules {
            table.set(rule.action, rule.reward);
        }
        table
    }

    /// Returns the reward previously assigned to `action`, if any.
    pub fn set(&mut self, action: ActionKind, reward: i32) -> Option<i32> {
        self.rewards[action as usize].replace(reward)
    }

    pub fn remove(&mut self, action: ActionKind) -> Option<i32> {
        self.rewards[action as usize].take()
    }

    pub fn get(&self, action: ActionKind) -> Option<i32> {
        self.rewards[action as usize]
    }

    pub fn reward_for(&self, action: ActionKind) -> i32 {
        self.get(action).unwrap_or(0)
    }

    /// Kinds that have no reward yet, in code order.
    pub fn unassigned(&self) -> impl Iterator<Item = ActionKind> + '_ {
        ActionKind::ALL.into_iter().filter(|kind| self.get(*kind).is_none())
    }

    pub fn rules(&self) -> Vec<RewardRule> {
        ActionKind::ALL
            .into_iter()
            .filter_map(|action| self.get(action).map(|reward| RewardRule { action, reward }))
            .collect()
    }
}
