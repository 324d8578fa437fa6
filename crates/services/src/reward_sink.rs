use quest_core::model::{NodeRef, Rewards};
use tracing::info;

/// Receives Treasure Box contents as rounds and levels complete.
///
/// Called synchronously from the store after the new snapshot is in place.
pub trait RewardSink: Send + Sync {
    fn show_rewards(&self, source: NodeRef, rewards: &Rewards);
}

/// Default sink that only logs the reward.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRewardSink;

impl RewardSink for LogRewardSink {
    fn show_rewards(&self, source: NodeRef, rewards: &Rewards) {
        info!(
            %source,
            stars = rewards.stars,
            badges = ?rewards.badges,
            prizes = ?rewards.prizes,
            "treasure box opened"
        );
    }
}
