use quest_core::model::{AttemptRecord, NodeRef, QuestProgress, Rewards, SubRound, SubRoundRef};
use services::RewardSink;

/// Prints Treasure Box contents as they are granted.
pub struct TerminalRewards;

impl RewardSink for TerminalRewards {
    fn show_rewards(&self, source: NodeRef, rewards: &Rewards) {
        println!();
        println!("Treasure box for {source}!");
        println!("  +{} stars", rewards.stars);
        for badge in &rewards.badges {
            println!("  badge: {badge}");
        }
        for prize in &rewards.prizes {
            println!("  prize: {prize}");
        }
    }
}

fn status(is_completed: bool, is_locked: bool) -> &'static str {
    if is_completed {
        "done"
    } else if is_locked {
        "locked"
    } else {
        "open"
    }
}

fn sub_round_cell(sub: &SubRound) -> String {
    if sub.is_completed() {
        format!("{}*", sub.stars())
    } else if sub.is_locked() {
        "--".into()
    } else {
        ">>".into()
    }
}

pub fn print_status(progress: &QuestProgress) {
    println!("Total stars: {}", progress.total_stars());
    if !progress.total_badges().is_empty() {
        println!("Badges: {}", progress.total_badges().join(", "));
    }
    if !progress.total_prizes().is_empty() {
        println!("Prizes: {}", progress.total_prizes().join(", "));
    }
    match progress.frontier() {
        Some(at) => println!("Next up: {at}"),
        None => println!("Quest complete!"),
    }

    for level in progress.levels() {
        println!();
        println!(
            "Level {} ({}) {}, {} stars",
            level.id() + 1,
            level.difficulty(),
            status(level.is_completed(), level.is_locked()),
            level.total_stars()
        );
        for round in level.rounds() {
            let cells: Vec<String> = round.sub_rounds().iter().map(sub_round_cell).collect();
            println!(
                "  Round {:>2} {:<6} {}",
                round.id().round + 1,
                status(round.is_completed(), round.is_locked()),
                cells.join(" ")
            );
        }
    }
}

pub fn print_attempts(at: SubRoundRef, attempts: &[AttemptRecord]) {
    if attempts.is_empty() {
        println!("No attempts yet for {at}.");
        return;
    }
    println!("Attempts for {at}:");
    for attempt in attempts {
        println!(
            "  {}  score {:>3}/{}  {} stars  {}  hints {}  reveals {}",
            attempt.completed_at().format("%Y-%m-%d %H:%M"),
            attempt.score(),
            attempt.total_questions(),
            attempt.stars_earned(),
            if attempt.passed() { "passed" } else { "failed" },
            attempt.hints_used(),
            attempt.reveals_used()
        );
    }
}
