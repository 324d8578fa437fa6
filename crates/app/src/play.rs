use quest_core::model::SubRoundRef;
use quest_core::progression::ProgressEvent;
use services::{
    AnswerFeedback, AppServices, SessionController, SessionOutcome, SessionStart, SessionStep,
    StoreUpdate, TokioTimers,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

type Session = SessionController<TokioTimers>;

/// Play one sub-round interactively on stdin/stdout.
pub async fn run(
    services: &mut AppServices,
    at: Option<SubRoundRef>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = services.store_mut();
    let Some(at) = at.or_else(|| store.current_frontier()) else {
        println!("Quest complete, nothing left to play.");
        return Ok(());
    };

    let (timers, mut fired) = TokioTimers::new();
    let mut session = match store.start_session(at, timers)? {
        SessionStart::Started(session) => session,
        SessionStart::Locked(at) => {
            println!("{at} is locked. Finish the earlier sub-rounds first.");
            return Ok(());
        }
    };

    println!("Playing {at}. Type an option number, 'h' for a hint, 'r' to reveal, 'q' to quit.");
    print_question(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(id) = fired.recv() => match session.on_timer(id) {
                Some(SessionStep::HintDismissed) => println!("(hint hidden)"),
                Some(SessionStep::NextQuestion(_)) => print_question(&session),
                Some(SessionStep::Completed(outcome)) => {
                    print_outcome(&outcome);
                    let update = store.finish_session(&session)?;
                    print_update(&update);
                    break;
                }
                None => debug!(?id, "timer ignored"),
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    store.abandon_session(session);
                    println!("Session abandoned.");
                    break;
                };
                if line.trim() == "q" {
                    store.abandon_session(session);
                    println!("Session abandoned.");
                    break;
                }
                handle_input(&mut session, line.trim());
            }
        }
    }

    store.flush().await;
    Ok(())
}

fn handle_input(session: &mut Session, input: &str) {
    match input {
        "h" => match session.request_hint() {
            Ok(hint) => println!("Hint: {}", hint.text),
            Err(err) => println!("{err}"),
        },
        "r" => match session.reveal_answer() {
            Ok(feedback) => print_feedback(session, &feedback),
            Err(err) => println!("{err}"),
        },
        other => match other.parse::<usize>() {
            Ok(choice) if choice >= 1 => match session.submit_answer(choice - 1) {
                Ok(feedback) => print_feedback(session, &feedback),
                Err(err) => println!("{err}"),
            },
            _ => println!("Type an option number, 'h', 'r' or 'q'."),
        },
    }
}

fn print_question(session: &Session) {
    let Some(question) = session.current_question() else {
        return;
    };
    let progress = session.progress();
    println!();
    println!(
        "Question {}/{} [{}]  hearts {}  stars to spend {}",
        progress.answered + 1,
        progress.total,
        question.topic(),
        progress.hearts,
        progress.currency
    );
    println!("{}", question.prompt());
    for (i, option) in question.options().iter().enumerate() {
        println!("  {}. {option}", i + 1);
    }
}

fn print_feedback(session: &Session, feedback: &AnswerFeedback) {
    if feedback.is_correct {
        println!("Correct!");
    } else {
        let answer = session
            .current_question()
            .map(|q| q.correct_option())
            .unwrap_or_default();
        println!("The answer is {}. {answer}", feedback.correct_index + 1);
    }
    if let Some(explanation) = &feedback.explanation {
        println!("{explanation}");
    }
}

fn print_outcome(outcome: &SessionOutcome) {
    let eval = outcome.evaluation;
    println!();
    println!(
        "Score {}/{}: {} stars, {}",
        eval.score,
        outcome.total_questions,
        eval.stars_earned,
        if eval.passed { "passed" } else { "not passed" }
    );
}

fn print_update(update: &StoreUpdate) {
    match update {
        StoreUpdate::Applied(events) => {
            for event in events {
                match event {
                    ProgressEvent::Unlocked(node) => println!("Unlocked {node}"),
                    ProgressEvent::QuestCompleted => println!("Quest complete!"),
                    _ => {}
                }
            }
        }
        StoreUpdate::Rejected(rejection) => println!("Not recorded: {rejection:?}"),
        StoreUpdate::NotPassed => println!("Score more than 8 to unlock the next sub-round."),
    }
}
