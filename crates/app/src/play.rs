//! Line-oriented terminal front end for one activity run.

use std::io::{self, BufRead, Write};

use services::{ActivityRun, SessionLoopService};
use tea_core::Phase;
use tea_core::model::{ActivityId, Exercise, OptionId};

/// What a line of learner input means while an answer is expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Quit,
    Submit,
    Pick(OptionId),
    Unknown(String),
}

/// Accepts a 1-based option number, an option id, `q` or an empty line (submit).
pub fn parse_choice(input: &str, exercise: &Exercise) -> Choice {
    let input = input.trim();
    match input {
        "" => Choice::Submit,
        "q" | "quit" => Choice::Quit,
        _ => {
            if let Some(option) = input
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| exercise.options().get(i))
            {
                return Choice::Pick(option.id().clone());
            }
            exercise
                .options()
                .iter()
                .find(|o| o.id().as_str() == input)
                .map_or_else(|| Choice::Unknown(input.to_owned()), |o| Choice::Pick(o.id().clone()))
        }
    }
}

/// How a play session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Finished { score: u32, max_score: u32 },
    Quit,
    TimedOut,
}

/// Returns `None` on end of input.
fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Drive one run until it finishes, the learner quits, or time runs out.
///
/// # Errors
///
/// Returns an error if the activity cannot be started or I/O fails.
pub async fn play(
    service: &SessionLoopService,
    activity_id: &ActivityId,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<PlayOutcome, Box<dyn std::error::Error>> {
    let mut run = service.start_session(activity_id)?;
    if let Some(activity) = run.session().activity() {
        writeln!(out, "== {} ==", activity.title())?;
        if let Some(description) = activity.description() {
            writeln!(out, "{description}")?;
        }
    }

    loop {
        if service.enforce_deadline(&mut run).is_expired() {
            writeln!(out, "Time is up. The run was reset.")?;
            return Ok(PlayOutcome::TimedOut);
        }

        match run.phase() {
            Phase::ExerciseIntro => {
                show_intro(&run, out)?;
                match read_line(input)?.as_deref().map(str::trim) {
                    None | Some("q" | "quit") => return Ok(quit(service, &mut run)),
                    Some(_) => {
                        service.reveal_question(&mut run)?;
                    }
                }
            }
            Phase::AwaitingAnswer => {
                let Some(exercise) = run.session().current_exercise().cloned() else {
                    return Ok(quit(service, &mut run));
                };
                show_question(&run, &exercise, out)?;
                let Some(line) = read_line(input)? else {
                    return Ok(quit(service, &mut run));
                };
                match parse_choice(&line, &exercise) {
                    Choice::Quit => return Ok(quit(service, &mut run)),
                    Choice::Pick(option) => service.select_option(&mut run, &option)?,
                    Choice::Submit if run.session().selected_option().is_some() => {
                        submit(service, &mut run, &exercise, out)?;
                    }
                    Choice::Submit => writeln!(out, "Pick an option first.")?,
                    Choice::Unknown(raw) => writeln!(out, "No option '{raw}'. Try again.")?,
                }
            }
            Phase::Feedback => {
                writeln!(out, "(Enter to continue)")?;
                if read_line(input)?.is_none() {
                    return Ok(quit(service, &mut run));
                }
                let result = service.advance(&mut run).await?;
                if let Some(err) = &result.persist_error {
                    writeln!(out, "Your result could not be saved: {err}")?;
                }
            }
            Phase::Finished => {
                let score = run.session().score();
                let max_score = run.session().max_score();
                writeln!(out, "All done! Score: {score} / {max_score}")?;
                return Ok(PlayOutcome::Finished { score, max_score });
            }
            Phase::NotStarted => return Ok(PlayOutcome::Quit),
        }
    }
}

fn quit(service: &SessionLoopService, run: &mut ActivityRun) -> PlayOutcome {
    service.exit(run);
    PlayOutcome::Quit
}

fn show_intro(run: &ActivityRun, out: &mut impl Write) -> io::Result<()> {
    let progress = run.session().progress();
    let Some(exercise) = run.session().current_exercise() else {
        return Ok(());
    };
    writeln!(out)?;
    writeln!(
        out,
        "[{}/{}] {}   (score {})",
        progress.position,
        progress.total,
        exercise.title(),
        run.session().score()
    )?;
    if let Some(scenario) = exercise.scenario() {
        writeln!(out, "{scenario}")?;
    }
    writeln!(out, "(Enter for the question, q to quit)")
}

fn show_question(run: &ActivityRun, exercise: &Exercise, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}", exercise.question())?;
    let selected = run.session().selected_option();
    for (i, option) in exercise.options().iter().enumerate() {
        let marker = if selected == Some(option.id()) { '>' } else { ' ' };
        writeln!(out, "{marker} {}. {}", i + 1, option.text())?;
    }
    if selected.is_some() {
        writeln!(out, "(Enter to submit, another number to change, q to quit)")
    } else {
        writeln!(out, "(number to pick, q to quit)")
    }
}

fn submit(
    service: &SessionLoopService,
    run: &mut ActivityRun,
    exercise: &Exercise,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = service.submit_answer(run)?;
    if outcome.correct {
        writeln!(out, "Correct! +{} points", outcome.points_awarded)?;
    } else if let Some(option) = exercise.correct_option() {
        writeln!(out, "Not quite. The answer was: {}", option.text())?;
    }
    if !exercise.explanation().is_empty() {
        writeln!(out, "{}", exercise.explanation())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use services::{AppConfig, AppServices, Route};
    use std::io::Cursor;
    use tea_core::time::fixed_clock;

    fn services() -> AppServices {
        AppServices::in_memory(&AppConfig {
            clock: fixed_clock(),
            ..AppConfig::default()
        })
        .unwrap()
    }

    fn emotion_faces() -> ActivityId {
        ActivityId::new("emotion-faces").unwrap()
    }

    #[test]
    fn parse_choice_accepts_numbers_ids_and_quit() {
        let catalog = services().catalog();
        let activity = catalog.get(&emotion_faces()).unwrap();
        let exercise = activity.exercise(0).unwrap();
        let first = exercise.options()[0].id().clone();

        assert_eq!(parse_choice("1\n", exercise), Choice::Pick(first.clone()));
        assert_eq!(parse_choice(first.as_str(), exercise), Choice::Pick(first));
        assert_eq!(parse_choice("q", exercise), Choice::Quit);
        assert_eq!(parse_choice("", exercise), Choice::Submit);
        assert_eq!(parse_choice("0", exercise), Choice::Unknown("0".into()));
        assert_eq!(parse_choice("99", exercise), Choice::Unknown("99".into()));
    }

    #[tokio::test]
    async fn scripted_run_finishes_and_saves() {
        let services = services();
        let catalog = services.catalog();
        let activity = catalog.get(&emotion_faces()).unwrap();

        // Intro, pick the correct option, submit, continue; for each exercise.
        let mut script = String::new();
        for exercise in activity.exercises() {
            let index = exercise.options().iter().position(|o| o.is_correct()).unwrap();
            script.push_str(&format!("\n{}\n\n\n", index + 1));
        }

        let mut out = Vec::new();
        let outcome = play(
            &services.session_loop(),
            &emotion_faces(),
            &mut Cursor::new(script),
            &mut out,
        )
        .await
        .unwrap();

        let max = activity.max_score();
        assert_eq!(outcome, PlayOutcome::Finished { score: max, max_score: max });
        let recent = services
            .session_summaries()
            .recent_for_activity(&emotion_faces(), 5)
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].score, max);
        assert_eq!(services.navigator().current(), Some(Route::Dashboard));
        assert!(String::from_utf8(out).unwrap().contains("All done!"));
    }

    #[tokio::test]
    async fn pick_can_change_before_submit() {
        let services = services();
        let catalog = services.catalog();
        let activity = catalog.get(&emotion_faces()).unwrap();
        let exercise = activity.exercise(0).unwrap();
        let correct = exercise.options().iter().position(|o| o.is_correct()).unwrap();
        let wrong = (correct + 1) % exercise.options().len();

        // Submit with nothing picked, pick wrong, switch to correct, submit, then stop.
        let script = format!("\n\n{}\n{}\n\n", wrong + 1, correct + 1);
        let mut out = Vec::new();
        let outcome = play(
            &services.session_loop(),
            &emotion_faces(),
            &mut Cursor::new(script),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PlayOutcome::Quit);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Pick an option first."));
        assert!(text.contains(&format!("> {}. ", correct + 1)));
        assert!(text.contains(&format!("Correct! +{} points", activity.point_value())));
        assert!(!text.contains("Not quite."));
    }

    #[tokio::test]
    async fn quitting_resets_without_saving() {
        let services = services();
        let mut out = Vec::new();
        let outcome = play(
            &services.session_loop(),
            &emotion_faces(),
            &mut Cursor::new("\nq\n"),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PlayOutcome::Quit);
        let recent = services
            .session_summaries()
            .recent_for_activity(&emotion_faces(), 5)
            .await
            .unwrap();
        assert!(recent.is_empty());
    }

    #[tokio::test]
    async fn end_of_input_quits() {
        let services = services();
        let mut out = Vec::new();
        let outcome = play(
            &services.session_loop(),
            &emotion_faces(),
            &mut Cursor::new(""),
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(outcome, PlayOutcome::Quit);
    }
}
