use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::client::driver::{run_session, SessionCommand, SessionEvent, SessionOutcome};
use crate::client::http::{HttpExamApi, DEFAULT_BASE_URL};
use crate::core::telemetry;
use crate::schemas::result::answer_text;

/// Take an exam from the terminal: start or resume the attempt, answer, and submit.
#[derive(Parser, Debug)]
#[command(name = "examhall-take", version, about, long_about = None)]
pub(crate) struct TakeArgs {
    /// API root, including the version prefix
    #[arg(long, env = "EXAMHALL_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Bearer token of the student taking the exam
    #[arg(long, env = "EXAMHALL_TOKEN", hide_env_values = true)]
    token: String,

    #[arg(long)]
    exam_id: String,

    /// JSON object of question id to answer
    #[arg(long)]
    answers: Option<PathBuf>,

    /// Do not submit manually; wait for the countdown to submit
    #[arg(long)]
    wait: bool,

    #[arg(short, long)]
    verbose: bool,
}

pub(crate) async fn run(args: TakeArgs) -> anyhow::Result<()> {
    telemetry::init_cli_tracing(args.verbose)?;

    let answers = match &args.answers {
        Some(path) => load_answers(path)?,
        None => BTreeMap::new(),
    };
    let api = HttpExamApi::new(&args.base_url, &args.token)?;

    let (command_tx, command_rx) = mpsc::channel(answers.len() + 1);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    for (question_id, value) in answers {
        command_tx
            .send(SessionCommand::Answer { question_id, value })
            .await
            .context("session closed before answers were sent")?;
    }
    if !args.wait {
        command_tx.send(SessionCommand::Submit).await.context("session closed before submit")?;
    }
    drop(command_tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event);
        }
    });

    let outcome = run_session(&api, &args.exam_id, command_rx, event_tx).await;
    let _ = printer.await;

    match outcome? {
        SessionOutcome::Submitted(_) => Ok(()),
        SessionOutcome::Failed(error) => anyhow::bail!("submission failed: {error}"),
    }
}

fn load_answers(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read answers from {}", path.display()))?;
    parse_answers(&raw).with_context(|| format!("Invalid answers file {}", path.display()))
}

fn parse_answers(raw: &str) -> anyhow::Result<BTreeMap<String, String>> {
    let parsed: BTreeMap<String, Value> = serde_json::from_str(raw)?;
    Ok(parsed
        .into_iter()
        .filter_map(|(question_id, value)| Some((question_id, answer_text(&value)?)))
        .collect())
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::Started { title, questions, remaining } => {
            println!("{title}: {questions} questions, {remaining}s on the clock");
        }
        SessionEvent::Tick { remaining, display, .. } => {
            if *remaining % 60 == 0 || *remaining <= 10 {
                println!("time left {display}");
            }
        }
        SessionEvent::Submitted { trigger, result } => {
            println!(
                "submitted ({trigger:?}): score {}% ({}/{})",
                result.score, result.correct_answers, result.total_questions
            );
        }
        SessionEvent::SubmitFailed { trigger, error } => {
            eprintln!("submission ({trigger:?}) failed: {error}");
        }
    }
}
