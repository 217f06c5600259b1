//! Replay a scripted scenario through a lesson session.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bankwise_lessons::telemetry::ReportOutcome;
use bankwise_lessons::{
    CompletionRecord, EngineConfig, HttpTelemetrySink, LessonCatalog, LessonId, LessonSession,
    Reaction, ReactionDispatcher, TelemetryReporter, action_params,
};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use tracing::{debug, info};

use crate::config::ConfigLoader;
use crate::renderer::LogRenderer;
use crate::scenario::{Scenario, Step};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Scenario file (TOML)
    pub script: PathBuf,

    /// Push one telemetry snapshot to the configured endpoint afterwards
    /// (always done when `telemetry.enabled` is set)
    #[arg(long)]
    pub report: bool,
}

pub async fn run(args: ReplayArgs) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    let scenario = Scenario::load(&args.script)?;
    if let Some(name) = &scenario.student_name {
        config.session.student_name = name.clone();
    }

    let replay = replay(&scenario, &config)?;
    for line in &replay.log {
        println!("{line}");
    }
    println!();
    println!("{}", score_table(&replay.session));

    if args.report || config.telemetry.enabled {
        report(replay.session, &config).await?;
    }
    Ok(())
}

/// Session state and step log after a replay.
pub struct Replay {
    pub session: LessonSession,
    pub log: Vec<String>,
}

/// Run every step of `scenario` through a fresh session.
pub fn replay(scenario: &Scenario, config: &EngineConfig) -> Result<Replay> {
    let catalog = LessonCatalog::from_definitions(scenario.lessons.clone());
    let mut session = LessonSession::new(config)
        .with_dispatcher(ReactionDispatcher::with_renderer(Arc::new(LogRenderer)));
    let mut log = Vec::new();

    info!(
        session_id = %session.id(),
        lessons = catalog.len(),
        steps = scenario.steps.len(),
        "Replaying scenario"
    );

    for (index, step) in scenario.steps.iter().enumerate() {
        let n = index + 1;
        debug!(step = n, ?step, "Replaying step");

        match step {
            Step::Start { lesson } => {
                let definition = catalog
                    .get(&LessonId::from(lesson.as_str()))
                    .with_context(|| format!("step {n}: unknown lesson '{lesson}'"))?;
                let validation = session
                    .start_lesson(definition)
                    .with_context(|| format!("step {n}: cannot start '{lesson}'"))?;
                log.push(format!(
                    "[{n}] start {lesson}: {} ({}/{}) {}",
                    validation.status,
                    validation.completed_count,
                    validation.total_count,
                    validation.message
                ));
            }
            Step::Action {
                action_type,
                params,
            } => {
                let outcome = session.process_action(action_type, &action_params(params.clone()));
                log.push(format!("[{n}] {action_type}"));
                for fired in &outcome.fired {
                    log.push(format!(
                        "      -> {} {}: {}",
                        fired.invocation.lesson_id,
                        fired.invocation.condition_id,
                        summarize(&fired.invocation.reaction)
                    ));
                }
                push_completions(&mut log, &outcome.completed);
            }
            Step::Mistake {
                mistake_type,
                details,
            } => {
                let affected = session.record_lesson_mistake(mistake_type, details.clone());
                log.push(format!(
                    "[{n}] mistake {mistake_type} (applied to {affected} lesson(s))"
                ));
            }
            Step::Quiz {
                earned,
                possible,
                label,
            } => {
                let completed = session.add_quiz_score(*earned, *possible, label.clone());
                log.push(format!("[{n}] quiz {label}: {earned}/{possible}"));
                push_completions(&mut log, &completed);
            }
            Step::Tick { seconds } => {
                session.tick(*seconds);
                log.push(format!("[{n}] tick {seconds}s"));
            }
        }
    }

    Ok(Replay { session, log })
}

fn push_completions(log: &mut Vec<String>, completed: &[CompletionRecord]) {
    for record in completed {
        log.push(format!(
            "      == {} completed ({}): {} {}",
            record.lesson_id, record.reason, record.score.final_score, record.score.grade
        ));
    }
}

fn summarize(reaction: &Reaction) -> String {
    match reaction {
        Reaction::Display(d) => format!("{} \"{}\"", d.style.as_str(), d.message),
        Reaction::Challenge(c) => format!("challenge \"{}\"", c.prompt),
        Reaction::Content(c) => format!("content \"{}\"", c.body),
        Reaction::Complete(c) => match &c.message {
            Some(message) => format!("complete \"{message}\""),
            None => "complete".to_string(),
        },
        Reaction::Stub(s) => format!(
            "coming soon ({})",
            s.feature.as_deref().unwrap_or("unnamed feature")
        ),
        Reaction::Unresolved {
            action_type,
            reason,
        } => format!("unresolved {action_type}: {reason}"),
    }
}

fn score_table(session: &LessonSession) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Lesson").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
        Cell::new("Content").fg(Color::Cyan),
        Cell::new("App usage").fg(Color::Cyan),
        Cell::new("Quiz").fg(Color::Cyan),
        Cell::new("Score").fg(Color::Cyan),
        Cell::new("Grade").fg(Color::Cyan),
    ]);

    for record in session.completed_records() {
        let snapshot = &record.snapshot;
        table.add_row(vec![
            Cell::new(&record.lesson_id),
            Cell::new(format!("completed ({})", record.reason)).fg(Color::Green),
            Cell::new(snapshot.content_score),
            Cell::new(snapshot.app_usage_score),
            Cell::new(format_quiz(snapshot.quiz_percentage)),
            Cell::new(record.score.final_score),
            Cell::new(record.score.grade),
        ]);
    }

    for active in session.active_lessons() {
        let Some(breakdown) = session.breakdown(active.id()) else {
            continue;
        };
        let score = session.current_score(active.id());
        table.add_row(vec![
            Cell::new(active.id()),
            Cell::new(format!(
                "active ({}/{} met)",
                active.met_count(),
                active.total_count()
            ))
            .fg(Color::Yellow),
            Cell::new(breakdown.content_score),
            Cell::new(breakdown.app_usage_score),
            Cell::new(format_quiz(breakdown.quiz_percentage)),
            Cell::new(score.map_or("-".to_string(), |s| s.final_score.to_string())),
            Cell::new(score.map_or("-".to_string(), |s| s.grade.to_string())),
        ]);
    }

    table
}

fn format_quiz(percentage: Option<f64>) -> String {
    percentage.map_or("-".to_string(), |p| format!("{p:.0}%"))
}

async fn report(session: LessonSession, config: &EngineConfig) -> Result<()> {
    let sink = HttpTelemetrySink::from_config(&config.telemetry)?;
    let endpoint = sink.endpoint().to_string();
    let mut reporter =
        TelemetryReporter::new(session.into_shared(), Arc::new(sink), &config.telemetry);

    match reporter
        .report_once()
        .await
        .with_context(|| format!("Failed to push telemetry to {endpoint}"))?
    {
        ReportOutcome::Sent => println!("Telemetry snapshot sent to {endpoint}"),
        ReportOutcome::Skipped => println!("Telemetry unchanged, nothing sent"),
    }
    Ok(())
}
