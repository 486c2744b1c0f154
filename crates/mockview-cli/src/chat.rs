use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use mockview_core::{
    load_config, FinishedInterview, InterviewPipeline, InterviewSession, TurnOutcome, TurnReply,
};
use mockview_schema::{Candidate, FeedbackFormat};

const GRADES: [&str; 4] = ["Junior", "Middle", "Senior", "Lead"];

pub struct ChatArgs {
    pub name: Option<String>,
    pub position: Option<String>,
    pub grade: Option<String>,
    pub experience: Option<String>,
    pub smart: bool,
    pub log_dir: Option<PathBuf>,
}

pub async fn run_chat(root: &Path, args: ChatArgs) -> Result<()> {
    let mut config = load_config(&root.join("config"))?;
    if args.smart {
        config.interview.smart_mode = true;
    }
    let pipeline = InterviewPipeline::from_config(&config)?;

    let candidate = resolve_candidate(&args)?;
    let mut session = pipeline.start_session(candidate);

    println!("mockview interview. Type 'stop' for feedback or 'quit' to leave.");
    println!("---");
    let greeting = pipeline.greet(&mut session).await?;
    print_reply(&greeting);

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input == "quit" || input == "exit" {
            break;
        }
        if input.is_empty() {
            continue;
        }

        match pipeline.process_message(&mut session, input).await? {
            TurnOutcome::Reply(reply) => print_reply(&reply),
            TurnOutcome::Finished(done) => {
                print_feedback(&done);
                break;
            }
        }
    }

    if !session.is_finished() {
        println!("Preparing feedback...");
        let done = pipeline.finish(&mut session).await;
        print_feedback(&done);
    }

    let dir = args.log_dir.unwrap_or_else(|| root.join("sessions"));
    for path in write_session_logs(&session, &dir, Local::now())? {
        println!("Saved {}", path.display());
    }
    Ok(())
}

fn resolve_candidate(args: &ChatArgs) -> Result<Candidate> {
    let theme = ColorfulTheme::default();

    let name = match &args.name {
        Some(name) => name.clone(),
        None => Input::with_theme(&theme)
            .with_prompt("Your name")
            .interact_text()?,
    };
    let name = name.trim().to_string();
    if name.is_empty() {
        bail!("candidate name cannot be empty");
    }

    let position = match &args.position {
        Some(position) => position.clone(),
        None => Input::with_theme(&theme)
            .with_prompt("Position")
            .default("Python Developer".to_string())
            .interact_text()?,
    };

    let grade = match &args.grade {
        Some(grade) => grade.clone(),
        None => {
            let selected = Select::with_theme(&theme)
                .with_prompt("Target grade")
                .items(&GRADES)
                .default(0)
                .interact()?;
            GRADES[selected].to_string()
        }
    };

    let experience = match &args.experience {
        Some(experience) => experience.clone(),
        None => Input::with_theme(&theme)
            .with_prompt("Experience")
            .allow_empty(true)
            .interact_text()?,
    };

    Ok(Candidate::new(name, position.trim(), grade.trim(), experience.trim()))
}

fn print_reply(reply: &TurnReply) {
    for thought in &reply.thoughts {
        println!(
            "{}",
            style(format!("  [{}] {}", thought.stage, thought.text)).dim()
        );
    }
    println!(
        "{} {}",
        style(format!("Interviewer (difficulty {}/5):", reply.difficulty)).bold(),
        reply.message
    );
}

fn print_feedback(done: &FinishedInterview) {
    println!("---");
    println!("{}", done.feedback.render_text());
    let flags = done
        .stats
        .flags
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "{}",
        style(format!(
            "turns: {}, skills: {}, gaps: {}, flags: [{flags}]",
            done.stats.turns, done.stats.skills_found, done.stats.gaps_found
        ))
        .dim()
    );
}

/// Writes the full (structured report) and formatted (text report) session
/// records. Returns the written paths.
pub fn write_session_logs(
    session: &InterviewSession,
    dir: &Path,
    at: DateTime<Local>,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log dir: {}", dir.display()))?;
    let stamp = at.format("%Y%m%d_%H%M%S");

    let mut written = Vec::with_capacity(2);
    for (suffix, format) in [
        ("full", FeedbackFormat::Structured),
        ("formatted", FeedbackFormat::Text),
    ] {
        let path = dir.join(format!("{stamp}_{suffix}.json"));
        let json = session.to_log(format).to_json_pretty()?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write session log: {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
