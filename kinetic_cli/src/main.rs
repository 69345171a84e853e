use clap::{Parser, Subcommand};
use kinetic_core::assistant::GroundedReply;
use kinetic_core::catalog::default_catalog;
use kinetic_core::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Upper bound for one set's rep count, scripted or typed
const MAX_REPS_PER_SET: u32 = 999;

#[derive(Parser)]
#[command(name = "kinetic")]
#[command(about = "Kinetic workout sessions, archive and daily schedule", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List exercises, their modifications and intensity profiles
    Catalog,

    /// Run a session on an exercise variant
    Train {
        /// Variant id (e.g. ex-1, ex-1-prog)
        variant: String,

        /// Intensity (low, medium, high)
        #[arg(long, default_value = "medium")]
        intensity: String,

        /// Scripted reps per set (0-999 each), e.g. 10,12,11. Fewer values than sets ends in a skip.
        #[arg(
            long,
            value_delimiter = ',',
            value_parser = clap::value_parser!(u32).range(0..=MAX_REPS_PER_SET as i64)
        )]
        reps: Option<Vec<u32>>,

        /// Disable the interactive set timer
        #[arg(long)]
        no_timer: bool,
    },

    /// Show or edit the workout archive
    Archive {
        #[command(subcommand)]
        action: Option<ArchiveAction>,
    },

    /// Show or edit the daily schedule
    Schedule {
        #[command(subcommand)]
        action: Option<ScheduleAction>,
    },

    /// Health ecosystem link
    Link {
        #[command(subcommand)]
        action: Option<LinkAction>,
    },

    /// Ask the assistant about your day
    Ask {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Chemical-free growing advice for a plant or food
    Cultivate {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Estimate calories and macros for a food
    Nutrition {
        #[arg(required = true, num_args = 1..)]
        food: Vec<String>,
    },

    /// Today's health briefs
    Briefs,

    /// A productivity ritual suggestion
    Inspire,
}

#[derive(Subcommand)]
enum ArchiveAction {
    /// List archived workouts, most recent first (default)
    List,
    /// Delete an archived workout
    Remove { id: String },
}

#[derive(Subcommand)]
enum ScheduleAction {
    /// List tasks by start time (default)
    List,
    /// Add a task
    Add {
        #[arg(long)]
        title: String,
        /// Start time as HH:MM
        #[arg(long)]
        start: String,
        /// Duration in minutes
        #[arg(long)]
        duration: Option<u32>,
        /// Work, Health, Personal, Leisure or Chore
        #[arg(long)]
        category: Option<String>,
    },
    /// Remove a task
    Remove { id: String },
    /// Set a task's status (todo, in-progress, completed, skipped)
    Status { id: String, status: String },
}

#[derive(Subcommand)]
enum LinkAction {
    /// Show the current link (default)
    Status,
    /// Link healthkit or googlefit
    Connect { ecosystem: String },
    Disconnect,
}

fn main() {
    let cli = Cli::parse();

    kinetic_core::logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let mut store = FileStore::new(data_dir);

    match cli.command {
        Commands::Catalog => cmd_catalog(&config),
        Commands::Train {
            variant,
            intensity,
            reps,
            no_timer,
        } => {
            let intensity: IntensityLevel = intensity.parse()?;
            cmd_train(&config, &mut store, &variant, intensity, reps, no_timer)
        }
        Commands::Archive { action } => cmd_archive(store, action.unwrap_or(ArchiveAction::List)),
        Commands::Schedule { action } => {
            cmd_schedule(store, action.unwrap_or(ScheduleAction::List))
        }
        Commands::Link { action } => cmd_link(&mut store, action.unwrap_or(LinkAction::Status)),
        Commands::Ask { text } => {
            let schedule = ScheduleStore::open(&mut store);
            let reply = assistant(&config).chat(&schedule.context_lines(), &text.join(" "));
            print_reply(&reply);
            Ok(())
        }
        Commands::Cultivate { query } => {
            print_reply(&assistant(&config).cultivation_advice(&query.join(" ")));
            Ok(())
        }
        Commands::Nutrition { food } => {
            let estimate = assistant(&config).nutrition_estimate(&food.join(" "));
            println!("  {}", estimate.food);
            println!(
                "  {} kcal · protein {}g · carbs {}g · fat {}g",
                estimate.calories, estimate.protein, estimate.carbs, estimate.fat
            );
            println!("  {}", estimate.advice);
            Ok(())
        }
        Commands::Briefs => {
            let briefs = assistant(&config).daily_health_briefs();
            if briefs.is_empty() {
                println!("No health briefs available.");
            }
            for brief in briefs {
                println!("• {} ({})", brief.title, brief.timestamp);
                println!("  {}", brief.summary);
                println!("  {}", brief.url);
            }
            Ok(())
        }
        Commands::Inspire => {
            println!("{}", assistant(&config).daily_inspiration());
            Ok(())
        }
    }
}

fn assistant(config: &Config) -> Assistant<Box<dyn AiGateway>> {
    let gateway: Box<dyn AiGateway> = match config.assistant.gateway() {
        Some(command) => Box::new(command),
        None => Box::new(OfflineGateway),
    };
    Assistant::new(gateway).with_location(config.assistant.location())
}

fn print_reply(reply: &GroundedReply) {
    println!("{}", reply.text);
    for source in &reply.sources {
        println!("  ↳ {} <{}>", source.title, source.uri);
    }
}

/// Run `f` with the configured catalog, validated
fn with_catalog<T>(config: &Config, f: impl FnOnce(&Catalog) -> Result<T>) -> Result<T> {
    let loaded;
    let catalog = match &config.catalog.path {
        Some(path) => {
            loaded = Catalog::load_from(path)?;
            &loaded
        }
        None => default_catalog(),
    };

    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in &errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }
    f(catalog)
}

// ============================================================================
// Catalog
// ============================================================================

fn cmd_catalog(config: &Config) -> Result<()> {
    with_catalog(config, |catalog| {
        for base in catalog.list_exercises() {
            println!("{} [{}]", base.name, base.id);
            print_profiles(base, "  ");
            for modification in catalog.list_modifications(&base.id)? {
                println!(
                    "  ↳ {} [{}] ({})",
                    modification.name, modification.id, modification.kind
                );
                print_profiles(modification, "      ");
            }
            println!();
        }
        Ok(())
    })
}

fn print_profiles(variant: &ExerciseVariant, indent: &str) {
    for level in IntensityLevel::ALL {
        let p = variant.profile(level);
        println!(
            "{}{:<6} {:>3}s × {} sets, {} reps",
            indent, level, p.duration_seconds, p.set_count, p.rep_target
        );
    }
}

// ============================================================================
// Training
// ============================================================================

fn cmd_train(
    config: &Config,
    store: &mut FileStore,
    variant_id: &str,
    intensity: IntensityLevel,
    reps: Option<Vec<u32>>,
    no_timer: bool,
) -> Result<()> {
    let link = HealthLink::load(&*store);

    let record = with_catalog(config, |catalog| {
        let mut session =
            KineticSession::with_intensity(catalog, variant_id, intensity)?.with_link(link.ecosystem());
        display_header(&session);

        let record = match reps {
            Some(reps) => run_scripted(&mut session, &reps)?,
            None => run_interactive(&mut session, no_timer)?,
        };
        Ok(record)
    })?;

    display_record(&record);
    let mut archive = ArchiveStore::open(store);
    archive.append(record);
    if archive.has_pending_write() {
        eprintln!("Warning: archive could not be saved; the record was not persisted.");
    }
    Ok(())
}

fn run_scripted(session: &mut KineticSession<'_>, reps: &[u32]) -> Result<WorkoutRecord> {
    let planned = session.set_count() as usize;
    if reps.len() > planned {
        tracing::warn!(
            "{} rep values given for {} sets; ignoring the rest",
            reps.len(),
            planned
        );
        eprintln!(
            "Warning: only {} sets planned, ignoring {} extra rep value(s)",
            planned,
            reps.len() - planned
        );
    }

    for &count in reps.iter().take(planned) {
        set_reps(session, count);
        println!("  Set {}/{}: {} reps", session.active_set(), planned, count);
        if let Some(record) = session.complete_set() {
            return Ok(record);
        }
    }

    println!("  Skipping remaining sets");
    session.skip();
    session
        .record()
        .cloned()
        .ok_or_else(|| Error::Validation("session ended without a record".into()))
}

fn run_interactive(session: &mut KineticSession<'_>, no_timer: bool) -> Result<WorkoutRecord> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut clock = SetClock::default();

    loop {
        clock.sync(session);
        println!("─────────────────────────────────────────");
        println!(
            "Set {}/{} · {}s{} · target {} reps",
            session.active_set(),
            session.set_count(),
            session.time_remaining(),
            if session.is_running() { " running" } else { "" },
            session.profile().rep_target
        );
        println!("  number + Enter to log reps and complete the set");
        if !no_timer {
            println!("  't' + Enter to start or pause the timer, 'r' + Enter to reset it");
        }
        println!("  's' + Enter to skip the rest");
        print!("> ");
        io::stdout().flush()?;

        let input = match lines.next() {
            Some(line) => line?,
            // End of input ends the session early
            None => "s".to_string(),
        };
        // Credit the time spent at the prompt
        clock.sync(session);

        let outcome = match input.trim().to_lowercase().as_str() {
            "s" => session.skip(),
            "t" if !no_timer => {
                toggle_timer(session, &mut clock);
                None
            }
            "r" if !no_timer => {
                session.reset_timer();
                clock.sync(session);
                println!("Timer reset to {}s", session.time_remaining());
                None
            }
            other => match other.parse::<u32>() {
                Ok(count) if count > MAX_REPS_PER_SET => {
                    println!("At most {} reps per set", MAX_REPS_PER_SET);
                    None
                }
                Ok(count) => {
                    set_reps(session, count);
                    session.complete_set()
                }
                Err(_) => {
                    println!("Unrecognized input: {:?}", other);
                    None
                }
            },
        };

        if let Some(record) = outcome {
            return Ok(record);
        }
    }
}

fn set_reps(session: &mut KineticSession<'_>, count: u32) {
    while session.current_reps() < count {
        session.increment_reps();
    }
    while session.current_reps() > count {
        session.decrement_reps();
    }
}

/// Wall clock driving whole-second ticks into a running set timer
#[derive(Default)]
struct SetClock {
    since: Option<Instant>,
}

impl SetClock {
    /// Deliver the seconds elapsed since the last sync. Fractions carry over.
    fn sync(&mut self, session: &mut KineticSession<'_>) {
        if !session.is_running() {
            self.since = None;
            return;
        }
        let since = match self.since {
            Some(since) => since,
            None => {
                self.since = Some(Instant::now());
                return;
            }
        };

        let elapsed = since.elapsed().as_secs();
        for _ in 0..elapsed.min(u64::from(session.time_remaining())) {
            session.tick();
        }
        self.since = if session.is_running() {
            Some(since + Duration::from_secs(elapsed))
        } else {
            None
        };
    }
}

fn toggle_timer(session: &mut KineticSession<'_>, clock: &mut SetClock) {
    if session.time_remaining() == 0 {
        println!("Time is up for this set. 'r' + Enter resets the timer.");
        return;
    }
    session.toggle_run();
    clock.sync(session);
    if session.is_running() {
        println!("Timer running: {}s left", session.time_remaining());
    } else {
        println!("Timer paused at {}s", session.time_remaining());
    }
}

fn display_header(session: &KineticSession<'_>) {
    let variant = session.variant();
    let profile = session.profile();
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {} · {}", variant.name.to_uppercase(), session.intensity());
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!(
        "  {} sets × {}s, target {} reps",
        profile.set_count, profile.duration_seconds, profile.rep_target
    );
    if !profile.guidance.is_empty() {
        println!("  {}", profile.guidance);
    }
    if let Some(ref url) = variant.video_url {
        println!("  ℹ Reference: {}", url);
    }
    println!();
}

fn display_record(record: &WorkoutRecord) {
    println!();
    println!("✓ {} {}", record.exercise_name, record.status);
    println!(
        "  {} sets · {} reps · {} · score {}",
        record.set_count, record.total_reps, record.intensity, record.metabolic_score
    );
    if let Some(eco) = record.ecosystem_id {
        println!("  Synced to {}", eco.display_name());
    }
    println!("  id {}", record.id);
}

// ============================================================================
// Archive, schedule, link
// ============================================================================

fn cmd_archive(store: FileStore, action: ArchiveAction) -> Result<()> {
    let mut archive = ArchiveStore::open(store);
    match action {
        ArchiveAction::List => {
            if archive.is_empty() {
                println!("No workouts archived yet.");
            }
            for r in archive.list() {
                println!(
                    "{}  {:<16} {:<9} {:<6} {:>2} sets {:>4} reps  score {:>5}  {}",
                    r.date_label,
                    r.exercise_name,
                    r.status,
                    r.intensity,
                    r.set_count,
                    r.total_reps,
                    r.metabolic_score,
                    r.id
                );
            }
        }
        ArchiveAction::Remove { id } => {
            if !archive.remove(&id) {
                return Err(Error::not_found("workout", id));
            }
            println!("✓ Removed {}", id);
        }
    }
    Ok(())
}

fn cmd_schedule(store: FileStore, action: ScheduleAction) -> Result<()> {
    let mut schedule = ScheduleStore::open(store);
    match action {
        ScheduleAction::List => {
            for task in schedule.list() {
                println!(
                    "{}  {:<30} {:>4}m  {:<8} {:<11} {}",
                    task.start_time,
                    task.title,
                    task.duration_minutes,
                    task.category,
                    task.status,
                    task.id
                );
            }
        }
        ScheduleAction::Add {
            title,
            start,
            duration,
            category,
        } => {
            let mut new_task = NewTask::new(title, start);
            new_task.duration_minutes = duration;
            new_task.category = category.map(|c| c.parse()).transpose()?;
            let task = schedule.add(new_task)?;
            println!("✓ Added {} at {} ({})", task.title, task.start_time, task.id);
        }
        ScheduleAction::Remove { id } => {
            if !schedule.remove(&id) {
                return Err(Error::not_found("task", id));
            }
            println!("✓ Removed {}", id);
        }
        ScheduleAction::Status { id, status } => {
            let status: TaskStatus = status.parse()?;
            schedule.update_status(&id, status)?;
            println!("✓ {} is now {}", id, status);
        }
    }
    if schedule.has_pending_write() {
        eprintln!("Warning: schedule could not be saved.");
    }
    Ok(())
}

fn cmd_link(store: &mut FileStore, action: LinkAction) -> Result<()> {
    let mut link = HealthLink::load(&*store);
    match action {
        LinkAction::Status => {}
        LinkAction::Connect { ecosystem } => link.connect(store, ecosystem.parse()?),
        LinkAction::Disconnect => link.disconnect(store),
    }
    println!("{}", link.status());
    Ok(())
}
