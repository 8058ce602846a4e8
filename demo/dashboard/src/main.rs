use chatscope_core::api::{ExclusionWordlist, Replacement, WordcloudSnapshot};
use chatscope_core::time::parse_utc;
use chatscope_core::wordcloud::WordFrequencyEntry;
use chatscope_core::{
    telemetry, Dashboard, DashboardConfig, ExclusionEditor, ReplacementEditor, Session,
    SnapshotRequest, TimeRange, WordCloudEngine, WordcloudSnapshotRequest,
};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "chatscope-dashboard")]
#[command(about = "Live-stream chat analytics dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Poll the live panels and write the word cloud on every refresh
    Live {
        #[arg(short = 'o', long = "output", default_value = "wordcloud.svg")]
        output: PathBuf,
        #[arg(long = "start", value_parser = parse_time)]
        start: Option<DateTime<Utc>>,
        #[arg(long = "end", value_parser = parse_time)]
        end: Option<DateTime<Utc>>,
        /// Seconds between panel summaries
        #[arg(long = "refresh", default_value_t = 5)]
        refresh_secs: u64,
        /// Exclusion wordlist to apply
        #[arg(long = "wordlist")]
        wordlist_id: Option<i64>,
    },
    /// Step through historical snapshots on a timer
    Playback {
        #[arg(long = "start", value_parser = parse_time)]
        start: DateTime<Utc>,
        #[arg(long = "end", value_parser = parse_time)]
        end: DateTime<Utc>,
        #[arg(long = "step-seconds", default_value_t = 300)]
        step_seconds: u32,
        #[arg(long = "window-hours", default_value_t = 4)]
        window_hours: u32,
        #[arg(long = "word-limit", default_value_t = 50)]
        word_limit: u32,
        /// Exclusion wordlist applied to the word cloud
        #[arg(long = "wordlist")]
        wordlist_id: Option<i64>,
        /// Replacement wordlist applied to the word cloud
        #[arg(long = "replacement-wordlist")]
        replacement_wordlist_id: Option<i64>,
        /// Milliseconds per frame
        #[arg(long = "speed", default_value_t = 1000)]
        speed_ms: u64,
        #[arg(short = 'o', long = "output", default_value = "playback.svg")]
        output: PathBuf,
    },
    /// Manage exclusion wordlists
    Wordlists {
        /// Admin password, required for changes
        #[arg(long = "password")]
        password: Option<String>,
        #[command(subcommand)]
        action: WordlistAction,
    },
    /// Manage replacement wordlists
    Replacements {
        /// Admin password, required for changes
        #[arg(long = "password")]
        password: Option<String>,
        #[command(subcommand)]
        action: ReplacementAction,
    },
}

#[derive(Debug, Subcommand)]
enum WordlistAction {
    List,
    Show { id: i64 },
    Create { name: String, words: Vec<String> },
    Add { id: i64, words: Vec<String> },
    Delete { id: i64 },
}

#[derive(Debug, Subcommand)]
enum ReplacementAction {
    List,
    Show {
        id: i64,
    },
    /// Rules are written as `source=target`
    Create {
        name: String,
        #[arg(value_parser = parse_rule)]
        rules: Vec<(String, String)>,
    },
    Add {
        id: i64,
        #[arg(value_parser = parse_rule)]
        rules: Vec<(String, String)>,
    },
    Remove {
        id: i64,
        source: String,
    },
    Delete {
        id: i64,
    },
}

fn parse_rule(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(source, target)| (source.to_string(), target.to_string()))
        .ok_or_else(|| format!("expected source=target, got: {raw}"))
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_utc(raw).ok_or_else(|| format!("invalid timestamp: {raw}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing("info,chatscope_core=info,chatscope_dashboard=info");

    let cli = Cli::parse();
    let config = DashboardConfig::load();

    match cli.command {
        Commands::Live {
            output,
            start,
            end,
            refresh_secs,
            wordlist_id,
        } => run_live(config, output, TimeRange { start, end }, refresh_secs, wordlist_id).await,
        Commands::Playback {
            start,
            end,
            step_seconds,
            window_hours,
            word_limit,
            wordlist_id,
            replacement_wordlist_id,
            speed_ms,
            output,
        } => {
            let base = SnapshotRequest {
                start: Some(start),
                end: Some(end),
                step_seconds,
            };
            let words = WordcloudSnapshotRequest {
                window_hours,
                word_limit,
                ..WordcloudSnapshotRequest::aligned_with(&base)
            }
            .with_wordlists(wordlist_id, replacement_wordlist_id);
            run_playback(config, base, words, Duration::from_millis(speed_ms), output).await
        }
        Commands::Wordlists { password, action } => run_wordlists(config, password, action).await,
        Commands::Replacements { password, action } => {
            run_replacements(config, password, action).await
        }
    }
}

async fn run_live(
    config: DashboardConfig,
    output: PathBuf,
    range: TimeRange,
    refresh_secs: u64,
    wordlist_id: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let dashboard = Dashboard::new(config);
    dashboard.start().await;

    if !range.is_realtime() {
        dashboard.set_range(range).await;
    }
    if let Some(id) = wordlist_id {
        let mut editor = ExclusionEditor::new(dashboard.exclusions().clone());
        editor.select(Some(id)).await?;
        info!(target: "dashboard", id, words = editor.words().len(), "Applying exclusion wordlist");
        dashboard.set_exclude_words(editor.words().to_vec()).await;
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(refresh_secs.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                report(&dashboard).await;
                let frame = dashboard.word_cloud_frame(Instant::now()).await;
                write_svg(&output, &frame.to_svg());
            }
            _ = signal::ctrl_c() => {
                info!(target: "dashboard", "Shutting down");
                break;
            }
        }
    }

    dashboard.shutdown().await;
    Ok(())
}

async fn report(dashboard: &Dashboard) {
    let chat = dashboard.chat();
    if let Some(err) = chat.error().await {
        warn!(target: "dashboard", error = %err, "Messages panel error");
    }
    let hourly = chat.hourly_stats().await;
    let latest = hourly.last().map(|p| p.count).unwrap_or(0);
    let stats = dashboard.word_frequency().stats().await;
    let title = dashboard
        .stream_info()
        .await
        .and_then(|s| s.title)
        .unwrap_or_else(|| "-".to_string());
    let stream_stats = dashboard.stream_stats().await;
    if let Some(err) = &stream_stats.error {
        warn!(target: "dashboard", error = %err, "Stream stats panel error");
    }
    let revenue = stream_stats
        .money
        .as_ref()
        .map(|m| m.total_amount_twd)
        .unwrap_or(0.0);

    info!(
        target: "dashboard",
        stream = %title,
        messages = chat.total_messages().await,
        hours = hourly.len(),
        latest_hour_count = latest,
        word_messages = stats.total_messages,
        unique_words = stats.unique_words,
        viewers = stream_stats.latest_viewers().unwrap_or(0),
        revenue_twd = revenue,
        "Panels refreshed"
    );
}

async fn run_playback(
    config: DashboardConfig,
    base: SnapshotRequest,
    words: WordcloudSnapshotRequest,
    speed: Duration,
    output: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let dashboard = Dashboard::new(config.clone());
    let playback = dashboard.playback().clone();

    // The two loads are independent; a word cloud failure still plays metrics
    let (primary, cloud) = tokio::join!(
        playback.load_snapshots(base),
        playback.load_wordcloud_snapshots(words)
    );
    primary?;
    if let Err(e) = cloud {
        warn!(target: "playback", error = %e, "Playing without word cloud");
    }

    let mut engine = WordCloudEngine::new(&config.wordcloud);
    playback.toggle_playback().await;
    let mut ticker = tokio::time::interval(speed);

    while playback.is_playing().await {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = signal::ctrl_c() => break,
        }

        if let Some(snapshot) = playback.current().await {
            info!(
                target: "playback",
                index = playback.current_index().await,
                total = playback.len().await,
                time = %snapshot.timestamp,
                viewers = snapshot.viewer_count.unwrap_or(0),
                messages = snapshot.hourly_messages.unwrap_or(0),
                "Frame"
            );
        }
        if let Some(frame) = playback.current_words().await {
            let now = Instant::now();
            engine.update(entries(&frame), now);
            // Let the transition settle before writing the frame
            write_svg(&output, &engine.frame(now + speed).to_svg());
        }

        playback.advance().await;
    }

    info!(target: "playback", "Playback finished");
    Ok(())
}

fn entries(frame: &WordcloudSnapshot) -> Vec<WordFrequencyEntry> {
    frame.words.iter().map(WordFrequencyEntry::from).collect()
}

async fn run_wordlists(
    config: DashboardConfig,
    password: Option<String>,
    action: WordlistAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = match password {
        Some(p) => Session::login(&p, &config.auth)?,
        None => Session::guest(),
    };
    let dashboard = Dashboard::new(config);
    let manager = dashboard.exclusions().clone();

    match action {
        WordlistAction::List => {
            manager.refresh().await;
            if let Some(err) = manager.error().await {
                error!(target: "wordlists", error = %err, "Failed to list wordlists");
            }
            for list in manager.wordlists().await {
                println!("{}\t{}\t{} words", list.id, list.name, list.words.len());
            }
        }
        WordlistAction::Show { id } => {
            let list = manager.get(id).await?;
            print_list(&list);
        }
        WordlistAction::Create { name, words } => {
            session.require_admin()?;
            let mut editor = ExclusionEditor::new(Arc::clone(&manager));
            for word in &words {
                editor.add_word(word);
            }
            let created = editor.save_as(&name).await?;
            print_list(&created);
        }
        WordlistAction::Add { id, words } => {
            session.require_admin()?;
            let mut editor = ExclusionEditor::new(Arc::clone(&manager));
            editor.select(Some(id)).await?;
            for word in &words {
                editor.add_word(word);
            }
            match editor.update_selected().await? {
                Some(updated) => print_list(&updated),
                None => println!("No changes"),
            }
        }
        WordlistAction::Delete { id } => {
            session.require_admin()?;
            manager.remove(id).await?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}

async fn run_replacements(
    config: DashboardConfig,
    password: Option<String>,
    action: ReplacementAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = match password {
        Some(p) => Session::login(&p, &config.auth)?,
        None => Session::guest(),
    };
    let dashboard = Dashboard::new(config);
    let mut editor = ReplacementEditor::new(dashboard.replacements().clone());

    match action {
        ReplacementAction::List => {
            let manager = editor.manager();
            manager.refresh().await;
            if let Some(err) = manager.error().await {
                error!(target: "wordlists", error = %err, "Failed to list replacement wordlists");
            }
            for list in manager.wordlists().await {
                println!("{}\t{}\t{} rules", list.id, list.name, list.replacements.len());
            }
        }
        ReplacementAction::Show { id } => {
            editor.select(Some(id)).await?;
            print_rules(id, editor.rules());
        }
        ReplacementAction::Create { name, rules } => {
            session.require_admin()?;
            for (source, target) in &rules {
                editor.add_rule(source, target);
            }
            let created = editor.save_as(&name).await?;
            println!("{} ({})", created.name, created.id);
            print_rules(created.id, &created.replacements);
        }
        ReplacementAction::Add { id, rules } => {
            session.require_admin()?;
            editor.select(Some(id)).await?;
            for (source, target) in &rules {
                editor.add_rule(source, target);
            }
            match editor.update_selected().await? {
                Some(updated) => print_rules(updated.id, &updated.replacements),
                None => println!("No changes"),
            }
        }
        ReplacementAction::Remove { id, source } => {
            session.require_admin()?;
            editor.select(Some(id)).await?;
            editor.remove_rule(&source);
            if let Some(updated) = editor.update_selected().await? {
                print_rules(updated.id, &updated.replacements);
            }
        }
        ReplacementAction::Delete { id } => {
            session.require_admin()?;
            editor.select(Some(id)).await?;
            editor.delete_selected().await?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}

fn print_rules(id: i64, rules: &[Replacement]) {
    println!("Replacement list {id}");
    for rule in rules {
        println!("  {} -> {}", rule.source, rule.target);
    }
}

fn print_list(list: &ExclusionWordlist) {
    println!("{} ({})", list.name, list.id);
    for word in &list.words {
        println!("  {word}");
    }
}

fn write_svg(path: &Path, svg: &str) {
    if let Err(e) = std::fs::write(path, svg) {
        warn!(target: "dashboard", path = %path.display(), error = %e, "Failed to write SVG");
    }
}
