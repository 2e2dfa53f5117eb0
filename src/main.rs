// SPDX-License-Identifier: MIT

mod settings;

use std::{path::PathBuf, str::FromStr, sync::Arc};

use clap::{Parser, Subcommand};
use colored::Colorize;
use itertools::Itertools;
use settings::Settings;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

use promodesk_core::{
    RequestError,
    backend::Backend,
    cas::{CasExport, CasReport},
    chunk::{self, TimeInterval},
    deadline::with_deadline,
    folders,
    list::Item,
    model::{ActionStatus, Brandmaster, Shop},
    notify::{Notification, NotificationKind, Notifier},
    screen::{Screen, ScreenState},
    time::{DateTimeLocal, combine_date_time},
};
use promodesk_remote::{api::RemoteBackend, client::Client};

const APP_NAME: &str = "promodesk";
const CONFIG_FILE_NAME: &str = "settings.toml";
const KEEP_LOG_FILES_COUNT: usize = 5;
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, name("PATH_TO_CONFIG_FILE"), help("/path/to/settings.toml"))]
    settings_file: Option<String>,
}

#[derive(clap::Args, Debug)]
struct Window {
    /// Day of the action, YYYY-MM-DD
    #[arg(short, long)]
    date: String,

    /// Start hour, H[:M[:S]]
    #[arg(long)]
    since: String,

    /// End hour, H[:M[:S]]
    #[arg(long)]
    until: String,

    /// Day of the end when the action runs past midnight
    #[arg(long)]
    until_date: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show how an action window is split for CAS
    Chunk {
        #[command(flatten)]
        window: Window,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        max_hours: Option<f64>,
    },
    /// Create one CAS action per chunk of the window
    ExportCas {
        #[command(flatten)]
        window: Window,

        #[arg(long)]
        shop: String,

        #[arg(short, long)]
        name: String,

        /// How many times the failed chunks are sent again
        #[arg(short, long, default_value_t = 0)]
        retries: usize,
    },
    SetStatus {
        #[arg(short, long)]
        action: String,

        /// editable, pending, accepted or declined
        #[arg(short, long)]
        status: String,
    },
    Shops {},
    DeleteShops {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    AddBrandmasters {
        /// JSON array of {firstName, lastName, email}
        #[arg(short, long)]
        file: PathBuf,
    },
    ConfigDir {},
}

/// Prints notifications to the terminal the way a toast would show them.
struct ConsoleNotifier {}

impl Notifier for ConsoleNotifier {
    fn notify(&self, n: Notification) {
        match n.kind {
            NotificationKind::Error => tracing::error!(target: "notify", text=%n.message, "Notification"),
            _ => tracing::info!(target: "notify", kind=?n.kind, text=%n.message, "Notification"),
        }
        println!("{n}");
    }
}

fn clear_old_logs(path: &PathBuf, file_name_pattern: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut files = std::fs::read_dir(path)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_str().is_some_and(|s| s.starts_with(file_name_pattern)))
        .map(|e| e.path())
        .sorted()
        .collect::<Vec<PathBuf>>();
    if files.len() <= KEEP_LOG_FILES_COUNT {
        return Ok(());
    }

    files.truncate(files.len() - KEEP_LOG_FILES_COUNT);
    for f in files {
        std::fs::remove_file(f)?;
    }

    Ok(())
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let log_path = folders::log_folder(APP_NAME)?;
    let log_file_pattern = format!("{APP_NAME}.log");

    let file_appender = tracing_appender::rolling::daily(&log_path, &log_file_pattern);
    tracing_subscriber::fmt()
        .with_writer(file_appender)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_max_level(Level::DEBUG)
        .init();
    if let Err(e) = clear_old_logs(&log_path, log_file_pattern.as_str()) {
        tracing::error!(target: "main", error=?e, "Clear old files");
    }

    Ok(())
}

fn load_settings(settings_file: &Option<String>) -> Result<Settings, Box<dyn std::error::Error>> {
    if let Some(p) = settings_file {
        return Settings::new(p.as_str());
    }

    let config_path = folders::config_folder(APP_NAME)?.join(CONFIG_FILE_NAME);
    let path = config_path.to_str().ok_or("the config path is not valid UTF-8")?;
    let cfg = Settings::new(path)?;
    if !config_path.exists() {
        cfg.save()?;
    }
    Ok(cfg)
}

fn connect(cfg: &Settings) -> Result<Arc<dyn Backend>, Box<dyn std::error::Error>> {
    let client = Client::new(&cfg.base_url, cfg.timeouts.file())?;
    Ok(Arc::new(RemoteBackend::new(client)))
}

fn resolve_window(w: &Window) -> Result<TimeInterval, Box<dyn std::error::Error>> {
    let since = combine_date_time(Some(&w.date), Some(&w.since))
        .ok_or_else(|| format!("wrong start: {} {}", w.date, w.since))?;
    let until_date = w.until_date.as_deref().unwrap_or(&w.date);
    let until = combine_date_time(Some(until_date), Some(&w.until))
        .ok_or_else(|| format!("wrong end: {until_date} {}", w.until))?;

    Ok(TimeInterval::new(since, until)?)
}

fn format_local(dt: &DateTimeLocal) -> String {
    dt.format(DISPLAY_FORMAT).to_string()
}

fn print_chunks(name: &str, chunks: &[chunk::Chunk]) {
    for (i, c) in chunks.iter().enumerate() {
        println!(
            "{} {} - {} ({}h)",
            chunk::ordinal_label(i + 1, name).bold(),
            format_local(&c.since),
            format_local(&c.until),
            c.duration_hours
        );
    }
}

fn print_shops(shops: &[Arc<Shop>]) {
    for s in shops {
        let place = [s.address.as_deref(), s.city.as_deref()].into_iter().flatten().join(", ");
        if place.is_empty() {
            println!("{}: {}", s.id, s.name);
        } else {
            println!("{}: {} ({})", s.id, s.name, place.purple());
        }
    }
}

fn print_cas_report(r: &CasReport) {
    println!("Created {}/{}", r.created, r.total);
    for (ordinal, e) in &r.failed {
        println!("{} {}", format!("[{ordinal}]").red(), e);
    }
}

/// Shows the failure as a notification and returns a short summary for the exit status.
fn request_failed(notifier: &dyn Notifier, e: RequestError, what: &str) -> Box<dyn std::error::Error> {
    tracing::error!(target: "main", error=?e, what=what, "Request failed");
    match &e {
        RequestError::Aborted => {}
        RequestError::TimedOut => notifier.notify(Notification::interrupted()),
        e => notifier.notify(Notification::error(e.to_string().as_str())),
    }
    format!("{what} failed").into()
}

async fn load_screen<T, F, Fut>(screen: &mut Screen<T>, fetch: F) -> Result<(), Box<dyn std::error::Error>>
where
    T: Item + Clone,
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<Vec<T>, RequestError>>,
{
    screen.load(fetch).await;
    if let ScreenState::Failed(message) = screen.state() {
        return Err(message.clone().into());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        println!("Init logging error: {e}");
    }

    tracing::info!("Start application");

    let cfg = load_settings(&cli.settings_file)?;
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier {});

    match &cli.command {
        Commands::Chunk { window, name, max_hours } => {
            let interval = resolve_window(window)?;
            let chunks = chunk::chunk(&interval, max_hours.unwrap_or(cfg.chunk_max_hours))?;
            print_chunks(name.as_deref().unwrap_or(""), &chunks);
        }
        Commands::ExportCas {
            window,
            shop,
            name,
            retries,
        } => {
            let interval = resolve_window(window)?;
            let mut export = CasExport::new(shop, name, &interval, cfg.chunk_max_hours)?;
            let backend = connect(&cfg)?;

            let mut report = export.send(backend.clone(), cfg.timeouts.single()).await;
            for attempt in 1..=*retries {
                if report.is_success() {
                    break;
                }
                tracing::info!(target: "main", attempt=attempt, failed=report.failed.len(), "Retry CAS export");
                report = export.retry_failed(backend.clone(), cfg.timeouts.single()).await;
            }

            print_cas_report(&report);
            if !report.is_success() {
                return Err(format!("{} of {} chunks were not created", report.failed.len(), report.total).into());
            }
            notifier.notify(Notification::success(
                promodesk_core::notify::added(report.created).as_str(),
            ));
        }
        Commands::SetStatus { action, status } => {
            let status = ActionStatus::from_str(status).map_err(|e| format!("wrong status {status}: {e}"))?;
            let backend = connect(&cfg)?;
            let message = with_deadline(
                cfg.timeouts.single(),
                None,
                backend.set_action_status(action, status),
            )
            .await
            .map_err(|e| request_failed(notifier.as_ref(), e, "changing the status"))?;

            let message = if message.is_empty() {
                promodesk_core::notify::saved()
            } else {
                message
            };
            notifier.notify(Notification::success(message.as_str()));
        }
        Commands::Shops {} => {
            let backend = connect(&cfg)?;
            let mut screen = Screen::<Shop>::new("shops", notifier.clone(), cfg.timeouts);
            let deadline = cfg.timeouts.batch();
            load_screen(&mut screen, move |token| async move {
                with_deadline(deadline, None, backend.shops(token)).await
            })
            .await?;
            print_shops(screen.items());
        }
        Commands::DeleteShops { ids } => {
            let backend = connect(&cfg)?;
            let mut screen = Screen::<Shop>::new("shops", notifier.clone(), cfg.timeouts);
            let deadline = cfg.timeouts.batch();
            let b = backend.clone();
            load_screen(&mut screen, move |token| async move {
                with_deadline(deadline, None, b.shops(token)).await
            })
            .await?;

            for id in ids {
                screen.select(id);
            }
            if screen.selection().is_empty() {
                return Err("none of the given shops exists".into());
            }

            let report = screen
                .delete_selected(move |id| {
                    let b = backend.clone();
                    async move { b.delete_shop(&id).await.map(|_| ()) }
                })
                .await;
            if let Some(r) = report
                && !r.is_success()
            {
                print_shops(screen.items());
                return Err(format!("{} shops were not deleted", r.failed.len()).into());
            }
        }
        Commands::AddBrandmasters { file } => {
            let items: Vec<Brandmaster> = serde_json::from_str(&std::fs::read_to_string(file)?)?;
            let backend = connect(&cfg)?;
            let mut screen = Screen::<Brandmaster>::new("brandmasters", notifier.clone(), cfg.timeouts);
            let deadline = cfg.timeouts.batch();
            let b = backend.clone();
            load_screen(&mut screen, move |token| async move {
                with_deadline(deadline, None, b.brandmasters(token)).await
            })
            .await?;

            let Some(pending) = screen.begin_add(items) else {
                return Err("there is nothing to add".into());
            };
            let outcome = pending
                .with_deadline(cfg.timeouts.file())
                .send(move |items| async move { backend.add_brandmasters(&items).await })
                .await;
            if screen.settle_add(outcome).is_err() {
                return Err("adding the brandmasters failed".into());
            }

            for b in screen.items() {
                println!("{}: {} {} <{}>", b.id, b.first_name, b.last_name, b.email.blue());
            }
        }
        Commands::ConfigDir {} => println!("{}", folders::config_folder(APP_NAME)?.display()),
    };

    tracing::info!("End application");
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use promodesk_core::notify::RecordingNotifier;

    #[test]
    fn failure_is_shown_once() {
        let notifier = RecordingNotifier::default();
        let e = request_failed(
            &notifier,
            RequestError::server(403, Some("Brak uprawnień".to_string())),
            "changing the status",
        );

        assert_eq!(notifier.messages(), vec!["Brak uprawnień"]);
        assert_eq!(e.to_string(), "changing the status failed");

        let notifier = RecordingNotifier::default();
        request_failed(&notifier, RequestError::Aborted, "changing the status");
        assert!(notifier.messages().is_empty());
    }
}
