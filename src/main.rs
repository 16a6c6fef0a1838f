use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use garage_desk::config::AppConfig;
use garage_desk::models::{format_amount, format_percent, BookingStatus, ListQuery, SortDir, SortKey};
use garage_desk::services::auth::AuthClient;
use garage_desk::services::bookings::BookingList;
use garage_desk::services::store::http::HttpBookingStore;
use garage_desk::services::store::BookingStore;
use garage_desk::services::transitions::TransitionAction;
use garage_desk::services::upsells;
use garage_desk::session::Session;

/// Workshop booking desk
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List one page of bookings
    List {
        /// Only bookings with this status (pending, arrived, complete, canceled)
        #[arg(short, long)]
        status: Option<String>,

        #[arg(short, long, default_value_t = 1)]
        page: u32,

        #[arg(long, value_enum, default_value_t = SortArg::Created)]
        sort_by: SortArg,

        /// Sort ascending instead of descending
        #[arg(long)]
        asc: bool,
    },
    /// Mark a pending booking as arrived
    Arrive { id: String },
    /// Check out an arrived booking
    Complete { id: String },
    /// Cancel a pending or arrived booking
    Cancel { id: String },
    /// Show a booking's upsells and totals
    Upsells { id: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortArg {
    Created,
    Arrival,
    Price,
    Client,
    Reg,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Created => SortKey::CreatedAt,
            SortArg::Arrival => SortKey::ScheduledArrival,
            SortArg::Price => SortKey::BookingPrice,
            SortArg::Client => SortKey::ClientName,
            SortArg::Reg => SortKey::CarRegNo,
        }
    }
}

async fn open_session(config: &AppConfig) -> anyhow::Result<Arc<Session>> {
    if !config.api_token.is_empty() {
        return Ok(Arc::new(Session::new(config.api_token.clone())));
    }
    anyhow::ensure!(
        !config.api_username.is_empty(),
        "API_TOKEN or API_USERNAME/API_PASSWORD must be set"
    );
    let auth = AuthClient::new(config)?;
    Ok(auth.login(&config.api_username, &config.api_password).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env();
    tracing::info!("using booking store at {}", config.api_url);

    let session = open_session(&config).await?;
    let store: Arc<dyn BookingStore> = Arc::new(HttpBookingStore::from_config(&config, session)?);

    match args.command {
        Command::List {
            status,
            page,
            sort_by,
            asc,
        } => {
            let status = match status.as_deref() {
                Some(s) => Some(
                    BookingStatus::parse(s).ok_or_else(|| anyhow::anyhow!("unknown status: {s}"))?,
                ),
                None => None,
            };
            let query = ListQuery {
                status,
                sort_by: sort_by.into(),
                sort_dir: if asc { SortDir::Asc } else { SortDir::Desc },
                page,
                page_size: config.page_size,
                ..Default::default()
            };
            let list = BookingList::new(store, query.clone());
            let snap = list.load(query).await?;

            for b in &snap.items {
                println!(
                    "{:<26} {:<10} {:<20} {:<20} {:>9} {:>9}",
                    b.id,
                    b.car_reg_no,
                    b.make_model,
                    b.client_name,
                    format_amount(b.profit()),
                    format_percent(b.profit_percent()),
                );
            }
            println!(
                "page {} of {} ({} bookings)",
                snap.page, snap.total_pages, snap.total_items
            );
        }
        Command::Arrive { id } => transition(store, &id, TransitionAction::MarkArrived).await?,
        Command::Complete { id } => transition(store, &id, TransitionAction::Complete).await?,
        Command::Cancel { id } => transition(store, &id, TransitionAction::Cancel).await?,
        Command::Upsells { id } => {
            let booking = store.get_booking(&id).await?;
            let (_, totals) = upsells::booking_totals(store.as_ref(), &booking).await?;
            for row in totals.rows.iter().chain(std::iter::once(&totals.total)) {
                println!(
                    "{:<8} {:<30} {:<20} {:>9} {:>9} {:>9} {:>9}",
                    row.kind,
                    row.services,
                    row.parts,
                    format_amount(row.parts_cost),
                    format_amount(row.labour_cost),
                    format_amount(row.price),
                    format_amount(row.profit),
                );
            }
        }
    }

    Ok(())
}

async fn transition(
    store: Arc<dyn BookingStore>,
    id: &str,
    action: TransitionAction,
) -> anyhow::Result<()> {
    let list = BookingList::new(store, ListQuery::default());
    let booking = list.transition(id, action).await?;
    println!("{}", booking.summary());
    Ok(())
}
