use chrono::Datelike;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style, Table, Tabled};

use trivifta::billing::{preview_csv, BillingRecord};
use trivifta::client::{ApiClient, HttpTransport, RunReport, Session};
use trivifta::config::{
    apply_env_overrides, config_dir, init_config_dir, load_config, resolve_output_dir, Config,
};
use trivifta::dates::{
    days_in_month, is_date_selectable, month_name, parse_date, selectable_years, DateQuery,
};
use trivifta::error::{IftaError, Result};
use trivifta::export::{
    billing_filename, report_filename, save_download, CONTRACTS_FILE, ORDERS_FILE,
};
use trivifta::request::{build_billing_query, build_report_run_request, RunOptions};
use trivifta::table::{parse_csv, ReportTable, TabularRow, ID_COLUMN};
use trivifta::workflow::{FormState, Outcome};

#[derive(Parser)]
#[command(name = "ifta")]
#[command(version, about = "IFTA compliance reporting client", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.ifta or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Backend base URL (overrides config.toml and IFTA_API_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// CSRF token sent as X-CSRFToken on POST requests
    #[arg(long, global = true)]
    csrf_token: Option<String>,

    /// Cookie header to read the csrftoken cookie from (e.g. "csrftoken=abc; sessionid=xyz")
    #[arg(long, global = true)]
    cookie: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template config.toml
    Init,

    /// Run the daily report job for a date and show the result
    Run {
        /// Report date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        /// Drop vehicles that did not move
        #[arg(long)]
        remove_unchanged: bool,

        /// Email the report
        #[arg(long)]
        send_email: bool,

        /// Do not store the entries in the report database
        #[arg(long)]
        no_save_to_db: bool,

        /// Upload the report to FTP
        #[arg(long)]
        send_to_ftp: bool,

        /// Save the CSV to the download directory
        #[arg(long)]
        download: bool,

        /// Submit even if the date is outside the selectable range
        #[arg(long)]
        force: bool,
    },

    /// Show stored report entries for a day
    Entries {
        #[arg(short, long)]
        year: i32,

        #[arg(short, long)]
        month: u32,

        #[arg(short, long)]
        day: u32,

        /// Save the entries as CSV to the download directory
        #[arg(long)]
        download: bool,
    },

    /// Show monthly billing summaries
    Billing {
        #[arg(short, long)]
        month: u32,

        #[arg(short, long)]
        year: i32,

        /// Save each record's orders CSV
        #[arg(long)]
        download_orders: bool,

        /// Save each record's contracts CSV
        #[arg(long)]
        download_contracts: bool,
    },

    /// List the days of a month
    Days {
        #[arg(short, long)]
        year: i32,

        #[arg(short, long)]
        month: u32,
    },

    /// Check whether a date can be submitted to `run`
    CheckDate {
        /// Date to check (YYYY-MM-DD)
        date: String,
    },

    /// Display a local CSV file, e.g. a previous download
    View {
        file: PathBuf,

        /// Only show the first five lines
        #[arg(long)]
        preview: bool,
    },

    /// Show the backend's advertised configuration
    ServerConfig,

    /// List companies known to the billing service
    Companies,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        if e.is_remote() {
            eprintln!("Check api.base_url in config.toml or pass --base-url.");
        }
        std::process::exit(1);
    }
}

/// Settings shared by the commands that talk to the backend
struct Context {
    cfg_dir: PathBuf,
    base_url: Option<String>,
    csrf_token: Option<String>,
    cookie: Option<String>,
}

impl Context {
    fn config(&self) -> Result<Config> {
        let config = match load_config(&self.cfg_dir) {
            Ok(config) => config,
            Err(IftaError::ConfigNotFound(_) | IftaError::ConfigFileNotFound(_))
                if self.base_url.is_some() =>
            {
                log::debug!("no config at {}, using defaults", self.cfg_dir.display());
                Config::default()
            }
            Err(e) => return Err(e),
        };

        let mut config = apply_env_overrides(config);
        if let Some(url) = &self.base_url {
            config.api.base_url = url.clone();
        }
        Ok(config)
    }

    /// Token from the command line wins over the cookie header, which wins over config.toml.
    fn session(&self, config: &Config) -> Session {
        if let Some(token) = &self.csrf_token {
            return Session::with_token(token.clone());
        }
        if let Some(cookies) = &self.cookie {
            let session = Session::from_cookie_header(cookies);
            if session.csrf_token.is_some() {
                return session;
            }
            log::warn!("no csrftoken cookie in --cookie value");
        }
        Session {
            csrf_token: config.api.csrf_token.clone(),
        }
    }

    fn client(&self, config: &Config) -> ApiClient<HttpTransport> {
        ApiClient::new(
            HttpTransport::new(config.api.timeout()),
            config.api.base_url.clone(),
            self.session(config),
        )
    }

    fn output_dir(&self, config: &Config) -> PathBuf {
        resolve_output_dir(&config.export.output_dir, &self.cfg_dir)
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };
    let ctx = Context {
        cfg_dir,
        base_url: cli.base_url,
        csrf_token: cli.csrf_token,
        cookie: cli.cookie,
    };

    match cli.command {
        Commands::Init => cmd_init(&ctx.cfg_dir),
        Commands::Run {
            date,
            remove_unchanged,
            send_email,
            no_save_to_db,
            send_to_ftp,
            download,
            force,
        } => {
            let options = RunOptions {
                remove_unchanged,
                send_email,
                save_to_db: !no_save_to_db,
                send_to_ftp,
            };
            cmd_run(&ctx, date.as_deref(), options, download, force)
        }
        Commands::Entries {
            year,
            month,
            day,
            download,
        } => cmd_entries(&ctx, year, month, day, download),
        Commands::Billing {
            month,
            year,
            download_orders,
            download_contracts,
        } => cmd_billing(&ctx, month, year, download_orders, download_contracts),
        Commands::Days { year, month } => cmd_days(year, month),
        Commands::CheckDate { date } => cmd_check_date(&date),
        Commands::View { file, preview } => cmd_view(&file, preview),
        Commands::ServerConfig => cmd_server_config(&ctx),
        Commands::Companies => cmd_companies(&ctx),
    }
}

/// Initialize config directory with the template
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    init_config_dir(cfg_dir)?;

    println!("Initialized ifta config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Point it at your backend:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Run a report:              ifta run --date <YYYY-MM-DD>");

    Ok(())
}

fn render_table(table: &ReportTable) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.headers().iter().cloned());
    for record in table.records() {
        builder.push_record(record.into_iter().map(str::to_string));
    }
    let mut rendered = builder.build();
    rendered.with(Style::rounded());
    rendered.to_string()
}

/// Settle a single submission on a fresh form and hand back its data.
///
/// The CLI issues one request per form, so the stale arm only guards against
/// misuse; a newer submission never exists here.
fn submit<T>(name: &'static str, request: impl FnOnce() -> Result<T>) -> Result<T> {
    let mut form = FormState::new(name);
    let submission = form.begin();
    match form.finish(submission, request()) {
        Outcome::Committed => form
            .take()
            .ok_or_else(|| IftaError::MalformedResponse(format!("{name}: no data"))),
        Outcome::Failed(e) => Err(e),
        Outcome::Stale => Err(IftaError::MalformedResponse(format!(
            "{name}: superseded by a newer request"
        ))),
    }
}

/// Run the report job and display the returned CSV
fn cmd_run(
    ctx: &Context,
    date: Option<&str>,
    options: RunOptions,
    download: bool,
    force: bool,
) -> Result<()> {
    let date = date.map(parse_date).transpose()?;
    let request = build_report_run_request(date, options)?;

    if !is_date_selectable(request.date) {
        if !force {
            return Err(IftaError::DateNotSelectable(request.date));
        }
        log::warn!("{} is outside the selectable range, submitting anyway", request.date);
    }

    let config = ctx.config()?;
    let client = ctx.client(&config);

    println!("Running report for {} ...", request.date);
    let report: RunReport = submit("run-job", || client.run_report(&request))?;

    if report.table.is_empty() {
        println!("Report for {} has no rows.", request.date);
    } else {
        println!("{}", render_table(&report.table));
        println!();
        println!("{} rows", report.table.len());
    }

    if download {
        let filename = report_filename(&config.export.prefix, request.date);
        let path = save_download(&ctx.output_dir(&config), &filename, &report.csv_text)?;
        println!("Saved: {}", path.display());
    }

    Ok(())
}

/// Show the stored entries for one day
fn cmd_entries(ctx: &Context, year: i32, month: u32, day: u32, download: bool) -> Result<()> {
    let query = DateQuery::new(year, month, day)?;
    let config = ctx.config()?;
    let client = ctx.client(&config);

    let rows: Vec<TabularRow> = submit("query-database", || client.fetch_entries_for_date(&query))?;
    if rows.is_empty() {
        println!("Selected Date not in database");
        if download {
            println!("Nothing to download.");
        }
        return Ok(());
    }

    let table = ReportTable::from_rows(rows).without_column(ID_COLUMN);
    println!("{}", render_table(&table));
    println!();
    println!("{} entries for {}", table.len(), query.date());

    if download {
        let filename = report_filename(&config.export.prefix, query.date());
        let path = save_download(&ctx.output_dir(&config), &filename, &table.to_csv()?)?;
        println!("Saved: {}", path.display());
    }

    Ok(())
}

#[derive(Tabled)]
struct BillingRow {
    #[tabled(rename = "KEY")]
    key: String,
    #[tabled(rename = "COMPANY")]
    company: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "ORDERS")]
    orders: String,
    #[tabled(rename = "CONTRACTS")]
    contracts: String,
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "yes" } else { "-" };
    text.to_string()
}

fn print_preview(label: &str, csv_text: &str) {
    println!("  {label}:");
    for line in preview_csv(csv_text).lines() {
        println!("    {line}");
    }
}

/// Show the monthly billing summaries
fn cmd_billing(
    ctx: &Context,
    month: u32,
    year: i32,
    download_orders: bool,
    download_contracts: bool,
) -> Result<()> {
    let query = build_billing_query(month, year)?;
    let config = ctx.config()?;
    let client = ctx.client(&config);

    let records: Vec<(String, BillingRecord)> =
        submit("billing", || client.fetch_billing(&query))?;
    if records.is_empty() {
        println!("No bills found for {year}-{month:02}");
        return Ok(());
    }

    let rows: Vec<BillingRow> = records
        .iter()
        .map(|(key, record)| BillingRow {
            key: key.clone(),
            company: record.company_name.clone(),
            total: format!("${:.2}", record.total_cost),
            orders: yes_no(record.has_orders()),
            contracts: yes_no(record.has_contracts()),
        })
        .collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    for (key, record) in &records {
        if !record.has_orders() && !record.has_contracts() {
            continue;
        }
        println!();
        println!("{} ({key})", record.company_name);
        if record.has_orders() {
            print_preview("Orders", &record.orders_csv);
        }
        if record.has_contracts() {
            print_preview("Contracts", &record.contracts_csv);
        }
    }

    let output_dir = ctx.output_dir(&config);
    if download_orders {
        let with_orders: Vec<_> = records.iter().filter(|(_, r)| r.has_orders()).collect();
        let shared = with_orders.len() > 1;
        for (key, record) in with_orders {
            let filename = billing_filename(key, ORDERS_FILE, shared);
            let path = save_download(&output_dir, &filename, &record.orders_csv)?;
            println!("Saved: {}", path.display());
        }
    }
    if download_contracts {
        let with_contracts: Vec<_> = records.iter().filter(|(_, r)| r.has_contracts()).collect();
        let shared = with_contracts.len() > 1;
        for (key, record) in with_contracts {
            let filename = billing_filename(key, CONTRACTS_FILE, shared);
            let path = save_download(&output_dir, &filename, &record.contracts_csv)?;
            println!("Saved: {}", path.display());
        }
    }

    Ok(())
}

/// Print the day picker for a month
fn cmd_days(year: i32, month: u32) -> Result<()> {
    let days = days_in_month(year, month)?;
    let name = month_name(month).ok_or(IftaError::InvalidMonth(month))?;
    let current_year = chrono::Local::now().year();
    if !selectable_years(current_year).contains(&year) {
        log::warn!("{year} is not offered by the year picker");
    }

    println!("{name} {year} ({} days)", days.len());
    for week in days.chunks(7) {
        let line: Vec<String> = week.iter().map(|d| format!("{d:>2}")).collect();
        println!("  {}", line.join(" "));
    }
    Ok(())
}

fn cmd_check_date(input: &str) -> Result<()> {
    let date = parse_date(input)?;
    if is_date_selectable(date) {
        println!("{date} is selectable");
    } else {
        println!("{date} is not selectable");
    }
    Ok(())
}

/// Display a CSV file from disk
fn cmd_view(file: &Path, preview: bool) -> Result<()> {
    let text = fs::read_to_string(file)?;
    if preview {
        println!("{}", preview_csv(&text));
        return Ok(());
    }

    let table = parse_csv(&text)?;
    if table.is_empty() {
        println!("No rows in {}", file.display());
        return Ok(());
    }
    println!("{}", render_table(&table));
    println!();
    println!("{} rows", table.len());
    Ok(())
}

fn cmd_server_config(ctx: &Context) -> Result<()> {
    let config = ctx.config()?;
    let server = ctx.client(&config).fetch_server_config()?;
    println!("Configured base URL: {}", config.api.base_url);
    println!("Server base URL:     {}", server.api_base_url);
    Ok(())
}

fn cmd_companies(ctx: &Context) -> Result<()> {
    let config = ctx.config()?;
    let mut companies = ctx.client(&config).fetch_companies()?;
    if companies.is_empty() {
        println!("No companies found.");
        return Ok(());
    }
    companies.sort();
    for company in &companies {
        println!("{company}");
    }
    println!();
    println!("Total: {} companies", companies.len());
    Ok(())
}
