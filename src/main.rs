mod config;
mod engine;
mod error;
mod gateway;
mod metrics;
mod types;
mod views;
mod web;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{load_config, render_default_config, DashboardConfig, DEFAULT_CONFIG_FILE};
use engine::{AuthSession, BotController, CommandOutcome};
use gateway::{AccountGateway, CredentialStore, FileCredentials, HttpGateway};
use metrics::{
    format_currency, format_currency_whole, format_percent, format_quantity, format_timestamp,
    SortDirection, SortField, TradeFilter, TradeQuery,
};
use types::{AnalysisReport, BacktestReport, BotStatus, RegisterRequest, SystemStatus, TradingMode};
use views::{HoldingsSource, PortfolioSource, TradesSource, ViewSource};
use web::{start_dashboard_server, AppState};

#[derive(Parser)]
#[command(name = "bot-dashboard")]
#[command(author = "Trading Bot")]
#[command(version = "0.1.0")]
#[command(about = "Monitor and control a remote automated trading agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to dashboard.toml when present)
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token
    Login {
        username: String,
        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Register {
        username: String,
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },
    /// Sign out and discard the session token
    Logout,
    /// Show the signed-in user
    Profile,
    /// Show the bot's lifecycle status and the gateway's price API connectivity
    Status,
    /// Show the account's cash balance
    Balance,
    /// Allow the bot to trade
    Activate {
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Suspend trading without stopping the bot
    Hold {
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Stop the bot completely
    Stop {
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Reinitialise the account balance
    Reset {
        /// Defaults to the configured reset balance
        #[arg(short, long)]
        initial_balance: Option<Decimal>,
    },
    /// Run one analysis pass over the given symbols
    Run {
        /// Comma separated symbols, e.g. bitcoin,ethereum
        #[arg(short, long, value_delimiter = ',')]
        symbols: Option<Vec<String>>,
        /// TRADING or TRAINING
        #[arg(short, long)]
        mode: Option<TradingMode>,
    },
    /// Backtest one symbol on the gateway
    Backtest {
        symbol: String,
        #[arg(short, long)]
        days: Option<u32>,
        #[arg(short, long)]
        initial_balance: Option<Decimal>,
    },
    /// Train on historical data
    Train {
        #[arg(short, long, value_delimiter = ',')]
        symbols: Option<Vec<String>>,
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Show portfolio performance and summary cards
    Portfolio,
    /// Show holdings with recomputed values
    Holdings {
        /// Quantities only, skipping the gateway's live price lookups
        #[arg(long)]
        basic: bool,
    },
    /// Show trade history
    Trades {
        /// all, buy, sell, profit or loss
        #[arg(short, long, default_value = "all")]
        filter: TradeFilter,
        /// date, action, quantity, price or profit-loss
        #[arg(short, long, default_value = "date")]
        sort: SortField,
        /// asc or desc
        #[arg(short, long, default_value = "desc")]
        direction: SortDirection,
    },
    /// Run the local dashboard server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Write the default configuration as TOML
    InitConfig {
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG overrides --verbose when set
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);
    match EnvFilter::try_from_default_env() {
        Ok(filter) => tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish())?,
        Err(_) => tracing::subscriber::set_global_default(builder.with_max_level(log_level).finish())?,
    }

    if let Commands::InitConfig { output } = &cli.command {
        std::fs::write(output, render_default_config()?)?;
        info!("Default configuration written to {}", output);
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    let credentials: Arc<dyn CredentialStore> = Arc::new(FileCredentials::open(config.gateway.token_path()));
    let gateway: Arc<dyn AccountGateway> = Arc::new(HttpGateway::new(&config.gateway, credentials.clone())?);
    let defaults = config.defaults.clone();

    match cli.command {
        Commands::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password()?,
            };
            let session = AuthSession::new(gateway, credentials);
            let user = session.login(&username, &password).await?;
            println!("Signed in as {}", user.display_name());
        }
        Commands::Register { username, email, password, confirm_password, first_name, last_name } => {
            let request = RegisterRequest {
                username,
                email,
                password,
                confirm_password,
                first_name,
                last_name,
            };
            let session = AuthSession::new(gateway, credentials);
            let user = session.register(request).await?;
            println!("Registered and signed in as {}", user.display_name());
        }
        Commands::Logout => {
            AuthSession::new(gateway, credentials).logout().await;
            println!("Signed out");
        }
        Commands::Profile => {
            let session = AuthSession::new(gateway, credentials);
            if !session.is_authenticated() {
                return Err(anyhow!("not signed in; run `login` first"));
            }
            let user = session.profile().await?;
            println!("\n=== Profile ===");
            println!("Username: {}", user.username);
            println!("Email:    {}", user.email);
            println!("Name:     {}", user.display_name());
            println!("Balance:  {}", format_currency(Some(user.balance)));
        }
        Commands::Status => {
            let controller = BotController::new(gateway.clone());
            let status = controller.refresh_status().await?;
            print_status(&status);
            match gateway.system_status().await {
                Ok(system) => print_system(&system),
                Err(e) => println!("\nPrice API:   unknown ({})", e),
            }
        }
        Commands::Balance => {
            let balance = gateway.balance().await?;
            if let Some(err) = balance.error {
                return Err(anyhow!("balance unavailable: {}", err));
            }
            println!("Cash balance: {}", format_currency(Some(balance.balance)));
        }
        Commands::Activate { reason } => {
            let outcome = BotController::new(gateway).activate(reason).await;
            report(outcome, print_status)?;
        }
        Commands::Hold { reason } => {
            let outcome = BotController::new(gateway).hold(reason).await;
            report(outcome, print_status)?;
        }
        Commands::Stop { reason } => {
            let outcome = BotController::new(gateway).stop(reason).await;
            report(outcome, print_status)?;
        }
        Commands::Reset { initial_balance } => {
            let balance = initial_balance.unwrap_or(defaults.reset_balance);
            let outcome = BotController::new(gateway).reset(balance).await;
            report(outcome, print_status)?;
        }
        Commands::Run { symbols, mode } => {
            let symbols = symbols.unwrap_or(defaults.symbols);
            let mode = mode.unwrap_or(defaults.mode);
            let outcome = BotController::new(gateway).run_bot(symbols, mode).await;
            report(outcome, print_analysis)?;
        }
        Commands::Backtest { symbol, days, initial_balance } => {
            let outcome = BotController::new(gateway)
                .run_backtest(
                    symbol,
                    days.unwrap_or(defaults.days),
                    initial_balance.unwrap_or(defaults.reset_balance),
                )
                .await;
            report(outcome, print_backtest)?;
        }
        Commands::Train { symbols, days } => {
            let symbols = symbols.unwrap_or(defaults.training_symbols);
            let outcome = BotController::new(gateway)
                .run_historical_training(symbols, days.unwrap_or(defaults.days))
                .await;
            report(outcome, print_analysis)?;
        }
        Commands::Portfolio => show_portfolio(gateway).await?,
        Commands::Holdings { basic: false } => show_holdings(gateway).await?,
        Commands::Holdings { basic: true } => show_basic_holdings(gateway).await?,
        Commands::Trades { filter, sort, direction } => {
            show_trades(gateway, TradeQuery { filter, sort, direction }).await?;
        }
        Commands::Serve { port } => serve(gateway, &config, port).await?,
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}

fn prompt_password() -> Result<String> {
    print!("Password: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

/// Prints a command's report, or its failure and a non-zero exit.
fn report<T>(outcome: CommandOutcome<T>, render: impl Fn(&T)) -> Result<()> {
    match outcome {
        CommandOutcome::Succeeded { result, .. } => {
            render(&result);
            Ok(())
        }
        CommandOutcome::Failed { command, error } => {
            error!("{} failed: {}", command, error);
            Err(anyhow!("{} failed: {}", command, error))
        }
    }
}

fn print_status(status: &BotStatus) {
    println!("\n=== Bot Status ===");
    println!("State:       {}", status.state);
    println!("Trading:     {}", if status.state.is_trading() { "yes" } else { "no" });
    println!("Changed at:  {}", format_timestamp(status.changed_at()));
    println!("Reason:      {}", status.reason());
    if !status.message.is_empty() {
        println!("Message:     {}", status.message);
    }
}

fn print_system(system: &SystemStatus) {
    println!("\n=== Gateway ===");
    println!("Price API:   {}", system.connection_label());
    println!("API key:     {}", system.key_label());
    if let Some(message) = &system.last_test_message {
        println!("Last test:   {}", message);
    }
}

fn print_analysis(report: &AnalysisReport) {
    println!("\n=== Analysis Report ===");
    println!("{}", report.summary);
    if !report.success {
        println!("(gateway reported failure)");
    }
    println!(
        "\n{:<12} {:>14} {:>14} {:>14} {:<6} {}",
        "Symbol", "Price", "Short SMA", "Long SMA", "Signal", "Status"
    );
    println!("{}", "-".repeat(80));
    for analysis in &report.analyses {
        println!(
            "{:<12} {:>14} {:>14} {:>14} {:<6} {}",
            analysis.symbol.to_uppercase(),
            format_currency(analysis.current_price),
            format_currency(analysis.short_term_sma),
            format_currency(analysis.long_term_sma),
            analysis.signal,
            analysis.status
        );
        if let Some(trade) = &analysis.trade_result {
            println!(
                "    -> {} {} @ {} = {} ({})",
                trade.action,
                format_quantity(trade.quantity),
                format_currency(trade.price),
                format_currency(trade.total_value),
                trade.message
            );
        }
    }
    println!("\nExecuted trades: {}", report.executed_trades().count());
}

fn print_backtest(report: &BacktestReport) {
    println!("\n=== Backtest: {} ===", report.symbol.to_uppercase());
    println!("{}", report.summary);
    println!("Initial Balance: {}", format_currency(Some(report.initial_balance)));
    println!("Final Balance:   {}", format_currency(Some(report.final_balance)));
    println!(
        "Total Return:    {} ({})",
        format_currency(Some(report.total_return)),
        format_percent(report.total_return_percentage)
    );
    println!(
        "Trades:          {} ({} successful, {:.1}% win rate)",
        report.total_trades,
        report.successful_trades,
        report.win_rate()
    );
}

async fn show_portfolio(gateway: Arc<dyn AccountGateway>) -> Result<()> {
    let view = PortfolioSource::new(gateway).load().await?;
    let summary = &view.summary;

    println!("\n=== Portfolio ===");
    println!("Current Value: {}", format_currency_whole(Some(summary.current_value)));
    println!(
        "Period Change: {} ({})",
        format_currency(Some(summary.period_change.absolute)),
        format_percent(summary.period_change.percent)
    );
    println!(
        "Total Return:  {} ({})",
        format_currency(Some(summary.total_return.absolute)),
        format_percent(summary.total_return.percent)
    );
    println!(
        "Trades:        {} ({} winning, {} losing, realized {})",
        view.trade_stats.total,
        view.trade_stats.winning,
        view.trade_stats.losing,
        format_currency(Some(view.trade_stats.realized_pnl))
    );

    println!("\n{:<12} {:>16} {:>16} {:>16}", "Date", "Total", "Cash", "Holdings");
    println!("{}", "-".repeat(63));
    for point in &view.series {
        println!(
            "{:<12} {:>16} {:>16} {:>16}",
            point.date,
            format_currency(Some(point.total_value)),
            format_currency(Some(point.cash_value)),
            format_currency(Some(point.holdings_value))
        );
    }
    Ok(())
}

async fn show_holdings(gateway: Arc<dyn AccountGateway>) -> Result<()> {
    let view = HoldingsSource::new(gateway).load().await?;

    println!("\n=== Holdings ===");
    println!("Cash:     {}", format_currency(Some(view.summary.cash_balance)));
    println!("Holdings: {}", format_currency(Some(view.summary.holdings_value)));
    println!("Total:    {}", format_currency(Some(view.summary.total_portfolio_value)));
    println!("Count:    {}", view.summary.holdings_count);

    if view.rows.is_empty() {
        println!("\nNo holdings");
        return Ok(());
    }
    println!(
        "\n{:<12} {:>16} {:>14} {:>16} {:<20}",
        "Symbol", "Quantity", "Price", "Value", "Acquired"
    );
    println!("{}", "-".repeat(82));
    for row in &view.rows {
        println!(
            "{:<12} {:>16} {:>14} {:>16} {:<20}",
            row.display_symbol(),
            format_quantity(Some(row.quantity)),
            format_currency(Some(row.current_price)),
            format_currency(Some(row.current_value)),
            format_timestamp(row.acquired_at)
        );
    }
    Ok(())
}

async fn show_basic_holdings(gateway: Arc<dyn AccountGateway>) -> Result<()> {
    let holdings = gateway.holdings().await?;

    println!("\n=== Holdings ({}) ===", holdings.len());
    if holdings.is_empty() {
        println!("No holdings");
        return Ok(());
    }
    println!("{:<12} {:>16} {:<20}", "Symbol", "Quantity", "Acquired");
    println!("{}", "-".repeat(50));
    for holding in &holdings {
        println!(
            "{:<12} {:>16} {:<20}",
            holding.symbol.to_uppercase(),
            format_quantity(Some(holding.quantity)),
            format_timestamp(holding.acquired_at)
        );
    }
    Ok(())
}

async fn show_trades(gateway: Arc<dyn AccountGateway>, query: TradeQuery) -> Result<()> {
    let view = TradesSource::new(gateway).load().await?;
    let trades = view.query(&query);

    println!("\n=== Trades ({}) ===", query);
    println!(
        "{} total, {} buys, {} sells, realized {}",
        view.stats.total,
        view.stats.buys,
        view.stats.sells,
        format_currency(Some(view.stats.realized_pnl))
    );
    println!(
        "\n{:<20} {:<5} {:<10} {:>14} {:>14} {:>14} {:>12}",
        "Time", "Side", "Symbol", "Quantity", "Price", "Total", "P&L"
    );
    println!("{}", "-".repeat(95));
    for trade in &trades {
        println!(
            "{:<20} {:<5} {:<10} {:>14} {:>14} {:>14} {:>12}",
            format_timestamp(Some(trade.timestamp)),
            trade.action,
            trade.display_symbol(),
            format_quantity(Some(trade.quantity)),
            format_currency(Some(trade.price)),
            format_currency(Some(trade.total_value())),
            format_currency(trade.profit_loss)
        );
    }
    Ok(())
}

async fn serve(gateway: Arc<dyn AccountGateway>, config: &DashboardConfig, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.server.port);
    info!("Gateway: {}", config.gateway.base_url);

    let state = AppState::new(gateway, config);
    info!("{} views registered for refresh fan-out", state.coordinator.view_count());

    tokio::select! {
        result = start_dashboard_server(state, port) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down dashboard"),
    }
    Ok(())
}
