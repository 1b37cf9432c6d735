//! Aquifer CLI - operator sandbox for the multi-pool lending ledger
//!
//! Plays the role of the external dispatcher: actions are appended to a
//! JSON-lines journal and the in-memory world is rebuilt by replay, so
//! a sandbox session survives across invocations. Position-touching
//! commands run the health check and roll back on failure, exactly as
//! the dispatcher contract requires.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod lending;
mod pools;
mod riskcmd;
mod scenario;
mod status;
mod store;
mod world;

use store::Journal;

#[derive(Parser)]
#[command(name = "aquifer")]
#[command(about = "Aquifer lending ledger sandbox - pools, positions and risk", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the action journal
    #[arg(short, long, default_value = "aquifer.journal")]
    journal: PathBuf,

    /// Verbose output (replay tracing)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a fresh journal
    Init {
        /// Account receiving interest and origination fees
        #[arg(long)]
        fee_recipient: u64,

        /// Global LTV floor (decimal fraction)
        #[arg(long, default_value = "0.1")]
        min_ltv: String,

        /// Global LTV ceiling (decimal fraction)
        #[arg(long, default_value = "0.98")]
        max_ltv: String,

        /// Liquidation discount (decimal fraction)
        #[arg(long, default_value = "0.1")]
        discount: String,
    },

    /// Mint sandbox funds to an account
    Mint {
        #[arg(long)]
        asset: u32,

        #[arg(long)]
        account: u64,

        #[arg(long)]
        amount: String,
    },

    /// Oracle directory operations
    Oracle {
        #[command(subcommand)]
        command: OracleCommands,
    },

    /// Pool lifecycle and owner knobs
    Pool {
        #[command(subcommand)]
        command: PoolCommands,
    },

    /// Per-(pool, asset) LTV operations
    Ltv {
        #[command(subcommand)]
        command: LtvCommands,
    },

    /// Deposit into a pool
    Deposit {
        #[arg(long)]
        account: u64,

        #[arg(long)]
        pool: String,

        #[arg(long)]
        amount: String,

        /// Shares go here; defaults to the depositing account
        #[arg(long)]
        receiver: Option<u64>,

        #[arg(long)]
        now: Option<u64>,
    },

    /// Withdraw from a pool
    Withdraw {
        /// Spending account (owner, operator, or allowance holder)
        #[arg(long)]
        caller: u64,

        #[arg(long)]
        pool: String,

        #[arg(long)]
        amount: String,

        /// Assets go here; defaults to the caller
        #[arg(long)]
        receiver: Option<u64>,

        /// Whose shares are burned; defaults to the caller
        #[arg(long)]
        owner: Option<u64>,

        #[arg(long)]
        now: Option<u64>,
    },

    /// Grant a share-spending allowance
    Approve {
        #[arg(long)]
        owner: u64,

        #[arg(long)]
        pool: String,

        #[arg(long)]
        spender: u64,

        /// Share allowance; "max" for unlimited, 0 to clear
        #[arg(long)]
        shares: String,
    },

    /// Grant or revoke an all-pool operator
    Operator {
        #[arg(long)]
        owner: u64,

        #[arg(long)]
        operator: u64,

        #[arg(long)]
        enabled: bool,
    },

    /// Position operations (collateral, debt, health)
    Position {
        #[command(subcommand)]
        command: PositionCommands,
    },

    /// Liquidate an unhealthy position
    Liquidate {
        #[arg(long)]
        liquidator: u64,

        #[arg(long)]
        position: u64,

        /// Debt legs as pool=amount ("max" repays the full debt)
        #[arg(long = "repay", required = true)]
        repayments: Vec<String>,

        /// Seizure legs as asset=amount
        #[arg(long = "seize", required = true)]
        seizures: Vec<String>,

        #[arg(long)]
        now: Option<u64>,
    },

    /// Point fee flows at a new recipient
    FeeRecipient {
        #[arg(long)]
        recipient: u64,
    },

    /// Report the whole world
    Status {
        #[arg(long)]
        now: Option<u64>,
    },

    /// Run the scripted end-to-end sandbox checks (fresh world, journal
    /// untouched)
    Scenario,
}

#[derive(Subcommand)]
enum OracleCommands {
    /// Register or replace an asset's price feed
    Set {
        #[arg(long)]
        asset: u32,

        /// Unit-of-account price of one whole unit (decimal)
        #[arg(long)]
        price: String,
    },

    /// Show the oracle directory
    Show,
}

#[derive(Subcommand)]
enum PoolCommands {
    /// Create a pool; its id is derived from (owner, asset, rate model)
    Create {
        #[arg(long)]
        owner: u64,

        #[arg(long)]
        asset: u32,

        /// fixed:<rate> or kinked:<base>:<slope1>:<slope2>:<kink>
        #[arg(long)]
        rate_model: String,

        /// Deposit cap in base units; "max" for none
        #[arg(long, default_value = "max")]
        cap: String,

        /// Interest fee (decimal fraction)
        #[arg(long, default_value = "0")]
        interest_fee: String,

        /// Origination fee (decimal fraction)
        #[arg(long, default_value = "0")]
        origination_fee: String,

        #[arg(long)]
        now: Option<u64>,
    },

    /// Accrue interest up to now
    Accrue {
        #[arg(long)]
        pool: String,

        #[arg(long)]
        now: Option<u64>,
    },

    /// Report one pool
    Status {
        #[arg(long)]
        pool: String,

        #[arg(long)]
        now: Option<u64>,
    },

    /// List all pools
    List {
        #[arg(long)]
        now: Option<u64>,
    },

    /// Change the deposit cap
    SetCap {
        #[arg(long)]
        owner: u64,

        #[arg(long)]
        pool: String,

        #[arg(long)]
        cap: String,
    },

    /// Toggle the pause flag
    Pause {
        #[arg(long)]
        owner: u64,

        #[arg(long)]
        pool: String,
    },

    /// Change the interest fee (accrues first)
    SetInterestFee {
        #[arg(long)]
        owner: u64,

        #[arg(long)]
        pool: String,

        #[arg(long)]
        fee: String,

        #[arg(long)]
        now: Option<u64>,
    },

    /// Change the origination fee
    SetOriginationFee {
        #[arg(long)]
        owner: u64,

        #[arg(long)]
        pool: String,

        #[arg(long)]
        fee: String,
    },

    /// Hand the pool to a new owner
    SetOwner {
        #[arg(long)]
        owner: u64,

        #[arg(long)]
        pool: String,

        #[arg(long)]
        new_owner: u64,
    },

    /// Propose a rate model change (timelocked)
    RequestRateModel {
        #[arg(long)]
        owner: u64,

        #[arg(long)]
        pool: String,

        /// fixed:<rate> or kinked:<base>:<slope1>:<slope2>:<kink>
        #[arg(long)]
        rate_model: String,

        #[arg(long)]
        now: Option<u64>,
    },

    /// Apply a matured rate model proposal
    AcceptRateModel {
        #[arg(long)]
        owner: u64,

        #[arg(long)]
        pool: String,

        #[arg(long)]
        now: Option<u64>,
    },

    /// Drop a pending rate model proposal
    RejectRateModel {
        #[arg(long)]
        owner: u64,

        #[arg(long)]
        pool: String,
    },
}

#[derive(Subcommand)]
enum LtvCommands {
    /// Propose an LTV for (pool, asset); first listings apply
    /// immediately, changes wait out the timelock
    Request {
        #[arg(long)]
        owner: u64,

        #[arg(long)]
        pool: String,

        #[arg(long)]
        asset: u32,

        /// Loan-to-value (decimal fraction)
        #[arg(long)]
        ltv: String,

        #[arg(long)]
        now: Option<u64>,
    },

    /// Apply a matured LTV proposal
    Accept {
        #[arg(long)]
        owner: u64,

        #[arg(long)]
        pool: String,

        #[arg(long)]
        asset: u32,

        #[arg(long)]
        now: Option<u64>,
    },

    /// Drop a pending LTV proposal
    Reject {
        #[arg(long)]
        owner: u64,

        #[arg(long)]
        pool: String,

        #[arg(long)]
        asset: u32,
    },

    /// Show the LTV table for a pool
    Show {
        #[arg(long)]
        pool: String,
    },
}

#[derive(Subcommand)]
enum PositionCommands {
    /// Move collateral from an account onto a position
    Supply {
        #[arg(long)]
        account: u64,

        #[arg(long)]
        position: u64,

        #[arg(long)]
        asset: u32,

        #[arg(long)]
        amount: String,
    },

    /// Move assets off a position (health-checked)
    Withdraw {
        #[arg(long)]
        position: u64,

        #[arg(long)]
        asset: u32,

        #[arg(long)]
        amount: String,

        #[arg(long)]
        receiver: u64,

        #[arg(long)]
        now: Option<u64>,
    },

    /// Borrow from a pool into a position (health-checked)
    Borrow {
        #[arg(long)]
        pool: String,

        #[arg(long)]
        position: u64,

        #[arg(long)]
        amount: String,

        #[arg(long)]
        now: Option<u64>,
    },

    /// Repay a position's debt from an account ("max" repays all)
    Repay {
        #[arg(long)]
        account: u64,

        #[arg(long)]
        pool: String,

        #[arg(long)]
        position: u64,

        #[arg(long)]
        amount: String,

        #[arg(long)]
        now: Option<u64>,
    },

    /// Report a position's collateral, debt and health
    Status {
        #[arg(long)]
        position: u64,

        #[arg(long)]
        now: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".bright_red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut journal = Journal::open(&cli.journal)?;

    match cli.command {
        Commands::Init { fee_recipient, min_ltv, max_ltv, discount } => {
            pools::init(&mut journal, fee_recipient, &min_ltv, &max_ltv, &discount)
        }
        Commands::Mint { asset, account, amount } => {
            lending::mint(&mut journal, asset, account, &amount)
        }
        Commands::Oracle { command } => match command {
            OracleCommands::Set { asset, price } => riskcmd::set_oracle(&mut journal, asset, &price),
            OracleCommands::Show => riskcmd::show_oracles(&journal),
        },
        Commands::Pool { command } => match command {
            PoolCommands::Create {
                owner,
                asset,
                rate_model,
                cap,
                interest_fee,
                origination_fee,
                now,
            } => pools::create(
                &mut journal,
                owner,
                asset,
                &rate_model,
                &cap,
                &interest_fee,
                &origination_fee,
                now,
            ),
            PoolCommands::Accrue { pool, now } => pools::accrue(&mut journal, &pool, now),
            PoolCommands::Status { pool, now } => status::pool(&journal, &pool, now),
            PoolCommands::List { now } => status::pools(&journal, now),
            PoolCommands::SetCap { owner, pool, cap } => {
                pools::set_cap(&mut journal, owner, &pool, &cap)
            }
            PoolCommands::Pause { owner, pool } => pools::pause(&mut journal, owner, &pool),
            PoolCommands::SetInterestFee { owner, pool, fee, now } => {
                pools::set_interest_fee(&mut journal, owner, &pool, &fee, now)
            }
            PoolCommands::SetOriginationFee { owner, pool, fee } => {
                pools::set_origination_fee(&mut journal, owner, &pool, &fee)
            }
            PoolCommands::SetOwner { owner, pool, new_owner } => {
                pools::set_owner(&mut journal, owner, &pool, new_owner)
            }
            PoolCommands::RequestRateModel { owner, pool, rate_model, now } => {
                pools::request_rate_model(&mut journal, owner, &pool, &rate_model, now)
            }
            PoolCommands::AcceptRateModel { owner, pool, now } => {
                pools::accept_rate_model(&mut journal, owner, &pool, now)
            }
            PoolCommands::RejectRateModel { owner, pool } => {
                pools::reject_rate_model(&mut journal, owner, &pool)
            }
        },
        Commands::Ltv { command } => match command {
            LtvCommands::Request { owner, pool, asset, ltv, now } => {
                riskcmd::request_ltv(&mut journal, owner, &pool, asset, &ltv, now)
            }
            LtvCommands::Accept { owner, pool, asset, now } => {
                riskcmd::accept_ltv(&mut journal, owner, &pool, asset, now)
            }
            LtvCommands::Reject { owner, pool, asset } => {
                riskcmd::reject_ltv(&mut journal, owner, &pool, asset)
            }
            LtvCommands::Show { pool } => riskcmd::show_ltvs(&journal, &pool),
        },
        Commands::Deposit { account, pool, amount, receiver, now } => {
            lending::deposit(&mut journal, account, &pool, &amount, receiver, now)
        }
        Commands::Withdraw { caller, pool, amount, receiver, owner, now } => {
            lending::withdraw(&mut journal, caller, &pool, &amount, receiver, owner, now)
        }
        Commands::Approve { owner, pool, spender, shares } => {
            lending::approve(&mut journal, owner, &pool, spender, &shares)
        }
        Commands::Operator { owner, operator, enabled } => {
            lending::set_operator(&mut journal, owner, operator, enabled)
        }
        Commands::Position { command } => match command {
            PositionCommands::Supply { account, position, asset, amount } => {
                lending::supply_collateral(&mut journal, account, position, asset, &amount)
            }
            PositionCommands::Withdraw { position, asset, amount, receiver, now } => {
                lending::withdraw_collateral(&mut journal, position, asset, &amount, receiver, now)
            }
            PositionCommands::Borrow { pool, position, amount, now } => {
                lending::borrow(&mut journal, &pool, position, &amount, now)
            }
            PositionCommands::Repay { account, pool, position, amount, now } => {
                lending::repay(&mut journal, account, &pool, position, &amount, now)
            }
            PositionCommands::Status { position, now } => {
                status::position(&journal, position, now)
            }
        },
        Commands::Liquidate { liquidator, position, repayments, seizures, now } => {
            lending::liquidate(&mut journal, liquidator, position, &repayments, &seizures, now)
        }
        Commands::FeeRecipient { recipient } => pools::set_fee_recipient(&mut journal, recipient),
        Commands::Status { now } => status::world(&journal, now),
        Commands::Scenario => scenario::run_all(),
    }
}
