//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};
use regex::Regex;

use crate::domain::{MemberStatus, Topology};

const PHONE_PATTERN: &str = r"^[0-9()+\- ]{6,20}$";

/// Multi-level sponsor tree: recruit members, record sales, pay the upline
#[derive(Parser, Debug)]
#[command(name = "sponsor-tree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Project directory holding .sponsor-tree.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    /// Member file (overrides config)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub data_file: Option<PathBuf>,

    /// Hierarchy shape: unbounded | binary (overrides config)
    #[arg(long, global = true)]
    pub topology: Option<Topology>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a member under a sponsor (or as root)
    Add {
        /// Display name
        name: String,
        /// Member id (synthesized when omitted)
        #[arg(long)]
        id: Option<String>,
        /// Sponsor id (default: under the root)
        #[arg(short, long)]
        sponsor: Option<String>,
        /// Own commission rate in percent (0-100)
        #[arg(short, long, value_parser = parse_percent)]
        rate: Option<f64>,
        /// Phone number
        #[arg(short, long, value_parser = parse_phone)]
        phone: Option<String>,
    },

    /// Record a sale and pay the seller and the whole upline
    Sale {
        /// Selling member id
        seller: String,
        /// Sale amount (> 0)
        #[arg(value_parser = parse_amount)]
        amount: f64,
        /// Upline weights, root first (normalized); default is the weighting policy
        #[arg(short, long, value_delimiter = ',')]
        weights: Option<Vec<f64>>,
    },

    /// Credit fixed percentages of a sale to the nearest uplines
    Distribute {
        /// Selling member id
        seller: String,
        /// Sale amount (> 0)
        #[arg(value_parser = parse_amount)]
        amount: f64,
        /// Percent of the sale per level, nearest sponsor first (default from config)
        #[arg(short, long, value_delimiter = ',', value_parser = parse_percent)]
        percentages: Option<Vec<f64>>,
    },

    /// Show one member in detail
    Show {
        /// Member id
        id: String,
    },

    /// Show the hierarchy as a tree
    Tree {
        /// Start at this member (default: every top-level member)
        id: Option<String>,
    },

    /// Rank members by downline sales volume
    Rank {
        /// Show only the first N
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// List a member's sponsors, nearest first
    Uplines {
        /// Member id
        id: String,
    },

    /// List everyone below a member
    Downlines {
        /// Member id
        id: String,
    },

    /// List top-level members
    Roots,

    /// List all members with their balances
    Balances {
        /// Level by level instead of registration order
        #[arg(short, long)]
        breadth_first: bool,
    },

    /// Move a member (and its downline) under a new sponsor
    Reparent {
        /// Member to move
        member: String,
        /// New sponsor id
        sponsor: String,
    },

    /// Insert a new member between a member and its sponsor
    #[command(name = "insert-parent")]
    InsertParent {
        /// Member that gets the new sponsor
        child: String,
        /// Name of the new member
        name: String,
    },

    /// Change a member's rate, phone or status
    Update {
        /// Member id
        id: String,
        /// Own commission rate in percent (0-100)
        #[arg(short, long, value_parser = parse_percent)]
        rate: Option<f64>,
        /// Phone number
        #[arg(short, long, value_parser = parse_phone)]
        phone: Option<String>,
        /// ACTIVE | INACTIVE | TERMINATED
        #[arg(short, long)]
        status: Option<MemberStatus>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print a config template
    Template,

    /// Show config paths
    Path,
}

/// Percent in 0-100, returned as a fraction.
pub fn parse_percent(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(format!("{value} is outside 0-100"));
    }
    Ok(value / 100.0)
}

pub fn parse_amount(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("amount must be positive, got {value}"));
    }
    Ok(value)
}

pub fn parse_phone(s: &str) -> Result<String, String> {
    let re = Regex::new(PHONE_PATTERN).map_err(|e| e.to_string())?;
    if re.is_match(s) {
        Ok(s.to_string())
    } else {
        Err(format!(
            "'{s}' is not a phone number (6-20 of digits, spaces, ( ) + -)"
        ))
    }
}
