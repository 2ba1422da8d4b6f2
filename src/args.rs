//! These structs provide the CLI interface for the spend CLI.
//!
//! The argument structs for commands that are also MCP tools derive `Deserialize` and
//! `JsonSchema` so that the same type serves as the tool's parameters.

use crate::commands::OutputFormat;
use crate::model::{Amount, Month};
use crate::utils::{parse_amount, parse_date, parse_month};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing::level_filters::LevelFilter;

/// spend: track categorized spending against monthly limits.
///
/// Every spending entry belongs to a category and a day. Entries are grouped by month, and each
/// month is compared with its limit: either the default limit from the config file or a limit
/// set for that month. In adaptive mode, spending over a month's limit is subtracted from the
/// following month's limit. Otherwise you are asked to raise the month's limit.
///
/// There is also a mode in which an AI agent can use this program through the mcp subcommand.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, the config file and an empty database.
    ///
    /// This is the first command you should run. By default the data directory is $HOME/spend,
    /// pass --spend-home to put it somewhere else.
    Init(InitArgs),
    /// Add a spending entry and check its month against the month's limit.
    Add(AddSpendingArgs),
    /// List the spending entries of a month.
    List(ListSpendingArgs),
    /// Show spending and limits for every month that has spending.
    Report,
    /// Show a day by category grid of a single month.
    Month(MonthArgs),
    /// Show the current month's spending and limit.
    Status,
    /// Add or list categories.
    Category(CategoryArgs),
    /// Set the limit of one month or a range of months.
    Limit(LimitArgs),
    /// Show or change the default limit and adaptive mode.
    Settings(SettingsArgs),
    /// Delete all categories, spending and limits. A backup of the database is taken first.
    Reset,
    /// Run an MCP server over stdio for AI agents.
    Mcp,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where spend data and configuration is held. Defaults to ~/spend
    #[arg(long, env = "SPEND_HOME", default_value_t = default_spend_home())]
    spend_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, spend_home: PathBuf) -> Self {
        Self {
            log_level,
            spend_home: spend_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn spend_home(&self) -> &DisplayPath {
        &self.spend_home
    }
}

/// Args for the `spend init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The limit of every month that has no limit of its own. Defaults to 1000.00
    #[arg(long, value_parser = parse_amount)]
    pub default_limit: Option<Amount>,

    /// Carry spending over a month's limit into the following month's limit.
    #[arg(long)]
    pub adaptive: bool,
}

/// Args for the `spend add` command and the `add_spending` tool.
#[derive(Debug, Clone, Parser, Serialize, Deserialize, JsonSchema)]
pub struct AddSpendingArgs {
    /// The name of an existing category.
    #[arg(long)]
    pub category: String,

    /// The amount spent, e.g. 12.50. Must not be negative. Rounded to cents.
    #[arg(long, value_parser = parse_amount)]
    #[schemars(with = "String")]
    pub amount: Amount,

    /// The day of the spending as YYYY-MM-DD. Defaults to today.
    #[arg(long, value_parser = parse_date)]
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub date: Option<NaiveDate>,
}

/// Args for the `spend list` command and the `list_spending` tool.
#[derive(Debug, Clone, Parser, Serialize, Deserialize, JsonSchema)]
pub struct ListSpendingArgs {
    /// The month as YYYY.M or YYYY-MM. Defaults to the current month.
    #[arg(long, value_parser = parse_month)]
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub month: Option<Month>,

    /// How to print the entries.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    #[serde(default)]
    pub format: OutputFormat,
}

/// Args for the `spend month` command and the `month_detail` tool.
#[derive(Debug, Clone, Parser, Serialize, Deserialize, JsonSchema)]
pub struct MonthArgs {
    /// The month as YYYY.M or YYYY-MM, e.g. 2024.5
    #[arg(value_parser = parse_month)]
    #[schemars(with = "String")]
    pub month: Month,
}

/// Args for the `spend category` command.
#[derive(Debug, Clone, Parser)]
pub struct CategoryArgs {
    #[command(subcommand)]
    command: CategorySubcommand,
}

impl CategoryArgs {
    pub fn command(&self) -> &CategorySubcommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategorySubcommand {
    /// Add a new category.
    Add(AddCategoryArgs),
    /// List all categories by name.
    List,
}

/// Args for the `spend category add` command and the `add_category` tool.
#[derive(Debug, Clone, Parser, Serialize, Deserialize, JsonSchema)]
pub struct AddCategoryArgs {
    /// The category name. Surrounding whitespace is removed. Names are unique.
    pub name: String,
}

/// Args for the `spend limit` command.
#[derive(Debug, Clone, Parser)]
pub struct LimitArgs {
    #[command(subcommand)]
    command: LimitSubcommand,
}

impl LimitArgs {
    pub fn command(&self) -> &LimitSubcommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum LimitSubcommand {
    /// Set the limit of one month. The limit must cover what the month has already spent.
    Set(SetLimitArgs),
    /// Set the same limit for every month from --from through --to.
    Range(LimitRangeArgs),
}

/// Args for the `spend limit set` command and the `update_month_limit` tool.
#[derive(Debug, Clone, Parser, Serialize, Deserialize, JsonSchema)]
pub struct SetLimitArgs {
    /// The month as YYYY.M or YYYY-MM.
    #[arg(value_parser = parse_month)]
    #[schemars(with = "String")]
    pub month: Month,

    /// The new limit. Rounded to cents.
    #[arg(value_parser = parse_amount, allow_hyphen_values = true)]
    #[schemars(with = "String")]
    pub limit: Amount,
}

/// Args for the `spend limit range` command and the `set_limit_range` tool.
#[derive(Debug, Clone, Parser, Serialize, Deserialize, JsonSchema)]
pub struct LimitRangeArgs {
    /// The first month as YYYY.M or YYYY-MM.
    #[arg(long, value_parser = parse_month)]
    #[schemars(with = "String")]
    pub from: Month,

    /// The last month, inclusive. Must be after --from. When omitted only --from is set.
    #[arg(long, value_parser = parse_month)]
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub to: Option<Month>,

    /// The limit for every month in the range. Rounded to cents.
    #[arg(long, value_parser = parse_amount, allow_hyphen_values = true)]
    #[schemars(with = "String")]
    pub limit: Amount,
}

/// Args for the `spend settings` command.
#[derive(Debug, Clone, Parser)]
pub struct SettingsArgs {
    #[command(subcommand)]
    command: SettingsSubcommand,
}

impl SettingsArgs {
    pub fn command(&self) -> &SettingsSubcommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsSubcommand {
    /// Print the default limit and whether adaptive mode is on.
    Show,
    /// Change the default limit, adaptive mode or both.
    Update(UpdateSettingsArgs),
}

/// Args for the `spend settings update` command and the `update_settings` tool. Settings that are
/// not given keep their current value.
#[derive(Debug, Clone, Default, Parser, Serialize, Deserialize, JsonSchema)]
pub struct UpdateSettingsArgs {
    /// The new default monthly limit. Rounded to cents.
    #[arg(long, value_parser = parse_amount, allow_hyphen_values = true)]
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub default_limit: Option<Amount>,

    /// Turn adaptive mode on (true) or off (false).
    #[arg(long)]
    #[serde(default)]
    pub adaptive: Option<bool>,
}

fn default_spend_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("spend"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --spend-home or SPEND_HOME instead of relying on the default \
                spend home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("spend")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
