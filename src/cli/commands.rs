use clap::{Parser, Subcommand, ValueEnum};

use crate::target::TargetCategory;

#[derive(Parser)]
#[command(name = "targetdeck")]
#[command(author, version, about = "Collection tasking orchestrator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize targetdeck in the current directory
    Init,

    /// Manage research targets
    Target {
        #[command(subcommand)]
        action: TargetAction,
    },

    /// Run one sweep cycle
    Sweep,

    /// Show package status
    Status {
        /// Package ID (optional, shows all if not specified)
        package_id: Option<String>,
    },

    /// Show a package's full status history
    History {
        /// Package ID
        package_id: String,
    },

    /// Show the latest cycle report
    Report,

    /// Inject a failure into a package (for stuck or misbehaving handoffs)
    Fail {
        /// Package ID
        package_id: String,

        /// Failure reason recorded in the audit trail
        #[arg(long, default_value = "manually failed by operator")]
        reason: String,
    },
}

#[derive(Subcommand)]
pub enum TargetAction {
    /// Add a research target
    Add {
        /// Human-readable target name
        name: String,

        /// Target category
        #[arg(long, value_enum, default_value = "org")]
        category: CategoryArg,

        /// Priority, 1 is highest
        #[arg(long, default_value = "2")]
        priority: u8,
    },

    /// List all targets
    List,

    /// Show one target and its packages
    Show {
        /// Target ID
        target_id: String,
    },

    /// Close a target (stops future package synthesis)
    Close {
        /// Target ID
        target_id: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CategoryArg {
    Person,
    Org,
    Event,
    Location,
    Tech,
    Operation,
}

impl From<CategoryArg> for TargetCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Person => TargetCategory::Person,
            CategoryArg::Org => TargetCategory::Org,
            CategoryArg::Event => TargetCategory::Event,
            CategoryArg::Location => TargetCategory::Location,
            CategoryArg::Tech => TargetCategory::Tech,
            CategoryArg::Operation => TargetCategory::Operation,
        }
    }
}
