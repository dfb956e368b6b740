//! Clap derive structures for the `wiser` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wiser -- command-line client for Feller Wiser hubs
#[derive(Debug, Parser)]
#[command(
    name = "wiser",
    version,
    about = "Control Wiser home-automation hubs from the command line",
    long_about = "Query and switch loads over the hub's REST API and follow\n\
        live state changes over its push channel.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Hub profile to use
    #[arg(long, short = 'p', env = "WISER_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Hub address, host or host:port (overrides profile)
    #[arg(long = "host", short = 'H', env = "WISER_HOST", global = true)]
    pub host: Option<String>,

    /// Hub API key
    #[arg(long, env = "WISER_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "WISER_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "WISER_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover, query and switch loads
    #[command(alias = "l")]
    Loads(LoadsArgs),

    /// List smart buttons
    #[command(alias = "b")]
    Buttons(ButtonsArgs),

    /// Follow live push events until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LOADS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoadsArgs {
    #[command(subcommand)]
    pub command: LoadsCommand,
}

#[derive(Debug, Subcommand)]
pub enum LoadsCommand {
    /// List all loads
    #[command(alias = "ls")]
    List,

    /// Show the current state of a load
    State {
        /// Load ID
        id: u32,
    },

    /// Set the target state of a load
    Set {
        /// Load ID
        id: u32,

        /// Target state as a JSON object, e.g. '{"bri": 10000}'
        state: String,
    },

    /// Emulate a button press on a load
    Ctrl {
        /// Load ID
        id: u32,

        /// Button to press
        #[arg(long, short = 'b')]
        button: CtrlButtonArg,

        /// Press type
        #[arg(long, short = 'e', default_value = "click")]
        event: CtrlEventArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CtrlButtonArg {
    On,
    Off,
    Up,
    Down,
    Toggle,
    Stop,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CtrlEventArg {
    Click,
    Press,
    Release,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  BUTTONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ButtonsArgs {
    #[command(subcommand)]
    pub command: ButtonsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ButtonsCommand {
    /// List all smart buttons
    #[command(alias = "ls")]
    List,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Load or button IDs to follow (default: every discovered device)
    pub ids: Vec<u32>,

    /// Seconds to wait for the push channel to open
    #[arg(long, default_value = "10")]
    pub connect_timeout: u64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or update a profile from --host / --api-key (and --profile)
    Init {
        /// Store the key in the system keyring instead of the config file
        #[arg(long)]
        keyring: bool,
    },

    /// Display the current configuration (secrets redacted)
    Show,

    /// Print the config file location
    Path,

    /// Set a profile value
    Set {
        /// Profile key: host, api_key, api_key_env, timeout, keepalive_secs,
        /// reconnect_on_abnormal_close, reconnect_on_host_not_found
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
