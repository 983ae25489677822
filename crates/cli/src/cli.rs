use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use fi::SurfaceMode;

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "fi")]
#[command(about = "Financial assistant client - sessions, account linking, and chat")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format
	#[arg(short = 'f', long, global = true, value_enum, default_value_t = OutputFormat::Toon)]
	pub format: OutputFormat,

	/// Config file (defaults to <config dir>/fi/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Backend base URL
	#[arg(long, global = true, value_name = "URL")]
	pub api_url: Option<String>,

	/// Where the session id is persisted
	#[arg(long, global = true, value_name = "FILE")]
	pub session_file: Option<PathBuf>,

	/// Keep the session in memory only
	#[arg(long, global = true)]
	pub no_save: bool,

	/// How to present the account-linking page
	#[arg(long, global = true, value_enum)]
	pub surface: Option<SurfaceArg>,

	/// Interval between authentication status checks
	#[arg(long, global = true, value_name = "MS")]
	pub poll_interval_ms: Option<u64>,

	/// Give up waiting for authentication after this long
	#[arg(long, global = true, value_name = "SECS")]
	pub auth_timeout_secs: Option<u64>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Session management
	Session {
		#[command(subcommand)]
		action: SessionAction,
	},

	/// Link the session to your financial accounts
	Auth {
		#[command(subcommand)]
		action: AuthAction,
	},

	/// Ask the assistant a question
	Chat {
		message: String,
		/// Return the link instead of waiting when authentication is needed
		#[arg(long)]
		no_wait: bool,
	},

	/// Show the aggregated financial dashboard
	#[command(alias = "dash")]
	Dashboard {
		#[arg(long)]
		no_wait: bool,
	},

	/// Load all financial data sources for the session
	Prefetch {
		#[arg(long)]
		no_wait: bool,
	},

	/// Show recent chat turns of the current session
	History {
		#[arg(short = 'n', long, default_value_t = 20)]
		limit: usize,
	},

	/// Check that the backend is reachable
	Health,
}

#[derive(Subcommand, Debug)]
pub enum SessionAction {
	/// Show the current session, creating one if needed
	Status,
	/// Discard the current session and start a new one
	New,
	/// Discard the current session
	Clear,
}

#[derive(Subcommand, Debug)]
pub enum AuthAction {
	/// Open the account-linking page and wait for completion
	Login {
		#[arg(long)]
		no_wait: bool,
	},
	/// Report whether the session is linked
	Status,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SurfaceArg {
	/// System browser unless headless, otherwise print
	Auto,
	/// System default browser
	Browser,
	/// Dedicated Chromium window, closed on success
	Window,
	/// Print the link to stderr
	Print,
}

impl From<SurfaceArg> for SurfaceMode {
	fn from(arg: SurfaceArg) -> Self {
		match arg {
			SurfaceArg::Auto => SurfaceMode::Auto,
			SurfaceArg::Browser => SurfaceMode::Browser,
			SurfaceArg::Window => SurfaceMode::Window,
			SurfaceArg::Print => SurfaceMode::Print,
		}
	}
}
