//! memory-install: register the memory hooks with the host CLI.

use anyhow::Result;
use clap::Parser;
use hook_install::{BinaryLocation, InstallOptions, InstallReport, run_install};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "memory-install", version, about = "Install the workspace memory hooks")]
struct Cli {
    /// Also register the PostToolUse tool-tracking hook
    #[arg(long)]
    enable_tool_tracking: bool,

    /// Invoke hook binaries by name from PATH
    #[arg(long, conflicts_with = "bin_dir")]
    use_path: bool,

    /// Host settings file [default: ~/.augment/settings.json]
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Directory for wrapper scripts [default: ~/.augment/memory-hooks]
    #[arg(long, value_name = "DIR")]
    hooks_dir: Option<PathBuf>,

    /// Directory containing the hook binaries [default: this installer's directory]
    #[arg(long, value_name = "DIR")]
    bin_dir: Option<PathBuf>,

    /// Show what would change without writing anything
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    hook_common::logging::init("memory-install");
    let cli = Cli::parse();

    let (settings_path, hooks_dir) = match (cli.settings, cli.hooks_dir) {
        (Some(settings), Some(hooks)) => (settings, hooks),
        (settings, hooks) => {
            let (default_settings, default_hooks) = InstallOptions::default_paths()?;
            (settings.unwrap_or(default_settings), hooks.unwrap_or(default_hooks))
        }
    };

    let binaries = if cli.use_path {
        BinaryLocation::OnPath
    } else {
        match cli.bin_dir {
            Some(dir) => BinaryLocation::Dir(dir),
            None => BinaryLocation::Dir(InstallOptions::own_bin_dir()?),
        }
    };

    let options = InstallOptions {
        settings_path,
        hooks_dir,
        binaries,
        tool_tracking: cli.enable_tool_tracking,
        dry_run: cli.dry_run,
    };

    let report = run_install(&options)?;
    print_report(&options, &report);
    Ok(())
}

fn print_report(options: &InstallOptions, report: &InstallReport) {
    let verb = if report.dry_run { "Would write" } else { "Wrote" };
    for written in &report.scripts {
        if written.changed {
            println!("{verb} {}", written.path.display());
        } else {
            println!("Unchanged {}", written.path.display());
        }
    }

    if !report.settings_changed {
        println!("Settings already up to date: {}", options.settings_path.display());
    } else if report.dry_run {
        println!("Would update {}", options.settings_path.display());
    } else {
        println!("Updated {}", options.settings_path.display());
    }

    for hook in &report.hooks {
        println!("  {} -> {} ({} ms)", hook.event, hook.command, hook.timeout_ms);
    }

    println!();
    println!("Configure the hooks with environment variables, for example:");
    println!("  AGENT_MEMORY_SERVER_URL=http://localhost:8000");
    println!("  AGENT_MEMORY_NAMESPACE=augment");
    println!("  AGENT_MEMORY_USER_ID=<you>");
    if !options.tool_tracking {
        println!("Tool tracking is off. To record tool use, rerun with --enable-tool-tracking");
        println!("and set AGENT_MEMORY_TRACK_TOOL_USAGE=true.");
    }
}
