use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn, Level};

use gitflow_release::boundary::GateWarning;
use gitflow_release::changelog::{ChangelogGateway, KeepAChangelog};
use gitflow_release::ci::CiContext;
use gitflow_release::config::{self, Config};
use gitflow_release::domain::ReleaseVersion;
use gitflow_release::error::EXIT_FAILED;
use gitflow_release::git::{RepositoryHandle, RepositoryMetadata};
use gitflow_release::publish::{self, PublishOutcome, PublishRequest};
use gitflow_release::runner::SystemRunner;
use gitflow_release::workflow::{ReleaseSettings, ReleaseWorkflow};
use gitflow_release::{logging, ui, version, ReleaseError};

#[derive(Parser)]
#[command(
    name = "gitflow-release",
    version,
    about = "GitFlow release automation: package versions, changelog and release/hotfix finishing"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Log debug output to stderr")]
    verbose: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

/// Command-line values that take precedence over the configuration file
#[derive(clap::Args)]
struct Overrides {
    #[arg(long, global = true, help = "Release base version (X.Y.Z)")]
    release_version: Option<String>,

    #[arg(long, global = true)]
    master_branch: Option<String>,

    #[arg(long, global = true)]
    develop_branch: Option<String>,

    #[arg(long, global = true)]
    release_prefix: Option<String>,

    #[arg(long, global = true)]
    hotfix_prefix: Option<String>,

    #[arg(long, global = true, help = "Changelog file path")]
    changelog: Option<PathBuf>,

    #[arg(long, global = true, help = "Remote to push releases to")]
    remote: Option<String>,

    #[arg(
        long,
        global = true,
        help = "Build configuration (default: Release on CI, Debug locally)"
    )]
    configuration: Option<String>,
}

impl Overrides {
    fn apply(&self, config: &mut Config) {
        if let Some(version) = &self.release_version {
            config.release.version = Some(version.clone());
        }
        if let Some(master) = &self.master_branch {
            config.branches.master = master.clone();
        }
        if let Some(develop) = &self.develop_branch {
            config.branches.develop = develop.clone();
        }
        if let Some(prefix) = &self.release_prefix {
            config.branches.release_prefix = prefix.clone();
        }
        if let Some(prefix) = &self.hotfix_prefix {
            config.branches.hotfix_prefix = prefix.clone();
        }
        if let Some(changelog) = &self.changelog {
            config.release.changelog = changelog.clone();
        }
        if let Some(remote) = &self.remote {
            config.release.remote = remote.clone();
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved versions and pending release notes
    PrintVersion,

    /// Finalize and commit the changelog on a release or hotfix branch
    Changelog {
        #[arg(long, help = "Preview what would happen without making changes")]
        dry_run: bool,
    },

    /// Start a release branch, or finish the current release/hotfix branch
    Release {
        #[arg(long, help = "The changelog was already finalized and committed")]
        skip_changelog: bool,

        #[arg(long, help = "Preview what would happen without making changes")]
        dry_run: bool,
    },

    /// Push packages from the output directory
    Publish {
        #[arg(long, env = "NUGET_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Reinstall the tool package globally from the output directory
    Install,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::WARN };
    logging::init_tracing(level);

    if let Err(e) = run(args) {
        ui::display_error(&format!("{:#}", e));
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<ReleaseError>()
        .map(ReleaseError::exit_code)
        .unwrap_or(EXIT_FAILED)
}

fn run(args: Args) -> Result<()> {
    let mut config =
        config::load_config(args.config.as_deref()).context("Failed to load configuration")?;
    args.overrides.apply(&mut config);
    config.validate()?;

    let release_version = config.release_version()?;
    let changelog_path = config.changelog_path()?.to_path_buf();
    let ci = CiContext::from_env();
    let repo = RepositoryHandle::new(SystemRunner::new("."), config.branches.conventions());

    match args.command {
        Command::PrintVersion => print_version(&repo, &release_version, &ci, &changelog_path),
        Command::Changelog { dry_run } => {
            let settings = release_settings(&config, release_version, changelog_path, dry_run);
            run_changelog(&repo, settings)
        }
        Command::Release {
            skip_changelog,
            dry_run,
        } => {
            let settings = release_settings(&config, release_version, changelog_path, dry_run);
            run_release(&repo, settings, skip_changelog)
        }
        Command::Publish { api_key } => {
            let configuration = args
                .overrides
                .configuration
                .unwrap_or_else(|| default_configuration(&ci, &config));
            run_publish(&repo, &config, configuration, api_key)
        }
        Command::Install => run_install(&repo, &config, &release_version, &ci),
    }
}

fn default_configuration(ci: &CiContext, config: &Config) -> String {
    if ci.is_ci() {
        config.publish.release_configuration.clone()
    } else {
        "Debug".to_string()
    }
}

fn release_settings(
    config: &Config,
    version: ReleaseVersion,
    changelog: PathBuf,
    dry_run: bool,
) -> ReleaseSettings {
    // Compare links are a nicety; a repo without a usable remote still releases.
    let repository = RepositoryMetadata::discover(".", &config.release.remote).unwrap_or_else(|e| {
        debug!(error = %e, "repository metadata unavailable");
        None
    });

    ReleaseSettings {
        version,
        changelog,
        remote: config.release.remote.clone(),
        repository,
        dry_run,
    }
}

fn print_version(
    repo: &RepositoryHandle<SystemRunner>,
    release_version: &ReleaseVersion,
    ci: &CiContext,
    changelog_path: &Path,
) -> Result<()> {
    let info = version::resolve_current(release_version, ci, repo)?;

    let notes = KeepAChangelog::today()
        .release_notes(changelog_path)
        .unwrap_or_else(|e| {
            warn!(error = %e, "no release notes");
            Vec::new()
        });

    ui::display_version_info(&info, &notes);
    Ok(())
}

fn run_changelog(repo: &RepositoryHandle<SystemRunner>, settings: ReleaseSettings) -> Result<()> {
    let changelog = KeepAChangelog::today();
    let dry_run = settings.dry_run;
    let version = settings.version;
    let mut workflow = ReleaseWorkflow::new(repo, &changelog, settings);

    workflow.run_changelog()?;

    if dry_run {
        ui::display_planned(workflow.planned());
    } else {
        ui::display_success(&format!("Changelog finalized for {}", version));
    }
    ui::display_status(&ui::format_trace(workflow.trace()));
    Ok(())
}

fn run_release(
    repo: &RepositoryHandle<SystemRunner>,
    settings: ReleaseSettings,
    skip_changelog: bool,
) -> Result<()> {
    let changelog = KeepAChangelog::today();
    let dry_run = settings.dry_run;
    let remote = settings.remote.clone();
    let tag = settings.version.to_string();
    let mut workflow = ReleaseWorkflow::new(repo, &changelog, settings);

    match workflow.run_release(skip_changelog) {
        Ok(outcome) => {
            if dry_run {
                ui::display_planned(workflow.planned());
            } else {
                ui::display_success(&ui::format_outcome(&outcome));
            }
            ui::display_status(&ui::format_trace(workflow.trace()));
            Ok(())
        }
        Err(e) if e.is_recoverable() => {
            let conventions = repo.conventions();
            let refs = vec![conventions.master.clone(), conventions.develop.clone(), tag];
            ui::display_boundary_warning(&GateWarning::PushPending {
                remote: remote.clone(),
                refs: refs.clone(),
            });
            ui::display_manual_push_instruction(&remote, &refs);
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn run_publish(
    repo: &RepositoryHandle<SystemRunner>,
    config: &Config,
    configuration: String,
    api_key: Option<String>,
) -> Result<()> {
    let request = PublishRequest {
        configuration,
        release_configuration: config.publish.release_configuration.clone(),
        output_dir: config.publish.output_dir.clone(),
        package_extension: config.publish.package_extension.clone(),
        source: config.publish.source.clone(),
        api_key,
        tool: config.publish.tool.clone(),
    };

    match publish::publish(repo, &request)? {
        PublishOutcome::Skipped(warnings) => {
            for warning in &warnings {
                ui::display_boundary_warning(warning);
            }
        }
        PublishOutcome::Pushed(packages) => {
            for package in &packages {
                ui::display_success(&format!("Pushed {}", package.display()));
            }
        }
    }
    Ok(())
}

fn run_install(
    repo: &RepositoryHandle<SystemRunner>,
    config: &Config,
    release_version: &ReleaseVersion,
    ci: &CiContext,
) -> Result<()> {
    let product = config
        .publish
        .product
        .as_deref()
        .ok_or_else(|| ReleaseError::config("[publish] product is required for install"))?;

    let branch = repo.current_branch()?;
    let package_version = version::nuget_version(release_version, &branch, ci);

    ui::display_status(&format!("Installing {} {}", product, package_version));
    publish::install_tool(
        repo.runner(),
        &config.publish.tool,
        product,
        &config.publish.output_dir,
        &package_version,
    )?;
    ui::display_success(&format!("Installed {} {}", product, package_version));
    Ok(())
}
