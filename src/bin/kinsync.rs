// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use kinsync::{
    client::DEFAULT_TIMEOUT,
    path::{default_config_path, expand_patterns},
    resource::{AppId, InjectionKey, LinkRequest},
    Credentials, KintoneClient, SyncDefinition, SyncOutcome, SyncSettings, Synchronizer,
};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Password;
use std::{fs, path::PathBuf, process::exit, time::Duration};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  kinsync [options] <kinsync-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(flatten)]
    pub target: TargetOptions,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        match self.command {
            Command::Files(opts) => run_files(self.target, opts).await,
            Command::Links(opts) => run_links(self.target, opts).await,
            Command::Status => run_status(self.target).await,
            Command::Init(opts) => run_init(self.target, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Upload local files and register them on the app.
    #[command(override_usage = "kinsync files [options] <file>...")]
    Files(FilesOptions),

    /// Register external URLs on the app.
    #[command(override_usage = "kinsync links [options] [<url>]...")]
    Links(LinksOptions),

    /// Show resources currently registered on the app.
    #[command(override_usage = "kinsync status [options]")]
    Status,

    /// Write template settings file.
    #[command(override_usage = "kinsync init [options]")]
    Init(InitOptions),
}

#[derive(Args, Clone, Debug)]
struct TargetOptions {
    /// Path to settings file.
    #[arg(long, global = true, value_name = "path", env = "KINSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Host of kintone domain.
    #[arg(long, global = true, value_name = "host", env = "KINSYNC_HOST")]
    pub host: Option<String>,

    /// Identifier of target app.
    #[arg(long, global = true, value_name = "id", env = "KINSYNC_APP")]
    pub app: Option<AppId>,

    /// Login name for password authentication.
    #[arg(long, global = true, value_name = "name", env = "KINSYNC_USERNAME")]
    pub username: Option<String>,

    /// Password for password authentication.
    #[arg(
        long,
        global = true,
        value_name = "password",
        env = "KINSYNC_PASSWORD",
        hide_env_values = true
    )]
    pub password: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct FilesOptions {
    /// Files or glob patterns of files to upload.
    #[arg(required = true, value_name = "file")]
    pub files: Vec<String>,

    /// Injection keys to register files under.
    #[arg(short, long, value_name = "key")]
    pub cover: Vec<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct LinksOptions {
    /// URLs to register. Links from settings file are used if none are given.
    #[arg(value_name = "url")]
    pub urls: Vec<String>,

    /// Injection keys to register URLs under. Also used for settings file links
    /// without keys of their own.
    #[arg(short, long, value_name = "key")]
    pub cover: Vec<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// Overwrite existing settings file.
    #[arg(short, long)]
    pub force: bool,
}

#[tokio::main]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

async fn run() -> Result<()> {
    Cli::parse().run().await
}

async fn run_files(target: TargetOptions, opts: FilesOptions) -> Result<()> {
    let (definition, sync) = open_target(target)?;
    let keys = cover_keys(opts.cover, &definition.settings);
    let files = expand_patterns(&opts.files)?;

    let bar = spinner(format!("upload {} files", files.len()))?;
    let outcome = sync.customize_files(&files, &keys).await;
    bar.finish_and_clear();
    report(outcome?)
}

async fn run_links(target: TargetOptions, opts: LinksOptions) -> Result<()> {
    let (definition, sync) = open_target(target)?;
    let keys = cover_keys(opts.cover, &definition.settings);
    let requests = if opts.urls.is_empty() {
        definition.link_requests_with(&keys)
    } else {
        opts.urls
            .into_iter()
            .map(|url| LinkRequest::new(url, keys.iter().cloned()))
            .collect()
    };

    let bar = spinner(format!("register {} links", requests.len()))?;
    let outcome = sync.customize_links(requests).await;
    bar.finish_and_clear();
    report(outcome?)
}

async fn run_status(target: TargetOptions) -> Result<()> {
    let (_, sync) = open_target(target)?;
    let customization = sync.status().await?;

    let mut keys: Vec<&InjectionKey> = Vec::new();
    for entry in &customization.scripts {
        if !keys.contains(&&entry.key) {
            keys.push(&entry.key);
        }
    }

    for key in keys {
        println!("{key}");
        for entry in customization.scripts.iter().filter(|entry| &entry.key == key) {
            println!(
                "  {:<4}  {}  {}",
                entry.location_type,
                entry.name.as_deref().unwrap_or("-"),
                entry.reference().unwrap_or("-"),
            );
        }
    }

    Ok(())
}

fn run_init(target: TargetOptions, opts: InitOptions) -> Result<()> {
    let path = match target.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    if path.exists() && !opts.force {
        return Err(anyhow!("settings file {:?} already exists", path.display()));
    }

    let definition = SyncDefinition {
        settings: SyncSettings {
            host: Some(target.host.unwrap_or_else(|| "<put kintone host here>".into())),
            app: target.app,
            username: Some(target.username.unwrap_or_else(|| "$KINTONE_USERNAME".into())),
            password: Some("$KINTONE_PASSWORD".into()),
            timeout: Some(DEFAULT_TIMEOUT.as_secs()),
            cover: Some(vec![InjectionKey::desktop()]),
        },
        ..Default::default()
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        mkdirp::mkdirp(parent)
            .with_context(|| format!("failed to create {:?}", parent.display()))?;
    }
    fs::write(&path, definition.to_string())
        .with_context(|| format!("failed to write {:?}", path.display()))?;
    info!("wrote settings file {:?}", path.display());

    Ok(())
}

fn open_target(target: TargetOptions) -> Result<(SyncDefinition, Synchronizer<KintoneClient>)> {
    let mut definition = load_definition(target.config.clone())?;
    let overrides = SyncSettings {
        host: target.host,
        app: target.app,
        username: target.username,
        password: target.password,
        ..Default::default()
    };
    definition.settings = definition.settings.overlay(overrides);

    let settings = &definition.settings;
    let host = settings
        .host
        .clone()
        .ok_or_else(|| anyhow!("no host given, use --host or set host in settings file"))?;
    let app = settings
        .app
        .ok_or_else(|| anyhow!("no app given, use --app or set app in settings file"))?;
    let username = settings
        .username
        .clone()
        .ok_or_else(|| anyhow!("no username given, use --username or set username in settings file"))?;
    let password = match &settings.password {
        Some(password) => password.clone(),
        None => Password::new("password")
            .without_confirmation()
            .prompt()?,
    };
    let timeout = settings
        .timeout
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT);

    let client = KintoneClient::new(&host, &Credentials::new(username, password), timeout)?;
    info!("target app {app} at {host}");

    Ok((definition, Synchronizer::new(client, app)))
}

fn load_definition(path: Option<PathBuf>) -> Result<SyncDefinition> {
    // INVARIANT: Missing default settings file is fine, missing explicit one is not.
    let path = match path {
        Some(path) => path,
        None => {
            let path = default_config_path()?;
            if !path.exists() {
                return Ok(SyncDefinition::default());
            }
            path
        }
    };

    let data = fs::read_to_string(&path)
        .with_context(|| format!("failed to read settings file {:?}", path.display()))?;
    data.parse()
        .with_context(|| format!("invalid settings file {:?}", path.display()))
}

fn cover_keys(cover: Vec<String>, settings: &SyncSettings) -> Vec<InjectionKey> {
    if cover.is_empty() {
        settings.cover_keys()
    } else {
        cover.into_iter().map(InjectionKey::new).collect()
    }
}

fn spinner(message: String) -> Result<ProgressBar> {
    let style = ProgressStyle::with_template("{elapsed_precise:.green}  {spinner}  {msg}")?;
    let bar = ProgressBar::new_spinner().with_style(style).with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    Ok(bar)
}

fn report(outcome: SyncOutcome) -> Result<()> {
    match outcome {
        SyncOutcome::DeployUnconfirmed { app_name } => Err(anyhow!(
            "deployment of {app_name} was not confirmed, check the app's status on kintone"
        )),
        SyncOutcome::Skipped | SyncOutcome::UpToDate | SyncOutcome::Deployed { .. } => Ok(()),
    }
}
