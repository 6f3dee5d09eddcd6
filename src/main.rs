mod auth;
mod config;
mod downloader;
mod error;
mod flickr_client;
mod model;
mod naming;
mod oauth;
mod pager;
mod progress;

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, anyhow};
use clap::Parser;
use git_version::git_version;
use log::info;

use crate::auth::ConsolePrompt;
use crate::config::ConfigDefaults;
use crate::downloader::{DownloadConfig, DownloadProgress, Downloader, NoProgress};
use crate::error::Error;
use crate::flickr_client::FlickrClient;
use crate::naming::NamingMode;
use crate::oauth::Consumer;
use crate::pager::Listing;
use crate::progress::BarProgress;

pub const GIT_VERSION: &str = git_version!(fallback = "unknown");

/// Flickr error code for an invalid or revoked token.
const INVALID_TOKEN: u32 = 98;

/// Download a Flickr photostream or set
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Flickr API key
    #[clap(short = 'k', long = "api_key")]
    api_key: Option<String>,

    /// Flickr API secret
    #[clap(short = 's', long = "api_secret")]
    api_secret: Option<String>,

    /// Flickr user ID, defaults to the authorized user
    #[clap(short = 'u', long = "user_id")]
    user_id: Option<String>,

    /// Download this photoset instead of the photostream
    #[clap(short = 'd', long = "set_id")]
    set_id: Option<String>,

    /// Photo naming mode
    #[clap(short = 'n', long = "naming", value_name = "NAMING_MODE")]
    naming: Option<String>,

    /// Don't skip photos by id suffix, check every exact file name
    #[clap(long = "no_fast_forward")]
    no_fast_forward: bool,

    /// List the sets of a user and exit
    #[clap(short = 'l', long = "list", value_name = "USER_ID")]
    list: Option<String>,

    /// Directory to save photos in
    #[clap(short = 'o', long = "output_dir")]
    output_dir: Option<PathBuf>,

    /// Log every request and file
    #[clap(short, long)]
    verbose: bool,
}

/// Command line values with the config file defaults filled in.
#[derive(Debug)]
struct Settings {
    api_key: String,
    api_secret: String,
    user_id: Option<String>,
    set_id: Option<String>,
    list: Option<String>,
    naming: NamingMode,
    fast_forward: bool,
    output_dir: PathBuf,
    verbose: bool,
}

impl Settings {
    fn merge(args: Args, defaults: ConfigDefaults) -> anyhow::Result<Settings> {
        let (Some(api_key), Some(api_secret)) = (
            args.api_key.or(defaults.api_key),
            args.api_secret.or(defaults.api_secret),
        ) else {
            return Err(anyhow!(
                "You need to pass in both \"api_key\" and \"api_secret\" arguments"
            ));
        };

        let naming = match args.naming.or(defaults.naming) {
            Some(name) => name.parse::<NamingMode>()?,
            None => NamingMode::default(),
        };

        Ok(Settings {
            api_key,
            api_secret,
            user_id: args.user_id.or(defaults.user_id),
            set_id: args.set_id.or(defaults.set_id),
            list: args.list,
            naming,
            fast_forward: !(args.no_fast_forward || defaults.no_fast_forward.unwrap_or(false)),
            output_dir: args
                .output_dir
                .or(defaults.output_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            verbose: args.verbose,
        })
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = format!("warn,{crate_name}={level}", crate_name = env!("CARGO_CRATE_NAME"));

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();
}

fn token_hint(e: Error, token_path: &Path) -> anyhow::Error {
    match e {
        e @ Error::Api {
            code: INVALID_TOKEN,
            ..
        } => anyhow::Error::new(e).context(format!(
            "The stored token was rejected, delete {} and run again to authorize",
            token_path.display()
        )),
        e => e.into(),
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let defaults = config::default_config_path()
        .map(|path| ConfigDefaults::load(&path))
        .unwrap_or_default();
    let settings = Settings::merge(args, defaults)?;

    let token_path = auth::default_token_path().context("Could not find the home directory")?;
    let client = FlickrClient::new(Consumer::new(&settings.api_key, &settings.api_secret))?;
    let token = auth::authenticate(&client, &mut ConsolePrompt, &token_path)
        .await
        .context("Authorization did not complete")?;
    if let Some(username) = &token.username {
        info!("Authorized as {username}");
    }
    let client = client.with_token(token);

    if let Some(user_id) = &settings.list {
        let sets = client
            .photosets(user_id)
            .await
            .map_err(|e| token_hint(e, &token_path))?;
        for set in sets {
            println!("{} - {} ({} photos)", set.id, set.title.content, set.photos);
        }
        return Ok(());
    }

    let listing = match (settings.set_id, settings.user_id) {
        (Some(set_id), _) => Listing::Set(set_id),
        (None, Some(user_id)) => Listing::User(user_id),
        (None, None) => {
            let user = client.login().await.map_err(|e| token_hint(e, &token_path))?;
            info!("Downloading photostream of {}", user.username.content);
            Listing::User(user.id)
        }
    };

    let photos = pager::fetch_all_photos(&client, &listing)
        .await
        .map_err(|e| token_hint(e, &token_path))
        .context("Could not list photos")?;
    info!("Found {count} photos", count = photos.len());

    let downloader = Downloader::new(
        DownloadConfig::default()
            .with_output_directory(&settings.output_dir)
            .with_naming(settings.naming)
            .with_fast_forward(settings.fast_forward),
    );
    let progress: Box<dyn DownloadProgress> = if settings.verbose {
        Box::new(NoProgress)
    } else {
        Box::new(BarProgress::new())
    };

    let summary = downloader
        .download_all(&client, &photos, progress.as_ref())
        .await?;
    info!(
        "Finished getting photos. {downloaded} new files, {skipped} skipped.",
        downloaded = summary.downloaded,
        skipped = summary.skipped
    );

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    println!("Flickr Downloader {GIT_VERSION}");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_token_hint_names_the_token_file() {
        let path = Path::new("/home/someone/.flickr_token");
        let e = Error::Api {
            code: INVALID_TOKEN,
            message: "Invalid auth token".into(),
        };

        let message = format!("{:#}", token_hint(e, path));

        assert!(message.contains("delete /home/someone/.flickr_token"));
        assert!(message.contains("Invalid auth token"));
    }

    #[test]
    fn other_api_errors_get_no_hint() {
        let path = Path::new("/home/someone/.flickr_token");
        let e = Error::Api {
            code: 2,
            message: "Unknown user".into(),
        };

        let message = format!("{:#}", token_hint(e, path));

        assert!(!message.contains(".flickr_token"));
        assert_eq!("Flickr API error 2: Unknown user", message);
    }

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("FlickrDownloader").chain(argv.iter().copied()))
    }

    #[test]
    fn flags_win_over_config() {
        let defaults = ConfigDefaults {
            api_key: Some("file-key".into()),
            api_secret: Some("file-secret".into()),
            naming: Some("id".into()),
            ..ConfigDefaults::default()
        };

        let settings = Settings::merge(args(&["-k", "flag-key", "-u", "1@N00"]), defaults).unwrap();

        assert_eq!("flag-key", settings.api_key);
        assert_eq!("file-secret", settings.api_secret);
        assert_eq!(Some("1@N00"), settings.user_id.as_deref());
        assert_eq!(NamingMode::Id, settings.naming);
        assert!(settings.fast_forward);
        assert_eq!(PathBuf::from("."), settings.output_dir);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let result = Settings::merge(args(&["--api_key", "key"]), ConfigDefaults::default());
        assert!(result.is_err());
    }

    #[test]
    fn unknown_naming_mode_is_an_error() {
        let result = Settings::merge(
            args(&["-k", "key", "-s", "secret", "-n", "by_colour"]),
            ConfigDefaults::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn fast_forward_can_be_disabled_from_config() {
        let defaults = ConfigDefaults {
            no_fast_forward: Some(true),
            ..ConfigDefaults::default()
        };

        let settings = Settings::merge(args(&["-k", "key", "-s", "secret"]), defaults).unwrap();

        assert!(!settings.fast_forward);
        assert_eq!(NamingMode::TitleAndId, settings.naming);
    }

    #[test]
    fn long_flags_use_underscores() {
        let settings = Settings::merge(
            args(&[
                "--api_key",
                "key",
                "--api_secret",
                "secret",
                "--set_id",
                "72157",
                "--naming",
                "timestamp_and_title_and_id",
                "--no_fast_forward",
                "--output_dir",
                "photos",
            ]),
            ConfigDefaults::default(),
        )
        .unwrap();

        assert_eq!(Some("72157"), settings.set_id.as_deref());
        assert_eq!(NamingMode::TimestampAndTitleAndId, settings.naming);
        assert!(!settings.fast_forward);
        assert_eq!(PathBuf::from("photos"), settings.output_dir);
    }
}
