mod args;
mod launcher;

use anyhow::{Context, Result, bail};
use args::{Args, Command, Parser};
use launcher::PrintingLauncher;
use shared_storage_config::{Config, DEFAULT_API_LEVEL};
use shared_storage_engine::{
    AndroidMimeTable, CopyStrategy, FileRef, MemoryBroker, ShareSession, SharedStorage,
    StaticHost, StorageOptions, auto_collection, mime_type_of, validate_collection,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

const DEFAULT_APP_TITLE: &str = "SharedStorage";

/// Config file values with command-line overrides applied
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    app_title: String,
    api_level: u32,
    storage_root: PathBuf,
    cache_dir: PathBuf,
    copy_strategy: Option<CopyStrategy>,
}

impl Settings {
    fn resolve(args: &Args, config: Option<Config>) -> Result<Self> {
        let config_strategy = match config.as_ref().and_then(|c| c.copy_strategy.as_deref()) {
            Some(name) => Some(name.parse::<CopyStrategy>()?),
            None => None,
        };
        let (storage_root, cache_dir) = match (&args.storage_root, &args.cache_dir, &config) {
            (Some(root), Some(cache), _) => (root.clone(), cache.clone()),
            (root, cache, Some(config)) => (
                root.clone().unwrap_or_else(|| config.storage_root.clone()),
                cache.clone().unwrap_or_else(|| config.cache_dir.clone()),
            ),
            _ => bail!(
                "No storage root and cache dir given and no config file found at {}",
                args.config
                    .clone()
                    .unwrap_or_else(Config::config_path)
                    .display()
            ),
        };
        Ok(Self {
            app_title: args
                .app_title
                .clone()
                .or_else(|| config.as_ref().map(|c| c.app_title.clone()))
                .unwrap_or_else(|| DEFAULT_APP_TITLE.to_string()),
            api_level: args
                .api_level
                .or_else(|| config.as_ref().map(Config::api_level))
                .unwrap_or(DEFAULT_API_LEVEL),
            storage_root,
            cache_dir,
            copy_strategy: args.copy_strategy.or(config_strategy),
        })
    }

    fn host(&self) -> StaticHost {
        StaticHost::new(&self.app_title, self.api_level)
            .with_storage_root(&self.storage_root)
            .with_cache_dir(&self.cache_dir)
    }
}

fn load_config(args: &Args) -> Result<Option<Config>> {
    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

/// Persist the settings so later runs need no directory flags
fn init(args: &Args) -> Result<PathBuf> {
    let settings = Settings::resolve(args, load_config(args)?)?;
    let mut config = Config::new(
        settings.app_title,
        settings.storage_root,
        settings.cache_dir,
    );
    config.api_level = Some(settings.api_level);
    config.copy_strategy = settings.copy_strategy.map(|strategy| strategy.to_string());

    let config_path = args.config.clone().unwrap_or_else(Config::config_path);
    match &args.config {
        Some(path) => config.save_to_path(path)?,
        None => config.save()?,
    }
    Ok(config_path)
}

fn run(args: Args) -> Result<()> {
    // Pure lookups need no storage
    match &args.command {
        Command::Mime { file_name } => {
            println!("{}", mime_type_of(file_name, &AndroidMimeTable));
            return Ok(());
        }
        Command::Collection {
            mime_type,
            requested,
        } => {
            println!(
                "{}",
                validate_collection(auto_collection(mime_type), *requested)
            );
            return Ok(());
        }
        Command::Init => {
            let config_path = init(&args)?;
            println!("Wrote {}", config_path.display());
            return Ok(());
        }
        _ => {}
    }

    let settings = Settings::resolve(&args, load_config(&args)?)?;
    log::debug!("Using {settings:?}");
    std::fs::create_dir_all(&settings.storage_root).with_context(|| {
        format!(
            "Failed to create storage root {}",
            settings.storage_root.display()
        )
    })?;

    let host = Arc::new(settings.host());
    let broker = Arc::new(MemoryBroker::new());
    let storage = SharedStorage::with_options(
        host.clone(),
        broker.clone(),
        StorageOptions {
            copy_strategy: settings.copy_strategy,
            ..StorageOptions::default()
        },
    );

    match args.command {
        Command::Publish {
            file,
            collection,
            subpath,
        } => {
            let published = storage.try_copy_to_shared(&file, collection, subpath.as_deref())?;
            println!("{published}");
        }
        Command::Fetch { reference } => {
            let cached = storage.try_copy_from_shared(&FileRef::parse(&reference))?;
            println!("{}", cached.display());
        }
        Command::Delete { reference } => {
            storage.try_delete_shared(&FileRef::parse(&reference))?;
            println!("Deleted {reference}");
        }
        Command::Resolve { reference } => {
            let resolved = storage.try_resolve_handle(&FileRef::parse(&reference))?;
            println!("{resolved}");
        }
        Command::Roundtrip { file, collection } => {
            let published = storage.try_copy_to_shared(&file, collection, None)?;
            let cached = storage.try_copy_from_shared(&published)?;
            let identical = std::fs::read(&file)? == std::fs::read(&cached)?;
            println!("{published} -> {}", cached.display());
            if !identical {
                bail!("{} differs from {}", cached.display(), file.display());
            }
        }
        Command::Share {
            references,
            target,
            text,
        } => {
            let mut session =
                ShareSession::for_host(host.as_ref(), broker, Arc::new(PrintingLauncher));
            let files: Vec<FileRef> = references.iter().map(|r| FileRef::parse(r)).collect();
            match (files.as_slice(), text.as_deref()) {
                ([], Some(text)) => session.try_share_text(text, target.as_deref())?,
                ([], None) => bail!("Nothing to share"),
                ([file], text) => session.try_share_one(file, target.as_deref(), text)?,
                (files, _) => session.try_share_many(files, target.as_deref())?,
            };
        }
        Command::Mime { .. } | Command::Collection { .. } | Command::Init => {}
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shared_storage_engine::Collection;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_publish() {
        let args = parse(&[
            "shared-storage",
            "--api-level",
            "28",
            "publish",
            "song.mp3",
            "--collection",
            "podcasts",
            "--subpath",
            "shows/ep1.mp3",
        ]);

        assert_eq!(args.api_level, Some(28));
        match args.command {
            Command::Publish {
                file,
                collection,
                subpath,
            } => {
                assert_eq!(file, PathBuf::from("song.mp3"));
                assert_eq!(collection, Some(Collection::Podcasts));
                assert_eq!(subpath.as_deref(), Some("shows/ep1.mp3"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_collection_rejected() {
        let result = Args::try_parse_from([
            "shared-storage",
            "publish",
            "a.txt",
            "--collection",
            "Desktop",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn test_settings_from_flags_only() {
        let args = parse(&[
            "shared-storage",
            "--storage-root",
            "/tmp/shared",
            "--cache-dir",
            "/tmp/cache",
            "--copy-strategy",
            "chunked",
            "mime",
            "a.txt",
        ]);

        let settings = Settings::resolve(&args, None).unwrap();

        assert_eq!(
            settings,
            Settings {
                app_title: DEFAULT_APP_TITLE.to_string(),
                api_level: DEFAULT_API_LEVEL,
                storage_root: PathBuf::from("/tmp/shared"),
                cache_dir: PathBuf::from("/tmp/cache"),
                copy_strategy: Some(CopyStrategy::Chunked),
            }
        );
    }

    #[test]
    fn test_flags_override_config() {
        let args = parse(&["shared-storage", "--api-level", "28", "fetch", "a.txt"]);
        let mut config = Config::new("MyApp", "/srv/shared", "/srv/cache");
        config.api_level = Some(33);
        config.copy_strategy = Some("bulk".to_string());

        let settings = Settings::resolve(&args, Some(config)).unwrap();

        assert_eq!(settings.app_title, "MyApp");
        assert_eq!(settings.api_level, 28);
        assert_eq!(settings.storage_root, PathBuf::from("/srv/shared"));
        assert_eq!(settings.copy_strategy, Some(CopyStrategy::Bulk));
    }

    #[test]
    fn test_missing_directories_without_config() {
        let args = parse(&["shared-storage", "--cache-dir", "/tmp/cache", "fetch", "a.txt"]);

        assert!(Settings::resolve(&args, None).is_err());
    }

    #[test]
    fn test_roundtrip_in_both_modes() {
        for api_level in ["28", "33"] {
            let dir = tempfile::tempdir().unwrap();
            let source = dir.path().join("notes.txt");
            std::fs::write(&source, b"hello").unwrap();
            let root = dir.path().join("shared");
            let cache = dir.path().join("cache");
            let config = dir.path().join("missing.toml");

            let args = parse(&[
                "shared-storage",
                "--config",
                config.to_str().unwrap(),
                "--api-level",
                api_level,
                "--storage-root",
                root.to_str().unwrap(),
                "--cache-dir",
                cache.to_str().unwrap(),
                "roundtrip",
                source.to_str().unwrap(),
            ]);

            run(args).unwrap();
            assert_eq!(
                std::fs::read(cache.join("FromSharedStorage/notes.txt")).unwrap(),
                b"hello"
            );
        }
    }

    #[test]
    fn test_init_writes_config_used_by_later_runs() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let root = dir.path().join("shared");
        let cache = dir.path().join("cache");

        let init_args = parse(&[
            "shared-storage",
            "--config",
            config_path.to_str().unwrap(),
            "--api-level",
            "28",
            "--storage-root",
            root.to_str().unwrap(),
            "--cache-dir",
            cache.to_str().unwrap(),
            "--copy-strategy",
            "bulk",
            "init",
        ]);
        assert_eq!(init(&init_args).unwrap(), config_path);

        let later = parse(&[
            "shared-storage",
            "--config",
            config_path.to_str().unwrap(),
            "fetch",
            "a.txt",
        ]);
        let settings = Settings::resolve(&later, load_config(&later).unwrap()).unwrap();

        assert_eq!(
            settings,
            Settings {
                app_title: DEFAULT_APP_TITLE.to_string(),
                api_level: 28,
                storage_root: root,
                cache_dir: cache,
                copy_strategy: Some(CopyStrategy::Bulk),
            }
        );
    }
}
