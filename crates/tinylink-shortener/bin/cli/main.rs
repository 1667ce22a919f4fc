mod cli;

use crate::cli::{Command, LogFormatArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::time::Duration;
use tinylink_generator::RandomGenerator;
use tinylink_shortener::{
    Link, LinkRegistry, RegistrySettings, ShortCode, ShortenParams, Shortener,
};
use tinylink_storage::{FileStore, LinkStore, MySqlStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        base_url = %config.base_url,
        code_length = config.code_length,
        storage_backend = %config.storage,
        "starting tinylink"
    );

    let generator = RandomGenerator::new(config.code_length.into())?;
    let settings = RegistrySettings::builder()
        .base_url(config.base_url.clone())
        .op_timeout(Duration::from_millis(config.timeout_ms))
        .build();

    match config.storage {
        StorageBackendArg::File => {
            let store = FileStore::open(&config.data_file)
                .await
                .with_context(|| format!("open journal {}", config.data_file.display()))?;
            let registry = LinkRegistry::new(store, generator, settings);
            run(registry, config.command).await
        }
        StorageBackendArg::Mysql => {
            let dsn = config
                .mysql_dsn
                .context("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlStore::connect(&dsn).await.context("connect to mysql")?;
            store.migrate().await.context("create links table")?;
            let registry = LinkRegistry::new(store, generator, settings);
            run(registry, config.command).await
        }
    }
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormatArg::Text => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

#[derive(Serialize)]
struct LinkView<'a> {
    #[serde(flatten)]
    link: &'a Link,
    short_url: String,
}

fn print_link<S: LinkStore>(
    registry: &LinkRegistry<S, RandomGenerator>,
    link: &Link,
) -> anyhow::Result<()> {
    let view = LinkView {
        link,
        short_url: registry.short_url(&link.code),
    };
    println!("{}", serde_json::to_string(&view)?);
    Ok(())
}

async fn run<S: LinkStore>(
    registry: LinkRegistry<S, RandomGenerator>,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Shorten { url, code } => {
            let params = ShortenParams {
                long_url: url,
                custom_code: code,
            };
            let link = registry.shorten(params).await?;
            print_link(&registry, &link)?;
        }
        Command::Resolve { code } => {
            let code = ShortCode::new(code)?;
            let link = registry
                .resolve(&code)
                .await?
                .with_context(|| format!("no link for code {code}"))?;
            print_link(&registry, &link)?;
        }
        Command::Hit { code } => {
            let link = registry.hit(&ShortCode::new(code)?).await?;
            print_link(&registry, &link)?;
        }
        Command::Delete { code } => {
            let code = ShortCode::new(code)?;
            registry.delete(&code).await?;
            info!(%code, "deleted link");
        }
        Command::List => {
            for link in registry.list().await? {
                print_link(&registry, &link)?;
            }
        }
    }

    Ok(())
}
