//! A disposable MySQL server with a connected pool, for the link store
//! integration tests.

use crate::{Result, TestInfraError};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

const MYSQL_PORT: u16 = 3306;
const USER: &str = "tinylink";
const PASSWORD: &str = "tinylink";

#[derive(Debug, Clone, TypedBuilder)]
pub struct MySqlOptions {
    #[builder(default = "tinylink".to_string(), setter(into))]
    database: String,
    /// Tag of the `mysql` image.
    #[builder(default = "8.4".to_string(), setter(into))]
    tag: String,
    #[builder(default = 8)]
    max_connections: u32,
    /// The server logs "ready" before it accepts TCP connections, so the first
    /// connects are retried.
    #[builder(default = 20)]
    connect_attempts: u32,
    #[builder(default = Duration::from_millis(500))]
    retry_delay: Duration,
}

/// A MySQL container plus a pool connected to its database.
///
/// The container is stopped when the fixture is dropped.
pub struct MySqlFixture {
    _container: ContainerAsync<GenericImage>,
    database_url: String,
    pool: MySqlPool,
}

impl MySqlFixture {
    /// Starts the container and waits until the database accepts connections.
    pub async fn start(options: MySqlOptions) -> Result<Self> {
        let container = GenericImage::new("mysql", options.tag.as_str())
            .with_exposed_port(MYSQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_DATABASE", options.database.as_str())
            .with_env_var("MYSQL_USER", USER)
            .with_env_var("MYSQL_PASSWORD", PASSWORD)
            .with_env_var("MYSQL_ROOT_PASSWORD", "root")
            .start()
            .await?;

        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(MYSQL_PORT).await?;
        let database_url = format!(
            "mysql://{USER}:{PASSWORD}@{host}:{port}/{}",
            options.database
        );
        let pool = connect_with_retry(&database_url, &options).await?;

        Ok(Self {
            _container: container,
            database_url,
            pool,
        })
    }

    /// A handle to the shared pool.
    pub fn pool(&self) -> MySqlPool {
        self.pool.clone()
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

async fn connect_with_retry(url: &str, options: &MySqlOptions) -> Result<MySqlPool> {
    let attempts = options.connect_attempts.max(1);
    let mut attempt = 1;

    loop {
        let connected = MySqlPoolOptions::new()
            .max_connections(options.max_connections)
            .connect(url)
            .await;

        match connected {
            Ok(pool) => return Ok(pool),
            Err(source) if attempt >= attempts => {
                return Err(TestInfraError::Connect { attempts, source })
            }
            Err(_) => {
                attempt += 1;
                tokio::time::sleep(options.retry_delay).await;
            }
        }
    }
}
