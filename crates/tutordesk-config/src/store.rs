use std::env;

/// Which entity store the server runs against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { url: String, max_connections: u32 },
    Memory,
}

impl StoreBackend {
    /// `STORE_BACKEND=memory` forces the in-memory store. Otherwise Postgres is
    /// used whenever `DATABASE_URL` is set.
    pub fn from_env() -> Self {
        Self::resolve(
            env::var("STORE_BACKEND").ok().as_deref(),
            env::var("DATABASE_URL").ok(),
            env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok()),
        )
    }

    fn resolve(backend: Option<&str>, url: Option<String>, max_connections: Option<u32>) -> Self {
        let max_connections = max_connections.unwrap_or(10);
        match (backend.map(str::to_ascii_lowercase).as_deref(), url) {
            (Some("memory"), _) => StoreBackend::Memory,
            (_, Some(url)) if !url.trim().is_empty() => StoreBackend::Postgres {
                url,
                max_connections,
            },
            (Some("postgres"), _) => {
                tracing::warn!("STORE_BACKEND=postgres but DATABASE_URL is empty, using memory");
                StoreBackend::Memory
            }
            _ => StoreBackend::Memory,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Postgres { .. } => "postgres",
            StoreBackend::Memory => "memory",
        }
    }
}
