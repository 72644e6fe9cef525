//! Application startup and lifecycle management.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use service_core::error::AppError;
use tokio::net::TcpListener;

use crate::config::{PosConfig, StoreBackend};
use crate::services::store::{BILL_SEQUENCE, BILL_SEQUENCE_START};
use crate::services::{InMemoryStore, JwtService, MongoDb, PosStore};
use crate::utils::{hash_password, Password, PasswordHashString, ShopClock};

/// The single staff login the till accepts.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password_hash: PasswordHashString,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PosStore>,
    pub jwt: JwtService,
    pub credentials: Credentials,
    pub clock: ShopClock,
    pub tax_rate: Decimal,
    pub storage_limit_mb: u64,
}

/// Wires state around an already connected store.
pub async fn build_state(config: &PosConfig, store: Arc<dyn PosStore>) -> Result<AppState, AppError> {
    store
        .ensure_sequence(BILL_SEQUENCE, BILL_SEQUENCE_START)
        .await?;

    let jwt = JwtService::new(&config.auth.jwt_secret, config.auth.jwt_expiry_hours)?;
    let password = Password::new(config.auth.password.expose_secret().clone());
    let password_hash = hash_password(&password).map_err(AppError::ConfigError)?;

    let clock = ShopClock::from_offset_minutes(config.shop.utc_offset_minutes);
    tracing::info!(offset = %clock.offset(), tax_rate = %config.report.tax_rate, "Shop settings loaded");

    Ok(AppState {
        store,
        jwt,
        credentials: Credentials {
            username: config.auth.username.clone(),
            password_hash,
        },
        clock,
        tax_rate: config.report.tax_rate,
        storage_limit_mb: config.report.storage_limit_mb,
    })
}

async fn connect_store(config: &PosConfig) -> Result<Arc<dyn PosStore>, AppError> {
    match config.store {
        StoreBackend::Mongo => {
            let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to connect to MongoDB: {}", e);
                    e
                })?;

            db.initialize_indexes().await.map_err(|e| {
                tracing::error!("Failed to initialize database indexes: {}", e);
                e
            })?;
            Ok(Arc::new(db))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data will not survive a restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    pub async fn build(config: PosConfig) -> Result<Self, AppError> {
        let store = connect_store(&config).await?;
        let state = build_state(&config, store).await?;

        // Port 0 picks a random port
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("POS service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests.
    pub async fn run_until_stopped<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = crate::build_router(self.state);
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })
    }
}
