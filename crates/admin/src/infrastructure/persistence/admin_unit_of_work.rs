//! PostgreSQL Unit of Work 实现

use async_trait::async_trait;
use idconf_errors::{AppError, AppResult};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::tx_repositories::{
    SharedTx, TxApiResourceRepository, TxApiScopeRepository, TxApiSecretRepository,
    TxIdentityResourceRepository,
};
use crate::domain::api_resource::{ApiResourceRepository, ApiScopeRepository, ApiSecretRepository};
use crate::domain::identity_resource::IdentityResourceRepository;
use crate::domain::unit_of_work::{AdminUnitOfWork, AdminUnitOfWorkFactory};

/// Postgres Unit of Work 工厂
pub struct PostgresAdminUnitOfWorkFactory {
    pool: PgPool,
}

impl PostgresAdminUnitOfWorkFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminUnitOfWorkFactory for PostgresAdminUnitOfWorkFactory {
    async fn begin(&self) -> AppResult<Box<dyn AdminUnitOfWork>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        Ok(Box::new(PostgresAdminUnitOfWork::new(tx)))
    }
}

/// Postgres Unit of Work 实现
pub struct PostgresAdminUnitOfWork {
    tx: SharedTx,
    api_resource_repo: TxApiResourceRepository,
    api_scope_repo: TxApiScopeRepository,
    api_secret_repo: TxApiSecretRepository,
    identity_resource_repo: TxIdentityResourceRepository,
}

impl PostgresAdminUnitOfWork {
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        let tx: SharedTx = Arc::new(Mutex::new(Some(tx)));

        Self {
            api_resource_repo: TxApiResourceRepository::new(tx.clone()),
            api_scope_repo: TxApiScopeRepository::new(tx.clone()),
            api_secret_repo: TxApiSecretRepository::new(tx.clone()),
            identity_resource_repo: TxIdentityResourceRepository::new(tx.clone()),
            tx,
        }
    }
}

#[async_trait]
impl AdminUnitOfWork for PostgresAdminUnitOfWork {
    fn api_resources(&self) -> &dyn ApiResourceRepository {
        &self.api_resource_repo
    }

    fn api_scopes(&self) -> &dyn ApiScopeRepository {
        &self.api_scope_repo
    }

    fn api_secrets(&self) -> &dyn ApiSecretRepository {
        &self.api_secret_repo
    }

    fn identity_resources(&self) -> &dyn IdentityResourceRepository {
        &self.identity_resource_repo
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .take()
            .ok_or_else(|| AppError::internal("Transaction already consumed"))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .take()
            .ok_or_else(|| AppError::internal("Transaction already consumed"))?;

        tx.rollback()
            .await
            .map_err(|e| AppError::database(format!("Failed to rollback transaction: {}", e)))?;

        Ok(())
    }
}
