//! Thin CRUD contract over a `PgPool`, implemented per entity in
//! [`crate::store::postgres`].

use async_trait::async_trait;
use sqlx::PgPool;

use crate::kernel::EngineResult;

#[async_trait]
pub trait Record: Sized + Send + Sync {
    const TABLE: &'static str;
    type Id: Send + Sync;

    async fn find_by_id(id: Self::Id, db: &PgPool) -> EngineResult<Option<Self>>;
    async fn insert(&self, db: &PgPool) -> EngineResult<Self>;
    async fn update(&self, db: &PgPool) -> EngineResult<Self>;
    async fn delete(&self, db: &PgPool) -> EngineResult<()>;
}
