//! Lookup table seeding.
//!
//! Every registered lookup enum is mirrored into its table, keyed by the
//! member's integer value, so re-running refreshes rows instead of adding them.

use std::collections::HashSet;
use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::AnyConnection;

use common::enums::{LookupEnum, Permission, UserStatusType};
use common::errors::{AppError, AppResult};
use common::models::Entity;

use crate::dialect::Dialect;
use crate::mapper::Mapper;
use crate::migration::{MigrationRunner, ModelCatalog};

/// A registered lookup enum, erased to its seeding behaviour.
#[async_trait]
pub trait EnumSeed: Send + Sync {
    fn enum_name(&self) -> &'static str;

    /// Model identifier of the backing table.
    fn model(&self) -> &'static str;

    /// Checks the member list: non-empty, unique keys, unique values.
    fn validate(&self) -> AppResult<()>;

    /// Upserts one row per member; returns the number of members written.
    async fn seed(&self, conn: &mut AnyConnection, dialect: Dialect) -> AppResult<usize>;
}

struct Registration<L>(PhantomData<fn() -> L>);

#[async_trait]
impl<L: LookupEnum> EnumSeed for Registration<L> {
    fn enum_name(&self) -> &'static str {
        L::NAME
    }

    fn model(&self) -> &'static str {
        <L::Model as Entity>::MODEL
    }

    fn validate(&self) -> AppResult<()> {
        let members = L::members();
        if members.is_empty() {
            return Err(AppError::EnumConfiguration(format!(
                "{} enum declares no members",
                L::NAME
            )));
        }

        let mut keys = HashSet::new();
        let mut values = HashSet::new();
        for member in members {
            if !keys.insert(member.key()) {
                return Err(AppError::EnumConfiguration(format!(
                    "{} enum declares key '{}' twice",
                    L::NAME,
                    member.key()
                )));
            }
            if !values.insert(member.value()) {
                return Err(AppError::EnumConfiguration(format!(
                    "{} enum declares value {} twice",
                    L::NAME,
                    member.value()
                )));
            }
        }
        Ok(())
    }

    async fn seed(&self, conn: &mut AnyConnection, dialect: Dialect) -> AppResult<usize> {
        let mapper = Mapper::<L::Model>::new(dialect);
        for member in L::members() {
            let existing = mapper.get(conn, member.value()).await?;
            let mut record = member.build_record(existing);
            mapper.save(conn, &mut record).await?;
        }
        Ok(L::members().len())
    }
}

/// Static list of lookup enums to seed.
#[derive(Default)]
pub struct EnumRegistry {
    seeds: Vec<Box<dyn EnumSeed>>,
}

impl EnumRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<L: LookupEnum>(self) -> Self {
        self.register_seed(Registration::<L>(PhantomData))
    }

    pub fn register_seed(mut self, seed: impl EnumSeed + 'static) -> Self {
        self.seeds.push(Box::new(seed));
        self
    }

    /// Lookup enums shipped with the installer.
    pub fn standard() -> Self {
        Self::new()
            .register::<Permission>()
            .register::<UserStatusType>()
    }

    /// Rejects duplicate registrations, enums mapped to models the catalog
    /// does not know, and malformed member lists.
    pub fn validate(&self, catalog: &ModelCatalog) -> AppResult<()> {
        let mut names = HashSet::new();
        for seed in &self.seeds {
            if !names.insert(seed.enum_name()) {
                return Err(AppError::EnumConfiguration(format!(
                    "{} enum is registered twice",
                    seed.enum_name()
                )));
            }
            if !catalog.contains(seed.model()) {
                return Err(AppError::EnumConfiguration(format!(
                    "{} enum maps to unknown model '{}'",
                    seed.enum_name(),
                    seed.model()
                )));
            }
            seed.validate()?;
        }
        Ok(())
    }

    /// Seeds every registered enum on the connection its model migrates on;
    /// returns the rows written.
    pub async fn seed_all(&self, router: &MigrationRunner<'_>) -> AppResult<usize> {
        let mut written = 0;
        for seed in &self.seeds {
            let handle = router.handle_for(seed.model())?;
            let mut conn = handle.pool().acquire().await?;
            let rows = seed.seed(&mut conn, handle.dialect()).await?;
            tracing::debug!(
                connection = handle.name(),
                enum_name = seed.enum_name(),
                model = seed.model(),
                rows,
                "Lookup enum seeded"
            );
            written += rows;
        }
        tracing::info!(enums = self.seeds.len(), rows = written, "Lookup tables seeded");
        Ok(written)
    }
}
