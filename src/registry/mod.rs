//! Reference entity registry.
//!
//! Small dimensions (stadium, weather, wind direction, decisive factor,
//! special rule, branch, rank) and the larger player/motor/boat sets are
//! deduplicated by natural key. Parsers only see the [`EntityResolver`]
//! trait; the storage behind it is pluggable through [`EntityStore`].

pub mod resolver;
pub mod store;

pub use resolver::CachingResolver;
pub use store::{EntityStore, InMemoryEntityStore, InsertOutcome};

use crate::error::Result;
use crate::models::{EntityAttributes, EntityKind, EntityRef, NaturalKey};

/// Get-or-create access to reference entities.
///
/// Resolving the same natural key twice returns the same identity, also when
/// two threads resolve it at once.
pub trait EntityResolver: Send + Sync {
    fn resolve(&self, key: &NaturalKey, attributes: &EntityAttributes) -> Result<EntityRef>;

    /// Resolve a dimension identified by its printed name.
    fn resolve_named(&self, kind: EntityKind, name: &str) -> Result<EntityRef> {
        self.resolve(
            &NaturalKey::named(kind, name),
            &EntityAttributes::labelled(name),
        )
    }

    fn resolve_stadium(&self, code: u8, name: &str) -> Result<EntityRef> {
        self.resolve(
            &NaturalKey::Stadium { code },
            &EntityAttributes::labelled(name),
        )
    }

    fn resolve_player(&self, registration: u32, name: &str) -> Result<EntityRef> {
        let attributes = if name.is_empty() {
            EntityAttributes::default()
        } else {
            EntityAttributes::labelled(name)
        };
        self.resolve(&NaturalKey::Player { registration }, &attributes)
    }

    /// Resolve a motor or boat. `rate` is only recorded when the entity is
    /// created; pass `None` when the caller has no rate to offer.
    fn resolve_equipment(
        &self,
        kind: EntityKind,
        number: u32,
        stadium_code: u8,
        rate: Option<f32>,
    ) -> Result<EntityRef> {
        self.resolve(
            &NaturalKey::Equipment {
                kind,
                number,
                stadium_code,
            },
            &EntityAttributes::default().with_rate(rate),
        )
    }
}
