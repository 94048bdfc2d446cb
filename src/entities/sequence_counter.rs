//! Sequence counter entity - One row per identifier series.
//!
//! Stores the last value issued for a series (`CUS`, `CVB`, `QUO`, `SO`, `ENQ`).
//! Rows are only ever advanced through an atomic `last_value = last_value + 1`
//! update, never by reading the maximum identifier of the owning table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sequence counter database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sequence_counters")]
pub struct Model {
    /// Series prefix, e.g. `"CUS"`
    #[sea_orm(primary_key, auto_increment = false)]
    pub series: String,
    /// Last numeric value issued for this series (0 when nothing was issued)
    pub last_value: i64,
    /// When the counter last moved
    pub updated_at: DateTimeUtc,
}

/// Sequence counters have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
