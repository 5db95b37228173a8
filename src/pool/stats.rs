// Shared dashboard types. A single closed tag drives the admin UI's
// branching instead of a class hierarchy per pool family. `ToSchema` derives
// feed the `/pools/stats` route's OpenAPI document (see `crate::api::ApiDoc`),
// matching the teacher's `rest_api.rs` convention of annotating every
// response type it serves.

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum PoolKind {
    Consumable,
    Reusable,
    Static,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConsumableGroupStatus {
    pub group_id: i64,
    pub size: usize,
    pub available: usize,
    pub used: u64,
    pub utilization_pct: f64,
    pub memory_bytes: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PoolStatus {
    pub name: String,
    pub kind: PoolKind,
    /// Populated for reusable pools: `group_id -> item count`.
    pub reusable_counts: Option<std::collections::HashMap<i64, usize>>,
    /// Populated for consumable pools: per-group breakdown.
    pub consumable_groups: Option<Vec<ConsumableGroupStatus>>,
    /// Populated for static (object) pools.
    pub object_pool: Option<crate::pool::object_pool::ObjectPoolStats>,
}
