//! Visibility and mutation policy.
//!
//! Pure functions over the actor's role, store scope and uid. Evaluated
//! before any filter predicate, so a store-scoped admin can never discover
//! another store's reports through a crafted search string.

use crate::{
    auth::ActorContext,
    models::{Report, Role},
};

/// Whether the actor may see this report at all.
pub fn can_view(actor: &ActorContext, report: &Report) -> bool {
    match actor.role {
        Role::Superadmin => true,
        Role::Admin => report.store_number.trim() == actor.store_number.trim(),
        Role::User => report.reporter_id == actor.uid,
    }
}

/// Whether the actor may edit, toggle or delete this report. Submitters may
/// create reports but never touch them afterwards.
pub fn can_mutate(actor: &ActorContext, report: &Report) -> bool {
    match actor.role {
        Role::Superadmin => true,
        Role::Admin => can_view(actor, report),
        Role::User => false,
    }
}

/// Taxonomy, field-schema and offender management.
pub fn can_manage_schema(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Superadmin)
}

/// User administration is superadmin-only.
pub fn can_manage_users(role: Role) -> bool {
    matches!(role, Role::Superadmin)
}
