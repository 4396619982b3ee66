// SPDX-License-Identifier: Apache-2.0

use givehub_model::{
    plan_division, Allocation, Amount, DivisionPlan, DomainError, DonationStatus, NewTarget,
    Period, Target, TargetId, TargetProgress, User, UserId, ValidationError,
};
use rusqlite::{params, Connection, OptionalExtension};

use crate::rows::{amount_at, amount_sql, target_from_row, TARGET_COLUMNS, TEAM_CTE};
use crate::users::{find_user, load_user, manages};
use crate::{Store, StoreError};

/// Child targets created by one division, plus the resulting plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Division {
    pub children: Vec<Target>,
    pub plan: DivisionPlan,
}

fn load_target(conn: &Connection, id: TargetId) -> Result<Target, StoreError> {
    conn.query_row(
        &format!("SELECT {TARGET_COLUMNS} FROM targets WHERE id = ?1"),
        params![id.get()],
        target_from_row,
    )
    .optional()?
    .ok_or_else(|| DomainError::not_found("target", id).into())
}

fn can_view_target(conn: &Connection, actor: &User, target: &Target) -> Result<bool, StoreError> {
    if actor.id == target.user_id || actor.id == target.assigned_by {
        return Ok(true);
    }
    manages(conn, actor, target.user_id)
}

/// Completed donations referred by `user` or anybody below, inside `period`.
pub(crate) fn achieved_for(conn: &Connection, user: UserId, period: Period) -> Result<Amount, StoreError> {
    Ok(conn.query_row(
        &format!(
            "{TEAM_CTE} SELECT COALESCE(SUM(amount), 0) FROM donations
             WHERE status = ?2 AND completed_at >= ?3 AND completed_at < ?4
               AND referrer_id IN (SELECT id FROM team)"
        ),
        params![
            user.get(),
            DonationStatus::Completed.as_str(),
            period.start,
            period.end
        ],
        |row| amount_at(row, 0),
    )?)
}

fn divided_for(conn: &Connection, id: TargetId) -> Result<Amount, StoreError> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM targets WHERE parent_target_id = ?1",
        params![id.get()],
        |row| amount_at(row, 0),
    )?)
}

pub(crate) fn progress_of(conn: &Connection, target: &Target) -> Result<TargetProgress, StoreError> {
    let achieved = achieved_for(conn, target.user_id, target.period)?;
    let divided = divided_for(conn, target.id)?;
    Ok(TargetProgress::compute(target, achieved, divided))
}

/// Targets of `user` whose period contains `now`.
pub(crate) fn current_targets(conn: &Connection, user: UserId, now: i64) -> Result<Vec<Target>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TARGET_COLUMNS} FROM targets
         WHERE user_id = ?1 AND period_start <= ?2 AND period_end > ?2
         ORDER BY period_end, id"
    ))?;
    let targets = stmt
        .query_map(params![user.get(), now], target_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(targets)
}

fn insert_target(
    conn: &Connection,
    target: &Target,
) -> Result<Target, StoreError> {
    conn.execute(
        "INSERT INTO targets (user_id, assigned_by, parent_target_id, title, amount,
           period_start, period_end, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            target.user_id.get(),
            target.assigned_by.get(),
            target.parent_target_id.map(TargetId::get),
            target.title,
            amount_sql(target.amount)?,
            target.period.start,
            target.period.end,
            target.created_at
        ],
    )?;
    load_target(conn, TargetId(conn.last_insert_rowid()))
}

impl Store {
    /// Assigns a fresh top-level target to somebody the actor manages.
    pub fn assign_target(&mut self, actor: &User, new: &NewTarget) -> Result<Target, StoreError> {
        let (title, period) = new.validate()?;
        let assignee = load_user(&self.conn, new.user_id)?;
        if !manages(&self.conn, actor, assignee.id)? {
            return Err(DomainError::forbidden(format!(
                "user {} is outside your team",
                assignee.id
            ))
            .into());
        }
        if !assignee.active {
            return Err(DomainError::Conflict(format!("user {} is inactive", assignee.id)).into());
        }
        let draft = Target {
            id: TargetId(0),
            user_id: assignee.id,
            assigned_by: actor.id,
            parent_target_id: None,
            title,
            amount: new.amount,
            period,
            created_at: self.now(),
        };
        insert_target(&self.conn, &draft)
    }

    pub fn get_target(&self, actor: &User, id: TargetId) -> Result<Target, StoreError> {
        let target = load_target(&self.conn, id)?;
        if !can_view_target(&self.conn, actor, &target)? {
            return Err(DomainError::forbidden(format!("target {id} is not visible to you")).into());
        }
        Ok(target)
    }

    /// Splits target `id` among direct subordinates of its assignee.
    pub fn divide_target(
        &mut self,
        actor: &User,
        id: TargetId,
        allocations: &[Allocation],
    ) -> Result<Division, StoreError> {
        let now = self.now();
        let tx = self.conn.transaction()?;
        let target = load_target(&tx, id)?;
        if actor.id != target.user_id && !actor.role.is_admin() {
            return Err(DomainError::forbidden(
                "only the assignee or an admin can divide a target",
            )
            .into());
        }

        let mut errors = Vec::new();
        for (idx, allocation) in allocations.iter().enumerate() {
            let field = format!("allocations[{idx}].user_id");
            let Some(recipient) = find_user(&tx, allocation.user_id)? else {
                errors.push(ValidationError::new(field, "unknown user"));
                continue;
            };
            if recipient.parent_id != Some(target.user_id) {
                errors.push(ValidationError::new(
                    field,
                    format!("user {} is not a direct subordinate of the assignee", recipient.id),
                ));
            } else if !recipient.active {
                errors.push(ValidationError::new(
                    field,
                    format!("user {} is inactive", recipient.id),
                ));
            }
        }
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors).into());
        }
        for allocation in allocations {
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM targets WHERE parent_target_id = ?1 AND user_id = ?2",
                    params![id.get(), allocation.user_id.get()],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(existing) = existing {
                return Err(DomainError::Conflict(format!(
                    "user {} already holds target {existing} from this division",
                    allocation.user_id
                ))
                .into());
            }
        }

        let plan = plan_division(target.amount, divided_for(&tx, id)?, allocations)?;
        let mut children = Vec::with_capacity(plan.allocations.len());
        for allocation in &plan.allocations {
            let draft = Target {
                id: TargetId(0),
                user_id: allocation.user_id,
                assigned_by: actor.id,
                parent_target_id: Some(id),
                title: target.title.clone(),
                amount: allocation.amount,
                period: target.period,
                created_at: now,
            };
            children.push(insert_target(&tx, &draft)?);
        }
        tx.commit()?;
        Ok(Division { children, plan })
    }

    pub fn target_progress(&self, actor: &User, id: TargetId) -> Result<TargetProgress, StoreError> {
        let target = self.get_target(actor, id)?;
        progress_of(&self.conn, &target)
    }

    /// Targets assigned to `user`, latest period first.
    pub fn list_targets(&self, actor: &User, user: UserId) -> Result<Vec<Target>, StoreError> {
        if actor.id != user && !manages(&self.conn, actor, user)? {
            return Err(DomainError::forbidden(format!("user {user} is outside your team")).into());
        }
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TARGET_COLUMNS} FROM targets WHERE user_id = ?1
             ORDER BY period_start DESC, id DESC"
        ))?;
        let targets = stmt
            .query_map(params![user.get()], target_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(targets)
    }
}
