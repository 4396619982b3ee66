// SPDX-License-Identifier: Apache-2.0

use givehub_core::{generate_token, token_digest};
use givehub_model::{
    check_new_user_placement, derive_referral_code, normalize_email, normalize_name,
    normalize_phone, ChainMember, DomainError, NewUser, PublicReferral, ReferralCode, Role,
    SubordinateScope, User, UserId, ValidationError,
};
use rusqlite::{params, Connection, OptionalExtension};

use crate::rows::{user_from_row, TEAM_CTE, USER_COLUMNS};
use crate::{Store, StoreError};

const REFERRAL_CODE_ATTEMPTS: u32 = 64;

pub(crate) fn find_user(conn: &Connection, id: UserId) -> Result<Option<User>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id.get()],
            user_from_row,
        )
        .optional()?)
}

pub(crate) fn load_user(conn: &Connection, id: UserId) -> Result<User, StoreError> {
    find_user(conn, id)?.ok_or_else(|| DomainError::not_found("user", id).into())
}

/// True when `candidate` sits strictly below `ancestor`.
pub(crate) fn is_descendant(
    conn: &Connection,
    ancestor: UserId,
    candidate: UserId,
) -> Result<bool, StoreError> {
    if ancestor == candidate {
        return Ok(false);
    }
    let found: Option<i64> = conn
        .query_row(
            "WITH RECURSIVE up(id, parent_id) AS (
               SELECT id, parent_id FROM users WHERE id = ?1
               UNION ALL
               SELECT u.id, u.parent_id FROM users u JOIN up ON u.id = up.parent_id
             )
             SELECT id FROM up WHERE id = ?2 LIMIT 1",
            params![candidate.get(), ancestor.get()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Admins manage everybody else; other users manage their strict descendants.
pub(crate) fn manages(conn: &Connection, actor: &User, other: UserId) -> Result<bool, StoreError> {
    if actor.id == other {
        return Ok(false);
    }
    if actor.role.is_admin() {
        return Ok(true);
    }
    is_descendant(conn, actor.id, other)
}

/// `candidate` is `root` itself or below it.
pub(crate) fn in_team(conn: &Connection, root: UserId, candidate: UserId) -> Result<bool, StoreError> {
    Ok(root == candidate || is_descendant(conn, root, candidate)?)
}

pub(crate) fn active_referrer(conn: &Connection, code: &ReferralCode) -> Result<User, StoreError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE referral_code = ?1 AND active = 1"),
            params![code.as_str()],
            user_from_row,
        )
        .optional()?;
    user.ok_or_else(|| DomainError::UnknownReferralCode(code.to_string()).into())
}

/// The referrer followed by its ancestors, closest first.
pub(crate) fn referral_chain(conn: &Connection, referrer: UserId) -> Result<Vec<ChainMember>, StoreError> {
    let mut stmt = conn.prepare(
        "WITH RECURSIVE up(id, parent_id, depth) AS (
           SELECT id, parent_id, 0 FROM users WHERE id = ?1
           UNION ALL
           SELECT u.id, u.parent_id, up.depth + 1 FROM users u JOIN up ON u.id = up.parent_id
         )
         SELECT users.id, users.role, users.active
         FROM up JOIN users ON users.id = up.id
         ORDER BY up.depth",
    )?;
    let rows = stmt.query_map(params![referrer.get()], |row| {
        let role: String = row.get(1)?;
        Ok((row.get::<_, i64>(0)?, role, row.get::<_, bool>(2)?))
    })?;
    let mut chain = Vec::new();
    for row in rows {
        let (id, role, active) = row?;
        let role: Role = role
            .parse()
            .map_err(|e: ValidationError| StoreError::Corrupt(e.to_string()))?;
        chain.push(ChainMember {
            user_id: UserId(id),
            role,
            active,
        });
    }
    Ok(chain)
}

fn email_taken(conn: &Connection, email: &str) -> Result<bool, StoreError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

struct UserDraft<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    role: Role,
    parent_id: Option<UserId>,
}

fn insert_user(conn: &Connection, draft: &UserDraft<'_>, now: i64) -> Result<(User, String), StoreError> {
    if email_taken(conn, draft.email)? {
        return Err(DomainError::Conflict(format!("email {} is already registered", draft.email)).into());
    }
    let mut code = None;
    for nonce in 0..REFERRAL_CODE_ATTEMPTS {
        let candidate = derive_referral_code(draft.role, draft.email, now, nonce);
        let taken: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE referral_code = ?1",
                params![candidate.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_none() {
            code = Some(candidate);
            break;
        }
    }
    let code = code.ok_or_else(|| {
        StoreError::Domain(DomainError::Conflict(
            "could not allocate a unique referral code".to_string(),
        ))
    })?;

    let token = generate_token()?;
    conn.execute(
        "INSERT INTO users (name, email, phone, role, parent_id, referral_code, token_digest, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8)",
        params![
            draft.name,
            draft.email,
            draft.phone,
            draft.role.as_str(),
            draft.parent_id.map(UserId::get),
            code.as_str(),
            token_digest(&token),
            now
        ],
    )?;
    let user = load_user(conn, UserId(conn.last_insert_rowid()))?;
    Ok((user, token))
}

impl Store {
    /// Creates the root admin. Only one admin may ever exist.
    pub fn bootstrap_admin(
        &mut self,
        name: &str,
        email: &str,
        phone: &str,
    ) -> Result<(User, String), StoreError> {
        let mut errors = Vec::new();
        let name = normalize_name("name", name).map_err(|e| errors.push(e)).ok();
        let email = normalize_email(email).map_err(|e| errors.push(e)).ok();
        let phone = normalize_phone("phone", phone).map_err(|e| errors.push(e)).ok();
        let (Some(name), Some(email), Some(phone)) = (name, email, phone) else {
            return Err(DomainError::Validation(errors).into());
        };

        let now = self.now();
        let tx = self.conn.transaction()?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM users WHERE role = ?1 LIMIT 1",
                params![Role::Admin.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(DomainError::Conflict("an admin already exists".to_string()).into());
        }
        let draft = UserDraft {
            name: &name,
            email: &email,
            phone: &phone,
            role: Role::Admin,
            parent_id: None,
        };
        let created = insert_user(&tx, &draft, now)?;
        tx.commit()?;
        Ok(created)
    }

    /// Creates a user under `new.parent_id` (the actor when absent) and
    /// returns it together with its one-time API token.
    pub fn create_user(&mut self, actor: &User, new: NewUser) -> Result<(User, String), StoreError> {
        let new = new.validate()?;
        let now = self.now();
        let tx = self.conn.transaction()?;

        let parent_id = new.parent_id.unwrap_or(actor.id);
        let parent = load_user(&tx, parent_id)?;
        let in_subtree = in_team(&tx, actor.id, parent.id)?;
        check_new_user_placement(actor, &parent, in_subtree, new.role)?;

        let draft = UserDraft {
            name: &new.name,
            email: &new.email,
            phone: &new.phone,
            role: new.role,
            parent_id: Some(parent.id),
        };
        let created = insert_user(&tx, &draft, now)?;
        tx.commit()?;
        Ok(created)
    }

    /// Resolves a bearer token to its active owner.
    pub fn authenticate(&self, token: &str) -> Result<Option<User>, StoreError> {
        if token.trim().is_empty() {
            return Ok(None);
        }
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE token_digest = ?1 AND active = 1"),
                params![token_digest(token)],
                user_from_row,
            )
            .optional()?)
    }

    pub fn get_user(&self, id: UserId) -> Result<User, StoreError> {
        load_user(&self.conn, id)
    }

    /// A user as seen by `actor`: themselves or somebody they manage.
    pub fn view_user(&self, actor: &User, id: UserId) -> Result<User, StoreError> {
        let user = load_user(&self.conn, id)?;
        if actor.id != id && !manages(&self.conn, actor, id)? {
            return Err(DomainError::forbidden(format!("user {id} is outside your team")).into());
        }
        Ok(user)
    }

    pub fn resolve_referral(&self, raw: &str) -> Result<PublicReferral, StoreError> {
        let code = ReferralCode::parse(raw)?;
        active_referrer(&self.conn, &code)
            .map(|user| user.public_referral())
            .map_err(|err| match err {
                StoreError::Domain(DomainError::UnknownReferralCode(code)) => {
                    DomainError::not_found("referral code", code).into()
                }
                other => other,
            })
    }

    pub fn is_descendant(&self, ancestor: UserId, candidate: UserId) -> Result<bool, StoreError> {
        is_descendant(&self.conn, ancestor, candidate)
    }

    /// Direct reports or the whole subtree of `id`, ordered by role level then id.
    pub fn list_subordinates(
        &self,
        actor: &User,
        id: UserId,
        scope: SubordinateScope,
    ) -> Result<Vec<User>, StoreError> {
        let root = self.view_user(actor, id)?;
        let sql = match scope {
            SubordinateScope::Direct => {
                format!("SELECT {USER_COLUMNS} FROM users WHERE parent_id = ?1")
            }
            SubordinateScope::All => format!(
                "{TEAM_CTE} SELECT {USER_COLUMNS} FROM users
                 WHERE id IN (SELECT id FROM team) AND id != ?1"
            ),
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let mut users = stmt
            .query_map(params![root.id.get()], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        users.sort_by_key(|u| (u.role.level(), u.id));
        Ok(users)
    }

    pub fn deactivate_user(&mut self, actor: &User, id: UserId) -> Result<User, StoreError> {
        if actor.id == id {
            return Err(DomainError::forbidden("you cannot deactivate yourself").into());
        }
        let user = load_user(&self.conn, id)?;
        if !manages(&self.conn, actor, id)? {
            return Err(DomainError::forbidden(format!("user {id} is outside your team")).into());
        }
        if user.role.is_admin() {
            return Err(DomainError::forbidden("the admin cannot be deactivated").into());
        }
        self.conn.execute(
            "UPDATE users SET active = 0 WHERE id = ?1",
            params![id.get()],
        )?;
        load_user(&self.conn, id)
    }

    /// Moves `id` under `new_parent`. Admin only; cycles are refused.
    pub fn reassign_parent(
        &mut self,
        actor: &User,
        id: UserId,
        new_parent: UserId,
    ) -> Result<User, StoreError> {
        if !actor.role.is_admin() {
            return Err(DomainError::forbidden("only an admin can move users").into());
        }
        let tx = self.conn.transaction()?;
        let user = load_user(&tx, id)?;
        if user.role.is_admin() {
            return Err(DomainError::forbidden("the admin has no parent").into());
        }
        let parent = load_user(&tx, new_parent)?;
        if !parent.active {
            return Err(DomainError::Conflict(format!("parent user {new_parent} is inactive")).into());
        }
        if parent.id == user.id || is_descendant(&tx, user.id, parent.id)? {
            return Err(DomainError::invalid(
                "parent_id",
                "a user cannot be moved under itself or its own team",
            )
            .into());
        }
        if !parent.role.can_manage(user.role) {
            return Err(DomainError::invalid(
                "parent_id",
                format!("{} cannot be placed under {}", user.role, parent.role),
            )
            .into());
        }
        tx.execute(
            "UPDATE users SET parent_id = ?1 WHERE id = ?2",
            params![parent.id.get(), user.id.get()],
        )?;
        let moved = load_user(&tx, id)?;
        tx.commit()?;
        Ok(moved)
    }

    /// Issues a new token for `id`, invalidating the previous one.
    pub fn rotate_token(&mut self, actor: &User, id: UserId) -> Result<String, StoreError> {
        load_user(&self.conn, id)?;
        if actor.id != id && !manages(&self.conn, actor, id)? {
            return Err(DomainError::forbidden(format!("user {id} is outside your team")).into());
        }
        let token = generate_token()?;
        self.conn.execute(
            "UPDATE users SET token_digest = ?1 WHERE id = ?2",
            params![token_digest(&token), id.get()],
        )?;
        Ok(token)
    }
}
