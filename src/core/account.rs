//! Caller identity helpers and the local user mirror.
//!
//! Authentication happens outside this crate. Operations receive the resolved
//! caller as `Option<Uuid>`; `None` means "not logged in". Users are mirrored
//! into the `users` table the first time they call [`sync_user`], which also
//! assigns the configured default subscription package.

use crate::{
    core::outcome::MutationOutcome,
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

/// Profile fields supplied by the identity provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Optional contact phone
    #[serde(default)]
    pub phone: Option<String>,
}

/// Returns the caller id, or `Error::Unauthenticated` naming `action`.
///
/// # Errors
/// Returns `Error::Unauthenticated` when `caller` is `None`.
pub fn require_caller(caller: Option<Uuid>, action: &'static str) -> Result<Uuid> {
    match caller {
        Some(id) => Ok(id),
        None => Err(Error::Unauthenticated { action }),
    }
}

/// Loads the caller and checks the admin flag.
///
/// # Errors
/// Returns `Error::Unauthenticated` without a caller and a validation error
/// when the caller is unknown or not an admin.
pub async fn require_admin<C>(conn: &C, caller: Option<Uuid>, action: &'static str) -> Result<Uuid>
where
    C: ConnectionTrait,
{
    let caller_id = require_caller(caller, action)?;
    let is_admin = User::find_by_id(caller_id)
        .one(conn)
        .await?
        .is_some_and(|u| u.is_admin);

    if is_admin {
        Ok(caller_id)
    } else {
        Err(Error::validation("Admin access required"))
    }
}

/// Returns true when `caller` is a known admin user.
pub async fn is_admin<C>(conn: &C, caller: Option<Uuid>) -> Result<bool>
where
    C: ConnectionTrait,
{
    let Some(caller_id) = caller else {
        return Ok(false);
    };
    Ok(User::find_by_id(caller_id)
        .one(conn)
        .await?
        .is_some_and(|u| u.is_admin))
}

/// Retrieves a user by id.
pub async fn get_user(db: &DatabaseConnection, user_id: Uuid) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

async fn upsert_user(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    default_package: Option<&str>,
    profile: UserProfile,
) -> Result<(Uuid, bool)> {
    let caller_id = require_caller(caller, "sync your profile")?;
    if profile.name.trim().is_empty() || profile.email.trim().is_empty() {
        return Err(Error::validation("Name and email are required"));
    }

    let txn = db.begin().await?;

    // emails are unique across users
    let taken = User::find()
        .filter(user::Column::Email.eq(profile.email.as_str()))
        .filter(user::Column::Id.ne(caller_id))
        .one(&txn)
        .await?
        .is_some();
    if taken {
        return Err(Error::validation("Email already in use"));
    }

    let now = chrono::Utc::now();
    let created = if let Some(existing) = User::find_by_id(caller_id).one(&txn).await? {
        let mut active: user::ActiveModel = existing.into();
        active.name = Set(profile.name);
        active.email = Set(profile.email);
        active.phone = Set(profile.phone);
        active.updated_at = Set(now);
        active.update(&txn).await?;
        false
    } else {
        user::ActiveModel {
            id: Set(caller_id),
            name: Set(profile.name),
            email: Set(profile.email),
            phone: Set(profile.phone),
            subscription_package: Set(default_package.map(str::to_string)),
            is_admin: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        true
    };

    txn.commit().await?;
    Ok((caller_id, created))
}

/// Creates or refreshes the caller's user row from identity provider data.
///
/// New users start on `default_package`. Existing users keep their package and
/// admin flag; only profile fields are refreshed. An email already held by a
/// different user is rejected with `success: false`.
#[instrument(skip(db, profile))]
pub async fn sync_user(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    default_package: Option<&str>,
    profile: UserProfile,
) -> Result<MutationOutcome> {
    match upsert_user(db, caller, default_package, profile).await {
        Ok((user_id, true)) => {
            info!(%user_id, package = ?default_package, "Registered new user");
            Ok(MutationOutcome::ok("Profile created", user_id))
        }
        Ok((user_id, false)) => Ok(MutationOutcome::ok("Profile updated", user_id)),
        Err(e) => MutationOutcome::rejected(e),
    }
}
