use std::io::Write;

use super::CommandError;
use crate::session::Session;
use crate::storage::DatabaseError;

pub(super) async fn register<W: Write>(
    session: &mut Session,
    name: &str,
    out: &mut W,
) -> Result<(), CommandError> {
    let user = match session.db.create_user(name).await {
        Ok(user) => user,
        Err(DatabaseError::Duplicate(_)) => return Err(CommandError::UserExists(name.to_string())),
        Err(e) => return Err(e.into()),
    };
    session.set_current_user(&user.name)?;

    tracing::info!(user = %user.name, id = user.id, "Registered user");
    writeln!(
        out,
        "User {} has been created (id {}, created {})",
        user.name,
        user.id,
        user.created_at.to_rfc3339()
    )?;
    Ok(())
}

pub(super) async fn login<W: Write>(
    session: &mut Session,
    name: &str,
    out: &mut W,
) -> Result<(), CommandError> {
    let user = session
        .db
        .get_user_by_name(name)
        .await?
        .ok_or_else(|| CommandError::UnknownUser(name.to_string()))?;
    session.set_current_user(&user.name)?;

    writeln!(out, "User has been set")?;
    Ok(())
}

/// Deletes every user. Feeds stay (ownerless); follows go with their users.
pub(super) async fn reset<W: Write>(session: &mut Session, out: &mut W) -> Result<(), CommandError> {
    let removed = session.db.delete_all_users().await?;
    tracing::info!(removed, "Deleted all users");
    writeln!(out, "users database reset successfully")?;
    Ok(())
}

pub(super) async fn list<W: Write>(session: &mut Session, out: &mut W) -> Result<(), CommandError> {
    for user in session.db.list_users().await? {
        if session.is_current_user(&user.name) {
            writeln!(out, "* {} (current)", user.name)?;
        } else {
            writeln!(out, "* {}", user.name)?;
        }
    }
    Ok(())
}
