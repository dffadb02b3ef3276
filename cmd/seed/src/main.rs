//! Bootstraps an administrator account.
//!
//! ```text
//! seed <username> <password>
//! ```
//!
//! Creates the user with the admin and student roles, or grants admin to an
//! existing user (the password is then left unchanged).

use std::collections::BTreeSet;

use anyhow::{bail, Context};
use auth_adapters::Argon2PasswordHasher;
use configs::Settings;
use domains::validation::{validate_password, validate_username};
use domains::{PasswordHasher, Role, User, UserRepository};
use secrecy::ExposeSecret;
use storage_adapters::SqliteStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [username, password] = args.as_slice() else {
        bail!("usage: seed <username> <password>");
    };

    let settings = Settings::load().context("loading settings")?;
    let store = SqliteStore::connect(
        settings.database.url.expose_secret(),
        settings.database.max_connections,
    )
    .await
    .context("opening database")?;

    if let Some(existing) = store.find_user_by_username(username).await? {
        let mut roles = existing.roles.clone();
        if !roles.insert(Role::Admin) {
            info!(username = %existing.username, "already an admin");
            return Ok(());
        }
        store.replace_roles(existing.id, &roles).await?;
        info!(username = %existing.username, "granted admin");
        return Ok(());
    }

    validate_username(username)?;
    validate_password(password)?;
    let hash = Argon2PasswordHasher::new().hash(password).await?;
    let roles = BTreeSet::from([Role::Admin, Role::Student]);
    let user = User::new(username.as_str(), hash, roles);
    store.insert_user(&user).await?;
    info!(username = %user.username, id = %user.id, "admin created");
    Ok(())
}
