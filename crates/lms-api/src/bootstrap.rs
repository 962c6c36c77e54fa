//! # Directory Bootstrap
//!
//! Builds the [`AppState`] at startup and, when `LMS_SEED_FILE` is set,
//! loads departments and users from a YAML seed:
//!
//! ```yaml
//! departments:
//!   - name: Computer Science
//!     school: Engineering
//! users:
//!   - name: Dana Dean
//!     email: dean@uni.example
//!     role: dean
//!   - name: Harriet Hod
//!     email: hod@uni.example
//!     role: hod
//!     department: Computer Science
//! ```
//!
//! Users refer to departments by name. `id` fields pin UUIDs so bearer
//! tokens and stored courses stay valid across restarts. They are optional
//! in-memory, but required when a database is configured: an unpinned entry
//! would get a fresh id on every start and orphan what was stored under the
//! old one. The whole seed is validated before anything is inserted; one bad
//! entry rejects the file.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::Utc;
use lms_core::{validate_name, DepartmentId, Role, UserId};
use serde::Deserialize;
use uuid::Uuid;

use crate::state::{AppConfig, AppState, DepartmentRecord, UserRecord};

const MAX_NAME_CHARS: usize = 120;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors during startup seeding.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Seed file not found at the given path.
    #[error("seed file not found: {path}")]
    SeedNotFound { path: String },

    /// Seed parsed but failed validation.
    #[error("invalid seed file: {errors:?}")]
    InvalidSeed { errors: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// ---------------------------------------------------------------------------
// Seed document
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Seed {
    #[serde(default)]
    departments: Vec<SeedDepartment>,
    #[serde(default)]
    users: Vec<SeedUser>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedDepartment {
    id: Option<Uuid>,
    name: String,
    school: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedUser {
    id: Option<Uuid>,
    name: String,
    email: String,
    role: String,
    department: Option<String>,
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Build application state, seeding the directory if configured.
///
/// Without a seed file the state starts empty; directory records can then
/// be created through the API with the service token.
pub fn bootstrap(
    config: AppConfig,
    db_pool: Option<sqlx::PgPool>,
) -> Result<AppState, BootstrapError> {
    let seed_file = config.seed_file.clone();
    let require_ids = db_pool.is_some();
    let state = AppState::with_config(config, db_pool);

    match seed_file {
        Some(path) => {
            let (departments, users) = load_seed(&path, require_ids)?;
            tracing::info!(
                path = %path.display(),
                departments = departments.len(),
                users = users.len(),
                "loaded directory seed"
            );
            for department in departments {
                state.departments.insert(*department.id.as_uuid(), department);
            }
            for user in users {
                state.users.insert(*user.id.as_uuid(), user);
            }
        }
        None => tracing::info!("no LMS_SEED_FILE set, starting with an empty directory"),
    }

    Ok(state)
}

/// Parse and validate a seed file into directory records.
fn load_seed(path: &Path, require_ids: bool) -> Result<DirectoryRecords, BootstrapError> {
    if !path.exists() {
        return Err(BootstrapError::SeedNotFound {
            path: path.display().to_string(),
        });
    }
    let raw = std::fs::read_to_string(path)?;
    let seed: Seed = if raw.trim().is_empty() {
        Seed::default()
    } else {
        serde_yaml::from_str(&raw)?
    };
    build_records(seed, require_ids)
}

type DirectoryRecords = (Vec<DepartmentRecord>, Vec<UserRecord>);

fn build_records(seed: Seed, require_ids: bool) -> Result<DirectoryRecords, BootstrapError> {
    let now = Utc::now();
    let mut errors = Vec::new();

    if require_ids {
        let unpinned = seed
            .departments
            .iter()
            .enumerate()
            .filter(|(_, d)| d.id.is_none())
            .map(|(i, _)| format!("departments[{i}]: id is required when DATABASE_URL is set"))
            .chain(
                seed.users
                    .iter()
                    .enumerate()
                    .filter(|(_, u)| u.id.is_none())
                    .map(|(i, _)| format!("users[{i}]: id is required when DATABASE_URL is set")),
            );
        errors.extend(unpinned);
    }

    let mut departments = Vec::with_capacity(seed.departments.len());
    let mut by_name: HashMap<String, DepartmentId> = HashMap::new();
    for (i, entry) in seed.departments.into_iter().enumerate() {
        let name = match validate_name("name", &entry.name, MAX_NAME_CHARS) {
            Ok(name) => name,
            Err(e) => {
                errors.push(format!("departments[{i}]: {e}"));
                continue;
            }
        };
        let school = match validate_name("school", &entry.school, MAX_NAME_CHARS) {
            Ok(school) => school,
            Err(e) => {
                errors.push(format!("departments[{i}]: {e}"));
                continue;
            }
        };
        let id = entry.id.map(DepartmentId::from_uuid).unwrap_or_default();
        if by_name.insert(name.to_lowercase(), id).is_some() {
            errors.push(format!("departments[{i}]: duplicate department '{name}'"));
            continue;
        }
        departments.push(DepartmentRecord {
            id,
            name,
            school,
            created_at: now,
        });
    }

    let mut users = Vec::with_capacity(seed.users.len());
    let mut emails = HashSet::new();
    for (i, entry) in seed.users.into_iter().enumerate() {
        match build_user(entry, &by_name, now) {
            Ok(user) if !emails.insert(user.email.clone()) => {
                errors.push(format!("users[{i}]: duplicate email '{}'", user.email));
            }
            Ok(user) => users.push(user),
            Err(e) => errors.push(format!("users[{i}]: {e}")),
        }
    }

    let mut ids = HashSet::new();
    for id in departments
        .iter()
        .map(|d| *d.id.as_uuid())
        .chain(users.iter().map(|u| *u.id.as_uuid()))
    {
        if !ids.insert(id) {
            errors.push(format!("id {id} is used more than once"));
        }
    }

    if errors.is_empty() {
        Ok((departments, users))
    } else {
        Err(BootstrapError::InvalidSeed { errors })
    }
}

fn build_user(
    entry: SeedUser,
    departments: &HashMap<String, DepartmentId>,
    now: chrono::DateTime<Utc>,
) -> Result<UserRecord, String> {
    let name = validate_name("name", &entry.name, MAX_NAME_CHARS).map_err(|e| e.to_string())?;
    let email = entry.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(format!("'{}' is not a valid email address", entry.email));
    }
    let role = Role::parse(&entry.role).map_err(|e| e.to_string())?;

    let department_id = match (role, entry.department) {
        (Role::Dean, None) => None,
        (Role::Dean, Some(_)) => return Err("deans do not belong to a department".into()),
        (_, None) => return Err(format!("{} requires a department", role.as_str())),
        (_, Some(dept)) => match departments.get(&dept.trim().to_lowercase()) {
            Some(id) => Some(*id),
            None => return Err(format!("unknown department '{dept}'")),
        },
    };

    Ok(UserRecord {
        id: entry.id.map(UserId::from_uuid).unwrap_or_default(),
        name,
        email,
        role,
        department_id,
        created_at: now,
    })
}
