//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! The in-memory stores are the source of truth while the process runs.
//! When a database pool is configured, departments, users, courses,
//! arrangements and sections are written through to Postgres and hydrated
//! back on startup.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lms_core::{CourseId, DepartmentId, Role, SectionId, UserId};
use lms_state::{ContentArrangement, Course};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::security::SecurityLog;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// The lock is `parking_lot` and is never held across `.await` points.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Insert a record unless an existing record satisfies `clashes`.
    ///
    /// Check and insert run under one write lock, so two concurrent
    /// requests cannot both claim the same unique value. Returns the
    /// clashing record on conflict.
    pub fn insert_unless(
        &self,
        id: Uuid,
        value: T,
        clashes: impl Fn(&T) -> bool,
    ) -> Result<(), T> {
        let mut guard = self.data.write();
        if let Some(existing) = guard.values().find(|v| clashes(v)) {
            return Err(existing.clone());
        }
        guard.insert(id, value);
        Ok(())
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// List records matching a predicate.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.data.read().values().filter(|v| pred(v)).cloned().collect()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure may inspect the current value, check preconditions and
    /// mutate it, all under a single write lock. Returns `None` if the
    /// record doesn't exist.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Remove a record by ID.
    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Directory Records --------------------------------------------------------

/// Academic department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentRecord {
    pub id: DepartmentId,
    pub name: String,
    /// School (faculty) the department belongs to.
    pub school: String,
    pub created_at: DateTime<Utc>,
}

/// A person known to the LMS. One role per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    /// Stored lower-case.
    pub email: String,
    pub role: Role,
    /// `None` only for deans.
    pub department_id: Option<DepartmentId>,
    pub created_at: DateTime<Utc>,
}

/// A teaching section of a course: one teacher, many students.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionRecord {
    pub id: SectionId,
    pub course_id: CourseId,
    pub name: String,
    pub teacher_id: Option<UserId>,
    /// Enrolled students in enrollment order. No duplicates.
    pub student_ids: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl SectionRecord {
    pub fn is_member(&self, user: UserId) -> bool {
        self.teacher_id == Some(user) || self.student_ids.contains(&user)
    }
}

// -- Notifications & Chat -----------------------------------------------------

/// What triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ArrangementSubmitted,
    ArrangementApproved,
    ArrangementRejected,
    CourseLaunched,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArrangementSubmitted => "arrangement_submitted",
            Self::ArrangementApproved => "arrangement_approved",
            Self::ArrangementRejected => "arrangement_rejected",
            Self::CourseLaunched => "course_launched",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub recipient_id: UserId,
    pub kind: NotificationKind,
    pub course_id: CourseId,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A message posted to a section's conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageRecord {
    pub id: Uuid,
    pub section_id: SectionId,
    /// `None` when posted with a service token.
    pub author_id: Option<UserId>,
    pub author_role: Role,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// -- Configuration ------------------------------------------------------------

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_RATE_LIMIT_PER_MINUTE: u64 = 1000;

/// Application configuration.
///
/// Custom `Debug` redacts the auth token and database URL.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Shared bearer secret. `None` disables authentication.
    pub auth_token: Option<String>,
    /// Postgres URL. `None` runs in-memory only.
    pub database_url: Option<String>,
    /// YAML file with departments and users loaded at startup.
    pub seed_file: Option<PathBuf>,
    pub rate_limit_per_minute: u64,
}

impl AppConfig {
    /// Build configuration from `PORT`, `AUTH_TOKEN`, `DATABASE_URL`,
    /// `LMS_SEED_FILE` and `RATE_LIMIT_PER_MINUTE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT").map(|p| p.parse::<u16>()) {
            Some(Ok(port)) => port,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "invalid PORT, using default {DEFAULT_PORT}");
                DEFAULT_PORT
            }
            None => DEFAULT_PORT,
        };
        let rate_limit = non_empty("RATE_LIMIT_PER_MINUTE").map(|v| v.parse::<u64>());
        let rate_limit_per_minute = match rate_limit {
            Some(Ok(n)) if n > 0 => n,
            Some(_) => {
                tracing::warn!(
                    "invalid RATE_LIMIT_PER_MINUTE, using default {DEFAULT_RATE_LIMIT_PER_MINUTE}"
                );
                DEFAULT_RATE_LIMIT_PER_MINUTE
            }
            None => DEFAULT_RATE_LIMIT_PER_MINUTE,
        };

        Self {
            port,
            auth_token: non_empty("AUTH_TOKEN"),
            database_url: non_empty("DATABASE_URL"),
            seed_file: non_empty("LMS_SEED_FILE").map(PathBuf::from),
            rate_limit_per_minute,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("seed_file", &self.seed_file)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            auth_token: None,
            database_url: None,
            seed_file: None,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
        }
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state. Cheap to clone; every store is `Arc`-backed.
#[derive(Debug, Clone)]
pub struct AppState {
    pub departments: Store<DepartmentRecord>,
    pub users: Store<UserRecord>,
    pub courses: Store<Course>,
    /// Keyed by course id. Exactly one arrangement per course.
    pub arrangements: Store<ContentArrangement>,
    pub sections: Store<SectionRecord>,
    pub notifications: Store<NotificationRecord>,
    /// Per-section conversations, append-only, oldest first.
    pub chats: Arc<RwLock<HashMap<SectionId, Vec<ChatMessageRecord>>>>,
    pub security_log: SecurityLog,

    /// When `Some`, directory records, courses, arrangements, sections and
    /// audit events are persisted.
    pub db_pool: Option<PgPool>,

    pub config: AppConfig,
}

impl AppState {
    /// Empty state with default configuration and no database.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            departments: Store::new(),
            users: Store::new(),
            courses: Store::new(),
            arrangements: Store::new(),
            sections: Store::new(),
            notifications: Store::new(),
            chats: Arc::new(RwLock::new(HashMap::new())),
            security_log: SecurityLog::default(),
            db_pool,
            config,
        }
    }

    /// Look up a user by id.
    pub fn user(&self, id: UserId) -> Option<UserRecord> {
        self.users.get(id.as_uuid())
    }

    /// Look up a course by id.
    pub fn course(&self, id: CourseId) -> Option<Course> {
        self.courses.get(id.as_uuid())
    }

    /// Sections belonging to a course.
    pub fn sections_of(&self, course_id: CourseId) -> Vec<SectionRecord> {
        self.sections.filter(|s| s.course_id == course_id)
    }

    /// Load persisted records into the in-memory stores.
    ///
    /// Called once on startup, after the seed has been applied. Seed records
    /// win over persisted ones with the same id and are then written through,
    /// so later restarts see them even without the seed. Startup is refused
    /// when anything references a department, user or course that neither
    /// the seed nor the database knows about.
    pub async fn hydrate_from_db(&self) -> Result<(), HydrateError> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let persisted = PersistedRecords {
            departments: crate::db::departments::load_all(pool).await?,
            users: crate::db::users::load_all(pool).await?,
            courses: crate::db::courses::load_all(pool).await?,
            arrangements: crate::db::arrangements::load_all(pool).await?,
            sections: crate::db::sections::load_all(pool).await?,
        };
        let counts = persisted.counts();
        self.merge_persisted(persisted);

        let errors = self.dangling_references();
        if !errors.is_empty() {
            return Err(HydrateError::DanglingReferences { errors });
        }

        for department in self.departments.list() {
            crate::db::departments::upsert(pool, &department).await?;
        }
        for user in self.users.list() {
            crate::db::users::upsert(pool, &user).await?;
        }

        tracing::info!(
            departments = counts[0],
            users = counts[1],
            courses = counts[2],
            arrangements = counts[3],
            sections = counts[4],
            "Hydrated in-memory stores from database"
        );
        Ok(())
    }

    /// Insert persisted records. Directory records already present (from the
    /// seed) are kept. A course without a stored arrangement gets a fresh
    /// open one so the one-arrangement-per-course invariant holds.
    fn merge_persisted(&self, persisted: PersistedRecords) {
        for department in persisted.departments {
            if !self.departments.contains(department.id.as_uuid()) {
                self.departments.insert(*department.id.as_uuid(), department);
            }
        }
        for user in persisted.users {
            if !self.users.contains(user.id.as_uuid()) {
                self.users.insert(*user.id.as_uuid(), user);
            }
        }
        for course in persisted.courses {
            self.courses.insert(*course.id.as_uuid(), course);
        }
        for arrangement in persisted.arrangements {
            self.arrangements
                .insert(*arrangement.course_id.as_uuid(), arrangement);
        }
        for section in persisted.sections {
            self.sections.insert(*section.id.as_uuid(), section);
        }

        for course in self.courses.list() {
            if !self.arrangements.contains(course.id.as_uuid()) {
                tracing::warn!(
                    course_id = %course.id,
                    "course has no stored arrangement, starting an empty one"
                );
                self.arrangements
                    .insert(*course.id.as_uuid(), ContentArrangement::new(course.id));
            }
        }
    }

    /// Every reference to a record that does not exist, plus email clashes
    /// between seed and persisted users.
    pub fn dangling_references(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let department_exists = |id: DepartmentId| self.departments.contains(id.as_uuid());
        let user_exists = |id: UserId| self.users.contains(id.as_uuid());

        let mut emails = HashSet::new();
        for user in self.users.list() {
            if !emails.insert(user.email.clone()) {
                errors.push(format!("email {} belongs to more than one user", user.email));
            }
            if let Some(department) = user.department_id.filter(|d| !department_exists(*d)) {
                errors.push(format!("user {} references missing {department}", user.id));
            }
        }
        for course in self.courses.list() {
            if !department_exists(course.department_id) {
                errors.push(format!(
                    "course {} references missing {}",
                    course.code, course.department_id
                ));
            }
            if let Some(coordinator) = course.coordinator_id.filter(|u| !user_exists(*u)) {
                errors.push(format!("course {} references missing {coordinator}", course.code));
            }
        }
        for arrangement in self.arrangements.list() {
            if !self.courses.contains(arrangement.course_id.as_uuid()) {
                errors.push(format!("arrangement for missing {}", arrangement.course_id));
            }
        }
        for section in self.sections.list() {
            if !self.courses.contains(section.course_id.as_uuid()) {
                errors.push(format!(
                    "section {} references missing {}",
                    section.id, section.course_id
                ));
            }
            for user in section.teacher_id.iter().chain(&section.student_ids) {
                if !user_exists(*user) {
                    errors.push(format!("section {} references missing {user}", section.id));
                }
            }
        }
        errors.sort();
        errors
    }
}

/// Records read back from Postgres at startup.
struct PersistedRecords {
    departments: Vec<DepartmentRecord>,
    users: Vec<UserRecord>,
    courses: Vec<Course>,
    arrangements: Vec<ContentArrangement>,
    sections: Vec<SectionRecord>,
}

impl PersistedRecords {
    fn counts(&self) -> [usize; 5] {
        [
            self.departments.len(),
            self.users.len(),
            self.courses.len(),
            self.arrangements.len(),
            self.sections.len(),
        ]
    }
}

/// Errors while loading persisted state at startup.
#[derive(Debug, thiserror::Error)]
pub enum HydrateError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Persisted or seeded records point at records that do not exist.
    #[error("inconsistent persisted state: {errors:?}")]
    DanglingReferences { errors: Vec<String> },
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_department(id: Uuid, name: &str) -> DepartmentRecord {
        DepartmentRecord {
            id: DepartmentId::from_uuid(id),
            name: name.to_string(),
            school: "Engineering".to_string(),
            created_at: Utc::now(),
        }
    }

    // -- Store tests ----------------------------------------------------------

    #[test]
    fn store_insert_get_list() {
        let store = Store::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(store.insert(a, sample_department(a, "CS")).is_none());
        assert!(store.insert(a, sample_department(a, "CS")).is_some());
        store.insert(b, sample_department(b, "EE"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&a).unwrap().name, "CS");
        assert_eq!(store.filter(|d| d.name == "EE").len(), 1);
    }

    #[test]
    fn store_insert_unless_detects_clash() {
        let store = Store::new();
        let a = Uuid::new_v4();
        store
            .insert_unless(a, sample_department(a, "CS"), |d| d.name == "CS")
            .unwrap();
        let b = Uuid::new_v4();
        let clash = store
            .insert_unless(b, sample_department(b, "CS"), |d| d.name == "CS")
            .unwrap_err();
        assert_eq!(clash.id.as_uuid(), &a);
        assert!(!store.contains(&b));
    }

    #[test]
    fn store_try_update_and_remove() {
        let store = Store::new();
        let id = Uuid::new_v4();
        store.insert(id, sample_department(id, "CS"));

        let result: Option<Result<(), String>> = store.try_update(&id, |d| {
            d.name = "Computing".into();
            Ok(())
        });
        assert!(matches!(result, Some(Ok(()))));
        assert_eq!(store.get(&id).unwrap().name, "Computing");

        let missing: Option<Result<(), String>> = store.try_update(&Uuid::new_v4(), |_| Ok(()));
        assert!(missing.is_none());

        assert!(store.remove(&id).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn store_clone_shares_underlying_data() {
        let store = Store::new();
        let clone = store.clone();
        let id = Uuid::new_v4();
        clone.insert(id, sample_department(id, "CS"));
        assert!(store.contains(&id));
    }

    // -- Config tests ---------------------------------------------------------

    #[test]
    fn config_from_lookup_reads_values() {
        let config = AppConfig::from_lookup(|key| match key {
            "PORT" => Some("9090".into()),
            "AUTH_TOKEN" => Some("s3cret".into()),
            "LMS_SEED_FILE" => Some("/etc/lms/seed.yaml".into()),
            "RATE_LIMIT_PER_MINUTE" => Some("60".into()),
            _ => None,
        });
        assert_eq!(config.port, 9090);
        assert_eq!(config.auth_token.as_deref(), Some("s3cret"));
        assert_eq!(config.seed_file, Some(PathBuf::from("/etc/lms/seed.yaml")));
        assert_eq!(config.rate_limit_per_minute, 60);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn config_falls_back_on_bad_values() {
        let config = AppConfig::from_lookup(|key| match key {
            "PORT" => Some("not-a-port".into()),
            "AUTH_TOKEN" => Some("   ".into()),
            "RATE_LIMIT_PER_MINUTE" => Some("0".into()),
            _ => None,
        });
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.auth_token.is_none());
        assert_eq!(config.rate_limit_per_minute, DEFAULT_RATE_LIMIT_PER_MINUTE);
    }

    #[test]
    fn config_debug_redacts_secrets() {
        let config = AppConfig {
            auth_token: Some("s3cret".into()),
            database_url: Some("postgres://lms:pw@db/lms".into()),
            ..AppConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("pw@db"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn section_membership() {
        let teacher = UserId::new();
        let student = UserId::new();
        let section = SectionRecord {
            id: SectionId::new(),
            course_id: CourseId::new(),
            name: "A".into(),
            teacher_id: Some(teacher),
            student_ids: vec![student],
            created_at: Utc::now(),
        };
        assert!(section.is_member(teacher));
        assert!(section.is_member(student));
        assert!(!section.is_member(UserId::new()));
    }

    // -- Hydration tests ------------------------------------------------------

    fn sample_user(role: Role, department: Option<DepartmentId>) -> UserRecord {
        let id = UserId::new();
        UserRecord {
            id,
            name: "Cora".into(),
            email: format!("{}@uni.example", id.as_uuid()),
            role,
            department_id: department,
            created_at: Utc::now(),
        }
    }

    fn no_records() -> PersistedRecords {
        PersistedRecords {
            departments: Vec::new(),
            users: Vec::new(),
            courses: Vec::new(),
            arrangements: Vec::new(),
            sections: Vec::new(),
        }
    }

    #[test]
    fn restart_with_pinned_seed_resolves_persisted_course() {
        // The seed pins the department id, so the stored course still resolves.
        let state = AppState::new();
        let cs = Uuid::new_v4();
        state.departments.insert(cs, sample_department(cs, "CS"));
        let cc = sample_user(Role::CourseCoordinator, Some(DepartmentId::from_uuid(cs)));
        state.users.insert(*cc.id.as_uuid(), cc.clone());

        let mut course = Course::new("CS101", "Intro", DepartmentId::from_uuid(cs)).unwrap();
        course.assign_coordinator(cc.id).unwrap();
        let mut persisted = no_records();
        persisted.departments.push(sample_department(cs, "Stale Name"));
        persisted.courses.push(course.clone());
        state.merge_persisted(persisted);

        assert!(state.dangling_references().is_empty());
        assert_eq!(state.departments.get(&cs).unwrap().name, "CS", "seed wins");
        assert!(state.arrangements.contains(course.id.as_uuid()));
    }

    #[test]
    fn course_of_unknown_department_is_reported() {
        // A seed without pinned ids mints a new department id on every start.
        let state = AppState::new();
        let reseeded = Uuid::new_v4();
        state.departments.insert(reseeded, sample_department(reseeded, "CS"));

        let course = Course::new("CS101", "Intro", DepartmentId::new()).unwrap();
        let student = UserId::new();
        let section = SectionRecord {
            id: SectionId::new(),
            course_id: course.id,
            name: "A".into(),
            teacher_id: None,
            student_ids: vec![student],
            created_at: Utc::now(),
        };
        let mut persisted = no_records();
        persisted.courses.push(course);
        persisted.sections.push(section);
        state.merge_persisted(persisted);

        let errors = state.dangling_references();
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors.iter().any(|e| e.starts_with("course CS101 references missing")));
        assert!(errors.iter().any(|e| e.contains(&student.to_string())));
    }

    #[test]
    fn email_clash_between_seed_and_database_is_reported() {
        let state = AppState::new();
        let seeded = sample_user(Role::Dean, None);
        state.users.insert(*seeded.id.as_uuid(), seeded.clone());

        let mut persisted = no_records();
        persisted.users.push(UserRecord {
            id: UserId::new(),
            ..seeded
        });
        state.merge_persisted(persisted);

        let errors = state.dangling_references();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("more than one user"));
    }

    #[tokio::test]
    async fn hydrate_without_pool_is_noop() {
        let state = AppState::new();
        state.hydrate_from_db().await.unwrap();
        assert!(state.courses.is_empty());
    }
}
