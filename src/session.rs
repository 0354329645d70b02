use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use crate::api::{ApiClient, DEFAULT_API_BASE};
use crate::config::ConfigBroadcaster;
use crate::error::ApiError;
use crate::lookup::LookupCache;
use crate::models::{FeeStructure, Id, LoginResponse, Subject};
use crate::storage::{
    LocalStore, BRANCH_ID_KEY, ROLE_KEY, SESSION_ID_KEY, STUDENT_ID_KEY, TOKEN_KEY,
};

pub const LOCAL_STORE_FILE: &str = "erp_local_storage.json";
pub const REPORTS_DIR: &str = "reports";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Admin,
    Teacher,
    Student,
    Staff(String),
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" | "super_admin" | "superadmin" => Role::Admin,
            "teacher" | "faculty" => Role::Teacher,
            "student" => Role::Student,
            other => Role::Staff(other.to_string()),
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Staff(_))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Teacher => write!(f, "teacher"),
            Role::Student => write!(f, "student"),
            Role::Staff(name) => write!(f, "{}", name),
        }
    }
}

/// Everything a screen needs to talk to the backend, created once at start-up
/// and handed to each screen instead of living in globals. Cheap to clone;
/// clones share the same store, client and caches.
#[derive(Clone)]
pub struct Session {
    pub store: Arc<LocalStore>,
    pub api: ApiClient,
    pub config: Arc<ConfigBroadcaster<ApiClient>>,
    subjects: Arc<LookupCache<Id, Vec<Subject>>>,
    fee_structures: Arc<LookupCache<Id, FeeStructure>>,
    data_dir: PathBuf,
}

impl Session {
    pub fn new(base_url: impl Into<String>, store: Arc<LocalStore>, data_dir: PathBuf) -> Self {
        let api = ApiClient::new(base_url, store.clone());
        let config = Arc::new(ConfigBroadcaster::new(api.clone(), store.clone()));
        Self {
            store,
            api,
            config,
            subjects: Arc::new(LookupCache::new("course-subjects")),
            fee_structures: Arc::new(LookupCache::new("fee-structures")),
            data_dir,
        }
    }

    /// Reads `ERP_API_BASE_URL` and `ERP_DATA_DIR`.
    pub fn from_env() -> Self {
        let base_url = std::env::var("ERP_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let data_dir = std::env::var("ERP_DATA_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."));
        let store = Arc::new(LocalStore::open(data_dir.join(LOCAL_STORE_FILE)));
        info!(%base_url, data_dir = %data_dir.display(), "session created");
        Self::new(base_url, store, data_dir)
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join(REPORTS_DIR)
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.get(TOKEN_KEY).is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.store.get(ROLE_KEY).map(|r| Role::parse(&r))
    }

    pub fn student_id(&self) -> Option<Id> {
        self.store.get(STUDENT_ID_KEY).map(Id)
    }

    /// Persists what the login answer carries for later runs.
    pub fn begin(&self, login: &LoginResponse) -> Role {
        let role = Role::parse(&login.role());
        self.store.set(TOKEN_KEY, login.token.clone());
        self.store.set(ROLE_KEY, role.to_string());
        let student_id = login.user.as_ref().and_then(|u| match (&u.student_id, &role) {
            (Some(id), _) => Some(id.clone()),
            (None, Role::Student) => u.id.clone(),
            _ => None,
        });
        let optional = [
            (SESSION_ID_KEY, login.active_session_id.clone()),
            (BRANCH_ID_KEY, login.active_branch_id.clone()),
            (STUDENT_ID_KEY, student_id),
        ];
        for (key, value) in optional {
            match value {
                Some(id) => self.store.set(key, id.0),
                None => self.store.remove(key),
            }
        }
        info!(%role, "session started");
        role
    }

    /// Ends the session: credentials are dropped and lookup caches emptied.
    pub fn end(&self) {
        for key in [TOKEN_KEY, ROLE_KEY, SESSION_ID_KEY, BRANCH_ID_KEY, STUDENT_ID_KEY] {
            self.store.remove(key);
        }
        debug!(
            subjects = self.subjects.len(),
            fee_structures = self.fee_structures.len(),
            "dropping lookup caches"
        );
        self.subjects.clear();
        self.fee_structures.clear();
        info!("session ended");
    }

    pub async fn course_subjects(&self, course_id: Id) -> Result<Arc<Vec<Subject>>, ApiError> {
        let api = self.api.clone();
        self.subjects
            .get(course_id, |id| async move { api.subjects(&id).await })
            .await
    }

    pub async fn fee_structure(&self, id: Id) -> Result<Arc<FeeStructure>, ApiError> {
        let api = self.api.clone();
        self.fee_structures
            .get(id, |id| async move { api.fee_structure(&id).await })
            .await
    }

    pub fn cached_subjects(&self, course_id: &Id) -> Option<Arc<Vec<Subject>>> {
        self.subjects.peek(course_id)
    }

    pub fn cached_fee_structure(&self, id: &Id) -> Option<Arc<FeeStructure>> {
        self.fee_structures.peek(id)
    }
}

pub fn subjects_text(subjects: &[Subject]) -> String {
    if subjects.is_empty() {
        return "No subjects".to_string();
    }
    subjects.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LoginUser;

    fn session() -> Session {
        Session::new("http://erp.test", Arc::new(LocalStore::in_memory()), PathBuf::from("target"))
    }

    #[test]
    fn roles_parse_loosely() {
        assert_eq!(Role::parse("Admin"), Role::Admin);
        assert_eq!(Role::parse("faculty"), Role::Teacher);
        assert_eq!(Role::parse("accountant"), Role::Staff("accountant".into()));
        assert!(Role::parse("accountant").is_staff());
        assert!(!Role::Student.is_staff());
    }

    #[test]
    fn student_login_persists_student_id() {
        let session = session();
        let role = session.begin(&LoginResponse {
            token: "tok".into(),
            user: Some(LoginUser { id: Some(Id::from("55")), name: None, role: "student".into(), student_id: None }),
            role: None,
            active_session_id: Some(Id::from("2025")),
            active_branch_id: None,
        });
        assert_eq!(role, Role::Student);
        assert!(session.is_authenticated());
        assert_eq!(session.student_id(), Some(Id::from("55")));
        assert_eq!(session.store.get(SESSION_ID_KEY).as_deref(), Some("2025"));
    }

    #[tokio::test]
    async fn end_clears_credentials_and_caches() {
        let session = session();
        session.store.set(TOKEN_KEY, "tok");
        session
            .subjects
            .get(Id::from("c1"), |_| async { Ok(Vec::new()) })
            .await
            .unwrap();
        assert!(session.cached_subjects(&Id::from("c1")).is_some());

        session.end();
        assert!(!session.is_authenticated());
        assert!(session.cached_subjects(&Id::from("c1")).is_none());
    }

    #[test]
    fn subject_names_are_joined() {
        let subjects = vec![
            Subject { id: Id::from("1"), name: "Maths".into(), code: None },
            Subject { id: Id::from("2"), name: "Physics".into(), code: None },
        ];
        assert_eq!(subjects_text(&subjects), "Maths, Physics");
        assert_eq!(subjects_text(&[]), "No subjects");
    }
}
