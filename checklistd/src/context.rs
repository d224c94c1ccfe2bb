const UNKNOWN: &str = "unknown";
const ROOT_PATH: &str = "/";

/// Identifies the project folder and document a session works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceContext {
    pub project_id: String,
    pub path: String,
    pub user_email: String,
}

impl WorkspaceContext {
    pub fn new(
        project_id: impl Into<String>,
        path: impl Into<String>,
        user_email: impl Into<String>,
    ) -> Self {
        Self {
            project_id: non_empty_or(project_id.into(), UNKNOWN),
            path: non_empty_or(path.into(), ROOT_PATH),
            user_email: non_empty_or(user_email.into(), UNKNOWN),
        }
    }

    /// Explicit values win over `CHECKLIST_PROJECT_ID`, `CHECKLIST_PATH` and
    /// `CHECKLIST_USER_EMAIL`; whatever is still missing gets the
    /// placeholder defaults.
    pub fn resolve(
        project_id: Option<String>,
        path: Option<String>,
        user_email: Option<String>,
    ) -> Self {
        Self::new(
            project_id
                .or_else(|| std::env::var("CHECKLIST_PROJECT_ID").ok())
                .unwrap_or_default(),
            path.or_else(|| std::env::var("CHECKLIST_PATH").ok())
                .unwrap_or_default(),
            user_email
                .or_else(|| std::env::var("CHECKLIST_USER_EMAIL").ok())
                .unwrap_or_default(),
        )
    }

    pub fn is_project_known(&self) -> bool {
        self.project_id != UNKNOWN
    }
}

fn non_empty_or(value: String, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}
