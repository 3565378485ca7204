//! Database schema definitions

/// Name of the submissions table
pub const SUBMISSIONS_TABLE: &str = "form_submissions";

/// SQL to create the form_submissions table
///
/// SQLite does not enforce VARCHAR lengths; they document the bounds the
/// site's forms are built around. `form_type` is constrained to the three
/// known forms.
pub const CREATE_SUBMISSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS form_submissions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    form_type TEXT NOT NULL DEFAULT 'enquiry'
        CHECK (form_type IN ('enquiry', 'popup', 'brochure')),
    first_name VARCHAR(100) DEFAULT NULL,
    last_name VARCHAR(100) DEFAULT NULL,
    email VARCHAR(255) DEFAULT NULL,
    phone VARCHAR(20) DEFAULT NULL,
    programme VARCHAR(150) DEFAULT NULL,
    city VARCHAR(100) DEFAULT NULL,
    enroll_timeline VARCHAR(50) DEFAULT NULL,
    enquiry_type VARCHAR(100) DEFAULT NULL,
    page_url VARCHAR(500) DEFAULT NULL,
    consent INTEGER NOT NULL DEFAULT 0 CHECK (consent IN (0, 1)),
    ip_address VARCHAR(45) DEFAULT NULL,
    user_agent TEXT DEFAULT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_form_type ON form_submissions(form_type)",
    "CREATE INDEX IF NOT EXISTS idx_email ON form_submissions(email)",
    "CREATE INDEX IF NOT EXISTS idx_created_at ON form_submissions(created_at)",
];

/// All schema creation statements, in execution order
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_SUBMISSIONS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
