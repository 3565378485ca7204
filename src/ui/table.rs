use tabled::{settings::Style, Table, Tabled};

use crate::storage::StoredSubmission;

#[derive(Tabled)]
pub struct SubmissionRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Form")]
    pub form_type: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Email")]
    pub email: String,
    #[tabled(rename = "Phone")]
    pub phone: String,
    #[tabled(rename = "Programme")]
    pub programme: String,
    #[tabled(rename = "Consent")]
    pub consent: &'static str,
    #[tabled(rename = "Received")]
    pub created_at: String,
}

impl From<&StoredSubmission> for SubmissionRow {
    fn from(s: &StoredSubmission) -> Self {
        let name = [s.first_name.as_deref(), s.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            id: s.id,
            form_type: s.form_type.clone(),
            name,
            email: s.email.clone().unwrap_or_default(),
            phone: s.phone.clone().unwrap_or_default(),
            programme: s.programme.clone().unwrap_or_default(),
            consent: if s.consent != 0 { "yes" } else { "no" },
            created_at: s.created_at.clone(),
        }
    }
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<SubmissionRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, submission: &StoredSubmission) {
        self.rows.push(SubmissionRow::from(submission));
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn submissions_table(submissions: &[StoredSubmission]) -> String {
    let mut builder = TableBuilder::new();
    for submission in submissions {
        builder.add_row(submission);
    }
    builder.build()
}
