//! Compliance export of the audit trail.

use chrono::Utc;

use crate::audit::{self, ActionType, AuditRecord};
use crate::entity::TimeStamp;
use crate::error::AdminError;

/// Hard cap on exported rows, newest first.
pub const EXPORT_ROW_CAP: usize = 10_000;

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub from: Option<TimeStamp<Utc>>,
    pub to: Option<TimeStamp<Utc>>,
    pub action: Option<ActionType>,
}

impl AuditFilter {
    fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(from) = &self.from {
            if record.created_at < *from {
                return false;
            }
        }
        if let Some(to) = &self.to {
            if record.created_at > *to {
                return false;
            }
        }
        if let Some(action) = self.action {
            if record.action != action {
                return false;
            }
        }
        true
    }
}

/// Filtered audit records, newest first, capped at [`EXPORT_ROW_CAP`].
pub fn query(db: &sled::Db, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AdminError> {
    let mut records: Vec<AuditRecord> = audit::read_all(db)?
        .into_iter()
        .filter(|r| filter.matches(r))
        .collect();
    records.reverse();
    records.truncate(EXPORT_ROW_CAP);
    Ok(records)
}

fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render records as CSV with the compliance column order.
pub fn to_csv(records: &[AuditRecord]) -> String {
    let mut lines = vec!["created_at,admin_email,action_type,target_id,details".to_string()];

    for record in records {
        let fields = [
            record.created_at.to_datetime_utc().to_rfc3339(),
            record.actor_email.clone(),
            record.action.as_str().to_string(),
            record.target_id.clone().unwrap_or_default(),
            record.details.clone(),
        ];
        let line: Vec<String> = fields.iter().map(|f| escape(f)).collect();
        lines.push(line.join(","));
    }

    lines.join("\n")
}
