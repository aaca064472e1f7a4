use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What the job store recorded about a failed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub exception_type: String,

    pub exception_message: String,

    /// Raw stack trace text of the failure
    pub exception_details: String,

    /// Culture the job ran under; selects locale marker tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_culture: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,

    /// Module declaring the job type, loaded into the symbol cache before rendering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_module: Option<String>,
}

impl JobRecord {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Culture used for marker selection; the UI culture wins since it drives resource lookup
    pub fn marker_culture(&self) -> Option<&str> {
        self.ui_culture
            .as_deref()
            .or(self.culture.as_deref())
            .filter(|culture| !culture.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_job_record() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"{
                "exception_type": "System.InvalidOperationException",
                "exception_message": "Queue is closed",
                "exception_details": "System.InvalidOperationException: Queue is closed\n   at MyApp.Worker.Run()",
                "culture": "de-DE",
                "failed_at": "2024-03-01T12:30:00Z",
                "job_module": "MyApp"
            }"#,
        )
        .unwrap();

        let job = JobRecord::load(file.path()).unwrap();
        assert_eq!(job.exception_type, "System.InvalidOperationException");
        assert_eq!(job.job_module.as_deref(), Some("MyApp"));
        assert_eq!(job.failed_at, Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()));
        assert_eq!(job.marker_culture(), Some("de-DE"));
    }

    #[test]
    fn test_marker_culture_prefers_ui_culture() {
        let job = JobRecord {
            exception_type: "E".to_string(),
            exception_message: String::new(),
            exception_details: String::new(),
            culture: Some("en-US".to_string()),
            ui_culture: Some("fr-FR".to_string()),
            failed_at: None,
            job_module: None,
        };
        assert_eq!(job.marker_culture(), Some("fr-FR"));

        let job = JobRecord { ui_culture: Some(String::new()), culture: None, ..job };
        assert_eq!(job.marker_culture(), None);
    }

    #[test]
    fn test_missing_required_field_is_an_error() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"exception_type": "E"}"#).unwrap();
        assert!(JobRecord::load(file.path()).is_err());
    }
}
