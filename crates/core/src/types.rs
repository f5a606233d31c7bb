use std::fmt;

use serde::{Deserialize, Serialize};

/// Portal login credentials. Kept in memory for silent re-authentication only.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A course to add, with ordered fallbacks tried only if it fails permanently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRequest {
    pub crn: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserves: Vec<CourseRequest>,
}

impl CourseRequest {
    pub fn new(crn: impl Into<String>) -> Self {
        Self {
            crn: crn.into(),
            reserves: Vec::new(),
        }
    }

    pub fn with_reserves(crn: impl Into<String>, reserves: Vec<CourseRequest>) -> Self {
        Self {
            crn: crn.into(),
            reserves,
        }
    }
}

/// Request body of a `pick` run as accepted by the CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct PickRequest {
    pub courses: Vec<CourseRequest>,
}

/// One classified per-CRN outcome of a registration call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub crn: String,
    /// 0 means the course was added.
    pub status_code: i64,
    pub result_code: String,
    pub message: String,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.status_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_request_tree_from_json() {
        let json = r#"{"courses":[{"crn":"100","reserves":[{"crn":"200","reserves":[{"crn":"300"}]}]},{"crn":"400"}]}"#;
        let req: PickRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.courses.len(), 2);
        assert_eq!(req.courses[0].reserves[0].crn, "200");
        assert_eq!(req.courses[0].reserves[0].reserves[0].crn, "300");
        assert!(req.courses[1].reserves.is_empty());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("student@itu.edu.tr", "hunter2");
        let out = format!("{:?}", creds);
        assert!(out.contains("student@itu.edu.tr"));
        assert!(!out.contains("hunter2"));
    }

    #[test]
    fn test_batch_result_serializes_camel_case() {
        let result = BatchResult {
            crn: "100".into(),
            status_code: 0,
            result_code: "successResult".into(),
            message: "ok".into(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["statusCode"], 0);
        assert_eq!(value["resultCode"], "successResult");
        assert!(result.is_success());
    }
}
