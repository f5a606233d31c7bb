use std::collections::HashMap;

use beehub_core::BatchResult;
use once_cell::sync::Lazy;

/// Vendor code for "registration window not open yet"; the only code worth retrying.
pub const TRANSIENT_RESULT_CODE: &str = "NULLParam-CheckOgrenciKayitZamaniKontrolu";

const SUCCESS_CODE: &str = "successResult";
const GENERIC_FAILURE_CODE: &str = "VAL01";
const CRN_PLACEHOLDER: &str = "{crn}";

static RESULT_MESSAGES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("successResult", "The operation for the course with CRN {crn} has been successfully completed."),
        ("errorResult", "No operation was completed in this process group."),
        ("error", "An error occurred during the operation."),
        ("VAL01", "The course with CRN {crn} cannot be added due to a problem."),
        ("VAL02", "The course with CRN {crn} cannot be added due to 'Enrollment Time Hold'."),
        ("VAL03", "The course with CRN {crn} could not be taken again because it was taken this semester."),
        ("VAL04", "The course with CRN {crn} could not be taken because it was not included in the lesson plan."),
        ("VAL05", "The course with CRN {crn} cannot be added as the maximum number of credits allowed for this term is exceeded."),
        ("VAL06", "The course with CRN {crn} cannot be added as the enrollment limit has been reached and there is no quota left."),
        ("VAL07", "The course with CRN {crn} cannot be re-added because this course has been completed before with an AA grade."),
        ("VAL08", "The course with CRN {crn} could not be taken because your program is not among the programs that can take this course."),
        ("VAL09", "The course with CRN {crn} cannot be added due to a time conflict with another course."),
        ("VAL10", "No action has been taken because you are not registered for the course with CRN {crn} this semester."),
        ("VAL11", "The course with CRN {crn} cannot be added as its prerequisites are not met."),
        ("VAL12", "The course with CRN {crn} is not offered in the respective semester."),
        ("VAL13", "The course with CRN {crn} has been temporarily disabled."),
        ("VAL14", "The system is temporarily disabled."),
        ("VAL15", "You can send a maximum of 12 CRN parameters."),
        ("VAL16", "You currently have an ongoing transaction; try again later."),
        ("VAL18", "The course with CRN {crn} could not be taken due to 'Attribute Hold'."),
        ("VAL19", "The course with CRN {crn} could not be taken because it is an undergraduate course."),
        ("VAL20", "You can leave only 1 course per semester."),
        ("CRNListEmpty", "The course with CRN {crn} is not available during the course selection period."),
        ("CRNNotFound", "The course with CRN {crn} is not available during the course selection period."),
        ("ERRLoad", "This service is temporarily unavailable."),
        (TRANSIENT_RESULT_CODE, "The course with CRN {crn} cannot be added due to 'Enrollment Time Hold'."),
    ])
});

/// How a result moves the work queue forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    /// Worth resubmitting unchanged in the next batch.
    Transient,
    /// Give up on this CRN and try its reserves.
    Permanent,
}

impl Classification {
    pub fn of(result: &BatchResult) -> Self {
        if result.status_code == 0 {
            Classification::Success
        } else if result.result_code == TRANSIENT_RESULT_CODE {
            Classification::Transient
        } else {
            Classification::Permanent
        }
    }
}

/// Human-readable message for a vendor result. Unknown codes fall back to the
/// success or generic failure template depending on the status.
pub fn message_for(crn: &str, status_code: i64, result_code: &str) -> String {
    let template = RESULT_MESSAGES.get(result_code).copied().unwrap_or_else(|| {
        if status_code == 0 {
            RESULT_MESSAGES[SUCCESS_CODE]
        } else {
            RESULT_MESSAGES[GENERIC_FAILURE_CODE]
        }
    });
    template.replace(CRN_PLACEHOLDER, crn)
}

pub fn classify(crn: &str, status_code: i64, result_code: &str) -> BatchResult {
    BatchResult {
        crn: crn.to_string(),
        status_code,
        result_code: result_code.to_string(),
        message: message_for(crn, status_code, result_code),
    }
}
