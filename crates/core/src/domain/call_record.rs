use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::customer::Customer;
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    #[default]
    InProgress,
    Answered,
    NotAnswered,
    NotActive,
    Voicemail,
    Error,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in-progress",
            Self::Answered => "answered",
            Self::NotAnswered => "not-answered",
            Self::NotActive => "not-active",
            Self::Voicemail => "voicemail",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in-progress" => Some(Self::InProgress),
            "answered" => Some(Self::Answered),
            "not-answered" => Some(Self::NotAnswered),
            "not-active" => Some(Self::NotActive),
            "voicemail" => Some(Self::Voicemail),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::UnknownStatus(s.to_string()))
    }
}

/// Terminal disposition reported by the telephony line once a call has run its course.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CallOutcome {
    Answered,
    NotAnswered,
    NotActive,
    VoiceMail,
}

impl CallOutcome {
    pub const ALL: [CallOutcome; 4] = [
        CallOutcome::Answered,
        CallOutcome::NotAnswered,
        CallOutcome::NotActive,
        CallOutcome::VoiceMail,
    ];
}

impl From<CallOutcome> for CallStatus {
    fn from(outcome: CallOutcome) -> Self {
        match outcome {
            CallOutcome::Answered => CallStatus::Answered,
            CallOutcome::NotAnswered => CallStatus::NotAnswered,
            CallOutcome::NotActive => CallStatus::NotActive,
            CallOutcome::VoiceMail => CallStatus::Voicemail,
        }
    }
}

/// Everything needed to move an in-progress record to its terminal state.
#[derive(Debug, Clone)]
pub struct CallCompletion {
    pub status: CallStatus,
    pub ended_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl CallCompletion {
    pub fn new(status: CallStatus) -> Self {
        Self {
            status,
            ended_at: Utc::now(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: CallStatus::Error,
            ended_at: Utc::now(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub id: String,
    pub case_id: String,
    pub customer_name: String,
    pub phone_number: String,
    pub handler: String,
    pub call_date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Elapsed call time in whole seconds
    pub duration: u64,
    pub status: CallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallRecord {
    /// Open an in-progress record for the customer about to be dialed.
    pub fn begin(customer: &Customer) -> Self {
        let now = Utc::now();
        Self {
            id: format!("call-{}-{}", now.timestamp_millis(), customer.case_id),
            case_id: customer.case_id.clone(),
            customer_name: customer.customer_name.clone(),
            phone_number: customer.phone_number.clone(),
            handler: customer.handler.clone(),
            call_date: now.date_naive(),
            start_time: now,
            end_time: None,
            duration: 0,
            status: CallStatus::InProgress,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Produce the terminal form of this record.
    ///
    /// Returns `None` when the record is already terminal or the completion
    /// itself is not terminal; a finished record never changes again.
    pub fn finish(&self, completion: CallCompletion) -> Option<CallRecord> {
        if self.is_terminal() || !completion.status.is_terminal() {
            return None;
        }

        let elapsed = completion.ended_at.signed_duration_since(self.start_time);

        Some(CallRecord {
            end_time: Some(completion.ended_at),
            duration: elapsed.num_seconds().max(0) as u64,
            status: completion.status,
            error: completion.error,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn customer() -> Customer {
        Customer::new("C1", "Alice", "555-1", "agent-7")
    }

    #[test]
    fn test_record_begin() {
        let record = CallRecord::begin(&customer());

        assert!(record.id.starts_with("call-"));
        assert!(record.id.ends_with("-C1"));
        assert_eq!(record.status, CallStatus::InProgress);
        assert_eq!(record.duration, 0);
        assert!(record.end_time.is_none());
        assert_eq!(record.call_date, record.start_time.date_naive());
        assert!(!record.is_terminal());
    }

    #[test]
    fn test_record_finish() {
        let record = CallRecord::begin(&customer());
        let completion = CallCompletion {
            status: CallStatus::Answered,
            ended_at: record.start_time + Duration::seconds(7),
            error: None,
        };

        let finished = record.finish(completion).unwrap();
        assert_eq!(finished.id, record.id);
        assert_eq!(finished.status, CallStatus::Answered);
        assert_eq!(finished.duration, 7);
        assert!(finished.end_time.is_some());
        assert!(finished.is_terminal());
    }

    #[test]
    fn test_finished_record_cannot_change() {
        let record = CallRecord::begin(&customer());
        let finished = record.finish(CallCompletion::failed("line dropped")).unwrap();

        assert_eq!(finished.error.as_deref(), Some("line dropped"));
        assert!(finished.finish(CallCompletion::new(CallStatus::Answered)).is_none());
        assert!(record.finish(CallCompletion::new(CallStatus::InProgress)).is_none());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(CallStatus::InProgress.as_str(), "in-progress");
        assert_eq!(CallStatus::NotAnswered.as_str(), "not-answered");
        assert_eq!(
            serde_json::to_string(&CallStatus::Voicemail).unwrap(),
            "\"voicemail\""
        );
        assert_eq!(
            serde_json::to_string(&CallStatus::NotActive).unwrap(),
            "\"not-active\""
        );
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(CallStatus::parse("answered"), Some(CallStatus::Answered));
        assert_eq!(CallStatus::parse("ringing"), None);
        assert!("bogus".parse::<CallStatus>().is_err());
        assert_eq!("error".parse::<CallStatus>().unwrap(), CallStatus::Error);
    }

    #[test]
    fn test_outcome_maps_to_terminal_status() {
        for outcome in CallOutcome::ALL {
            assert!(CallStatus::from(outcome).is_terminal());
        }
        assert_eq!(
            CallStatus::from(CallOutcome::VoiceMail),
            CallStatus::Voicemail
        );
    }
}
