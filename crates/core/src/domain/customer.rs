use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::CoreError;

/// A customer to be dialed. Loaded by the operator and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default)]
    pub id: String,
    pub case_id: String,
    #[serde(default)]
    pub customer_name: String,
    pub phone_number: String,
    /// Agent or handler tag the case is assigned to
    #[serde(default, alias = "handel")]
    pub handler: String,
}

impl Customer {
    pub fn new(
        case_id: impl Into<String>,
        customer_name: impl Into<String>,
        phone_number: impl Into<String>,
        handler: impl Into<String>,
    ) -> Self {
        let case_id = case_id.into();
        Self {
            id: format!("customer-{}", case_id),
            case_id,
            customer_name: customer_name.into(),
            phone_number: phone_number.into(),
            handler: handler.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// A customer can only be dialed with both a case id and a phone number.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.case_id.trim().is_empty() {
            return Err(CoreError::Validation("caseId is required".to_string()));
        }
        if self.phone_number.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "phoneNumber is required for case {}",
                self.case_id
            )));
        }
        Ok(())
    }

    pub fn is_dialable(&self) -> bool {
        self.validate().is_ok()
    }
}
