use std::sync::{Arc, RwLock};

use autodial_core::Customer;
use tracing::{debug, info};

/// Customers loaded by the operator.
///
/// Uploads replace the whole list. A run works on its own copy of the
/// selection, so replacing the roster never affects a run in flight.
#[derive(Debug, Clone, Default)]
pub struct CustomerRoster {
    customers: Arc<RwLock<Vec<Customer>>>,
}

impl CustomerRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Customer> {
        self.customers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.customers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the roster, keeping only dialable rows.
    ///
    /// Returns `(loaded, rejected)`.
    pub fn replace(&self, customers: Vec<Customer>) -> (usize, usize) {
        let submitted = customers.len();
        let accepted: Vec<Customer> = customers
            .into_iter()
            .map(|c| {
                if c.id.is_empty() {
                    let id = format!("customer-{}", c.case_id);
                    c.with_id(id)
                } else {
                    c
                }
            })
            .filter(|c| match c.validate() {
                Ok(()) => true,
                Err(e) => {
                    debug!(error = %e, "Rejected customer row");
                    false
                }
            })
            .collect();

        let loaded = accepted.len();
        let rejected = submitted - loaded;

        *self
            .customers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = accepted;

        info!(loaded, rejected, "Customer roster replaced");
        (loaded, rejected)
    }

    /// Customers matching `case_ids`, in the order requested.
    ///
    /// Unknown case ids are skipped.
    pub fn select(&self, case_ids: &[String]) -> Vec<Customer> {
        let customers = self
            .customers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let selected: Vec<Customer> = case_ids
            .iter()
            .filter_map(|case_id| customers.iter().find(|c| &c.case_id == case_id).cloned())
            .collect();

        debug!(
            requested = case_ids.len(),
            selected = selected.len(),
            "Selected customers from roster"
        );
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(case_id: &str, phone: &str) -> Customer {
        Customer::new(case_id, "Name", phone, "agent")
    }

    #[test]
    fn test_replace_drops_undialable() {
        let roster = CustomerRoster::new();
        let (loaded, rejected) = roster.replace(vec![
            customer("C1", "555-1"),
            customer("C2", " "),
            customer("", "555-3"),
        ]);

        assert_eq!((loaded, rejected), (1, 2));
        assert_eq!(roster.all()[0].case_id, "C1");
    }

    #[test]
    fn test_replace_overwrites() {
        let roster = CustomerRoster::new();
        roster.replace(vec![customer("C1", "555-1"), customer("C2", "555-2")]);
        roster.replace(vec![customer("C3", "555-3")]);

        assert_eq!(roster.len(), 1);
        assert_eq!(roster.all()[0].case_id, "C3");
    }

    #[test]
    fn test_select_keeps_request_order() {
        let roster = CustomerRoster::new();
        roster.replace(vec![
            customer("C1", "555-1"),
            customer("C2", "555-2"),
            customer("C3", "555-3"),
        ]);

        let selected = roster.select(&[
            "C3".to_string(),
            "missing".to_string(),
            "C1".to_string(),
        ]);
        let cases: Vec<&str> = selected.iter().map(|c| c.case_id.as_str()).collect();
        assert_eq!(cases, vec!["C3", "C1"]);
    }
}
