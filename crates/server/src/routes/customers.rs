use axum::extract::State;
use axum::Json;
use autodial_core::Customer;
use events::Event;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomersResponse {
    pub customers: Vec<Customer>,
    pub count: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadCustomersRequest {
    pub customers: Vec<Customer>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadCustomersResponse {
    pub loaded: usize,
    /// Rows dropped for missing a case id or phone number
    pub rejected: usize,
    pub customers: Vec<Customer>,
}

#[utoipa::path(
    get,
    path = "/api/customers",
    responses(
        (status = 200, description = "Loaded customers", body = CustomersResponse)
    ),
    tag = "customers"
)]
pub async fn list_customers(State(state): State<AppState>) -> Json<CustomersResponse> {
    let customers = state.roster.all();
    Json(CustomersResponse {
        count: customers.len(),
        customers,
    })
}

#[utoipa::path(
    post,
    path = "/api/customers",
    request_body = UploadCustomersRequest,
    responses(
        (status = 200, description = "Roster replaced", body = UploadCustomersResponse)
    ),
    tag = "customers"
)]
pub async fn upload_customers(
    State(state): State<AppState>,
    Json(payload): Json<UploadCustomersRequest>,
) -> Json<UploadCustomersResponse> {
    let (loaded, rejected) = state.roster.replace(payload.customers);

    state
        .event_bus
        .emit(Event::CustomersLoaded { count: loaded, rejected });

    Json(UploadCustomersResponse {
        loaded,
        rejected,
        customers: state.roster.all(),
    })
}
