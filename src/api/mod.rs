pub mod client;
pub mod types;

pub use client::CheckInClient;
pub use types::{EmployeesResponse, PreRegistrationResponse, StepResponse, VisibleFieldsResponse};
