//! HTTP client for the visitor backend.
//!
//! Every call is a single attempt: failures come back as
//! [`CheckInError::NetworkFailure`] and the visitor retries by hand.

use std::time::Duration;

use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::types::{
    AgreementRequest, EmailRequest, EmployeesResponse, PreRegistrationResponse, PurposeRequest,
    RoleRequest, StepResponse, VisibleFieldsResponse,
};
use crate::config::KioskConfig;
use crate::models::{Employee, Role, SearchBy, VisitorRecord};
use crate::utils::{CheckInError, Result};

/// Queries shorter than this return no results without calling the backend.
pub const MIN_SEARCH_LEN: usize = 2;

pub struct CheckInClient {
    client: Client,
    base_url: Url,
    client_id: String,
}

impl CheckInClient {
    pub fn new(config: &KioskConfig) -> Result<Self> {
        Self::with_base_url(&config.api_base_url, &config.client_id, config.request_timeout_secs)
    }

    /// Points the client at any base URL, such as a mock server in tests.
    pub fn with_base_url(base_url: &str, client_id: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        // Exactly one trailing slash so joined paths stay under the API root
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| CheckInError::ConfigError(format!("invalid base URL '{}': {}", base_url, e)))?;

        Ok(Self {
            client,
            base_url,
            client_id: client_id.to_string(),
        })
    }

    pub async fn check_pre_registered(&self, email: &str) -> Result<PreRegistrationResponse> {
        self.post_json("visitor/checkPreRegistered", &EmailRequest { email }).await
    }

    pub async fn visible_fields(&self) -> Result<VisibleFieldsResponse> {
        let url = self.url("visitor/visibleFields")?;
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::decode("visitor/visibleFields", response).await
    }

    /// Employees a visitor can pick on the purpose step.
    pub async fn employees(&self) -> Result<Vec<Employee>> {
        let url = self.url("visitor/selctAppEmployee/")?;
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let directory: EmployeesResponse = Self::decode("visitor/selctAppEmployee", response).await?;
        Ok(directory.employees)
    }

    /// Creates (or updates) the visitor from the details form. The response
    /// carries the assigned `visitor.id`.
    pub async fn store_checkin(&self, details: &VisitorRecord) -> Result<StepResponse> {
        let mut body = compact(serde_json::to_value(details).map_err(|e| {
            CheckInError::NetworkFailure(format!("failed to encode visitor details: {}", e))
        })?);
        if let serde_json::Value::Object(map) = &mut body {
            map.insert("client_id".to_string(), serde_json::Value::String(self.client_id.clone()));
        }
        self.post_json("visitor/store-checkin", &body).await
    }

    pub async fn set_role(&self, visitor_id: u64, role: Role) -> Result<StepResponse> {
        let body = RoleRequest {
            visitor_id,
            role: role.token(),
        };
        self.post_json("visitor/set-role", &body).await
    }

    pub async fn set_purpose(
        &self,
        visitor_id: u64,
        purpose: &str,
        employee_id: Option<u64>,
    ) -> Result<StepResponse> {
        let body = PurposeRequest {
            visitor_id,
            purpose,
            employee_id,
        };
        self.post_json("visitor/setAppPurpose", &body).await
    }

    pub async fn store_captured_image(&self, visitor_id: u64, jpeg: Vec<u8>) -> Result<StepResponse> {
        let file_name = format!("visitor_{}.jpg", visitor_id);
        self.post_photo("visitor/storeAppCapturedImage", visitor_id, jpeg, file_name, &[])
            .await
    }

    /// Uploads the ID photo together with the fields the visitor confirmed.
    pub async fn store_id_image(
        &self,
        visitor_id: u64,
        jpeg: Vec<u8>,
        confirmed: &[(&str, &str)],
    ) -> Result<StepResponse> {
        let file_name = format!("visitor_id_{}.jpg", visitor_id);
        self.post_photo("visitor/storeAppIdCapturedImage", visitor_id, jpeg, file_name, confirmed)
            .await
    }

    /// Sends the emergency contact fields given, keyed by their wire names.
    pub async fn emergency_contact(
        &self,
        visitor_id: u64,
        fields: &[(&str, &str)],
    ) -> Result<StepResponse> {
        let mut body = serde_json::Map::new();
        for (key, value) in fields {
            body.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        }
        body.insert("visitor_id".to_string(), serde_json::Value::from(visitor_id));
        self.post_json("visitor/appEmergencyContact", &body).await
    }

    pub async fn privacy_agreement(&self, visitor_id: u64) -> Result<StepResponse> {
        let body = AgreementRequest {
            visitor_id,
            privacy_policy_agreement: 1,
        };
        self.post_json("visitor/appPrivacyAgreement", &body).await
    }

    /// Looks up visitors for check-out.
    pub async fn search_visitors(&self, query: &str, by: SearchBy) -> Result<Vec<VisitorRecord>> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_LEN {
            return Ok(Vec::new());
        }

        let url = self.url("visitor/search_visitor")?;
        debug!("GET {} q={} searchBy={}", url, query, by.as_query());
        let response = self
            .client
            .get(url)
            .query(&[("q", query), ("searchBy", by.as_query())])
            .send()
            .await?;
        Self::decode("visitor/search_visitor", response).await
    }

    async fn post_photo(
        &self,
        path: &str,
        visitor_id: u64,
        jpeg: Vec<u8>,
        file_name: String,
        fields: &[(&str, &str)],
    ) -> Result<StepResponse> {
        let photo = Part::bytes(jpeg).file_name(file_name).mime_str("image/jpeg")?;
        let mut form = Form::new().text("visitor_id", visitor_id.to_string());
        for (key, value) in fields {
            form = form.text(key.to_string(), value.to_string());
        }
        let form = form.part("photo", photo);

        let url = self.url(path)?;
        debug!("POST {} (multipart)", url);
        let response = self.client.post(url).multipart(form).send().await?;
        Self::decode(path, response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        Self::decode(path, response).await
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| CheckInError::ConfigError(format!("invalid path '{}': {}", path, e)))
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| status.to_string());
            warn!("{} failed with {}: {}", path, status, message);
            return Err(CheckInError::NetworkFailure(format!("{}: {}", path, message)));
        }

        serde_json::from_str(&body).map_err(|e| {
            CheckInError::NetworkFailure(format!("{}: unexpected response body: {}", path, e))
        })
    }
}

// Drops nulls so a partial record never sends "clear this field"
fn compact(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .collect(),
        ),
        other => other,
    }
}
