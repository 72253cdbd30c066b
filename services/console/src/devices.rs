//! Device trust approval
//!
//! Staff sign-ins from an unknown device are held as `pending` until an
//! administrator approves or rejects the device.

use std::fmt;
use std::str::FromStr;

use common::{ApiClient, ApiResult};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Trust status of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Pending,
    Approved,
    Rejected,
}

impl DeviceStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Pending => "pending",
            DeviceStatus::Approved => "approved",
            DeviceStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(DeviceStatus::Pending),
            "approved" => Ok(DeviceStatus::Approved),
            "rejected" => Ok(DeviceStatus::Rejected),
            other => Err(format!(
                "invalid device status '{}', expected pending, approved or rejected",
                other
            )),
        }
    }
}

/// Device registered by a staff sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub device_name: String,
    pub fingerprint: String,
    pub status: DeviceStatus,
    #[serde(default)]
    pub last_seen_at: Option<String>,
    pub created_at: String,
}

/// Client for the device endpoints
#[derive(Debug, Clone)]
pub struct DeviceService {
    client: ApiClient,
}

impl DeviceService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// List devices, optionally only those with `status`
    pub async fn list(&self, status: Option<DeviceStatus>) -> ApiResult<Vec<Device>> {
        let query: Vec<(String, String)> = status
            .map(|s| vec![("status".to_string(), s.to_string())])
            .unwrap_or_default();
        self.client.get_json("devices", &query).await
    }

    /// Trust a device
    pub async fn approve(&self, id: i64) -> ApiResult<Device> {
        let device: Device = self
            .client
            .post_json(&format!("devices/{}/approve", id), &serde_json::json!({}))
            .await?;
        info!("Approved device {} for {}", device.device_name, device.username);
        Ok(device)
    }

    /// Refuse a device
    pub async fn reject(&self, id: i64) -> ApiResult<Device> {
        let device: Device = self
            .client
            .post_json(&format!("devices/{}/reject", id), &serde_json::json!({}))
            .await?;
        info!("Rejected device {} for {}", device.device_name, device.username);
        Ok(device)
    }
}
