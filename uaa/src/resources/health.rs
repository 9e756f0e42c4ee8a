use std::fmt;

use http::StatusCode;

use crate::{Api, Error};

/// The health reported by `/healthz`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HealthStatus {
    /// The server answered `200 OK`
    Ok,
    /// The server answered with any other status
    Error,
}

impl HealthStatus {
    /// The status as the UAA CLI reports it
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "health_error",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Api {
    /// Checks the health of the server
    ///
    /// Any response is a health status. Only a failure to get a response at
    /// all is an error.
    pub async fn health(&self) -> Result<HealthStatus, Error> {
        match self.unauthenticated().get("/healthz", "").await {
            Ok(response) if response.status == StatusCode::OK => Ok(HealthStatus::Ok),
            Ok(_) => Ok(HealthStatus::Error),
            Err(Error::RequestFailed {
                status: Some(status),
                ..
            }) => {
                tracing::debug!(%status, "server is unhealthy");
                Ok(HealthStatus::Error)
            }
            Err(err) => Err(err),
        }
    }
}
