use serde::{Deserialize, Serialize};

use crate::{Api, Error};

/// Claims about the current user, as served by `/userinfo`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    /// The user's ID
    pub user_id: String,
    /// The subject identifier
    pub sub: String,
    /// The user's name
    #[serde(rename = "user_name")]
    pub username: String,
    /// The user's given name
    pub given_name: String,
    /// The user's family name
    pub family_name: String,
    /// The user's email address
    pub email: String,
    /// The user's phone numbers
    pub phone_number: Vec<String>,
    /// When the user last logged on before the current session, in
    /// milliseconds since the epoch
    #[serde(rename = "previous_logon_time")]
    pub previous_login_time: i64,
    /// The user's full name
    pub name: String,
}

impl Api {
    /// Gets the claims of the user the current token was issued to
    pub async fn user_info(&self) -> Result<UserInfo, Error> {
        self.authenticated()
            .get_json("/userinfo", "scheme=openid")
            .await
    }
}
