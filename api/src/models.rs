use impersonation::EffectiveUser;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request to start impersonating a user
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImpersonateRequest {
    /// Registered user name to act as
    pub impersonated_user: String,
}

/// The caller as the rest of the platform sees them
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveUserResponse {
    /// Effective user name (the impersonated user while impersonating)
    pub user_name: String,
    pub actual_user: String,
    pub impersonated_user: Option<String>,
    pub impersonated_by: Option<String>,
    pub is_recognized: bool,
    pub workstation: Option<String>,
}

impl From<EffectiveUser> for EffectiveUserResponse {
    fn from(user: EffectiveUser) -> Self {
        Self {
            user_name: user.user_name().to_string(),
            impersonated_by: user.impersonated_by().map(str::to_string),
            is_recognized: user.is_recognized(),
            actual_user: user.actual_user,
            impersonated_user: user.impersonated_user,
            workstation: user.workstation,
        }
    }
}
