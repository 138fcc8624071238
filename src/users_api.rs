use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::ApiClient;
use crate::envelope::Envelope;
use crate::error::ApiResult;

const USERS_PATH: &str = "/users";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(rename = "isActive", default)]
    pub is_active: bool,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserDto {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(rename = "isActive", skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateUserDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(rename = "isActive", skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub message: String,
    pub user: User,
    #[serde(default)]
    pub timestamp: String,
}

pub fn find_all(api: &ApiClient) -> ApiResult<Envelope<Vec<User>>> {
    api.get(USERS_PATH)
}

pub fn find_one(api: &ApiClient, id: i64) -> ApiResult<Envelope<User>> {
    api.get(&format!("{USERS_PATH}/{id}"))
}

pub fn create(api: &ApiClient, dto: &CreateUserDto) -> ApiResult<Envelope<User>> {
    api.post(USERS_PATH, dto)
}

pub fn update(api: &ApiClient, id: i64, dto: &UpdateUserDto) -> ApiResult<Envelope<User>> {
    api.patch(&format!("{USERS_PATH}/{id}"), dto)
}

pub fn remove(api: &ApiClient, id: i64) -> ApiResult<Envelope<serde_json::Value>> {
    api.delete(&format!("{USERS_PATH}/{id}"))
}

pub fn my_profile(api: &ApiClient) -> ApiResult<Envelope<UserProfile>> {
    api.get(&format!("{USERS_PATH}/profile/me"))
}

pub fn find_by_email(api: &ApiClient, email: &str) -> ApiResult<Envelope<Vec<User>>> {
    api.get_with_query(
        &format!("{USERS_PATH}/search"),
        &[("email", email.trim().to_string())],
    )
}

pub fn find_by_role(api: &ApiClient, role: &str) -> ApiResult<Envelope<Vec<User>>> {
    api.get_with_query(
        &format!("{USERS_PATH}/search"),
        &[("role", role.trim().to_string())],
    )
}

pub fn toggle_active(api: &ApiClient, id: i64, is_active: bool) -> ApiResult<Envelope<User>> {
    api.patch(&format!("{USERS_PATH}/{id}"), &json!({ "isActive": is_active }))
}

pub fn change_role(api: &ApiClient, id: i64, role: &str) -> ApiResult<Envelope<User>> {
    api.patch(&format!("{USERS_PATH}/{id}"), &json!({ "role": role }))
}
