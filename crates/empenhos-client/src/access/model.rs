use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[default]
    #[serde(rename = "USER", alias = "user")]
    User,
    #[serde(rename = "ADMIN", alias = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "USER" => Some(Self::User),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    #[default]
    #[serde(rename = "pendente")]
    Pending,
    #[serde(rename = "ativo")]
    Active,
    #[serde(rename = "rejeitado")]
    Rejected,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pendente",
            Self::Active => "ativo",
            Self::Rejected => "rejeitado",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    #[default]
    #[serde(rename = "pendente")]
    Pending,
    #[serde(rename = "aprovado")]
    Approved,
    #[serde(rename = "rejeitado")]
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pendente",
            Self::Approved => "aprovado",
            Self::Rejected => "rejeitado",
        }
    }
}

/// Stored account. The username is the key of the enclosing map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    #[serde(rename = "senha_hash")]
    pub password_hash: String,
    #[serde(rename = "perfil", default)]
    pub role: Role,
    #[serde(default)]
    pub status: AccountStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    #[serde(default)]
    pub email: String,
    #[serde(rename = "senha_hash")]
    pub password_hash: String,
    #[serde(rename = "perfil_solicitado", default)]
    pub requested_role: Role,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(rename = "solicitado_em", default)]
    pub requested_at: String,
}

pub type UserBook = BTreeMap<String, UserAccount>;
pub type RequestBook = BTreeMap<String, AccessRequest>;

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub username: String,
    pub role: Role,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// An account as shown to administrators. Never carries the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub username: String,
    pub role: Role,
    pub status: AccountStatus,
}

impl AccountSummary {
    pub fn from_entry(username: &str, account: &UserAccount) -> Self {
        Self {
            username: username.to_string(),
            role: account.role,
            status: account.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestSummary {
    pub username: String,
    pub email: String,
    pub requested_role: Role,
    pub status: RequestStatus,
    pub requested_at: String,
}

impl RequestSummary {
    pub fn from_entry(username: &str, request: &AccessRequest) -> Self {
        Self {
            username: username.to_string(),
            email: request.email.clone(),
            requested_role: request.requested_role,
            status: request.status,
            requested_at: request.requested_at.clone(),
        }
    }
}
