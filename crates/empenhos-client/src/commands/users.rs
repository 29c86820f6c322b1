use std::path::Path;

use crate::ClientResult;
use crate::access::AccessControl;
use crate::commands::access::{AdminOptions, Credentials, authorize_admin};
use crate::commands::common::Dashboard;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{UserDeletedData, UsersData};

#[derive(Debug, Default)]
pub struct UserDeleteOptions<'a> {
    pub credentials: Credentials,
    pub username: String,
    pub home_override: Option<&'a Path>,
}

pub fn list_with_options(options: AdminOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let store = Dashboard::open(options.home_override)?.store()?;
    let access = AccessControl::new(store.as_ref());
    authorize_admin(&access, &options.credentials)?;
    let users = access.list_users()?;
    success("user list", UsersData { users })
}

pub fn delete_with_options(options: UserDeleteOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let store = Dashboard::open(options.home_override)?.store()?;
    let access = AccessControl::new(store.as_ref());
    authorize_admin(&access, &options.credentials)?;
    let account = access.delete_user(&options.username)?;
    success("user delete", UserDeletedData { account })
}
