use std::path::Path;

use crate::ClientResult;
use crate::access::model::{RequestStatus, Role, Session};
use crate::access::{AccessControl, PROTECTED_ACCOUNT, require_admin};
use crate::commands::common::Dashboard;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{
    ApprovalData, BootstrapAdminData, LoginData, PendingRequestsData, RejectionData,
    RequestSubmittedData,
};
use crate::store::DocumentStore;

/// Username and password supplied by the caller of an authenticated command.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default)]
pub struct RequestAccessOptions<'a> {
    pub username: String,
    pub email: String,
    pub password: String,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct AdminOptions<'a> {
    pub credentials: Credentials,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct ReviewOptions<'a> {
    pub credentials: Credentials,
    pub username: String,
    /// Role granted on approval. Ignored when rejecting.
    pub role: Role,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct BootstrapAdminOptions<'a> {
    pub password: String,
    pub home_override: Option<&'a Path>,
}

pub fn request_with_options(options: RequestAccessOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let store = Dashboard::open(options.home_override)?.store()?;
    let request = AccessControl::new(store.as_ref()).submit_request(
        &options.username,
        &options.email,
        &options.password,
    )?;
    success("access request", RequestSubmittedData { request })
}

pub fn login_with_options(options: AdminOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let store = Dashboard::open(options.home_override)?.store()?;
    let session = AccessControl::new(store.as_ref())
        .authenticate(&options.credentials.username, &options.credentials.password)?;
    success("access login", LoginData { session })
}

pub fn pending_with_options(options: AdminOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let store = Dashboard::open(options.home_override)?.store()?;
    let access = AccessControl::new(store.as_ref());
    authorize_admin(&access, &options.credentials)?;
    let requests = access.pending_requests()?;
    success("access pending", PendingRequestsData { requests })
}

pub fn approve_with_options(options: ReviewOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let store = Dashboard::open(options.home_override)?.store()?;
    let access = AccessControl::new(store.as_ref());
    authorize_admin(&access, &options.credentials)?;
    let account = access.approve(&options.username, options.role)?;
    success(
        "access approve",
        ApprovalData {
            account,
            request_status: RequestStatus::Approved,
        },
    )
}

pub fn reject_with_options(options: ReviewOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let store = Dashboard::open(options.home_override)?.store()?;
    let access = AccessControl::new(store.as_ref());
    authorize_admin(&access, &options.credentials)?;
    let request = access.reject(&options.username)?;
    success("access reject", RejectionData { request })
}

pub fn bootstrap_admin_with_options(
    options: BootstrapAdminOptions<'_>,
) -> ClientResult<SuccessEnvelope> {
    let store = Dashboard::open(options.home_override)?.store()?;
    let created = AccessControl::new(store.as_ref()).bootstrap_admin(&options.password)?;
    success(
        "access bootstrap-admin",
        BootstrapAdminData {
            username: PROTECTED_ACCOUNT.to_string(),
            created,
        },
    )
}

/// Authenticates `credentials` and requires the `ADMIN` role.
pub(crate) fn authorize_admin(
    access: &AccessControl<'_>,
    credentials: &Credentials,
) -> ClientResult<Session> {
    let session = access.authenticate(&credentials.username, &credentials.password)?;
    require_admin(&session)?;
    Ok(session)
}

pub(crate) fn authorize_admin_in(
    store: &dyn DocumentStore,
    credentials: &Credentials,
) -> ClientResult<Session> {
    authorize_admin(&AccessControl::new(store), credentials)
}
