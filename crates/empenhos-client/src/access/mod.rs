//! Access requests, accounts and authentication.
//!
//! State lives in two JSON documents keyed by username. Every change is a
//! read-modify-write against the document store, retried when another
//! writer got there first.

pub mod model;
pub mod password;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::access::model::{
    AccessRequest, AccountStatus, AccountSummary, RequestBook, RequestStatus, RequestSummary, Role,
    Session, UserAccount, UserBook,
};
use crate::access::password::{hash_password, verify_password};
use crate::store::{DocumentStore, Revision};
use crate::{ClientError, ClientResult};

pub const USERS_KEY: &str = "data/usuarios.json";
pub const REQUESTS_KEY: &str = "data/solicitacoes.json";
pub const PROTECTED_ACCOUNT: &str = "admin";
pub const MAX_WRITE_ATTEMPTS: usize = 3;

pub struct AccessControl<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> AccessControl<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    pub fn submit_request(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ClientResult<RequestSummary> {
        let username = required("username", username)?;
        let email = required("email", email)?;
        if password.is_empty() {
            return Err(ClientError::invalid_argument("A password is required."));
        }

        if username == PROTECTED_ACCOUNT {
            return Err(ClientError::account_protected(&username));
        }

        let (users, _) = read_book::<UserBook>(self.store, USERS_KEY)?;
        if users.contains_key(&username) {
            return Err(ClientError::request_exists(&username));
        }

        let password_hash = hash_password(password)?;
        let requested_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let summary = update_book::<RequestBook, _, _>(self.store, REQUESTS_KEY, |requests| {
            if requests.contains_key(&username) {
                return Err(ClientError::request_exists(&username));
            }
            let request = AccessRequest {
                email: email.clone(),
                password_hash: password_hash.clone(),
                requested_role: Role::User,
                status: RequestStatus::Pending,
                requested_at: requested_at.clone(),
            };
            let summary = RequestSummary::from_entry(&username, &request);
            requests.insert(username.clone(), request);
            Ok(summary)
        })?;

        info!(username = %summary.username, "access request submitted");
        Ok(summary)
    }

    /// Marks a pending request approved, then creates its active account
    /// with `role`. An existing account is never replaced; if the account
    /// cannot be written the request goes back to pending.
    pub fn approve(&self, username: &str, role: Role) -> ClientResult<AccountSummary> {
        let username = required("username", username)?;
        if username == PROTECTED_ACCOUNT {
            return Err(ClientError::account_protected(&username));
        }
        let (users, _) = read_book::<UserBook>(self.store, USERS_KEY)?;
        if users.contains_key(&username) {
            return Err(ClientError::account_exists(&username));
        }

        let request = update_book::<RequestBook, _, _>(self.store, REQUESTS_KEY, |requests| {
            pending_request(requests, &username)?;
            let Some(entry) = requests.get_mut(&username) else {
                return Err(ClientError::request_not_found(&username));
            };
            entry.status = RequestStatus::Approved;
            Ok(entry.clone())
        })?;

        let created = update_book::<UserBook, _, _>(self.store, USERS_KEY, |users| {
            if users.contains_key(&username) {
                return Err(ClientError::account_exists(&username));
            }
            let account = UserAccount {
                password_hash: request.password_hash.clone(),
                role,
                status: AccountStatus::Active,
            };
            let summary = AccountSummary::from_entry(&username, &account);
            users.insert(username.clone(), account);
            Ok(summary)
        });

        match created {
            Ok(account) => {
                info!(username = %username, role = %role, "access request approved");
                Ok(account)
            }
            Err(error) => {
                self.reopen_request(&username);
                Err(error)
            }
        }
    }

    fn reopen_request(&self, username: &str) {
        let reopened = update_book::<RequestBook, _, _>(self.store, REQUESTS_KEY, |requests| {
            if let Some(entry) = requests.get_mut(username)
                && entry.status == RequestStatus::Approved
            {
                entry.status = RequestStatus::Pending;
            }
            Ok(())
        });
        if let Err(error) = reopened {
            warn!(username, code = %error.code, "could not reopen access request");
        }
    }

    pub fn reject(&self, username: &str) -> ClientResult<RequestSummary> {
        let username = required("username", username)?;
        let summary = update_book::<RequestBook, _, _>(self.store, REQUESTS_KEY, |requests| {
            pending_request(requests, &username)?;
            let Some(entry) = requests.get_mut(&username) else {
                return Err(ClientError::request_not_found(&username));
            };
            entry.status = RequestStatus::Rejected;
            Ok(RequestSummary::from_entry(&username, entry))
        })?;

        info!(username = %username, "access request rejected");
        Ok(summary)
    }

    pub fn pending_requests(&self) -> ClientResult<Vec<RequestSummary>> {
        let (requests, _) = read_book::<RequestBook>(self.store, REQUESTS_KEY)?;
        Ok(requests
            .iter()
            .filter(|(_, request)| request.status == RequestStatus::Pending)
            .map(|(username, request)| RequestSummary::from_entry(username, request))
            .collect())
    }

    pub fn list_users(&self) -> ClientResult<Vec<AccountSummary>> {
        let (users, _) = read_book::<UserBook>(self.store, USERS_KEY)?;
        Ok(users
            .iter()
            .map(|(username, account)| AccountSummary::from_entry(username, account))
            .collect())
    }

    pub fn delete_user(&self, username: &str) -> ClientResult<AccountSummary> {
        let username = required("username", username)?;
        if username == PROTECTED_ACCOUNT {
            return Err(ClientError::account_protected(&username));
        }

        let removed = update_book::<UserBook, _, _>(self.store, USERS_KEY, |users| {
            users
                .remove(&username)
                .map(|account| AccountSummary::from_entry(&username, &account))
                .ok_or_else(|| ClientError::account_not_found(&username))
        })?;

        info!(username = %username, "account deleted");
        Ok(removed)
    }

    /// Every credential failure yields the same error so callers cannot tell
    /// which part was wrong. Store failures still surface as themselves.
    pub fn authenticate(&self, username: &str, password: &str) -> ClientResult<Session> {
        let (users, _) = read_book::<UserBook>(self.store, USERS_KEY)?;
        let username = username.trim();
        let Some(account) = users.get(username) else {
            return Err(ClientError::authentication_failed());
        };
        if account.status != AccountStatus::Active
            || !verify_password(password, &account.password_hash)
        {
            return Err(ClientError::authentication_failed());
        }

        Ok(Session {
            username: username.to_string(),
            role: account.role,
        })
    }

    /// Creates the protected `admin` account. Returns `false` when it
    /// already exists, leaving it untouched.
    pub fn bootstrap_admin(&self, password: &str) -> ClientResult<bool> {
        if password.is_empty() {
            return Err(ClientError::invalid_argument("A password is required."));
        }
        let password_hash = hash_password(password)?;
        let created = update_book::<UserBook, _, _>(self.store, USERS_KEY, |users| {
            if users.contains_key(PROTECTED_ACCOUNT) {
                return Ok(false);
            }
            users.insert(
                PROTECTED_ACCOUNT.to_string(),
                UserAccount {
                    password_hash: password_hash.clone(),
                    role: Role::Admin,
                    status: AccountStatus::Active,
                },
            );
            Ok(true)
        })?;

        if created {
            info!(username = PROTECTED_ACCOUNT, "administrator account created");
        }
        Ok(created)
    }
}

pub fn require_admin(session: &Session) -> ClientResult<()> {
    if session.is_admin() {
        Ok(())
    } else {
        Err(ClientError::admin_required(&session.username))
    }
}

fn required(field: &str, value: &str) -> ClientResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClientError::invalid_argument(&format!("The {field} is required.")));
    }
    Ok(trimmed.to_string())
}

fn pending_request<'b>(
    requests: &'b RequestBook,
    username: &str,
) -> ClientResult<&'b AccessRequest> {
    let request = requests
        .get(username)
        .ok_or_else(|| ClientError::request_not_found(username))?;
    if request.status != RequestStatus::Pending {
        return Err(ClientError::request_not_pending(username, request.status.as_str()));
    }
    Ok(request)
}

/// Reads a JSON document. A missing or blank document is the empty default.
fn read_book<T>(store: &dyn DocumentStore, key: &str) -> ClientResult<(T, Option<Revision>)>
where
    T: DeserializeOwned + Default,
{
    let Some(document) = store.get(key)? else {
        return Ok((T::default(), None));
    };
    if document.bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok((T::default(), Some(document.revision)));
    }
    let book = serde_json::from_slice::<T>(&document.bytes)
        .map_err(|error| ClientError::store_corrupt(key, &error.to_string()))?;
    Ok((book, Some(document.revision)))
}

/// Applies `mutate` to the current document and writes it back against the
/// revision it was read at, re-reading after each conflict.
fn update_book<T, R, F>(store: &dyn DocumentStore, key: &str, mut mutate: F) -> ClientResult<R>
where
    T: DeserializeOwned + Serialize + Default,
    F: FnMut(&mut T) -> ClientResult<R>,
{
    let mut attempt = 1;
    loop {
        let (mut book, revision) = read_book::<T>(store, key)?;
        let outcome = mutate(&mut book)?;
        let bytes = serde_json::to_vec_pretty(&book)
            .map_err(|error| ClientError::internal_serialization(&error.to_string()))?;

        match store.put(key, &bytes, revision.as_ref()) {
            Ok(_) => return Ok(outcome),
            Err(error) if error.code == "store_conflict" && attempt < MAX_WRITE_ATTEMPTS => {
                warn!(key, attempt, "document changed during update; retrying");
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
