mod support;

use std::fs;
use std::path::Path;

use empenhos_client::access::model::Role;
use empenhos_client::commands::access::{
    self, AdminOptions, BootstrapAdminOptions, Credentials, RequestAccessOptions, ReviewOptions,
};
use empenhos_client::commands::users::{self, UserDeleteOptions};
use serde_json::Value;
use support::ledger_testkit::{data_dir, payload, temp_home};

const ADMIN_PASSWORD: &str = "admin-secret";

fn admin() -> Credentials {
    Credentials {
        username: "admin".to_string(),
        password: ADMIN_PASSWORD.to_string(),
    }
}

fn bootstrap(home: &Path) {
    let created = payload(access::bootstrap_admin_with_options(BootstrapAdminOptions {
        password: ADMIN_PASSWORD.to_string(),
        home_override: Some(home),
    }));
    assert_eq!(created["data"]["created"], true);
}

fn request(home: &Path, username: &str, password: &str) -> Value {
    payload(access::request_with_options(RequestAccessOptions {
        username: username.to_string(),
        email: format!("{username}@prefeitura.gov.br"),
        password: password.to_string(),
        home_override: Some(home),
    }))
}

fn read_document(home: &Path, name: &str) -> Value {
    let text = fs::read_to_string(data_dir(home).join(name));
    assert!(text.is_ok());
    let parsed = serde_json::from_str::<Value>(&text.unwrap_or_default());
    assert!(parsed.is_ok());
    parsed.unwrap_or(Value::Null)
}

#[test]
fn approved_request_becomes_an_active_account() {
    let temp = temp_home("empenhos-approve-flow");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        let submitted = request(&home, "maria", "segredo-da-maria");
        assert_eq!(submitted["command"], "access request");
        assert_eq!(submitted["data"]["request"]["status"], "pendente");
        assert_eq!(submitted["data"]["request"]["requested_role"], "USER");

        bootstrap(&home);
        let pending = payload(access::pending_with_options(AdminOptions {
            credentials: admin(),
            home_override: Some(&home),
        }));
        assert_eq!(pending["data"]["requests"][0]["username"], "maria");

        let approved = payload(access::approve_with_options(ReviewOptions {
            credentials: admin(),
            username: "maria".to_string(),
            role: Role::Admin,
            home_override: Some(&home),
        }));
        assert_eq!(approved["data"]["account"]["status"], "ativo");
        assert_eq!(approved["data"]["request_status"], "aprovado");

        let users = read_document(&home, "usuarios.json");
        assert_eq!(users["maria"]["status"], "ativo");
        assert_eq!(users["maria"]["perfil"], "ADMIN");
        let hash = users["maria"]["senha_hash"].as_str().unwrap_or_default();
        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("segredo-da-maria"));

        let requests = read_document(&home, "solicitacoes.json");
        assert_eq!(requests["maria"]["status"], "aprovado");

        let login = payload(access::login_with_options(AdminOptions {
            credentials: Credentials {
                username: "maria".to_string(),
                password: "segredo-da-maria".to_string(),
            },
            home_override: Some(&home),
        }));
        assert_eq!(login["data"]["session"]["role"], "ADMIN");

        let pending = payload(access::pending_with_options(AdminOptions {
            credentials: admin(),
            home_override: Some(&home),
        }));
        assert_eq!(pending["data"]["requests"].as_array().map(Vec::len), Some(0));
    }
}

#[test]
fn pending_request_cannot_log_in_yet() {
    let temp = temp_home("empenhos-pending-login");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        request(&home, "joao", "senha-do-joao");
        let result = access::login_with_options(AdminOptions {
            credentials: Credentials {
                username: "joao".to_string(),
                password: "senha-do-joao".to_string(),
            },
            home_override: Some(&home),
        });
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "authentication_failed");
        }
    }
}

#[test]
fn wrong_password_and_unknown_user_fail_alike() {
    let temp = temp_home("empenhos-login-failures");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        bootstrap(&home);
        let wrong_password = access::login_with_options(AdminOptions {
            credentials: Credentials {
                username: "admin".to_string(),
                password: "chute".to_string(),
            },
            home_override: Some(&home),
        });
        let unknown_user = access::login_with_options(AdminOptions {
            credentials: Credentials {
                username: "ninguem".to_string(),
                password: ADMIN_PASSWORD.to_string(),
            },
            home_override: Some(&home),
        });

        assert!(wrong_password.is_err());
        assert!(unknown_user.is_err());
        if let (Err(left), Err(right)) = (wrong_password, unknown_user) {
            assert_eq!(left.code, "authentication_failed");
            assert_eq!(left.code, right.code);
            assert_eq!(left.message, right.message);
        }
    }
}

#[test]
fn duplicate_request_is_refused() {
    let temp = temp_home("empenhos-duplicate-request");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        request(&home, "ana", "senha-1");
        let again = access::request_with_options(RequestAccessOptions {
            username: "ana".to_string(),
            email: "outra@prefeitura.gov.br".to_string(),
            password: "senha-2".to_string(),
            home_override: Some(&home),
        });
        assert!(again.is_err());
        if let Err(error) = again {
            assert_eq!(error.code, "request_exists");
        }
    }
}

#[test]
fn ordinary_users_cannot_review_requests() {
    let temp = temp_home("empenhos-non-admin");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        bootstrap(&home);
        request(&home, "carlos", "senha-do-carlos");
        payload(access::approve_with_options(ReviewOptions {
            credentials: admin(),
            username: "carlos".to_string(),
            role: Role::User,
            home_override: Some(&home),
        }));
        request(&home, "beatriz", "senha-da-beatriz");

        let result = access::approve_with_options(ReviewOptions {
            credentials: Credentials {
                username: "carlos".to_string(),
                password: "senha-do-carlos".to_string(),
            },
            username: "beatriz".to_string(),
            role: Role::User,
            home_override: Some(&home),
        });
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "admin_required");
        }
    }
}

#[test]
fn rejected_request_leaves_no_account() {
    let temp = temp_home("empenhos-reject");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        bootstrap(&home);
        request(&home, "pedro", "senha-do-pedro");

        let rejected = payload(access::reject_with_options(ReviewOptions {
            credentials: admin(),
            username: "pedro".to_string(),
            home_override: Some(&home),
            ..ReviewOptions::default()
        }));
        assert_eq!(rejected["data"]["request"]["status"], "rejeitado");

        let users = read_document(&home, "usuarios.json");
        assert!(users.get("pedro").is_none());

        let approve_after = access::approve_with_options(ReviewOptions {
            credentials: admin(),
            username: "pedro".to_string(),
            home_override: Some(&home),
            ..ReviewOptions::default()
        });
        assert!(approve_after.is_err());
        if let Err(error) = approve_after {
            assert_eq!(error.code, "request_not_pending");
        }
    }
}

#[test]
fn bootstrap_admin_is_idempotent() {
    let temp = temp_home("empenhos-bootstrap-twice");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        bootstrap(&home);
        let again = payload(access::bootstrap_admin_with_options(BootstrapAdminOptions {
            password: "outra-senha".to_string(),
            home_override: Some(&home),
        }));
        assert_eq!(again["data"]["created"], false);

        // The original password still works.
        let login = access::login_with_options(AdminOptions {
            credentials: admin(),
            home_override: Some(&home),
        });
        assert!(login.is_ok());
    }
}

#[test]
fn admins_manage_accounts_but_not_the_protected_one() {
    let temp = temp_home("empenhos-user-admin");
    assert!(temp.is_ok());
    if let Ok((_dir, home)) = temp {
        bootstrap(&home);
        request(&home, "lucia", "senha-da-lucia");
        payload(access::approve_with_options(ReviewOptions {
            credentials: admin(),
            username: "lucia".to_string(),
            role: Role::User,
            home_override: Some(&home),
        }));

        let listed = payload(users::list_with_options(AdminOptions {
            credentials: admin(),
            home_override: Some(&home),
        }));
        let names = listed["data"]["users"]
            .as_array()
            .map(|users| {
                users
                    .iter()
                    .filter_map(|user| user["username"].as_str())
                    .collect::<Vec<&str>>()
            })
            .unwrap_or_default();
        assert_eq!(names, vec!["admin", "lucia"]);

        let protected = users::delete_with_options(UserDeleteOptions {
            credentials: admin(),
            username: "admin".to_string(),
            home_override: Some(&home),
        });
        assert!(protected.is_err());
        if let Err(error) = protected {
            assert_eq!(error.code, "account_protected");
        }

        let deleted = payload(users::delete_with_options(UserDeleteOptions {
            credentials: admin(),
            username: "lucia".to_string(),
            home_override: Some(&home),
        }));
        assert_eq!(deleted["data"]["account"]["username"], "lucia");

        let missing = users::delete_with_options(UserDeleteOptions {
            credentials: admin(),
            username: "lucia".to_string(),
            home_override: Some(&home),
        });
        assert!(missing.is_err());
        if let Err(error) = missing {
            assert_eq!(error.code, "account_not_found");
        }
    }
}
