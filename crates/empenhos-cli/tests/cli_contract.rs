use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde_json::Value;
use tempfile::{Builder, TempDir};

const TRANSACTIONS_2023: &str = "\
anoEmpenho;nomeEntidade;nomeCredor;numeroEmpenho;numRecurso;numDespesa;numNaturezaEmp;especificacao;valorEmpenhadoBruto;valorEmpenhadoAnulado;valorBaixadoBruto
2023;PREFEITURA;ACME LTDA;101;100;31;90;Aquisição de merenda escolar;1.000,00;100,00;400,00
2023;CAMARA;BETA SERVICOS;102;200;33;39;Serviço de limpeza;500,50;0,00;500,50
";

struct CliRun {
    code: Option<i32>,
    stdout: String,
}

fn temp_home() -> (TempDir, PathBuf) {
    let dir = Builder::new().prefix("empenhos-cli").tempdir();
    assert!(dir.is_ok());
    let Ok(dir) = dir else {
        panic!("temporary directory unavailable");
    };
    let home = dir.path().join("home");
    (dir, home)
}

fn run_cli(home: &Path, args: &[&str], password: Option<&str>, input: Option<&str>) -> CliRun {
    let mut command = Command::new(env!("CARGO_BIN_EXE_empenhos"));
    command
        .args(args)
        .env("EMPENHOS_HOME", home)
        .env("EMPENHOS_STORE", "local")
        .env("EMPENHOS_LOG", "off")
        .env("COLUMNS", "160")
        .env_remove("EMPENHOS_GITHUB_TOKEN")
        .env_remove("EMPENHOS_GITHUB_REPO");
    match password {
        Some(value) => command.env("EMPENHOS_PASSWORD", value),
        None => command.env_remove("EMPENHOS_PASSWORD"),
    };
    if input.is_some() {
        command.stdin(Stdio::piped());
    }
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let spawned = command.spawn();
    assert!(spawned.is_ok());
    if let Ok(mut child) = spawned {
        if let Some(body) = input
            && let Some(mut pipe) = child.stdin.take()
        {
            assert!(pipe.write_all(body.as_bytes()).is_ok());
        }
        let output = child.wait_with_output();
        assert!(output.is_ok());
        if let Ok(result) = output {
            return CliRun {
                code: result.status.code(),
                stdout: String::from_utf8_lossy(&result.stdout).to_string(),
            };
        }
    }
    CliRun {
        code: None,
        stdout: String::new(),
    }
}

fn parse_json(body: &str) -> Value {
    let parsed = serde_json::from_str::<Value>(body);
    assert!(parsed.is_ok(), "not JSON: {body}");
    parsed.unwrap_or(Value::Null)
}

fn seed(home: &Path, name: &str, body: &str) {
    let data = home.join("data");
    assert!(fs::create_dir_all(&data).is_ok());
    assert!(fs::write(data.join(name), body).is_ok());
}

#[test]
fn bare_invocation_prints_short_help() {
    let (_dir, home) = temp_home();
    let run = run_cli(&home, &[], None, None);
    assert_eq!(run.code, Some(0));
    assert!(run.stdout.starts_with("empenhos - relatórios de empenhos municipais"));
    assert!(run.stdout.contains("empenhos files list"));
}

#[test]
fn summary_without_data_is_informational() {
    let (_dir, home) = temp_home();
    let run = run_cli(&home, &["summary"], None, None);
    assert_eq!(run.code, Some(0));
    assert!(run.stdout.contains("Nenhum empenho encontrado"));
    assert!(run.stdout.contains("empenhos files list"));
}

#[test]
fn summary_json_is_a_success_envelope() {
    let (_dir, home) = temp_home();
    seed(&home, "2023_empenhos.csv", TRANSACTIONS_2023);
    let run = run_cli(&home, &["summary", "--json"], None, None);
    assert_eq!(run.code, Some(0));

    let envelope = parse_json(&run.stdout);
    assert_eq!(envelope["ok"], true);
    assert_eq!(envelope["command"], "summary");
    assert_eq!(envelope["data"]["empty"], false);
    assert_eq!(envelope["data"]["totals"]["records"], 2);
}

#[test]
fn text_reports_show_brazilian_currency() {
    let (_dir, home) = temp_home();
    seed(&home, "2023_empenhos.csv", TRANSACTIONS_2023);
    let run = run_cli(&home, &["creditor", "--entity", "PREFEITURA"], None, None);
    assert_eq!(run.code, Some(0));
    assert!(run.stdout.contains("Filtros: "));
    assert!(run.stdout.contains("ACME LTDA"));
    assert!(run.stdout.contains("R$ 1.000,00"));
    assert!(!run.stdout.contains("BETA SERVICOS"));
}

#[test]
fn invalid_year_fails_with_json_error() {
    let (_dir, home) = temp_home();
    let run = run_cli(&home, &["summary", "--year", "vinte", "--json"], None, None);
    assert_eq!(run.code, Some(1));

    let envelope = parse_json(&run.stdout);
    assert_eq!(envelope["ok"], false);
    assert_eq!(envelope["error"]["code"], "invalid_argument");
}

#[test]
fn unknown_flag_is_a_parse_error_with_hint() {
    let (_dir, home) = temp_home();
    let run = run_cli(&home, &["fund", "--bogus", "--json"], None, None);
    assert_eq!(run.code, Some(1));

    let envelope = parse_json(&run.stdout);
    assert_eq!(envelope["error"]["code"], "invalid_argument");
    assert_eq!(envelope["data"]["command_hint"], "fund");
}

#[test]
fn administrator_reviews_a_request() {
    let (_dir, home) = temp_home();

    let bootstrap = run_cli(
        &home,
        &["access", "bootstrap-admin", "--json"],
        Some("admin-secret"),
        None,
    );
    assert_eq!(bootstrap.code, Some(0));
    assert_eq!(parse_json(&bootstrap.stdout)["data"]["created"], true);

    let request = run_cli(
        &home,
        &[
            "access",
            "request",
            "maria",
            "--email",
            "maria@prefeitura.gov.br",
            "--password-stdin",
        ],
        None,
        Some("maria-secret\n"),
    );
    assert_eq!(request.code, Some(0));
    assert!(request.stdout.contains("`maria`"));

    let pending = run_cli(
        &home,
        &["access", "pending", "--json"],
        Some("admin-secret"),
        None,
    );
    assert_eq!(pending.code, Some(0));
    let pending = parse_json(&pending.stdout);
    assert_eq!(pending["command"], "access pending");
    assert_eq!(pending["data"]["requests"][0]["username"], "maria");

    let approve = run_cli(
        &home,
        &["access", "approve", "maria", "--role", "USER"],
        Some("admin-secret"),
        None,
    );
    assert_eq!(approve.code, Some(0));
    assert!(approve.stdout.contains("Acesso aprovado"));

    let login = run_cli(
        &home,
        &["access", "login", "--user", "maria", "--json"],
        Some("maria-secret"),
        None,
    );
    assert_eq!(login.code, Some(0));
    assert_eq!(parse_json(&login.stdout)["data"]["session"]["role"], "USER");
}

#[test]
fn authenticated_commands_need_a_password() {
    let (_dir, home) = temp_home();
    let run = run_cli(&home, &["user", "list"], None, None);
    assert_eq!(run.code, Some(1));
    assert!(run.stdout.starts_with("The command could not finish."));
    assert!(run.stdout.contains("EMPENHOS_PASSWORD"));
}

#[test]
fn export_writes_the_requested_file() {
    let (dir, home) = temp_home();
    seed(&home, "2023_empenhos.csv", TRANSACTIONS_2023);
    let target = dir.path().join("saida.csv");
    let target_arg = target.display().to_string();

    let run = run_cli(&home, &["export", "--output", &target_arg], None, None);
    assert_eq!(run.code, Some(0));
    assert!(run.stdout.starts_with("Arquivo gerado: "));
    assert!(run.stdout.contains("(2 registros)"));

    let written = fs::read_to_string(&target);
    assert!(matches!(written, Ok(ref text) if text.contains("ACME LTDA")));
}
