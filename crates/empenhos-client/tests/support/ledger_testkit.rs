use std::fs;
use std::path::{Path, PathBuf};

use empenhos_client::SuccessEnvelope;
use serde_json::Value;
use tempfile::{Builder, TempDir};

pub const TRANSACTIONS_2023: &str = "\
anoEmpenho;nomeEntidade;nomeCredor;numeroEmpenho;numRecurso;numDespesa;numNaturezaEmp;especificacao;valorEmpenhadoBruto;valorEmpenhadoAnulado;valorBaixadoBruto
2023;PREFEITURA;ACME LTDA;101;100;31;90;Aquisição de merenda escolar;1.000,00;100,00;400,00
2023;CAMARA;BETA SERVICOS;102;200;33;39;Serviço de limpeza;500,50;0,00;500,50
";

pub const TRANSACTIONS_2024: &str = "\
anoEmpenho;nomeEntidade;nomeCredor;numeroEmpenho;numRecurso;numDespesa;numNaturezaEmp;especificacao;valorEmpenhadoBruto;valorEmpenhadoAnulado;valorBaixadoBruto
2024;PREFEITURA;ACME LTDA;201;100;31;90;Merendas para creches;2.000,00;0,00;1.500,00
2024;PREFEITURA;GAMA OBRAS;202;200;44;51;Obra de pavimentação;10.000,00;2.500,00;abc
2024;;SEM ENTIDADE;203;100;31;90;Linha sem entidade;99,00;0;0
";

pub const REFERENCES_2023: &str = "\
anoEmpenho;nomeEntidade;numDespesa;numNaturezaEmp;Descrição da despesa;Descrição da natureza
2023;PREFEITURA;31;90;PESSOAL E ENCARGOS;APLICACOES DIRETAS
2023;CAMARA;33;39;OUTRAS DESPESAS CORRENTES;SERVICOS DE TERCEIROS
";

pub fn temp_home(prefix: &str) -> std::io::Result<(TempDir, PathBuf)> {
    let dir = Builder::new().prefix(prefix).tempdir()?;
    let home = dir.path().join("empenhos-home");
    fs::create_dir_all(&home)?;
    Ok((dir, home))
}

pub fn data_dir(home: &Path) -> PathBuf {
    home.join("data")
}

pub fn write_data_file(home: &Path, name: &str, body: &str) {
    let dir = data_dir(home);
    assert!(fs::create_dir_all(&dir).is_ok());
    assert!(fs::write(dir.join(name), body).is_ok());
}

/// Two transaction years plus the 2023 reference table.
pub fn seed_home(home: &Path) {
    write_data_file(home, "2023_empenhos.csv", TRANSACTIONS_2023);
    write_data_file(home, "2024_empenhos.csv", TRANSACTIONS_2024);
    write_data_file(home, "2023_referencias.csv", REFERENCES_2023);
}

pub fn payload(result: empenhos_client::ClientResult<SuccessEnvelope>) -> Value {
    assert!(result.is_ok(), "{:?}", result.as_ref().err());
    if let Ok(success) = result {
        let value = serde_json::to_value(success);
        assert!(value.is_ok());
        if let Ok(value) = value {
            return value;
        }
    }
    Value::Null
}

/// Decimal amounts serialize as strings; compares them numerically.
pub fn amount(value: &Value) -> f64 {
    value
        .as_str()
        .and_then(|text| text.parse::<f64>().ok())
        .or_else(|| value.as_f64())
        .unwrap_or(f64::NAN)
}

pub fn assert_amount(value: &Value, expected: f64) {
    let actual = amount(value);
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {value}"
    );
}

static MISSING: Value = Value::Null;

pub fn table<'a>(data: &'a Value, name: &str) -> &'a Value {
    data["tables"]
        .as_array()
        .and_then(|tables| tables.iter().find(|table| table["name"] == name))
        .unwrap_or(&MISSING)
}
