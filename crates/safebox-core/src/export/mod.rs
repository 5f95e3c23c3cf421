//! Export deployed values as json, yaml or dotenv
//!
//! Values are keyed by their short name (`Config::key`), so
//! `/prod/orders/DB_NAME` exports as `DB_NAME`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deploy::{FileGenerator, GenerateTarget};
use crate::logging::file_logger as log;
use crate::store::{Store, StoreError};
use crate::types::{Config, ConfigInput};

/// Errors from exporting
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("key '{0}' is not found in safebox config file")]
    UnknownKey(String),

    #[error("failed to get params: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Yaml,
    Dotenv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Yaml => "yaml",
            ExportFormat::Dotenv => "dotenv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "yaml" => Ok(ExportFormat::Yaml),
            "dotenv" => Ok(ExportFormat::Dotenv),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short name → value; on a key collision the later record wins
pub fn export_params(configs: &[Config]) -> BTreeMap<String, String> {
    configs
        .iter()
        .map(|c| (c.key().to_string(), c.value.clone()))
        .collect()
}

/// Restrict `all` to the entries whose short name is in `keys`
///
/// An empty `keys` selects everything.
pub fn select_inputs(all: &[ConfigInput], keys: &[String]) -> ExportResult<Vec<ConfigInput>> {
    if keys.is_empty() {
        return Ok(all.to_vec());
    }
    keys.iter()
        .map(|key| {
            all.iter()
                .find(|input| input.key() == key)
                .cloned()
                .ok_or_else(|| ExportError::UnknownKey(key.clone()))
        })
        .collect()
}

pub fn write_export<W: Write>(
    params: &BTreeMap<String, String>,
    format: ExportFormat,
    mut out: W,
) -> ExportResult<()> {
    match format {
        ExportFormat::Json => serde_json::to_writer_pretty(&mut out, params)?,
        ExportFormat::Yaml => serde_yaml::to_writer(&mut out, params)?,
        ExportFormat::Dotenv => {
            for (key, value) in params {
                let key = key.to_uppercase().replace('-', "_");
                writeln!(out, "{}=\"{}\"", key, double_quote_escape(value))?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// Read `keys` (or everything in `all`) from the store and write them out
pub async fn export_configs<W: Write>(
    store: &dyn Store,
    all: &[ConfigInput],
    keys: &[String],
    format: ExportFormat,
    out: W,
) -> ExportResult<()> {
    let inputs = select_inputs(all, keys)?;
    let configs = store.get_many(&inputs).await?;
    write_export(&export_params(&configs), format, out)
}

fn double_quote_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\\' | '"' | '!' | '$' | '`' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders generate targets to disk
#[derive(Debug, Default, Clone, Copy)]
pub struct FileExporter;

impl FileExporter {
    pub fn new() -> Self {
        Self
    }
}

impl FileGenerator for FileExporter {
    fn generate(
        &self,
        configs: &[Config],
        target: &GenerateTarget,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(parent) = target.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&target.path)?;
        write_export(&export_params(configs), target.format, BufWriter::new(file))?;
        log::debug(
            "FileExporter",
            &format!("wrote {} as {}", target.path.display(), target.format),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;
    use tempfile::tempdir;

    fn config(name: &str, value: &str) -> Config {
        Config::first_version(&ConfigInput::new(name, value), Utc::now())
    }

    fn render(params: &BTreeMap<String, String>, format: ExportFormat) -> String {
        let mut out = Vec::new();
        write_export(params, format, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_params_keyed_by_short_name() {
        let exported = export_params(&[config("/prod/orders/DB_NAME", "orders"), config("/prod/shared/BUCKET", "assets")]);
        assert_eq!(exported, params(&[("BUCKET", "assets"), ("DB_NAME", "orders")]));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("dotenv".parse::<ExportFormat>().unwrap(), ExportFormat::Dotenv);
        let err = "toml".parse::<ExportFormat>().unwrap_err();
        assert_eq!(err.to_string(), "unsupported export format: toml");
    }

    #[test]
    fn test_json_output() {
        let text = render(&params(&[("A", "1"), ("B", "two")]), ExportFormat::Json);
        assert_eq!(text, "{\n  \"A\": \"1\",\n  \"B\": \"two\"\n}");
    }

    #[test]
    fn test_yaml_output() {
        let text = render(&params(&[("BUCKET", "assets"), ("DB_NAME", "orders")]), ExportFormat::Yaml);
        assert_eq!(text, "BUCKET: assets\nDB_NAME: orders\n");
    }

    #[test]
    fn test_dotenv_output() {
        let text = render(
            &params(&[("api-key", "a$b"), ("MOTD", "say \"hi\"!\nbye")]),
            ExportFormat::Dotenv,
        );
        assert_eq!(text, "MOTD=\"say \\\"hi\\\"\\!\\nbye\"\nAPI_KEY=\"a\\$b\"\n");
    }

    #[test]
    fn test_double_quote_escape() {
        assert_eq!(double_quote_escape(r"C:\tmp"), r"C:\\tmp");
        assert_eq!(double_quote_escape("`cmd`"), "\\`cmd\\`");
        assert_eq!(double_quote_escape("a\r\nb"), "a\\r\\nb");
        assert_eq!(double_quote_escape("plain"), "plain");
    }

    #[test]
    fn test_select_inputs() {
        let all = vec![
            ConfigInput::new("/dev/svc/A", "1"),
            ConfigInput::new("/dev/svc/B", "2"),
        ];
        assert_eq!(select_inputs(&all, &[]).unwrap().len(), 2);

        let picked = select_inputs(&all, &["B".to_string()]).unwrap();
        assert_eq!(picked[0].name, "/dev/svc/B");

        let err = select_inputs(&all, &["C".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "key 'C' is not found in safebox config file");
    }

    #[tokio::test]
    async fn test_export_configs() {
        let store = MemoryStore::new();
        store
            .put_many(vec![ConfigInput::new("/dev/svc/A", "1"), ConfigInput::new("/dev/svc/B", "2")])
            .await
            .unwrap();
        let all = vec![ConfigInput::named("/dev/svc/A"), ConfigInput::named("/dev/svc/B")];

        let mut out = Vec::new();
        export_configs(&store, &all, &["A".to_string()], ExportFormat::Dotenv, &mut out)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "A=\"1\"\n");
    }

    #[test]
    fn test_file_exporter() {
        let dir = tempdir().unwrap();
        let target = GenerateTarget::new(ExportFormat::Dotenv, dir.path().join("nested").join(".env"));

        FileExporter::new()
            .generate(&[config("/dev/svc/PORT", "8080")], &target)
            .unwrap();

        let written = std::fs::read_to_string(&target.path).unwrap();
        assert_eq!(written, "PORT=\"8080\"\n");
    }
}
