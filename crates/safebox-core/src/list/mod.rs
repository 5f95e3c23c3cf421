//! Read-only listing of deployed configs

use std::cmp::Ordering;
use std::io::Write;
use std::str::FromStr;

use crate::store::{Store, StoreError, StoreResult};
use crate::types::{Config, ConfigInput};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Listing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Lexicographic by full name
    #[default]
    Name,
    /// Numeric by version, `"2"` before `"10"`
    Version,
    /// Oldest modification first
    Modified,
}

impl FromStr for SortOrder {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortOrder::Name),
            "version" => Ok(SortOrder::Version),
            "modified" => Ok(SortOrder::Modified),
            other => Err(StoreError::configuration(format!("unknown sort order `{}`", other))),
        }
    }
}

/// Sort in place; stable, ties keep store order
///
/// Versions that are not numbers sort after every numeric version and
/// among themselves by name.
pub fn sort_configs(configs: &mut [Config], order: SortOrder) {
    match order {
        SortOrder::Name => configs.sort_by(|a, b| a.name.cmp(&b.name)),
        SortOrder::Version => configs.sort_by(compare_versions),
        SortOrder::Modified => configs.sort_by(|a, b| a.modified.cmp(&b.modified)),
    }
}

fn compare_versions(a: &Config, b: &Config) -> Ordering {
    match (a.version_number(), b.version_number()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    }
}

/// Read the named entries and order them
pub async fn list_configs(
    store: &dyn Store,
    inputs: &[ConfigInput],
    order: SortOrder,
) -> StoreResult<Vec<Config>> {
    let mut configs = store.get_many(inputs).await?;
    sort_configs(&mut configs, order);
    Ok(configs)
}

/// Render a listing as an aligned table followed by a total line
pub fn write_table<W: Write>(configs: &[Config], mut out: W) -> std::io::Result<()> {
    if !configs.is_empty() {
        let rows: Vec<[String; 5]> = configs
            .iter()
            .map(|c| {
                [
                    c.name.clone(),
                    c.value.clone(),
                    c.config_type.to_string(),
                    c.version.clone(),
                    c.modified.with_timezone(&chrono::Local).format(TIME_FORMAT).to_string(),
                ]
            })
            .collect();
        let header = ["Name", "Value", "Type", "Version", "LastModified"].map(String::from);

        let mut widths = [0usize; 5];
        for row in std::iter::once(&header).chain(rows.iter()) {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        for row in std::iter::once(&header).chain(rows.iter()) {
            let line: Vec<String> = row
                .iter()
                .zip(widths.iter())
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect();
            writeln!(out, "{}", line.join("  ").trim_end())?;
        }
        writeln!(out, "---")?;
    }
    writeln!(out, "Total parameters = {}", configs.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};

    fn config(name: &str, version: &str, minutes_ago: i64) -> Config {
        let mut config = Config::first_version(&ConfigInput::new(name, "v"), Utc::now() - Duration::minutes(minutes_ago));
        config.version = version.to_string();
        config
    }

    fn names(configs: &[Config]) -> Vec<&str> {
        configs.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_version_sort_is_numeric() {
        let mut configs = vec![config("a", "10", 0), config("b", "2", 0), config("c", "1", 0)];
        sort_configs(&mut configs, SortOrder::Version);
        assert_eq!(names(&configs), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_unparseable_versions_last() {
        let mut configs = vec![config("z", "x", 0), config("y", "3", 0), config("a", "", 0)];
        sort_configs(&mut configs, SortOrder::Version);
        assert_eq!(names(&configs), vec!["y", "a", "z"]);
    }

    #[test]
    fn test_name_and_modified_sort() {
        let mut configs = vec![config("/b", "1", 5), config("/a", "1", 1), config("/c", "1", 10)];

        sort_configs(&mut configs, SortOrder::Name);
        assert_eq!(names(&configs), vec!["/a", "/b", "/c"]);

        sort_configs(&mut configs, SortOrder::Modified);
        assert_eq!(names(&configs), vec!["/c", "/b", "/a"]);
    }

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!("version".parse::<SortOrder>().unwrap(), SortOrder::Version);
        assert!("size".parse::<SortOrder>().is_err());
    }

    #[tokio::test]
    async fn test_list_configs() {
        let store = MemoryStore::new();
        store
            .put_many(vec![ConfigInput::new("/dev/svc/B", "2"), ConfigInput::new("/dev/svc/A", "1")])
            .await
            .unwrap();

        let inputs = vec![
            ConfigInput::named("/dev/svc/B"),
            ConfigInput::named("/dev/svc/A"),
            ConfigInput::named("/dev/svc/GONE"),
        ];
        let listed = list_configs(&store, &inputs, SortOrder::Name).await.unwrap();
        assert_eq!(names(&listed), vec!["/dev/svc/A", "/dev/svc/B"]);
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let store = MemoryStore::new();
        let listed = list_configs(&store, &[], SortOrder::Version).await.unwrap();
        assert!(listed.is_empty());

        let mut out = Vec::new();
        write_table(&listed, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Total parameters = 0\n");
    }

    #[test]
    fn test_table_layout() {
        let configs = vec![config("/dev/svc/LONG_NAME", "12", 0)];
        let mut out = Vec::new();
        write_table(&configs, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Name                Value  Type"));
        assert!(lines[1].starts_with("/dev/svc/LONG_NAME  v      String  12"));
        assert_eq!(lines[2], "---");
        assert_eq!(lines[3], "Total parameters = 1");
    }
}
