use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const ORDERS_FILE: &str = "orders.csv";
pub const CONTRACTS_FILE: &str = "contracts.csv";

/// `<prefix>_YYYY_MM_DD.csv`
pub fn report_filename(prefix: &str, date: NaiveDate) -> String {
    format!("{}_{}.csv", prefix, date.format("%Y_%m_%d"))
}

/// Filename for a billing sub-export. With several records carrying the same kind
/// of CSV, the record key is prefixed so downloads do not overwrite each other.
pub fn billing_filename(key: &str, base: &str, shared: bool) -> String {
    if shared {
        format!("{key}_{base}")
    } else {
        base.to_string()
    }
}

/// Write `contents` to `dir/filename`, creating the directory and replacing any
/// earlier download of the same name.
pub fn save_download(dir: &Path, filename: &str, contents: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    fs::write(&path, contents)?;
    log::info!("saved {} bytes to {}", contents.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ReportTable, TabularRow, ID_COLUMN};
    use tempfile::TempDir;

    #[test]
    fn report_name_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        assert_eq!(report_filename("Ohalloran", date), "Ohalloran_2024_01_09.csv");
    }

    #[test]
    fn save_creates_directory_and_replaces_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("downloads").join("nested");

        let path = save_download(&dir, "report.csv", "a,b\n1,2").unwrap();
        assert_eq!(path, dir.join("report.csv"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "a,b\n1,2");

        save_download(&dir, "report.csv", "a\n9").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\n9");
    }

    #[test]
    fn entries_export_omits_id() {
        let temp_dir = TempDir::new().unwrap();
        let rows: Vec<TabularRow> = vec![
            [("id", "1"), ("vehicle", "T-1"), ("miles", "5")]
                .into_iter()
                .collect(),
            [("id", "2"), ("vehicle", "T-2"), ("miles", "6")]
                .into_iter()
                .collect(),
        ];
        let table = ReportTable::from_rows(rows).without_column(ID_COLUMN);
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

        let path = save_download(
            temp_dir.path(),
            &report_filename("Ohalloran", date),
            &table.to_csv().unwrap(),
        )
        .unwrap();

        assert!(path.ends_with("Ohalloran_2024_03_09.csv"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "vehicle,miles\nT-1,5\nT-2,6"
        );
    }

    #[test]
    fn billing_names_are_keyed_only_when_shared() {
        assert_eq!(billing_filename("42", ORDERS_FILE, false), "orders.csv");
        assert_eq!(billing_filename("42", ORDERS_FILE, true), "42_orders.csv");
        assert_eq!(
            billing_filename("7", CONTRACTS_FILE, true),
            "7_contracts.csv"
        );
    }
}
