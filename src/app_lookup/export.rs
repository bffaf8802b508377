// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;
use serde::Serialize;
use std::path::Path;

pub const CSV_HEADER: [&str; 4] = ["Steam App ID", "Platform", "Status", "My Review"];
const DEFAULT_STATUS: &str = "Backlog";
const DEFAULT_REVIEW: &str = "Unreviewed";

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// One import row per app id, with default status and review columns
pub fn write_csv<I>(path: &Path, app_ids: I, platform: &str) -> anyhow::Result<()>
where
    I: IntoIterator<Item = u32>,
{
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(CSV_HEADER)?;
    for app_id in app_ids {
        writer.write_record([
            app_id.to_string().as_str(),
            platform,
            DEFAULT_STATUS,
            DEFAULT_REVIEW,
        ])?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_write_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("games.csv");

        write_csv(&path, [620, 400], "Epic Games").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "Steam App ID,Platform,Status,My Review\n\
             620,Epic Games,Backlog,Unreviewed\n\
             400,Epic Games,Backlog,Unreviewed\n"
        );
    }

    #[test]
    fn test_write_csv_quotes_platform_with_comma() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("games.csv");

        write_csv(&path, [620], "GOG, Galaxy").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with("620,\"GOG, Galaxy\",Backlog,Unreviewed\n"));
    }

    #[test]
    fn test_write_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids.json");
        let ids = BTreeMap::from([("Portal", 400)]);

        write_json(&path, &ids).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"Portal":400}"#);
    }
}
