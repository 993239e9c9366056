use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSONL record of one client run
pub struct Transcript {
    pub path: PathBuf,
    run_id: String,
    file: File,
}

#[derive(Serialize)]
struct Record<'a> {
    ts: DateTime<Utc>,
    run_id: &'a str,
    #[serde(rename = "type")]
    record_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl Transcript {
    /// Open `<dir>/<run_id>.jsonl`, creating the directory if needed
    pub fn open(dir: &Path, run_id: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.jsonl", run_id));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            run_id: run_id.to_string(),
            file,
        })
    }

    pub fn log(&mut self, record_type: &str, data: serde_json::Value) -> Result<()> {
        let record = Record {
            ts: Utc::now(),
            run_id: &self.run_id,
            record_type,
            data,
        };
        let line = serde_json::to_string(&record)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    /// Only the command name: arguments may carry passwords
    pub fn command(&mut self, name: &str) -> Result<()> {
        self.log("command", serde_json::json!({ "command": name }))
    }

    /// Outcome of a user action; `error` is the line shown to the user
    pub fn action_result(&mut self, action: &str, ok: bool, error: Option<&str>) -> Result<()> {
        self.log(
            "action_result",
            serde_json::json!({
                "action": action,
                "ok": ok,
                "error": error,
            }),
        )
    }

    /// Never records the token itself
    pub fn session_saved(&mut self, role: &str, identity: &str) -> Result<()> {
        self.log(
            "session_saved",
            serde_json::json!({ "role": role, "identity": identity }),
        )
    }

    pub fn session_cleared(&mut self) -> Result<()> {
        self.log("session_cleared", serde_json::json!({}))
    }

    pub fn image_upload(
        &mut self,
        file: &str,
        media_type: &str,
        size: usize,
        hosted: bool,
    ) -> Result<()> {
        self.log(
            "image_upload",
            serde_json::json!({
                "file": file,
                "media_type": media_type,
                "size": size,
                "hosted": hosted,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_records(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_records_are_jsonl() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");
        let mut t = Transcript::open(&logs, "run-1").unwrap();
        assert_eq!(t.path, logs.join("run-1.jsonl"));

        t.command("like").unwrap();
        t.action_result("like", false, Some("Failed to like post"))
            .unwrap();
        t.session_saved("user", "u1").unwrap();
        t.image_upload("a.png", "image/png", 4, true).unwrap();

        let records = read_records(&t.path);
        assert_eq!(records.len(), 4);
        assert_eq!(records[0]["type"], "command");
        assert_eq!(records[0]["command"], "like");
        assert_eq!(records[0]["run_id"], "run-1");
        assert_eq!(records[1]["ok"], false);
        assert_eq!(records[1]["error"], "Failed to like post");
        assert!(records[2].get("token").is_none());
        assert_eq!(records[3]["media_type"], "image/png");
    }

    #[test]
    fn test_reopen_appends() {
        let dir = TempDir::new().unwrap();
        Transcript::open(dir.path(), "r")
            .unwrap()
            .session_cleared()
            .unwrap();
        let mut t = Transcript::open(dir.path(), "r").unwrap();
        t.session_cleared().unwrap();
        assert_eq!(read_records(&t.path).len(), 2);
    }
}
