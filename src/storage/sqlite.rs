use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::path::Path;

use crate::error::Result;
use crate::models::AnalysisReport;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub document_name: String,
    pub analysis_date: DateTime<Utc>,
    pub provider: String,
    pub complete: bool,
}

/// History of exported analysis reports.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let storage = Self { conn };
        storage.init_db()?;
        Ok(storage)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.init_db()?;
        Ok(storage)
    }

    fn init_db(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                id INTEGER PRIMARY KEY,
                document_name TEXT NOT NULL,
                analysis_date TEXT NOT NULL,
                provider TEXT NOT NULL,
                complete INTEGER NOT NULL,
                report_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reports_document_name ON reports(document_name);
            "#,
        )?;

        Ok(())
    }

    pub fn save_report(&self, report: &AnalysisReport) -> Result<i64> {
        let report_json = serde_json::to_string(report)?;

        self.conn.execute(
            r#"
            INSERT INTO reports (document_name, analysis_date, provider, complete, report_json)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                report.document_name,
                report.analysis_date.to_rfc3339_opts(SecondsFormat::Micros, true),
                report.provider,
                report.is_complete(),
                report_json,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent report for a document, if any.
    pub fn latest_report(&self, document_name: &str) -> Result<Option<AnalysisReport>> {
        let result = self.conn.query_row(
            r#"
            SELECT report_json FROM reports
            WHERE document_name = ?1
            ORDER BY analysis_date DESC, id DESC
            LIMIT 1
            "#,
            params![document_name],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_reports(&self) -> Result<Vec<ReportSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT document_name, analysis_date, provider, complete FROM reports ORDER BY analysis_date DESC, id DESC",
        )?;

        let summaries = stmt.query_map([], |row| {
            let analysis_date_str: String = row.get(1)?;
            let analysis_date = DateTime::parse_from_rfc3339(&analysis_date_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());

            Ok(ReportSummary {
                document_name: row.get(0)?,
                analysis_date,
                provider: row.get(2)?,
                complete: row.get(3)?,
            })
        })?;

        summaries.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvocationError;
    use crate::pipeline::{PipelineResult, StageOutcome, StageOutput, StageRecord};
    use chrono::Duration;
    use serde_json::json;

    fn report(name: &str, fail: bool) -> AnalysisReport {
        let outcome = if fail {
            StageOutcome::Failure(InvocationError::EmptyResponse)
        } else {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), json!(50000));
            StageOutcome::Success(StageOutput::Structured(map))
        };
        let result = PipelineResult {
            records: vec![StageRecord {
                stage_id: "contract_details".to_string(),
                outcome,
            }],
            chunking: None,
        };
        AnalysisReport::from_result(name, "Fake", &result)
    }

    #[test]
    fn test_save_and_fetch_latest() {
        let storage = Storage::in_memory().unwrap();

        let mut older = report("msa.txt", true);
        older.analysis_date = Utc::now() - Duration::days(1);
        storage.save_report(&older).unwrap();
        storage.save_report(&report("msa.txt", false)).unwrap();

        let latest = storage.latest_report("msa.txt").unwrap().unwrap();
        assert!(latest.is_complete());
        assert_eq!(latest.sections["contract_details"], json!({"value": 50000}));

        assert!(storage.latest_report("other.txt").unwrap().is_none());
    }

    #[test]
    fn test_list_reports() {
        let storage = Storage::in_memory().unwrap();
        storage.save_report(&report("a.txt", false)).unwrap();
        storage.save_report(&report("b.txt", true)).unwrap();

        let summaries = storage.list_reports().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].document_name, "b.txt");
        assert!(!summaries[0].complete);
        assert!(summaries[1].complete);
    }
}
