use async_trait::async_trait;

use super::model::{collect, ReportRow};
use super::{PgStore, ReportStore, StoreResult};
use crate::models::{Report, ReportStatus};

#[async_trait]
impl ReportStore for PgStore {
    async fn insert_report(&self, report: &Report) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO reports (id, event_id, reporter_uid, reason, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(report.id)
        .bind(report.event_id)
        .bind(report.reporter_uid)
        .bind(&report.reason)
        .bind(report.status.as_str())
        .bind(report.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_reports(&self, status: Option<ReportStatus>) -> StoreResult<Vec<Report>> {
        let rows = sqlx::query_as::<_, ReportRow>(
            "SELECT id, event_id, reporter_uid, reason, status, created_at FROM reports
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC",
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }
}
