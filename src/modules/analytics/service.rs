use examtrack_core::AppError;
use examtrack_models::attendance::attendance_rate;
use sqlx::PgPool;
use tracing::instrument;

use super::model::{
    AnalyticsOverview, AttendanceAnalyticsParams, CountByKey, CourseAttendanceStats,
    TransferTurnaround, TurnaroundParams,
};

pub struct AnalyticsService;

impl AnalyticsService {
    async fn count_by(db: &PgPool, query: &str) -> Result<Vec<CountByKey>, AppError> {
        let rows = sqlx::query_as::<_, CountByKey>(query).fetch_all(db).await?;
        Ok(rows)
    }

    #[instrument(skip(db))]
    pub async fn get_overview(db: &PgPool) -> Result<AnalyticsOverview, AppError> {
        let users_by_role = Self::count_by(
            db,
            "SELECT role::text AS key, COUNT(*) AS count FROM users GROUP BY role ORDER BY role",
        )
        .await?;

        let active_users =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE is_active = true")
                .fetch_one(db)
                .await?;

        let total_students = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students")
            .fetch_one(db)
            .await?;

        let exam_sessions_by_status = Self::count_by(
            db,
            "SELECT status::text AS key, COUNT(*) AS count FROM exam_sessions GROUP BY status ORDER BY status",
        )
        .await?;

        let transfers_by_status = Self::count_by(
            db,
            "SELECT status::text AS key, COUNT(*) AS count FROM batch_transfers GROUP BY status ORDER BY status",
        )
        .await?;

        let open_discrepancies = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(DISTINCT bt.id)
               FROM batch_transfers bt
               JOIN incidents i ON i.batch_transfer_id = bt.id
               WHERE bt.has_discrepancy
                 AND i.incident_type = 'script_discrepancy'
                 AND i.status IN ('open', 'under_investigation')"#,
        )
        .fetch_one(db)
        .await?;

        let incidents_by_status = Self::count_by(
            db,
            "SELECT status::text AS key, COUNT(*) AS count FROM incidents GROUP BY status ORDER BY status",
        )
        .await?;

        let incidents_by_severity = Self::count_by(
            db,
            "SELECT severity::text AS key, COUNT(*) AS count FROM incidents GROUP BY severity ORDER BY severity",
        )
        .await?;

        let (attended, recorded) = sqlx::query_as::<_, (i64, i64)>(
            r#"SELECT COUNT(*) FILTER (WHERE status IN ('present', 'late')), COUNT(*)
               FROM attendance_records"#,
        )
        .fetch_one(db)
        .await?;

        Ok(AnalyticsOverview {
            users_by_role,
            active_users,
            total_students,
            exam_sessions_by_status,
            transfers_by_status,
            open_discrepancies,
            incidents_by_status,
            incidents_by_severity,
            attendance_rate: attendance_rate(attended, recorded),
        })
    }

    /// Per-course attendance. Sessions without records still show up with zeros.
    #[instrument(skip(db))]
    pub async fn get_attendance_by_course(
        db: &PgPool,
        params: AttendanceAnalyticsParams,
    ) -> Result<Vec<CourseAttendanceStats>, AppError> {
        let department = params.department.as_deref().map(str::trim);

        let stats = sqlx::query_as::<_, CourseAttendanceStats>(
            r#"SELECT cs.course_code,
                      COUNT(DISTINCT cs.id) AS class_sessions,
                      COUNT(ar.id) AS records,
                      COUNT(*) FILTER (WHERE ar.status = 'present') AS present,
                      COUNT(*) FILTER (WHERE ar.status = 'late') AS late,
                      COUNT(*) FILTER (WHERE ar.status = 'absent') AS absent,
                      COUNT(*) FILTER (WHERE ar.status = 'excused') AS excused
               FROM class_sessions cs
               LEFT JOIN (attendance_records ar
                          JOIN students s ON s.id = ar.student_id
                                         AND ($1::text IS NULL OR s.department = $1))
                      ON ar.class_session_id = cs.id
               WHERE ($2::timestamptz IS NULL OR cs.starts_at >= $2)
                 AND ($3::timestamptz IS NULL OR cs.starts_at < $3)
               GROUP BY cs.course_code
               ORDER BY cs.course_code"#,
        )
        .bind(department)
        .bind(params.from)
        .bind(params.to)
        .fetch_all(db)
        .await?
        .into_iter()
        .map(CourseAttendanceStats::with_rate)
        .collect();

        Ok(stats)
    }

    /// Exam sessions whose confirmed hand-overs took longest to acknowledge.
    #[instrument(skip(db))]
    pub async fn get_transfer_turnaround(
        db: &PgPool,
        params: TurnaroundParams,
    ) -> Result<Vec<TransferTurnaround>, AppError> {
        let rows = sqlx::query_as::<_, TransferTurnaround>(
            r#"SELECT bt.exam_session_id,
                      es.course_code,
                      COUNT(*) AS confirmed_transfers,
                      AVG(EXTRACT(EPOCH FROM (bt.responded_at - bt.requested_at)) / 60.0)::float8 AS avg_minutes,
                      MAX(EXTRACT(EPOCH FROM (bt.responded_at - bt.requested_at)) / 60.0)::float8 AS max_minutes
               FROM batch_transfers bt
               JOIN exam_sessions es ON es.id = bt.exam_session_id
               WHERE bt.status = 'confirmed' AND bt.responded_at IS NOT NULL
               GROUP BY bt.exam_session_id, es.course_code
               ORDER BY avg_minutes DESC, bt.exam_session_id
               LIMIT $1"#,
        )
        .bind(params.limit())
        .fetch_all(db)
        .await?;

        Ok(rows)
    }
}
