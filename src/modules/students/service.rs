use examtrack_core::{AppError, PaginationMeta};
use serde_json::json;
use sqlx::{Executor, PgPool, Postgres};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::audit::service::{AuditEntry, AuditService};

use super::model::{
    CreateStudentDto, PaginatedStudentsResponse, Student, StudentFilterParams, UpdateStudentDto,
    normalize_matric,
};

const DUPLICATE_MATRIC: &str = "A student with this matric number already exists";

pub struct StudentService;

impl StudentService {
    #[instrument(skip(db))]
    pub async fn create_student(
        db: &PgPool,
        actor_id: Uuid,
        dto: CreateStudentDto,
    ) -> Result<Student, AppError> {
        let mut tx = db.begin().await?;

        let student = sqlx::query_as::<_, Student>(
            r#"INSERT INTO students (matric_number, first_name, last_name, email, department, level, programme)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id, matric_number, first_name, last_name, email, department, level,
                         programme, created_at, updated_at"#,
        )
        .bind(normalize_matric(&dto.matric_number))
        .bind(dto.first_name.trim())
        .bind(dto.last_name.trim())
        .bind(&dto.email)
        .bind(dto.department.trim())
        .bind(dto.level)
        .bind(&dto.programme)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, DUPLICATE_MATRIC))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "student.create", "student", student.id)
                .details(json!({ "matric_number": student.matric_number })),
        )
        .await?;

        tx.commit().await?;

        Ok(student)
    }

    #[instrument(skip(db))]
    pub async fn get_students(
        db: &PgPool,
        filters: StudentFilterParams,
    ) -> Result<PaginatedStudentsResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        let search = filters
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM students
               WHERE ($1::text IS NULL OR department = $1)
                 AND ($2::int IS NULL OR level = $2)
                 AND ($3::text IS NULL OR matric_number ILIKE $3
                      OR first_name ILIKE $3 OR last_name ILIKE $3)"#,
        )
        .bind(&filters.department)
        .bind(filters.level)
        .bind(&search)
        .fetch_one(db)
        .await?;

        let students = sqlx::query_as::<_, Student>(
            r#"SELECT id, matric_number, first_name, last_name, email, department, level,
                      programme, created_at, updated_at
               FROM students
               WHERE ($1::text IS NULL OR department = $1)
                 AND ($2::int IS NULL OR level = $2)
                 AND ($3::text IS NULL OR matric_number ILIKE $3
                      OR first_name ILIKE $3 OR last_name ILIKE $3)
               ORDER BY matric_number
               LIMIT $4 OFFSET $5"#,
        )
        .bind(&filters.department)
        .bind(filters.level)
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        Ok(PaginatedStudentsResponse {
            data: students,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_student(db: &PgPool, id: Uuid) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>(
            r#"SELECT id, matric_number, first_name, last_name, email, department, level,
                      programme, created_at, updated_at
               FROM students WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))
    }

    /// Finds a student by matric number in any letter case.
    pub async fn find_by_matric<'e, E>(
        executor: E,
        matric_number: &str,
    ) -> Result<Option<Student>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let student = sqlx::query_as::<_, Student>(
            r#"SELECT id, matric_number, first_name, last_name, email, department, level,
                      programme, created_at, updated_at
               FROM students WHERE matric_number = $1"#,
        )
        .bind(normalize_matric(matric_number))
        .fetch_optional(executor)
        .await?;

        Ok(student)
    }

    #[instrument(skip(db))]
    pub async fn get_student_by_matric(
        db: &PgPool,
        matric_number: &str,
    ) -> Result<Student, AppError> {
        Self::find_by_matric(db, matric_number)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))
    }

    #[instrument(skip(db))]
    pub async fn update_student(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        dto: UpdateStudentDto,
    ) -> Result<Student, AppError> {
        let mut tx = db.begin().await?;

        let student = sqlx::query_as::<_, Student>(
            r#"UPDATE students SET
                   matric_number = COALESCE($2, matric_number),
                   first_name = COALESCE($3, first_name),
                   last_name = COALESCE($4, last_name),
                   email = COALESCE($5, email),
                   department = COALESCE($6, department),
                   level = COALESCE($7, level),
                   programme = COALESCE($8, programme),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, matric_number, first_name, last_name, email, department, level,
                         programme, created_at, updated_at"#,
        )
        .bind(id)
        .bind(dto.matric_number.as_deref().map(normalize_matric))
        .bind(dto.first_name.as_deref().map(str::trim))
        .bind(dto.last_name.as_deref().map(str::trim))
        .bind(&dto.email)
        .bind(dto.department.as_deref().map(str::trim))
        .bind(dto.level)
        .bind(&dto.programme)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, DUPLICATE_MATRIC))?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "student.update", "student", student.id)
                .details(json!({ "matric_number": student.matric_number })),
        )
        .await?;

        tx.commit().await?;

        Ok(student)
    }

    #[instrument(skip(db))]
    pub async fn delete_student(db: &PgPool, actor_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let matric_number = sqlx::query_scalar::<_, String>(
            "DELETE FROM students WHERE id = $1 RETURNING matric_number",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::from_delete(e, "Student is linked to incidents and cannot be deleted")
        })?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "student.delete", "student", id)
                .details(json!({ "matric_number": matric_number })),
        )
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
