//! Exam session seeding.

use chrono::{Duration, Utc};
use fake::Fake;
use fake::faker::lorem::en::Words;
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;
use uuid::Uuid;

use super::models::{ExamSessionSeed, SeedConfig};

/// Venue prefix marking seeded sessions.
pub const SEED_VENUE_PREFIX: &str = "Seed Hall";

/// Generates sessions over the coming weeks, round-robin over each
/// department's invigilators.
pub fn generate_exam_sessions(
    config: &SeedConfig,
    invigilators: &[(Uuid, String)],
) -> Vec<ExamSessionSeed> {
    let now = Utc::now();

    config
        .departments()
        .par_iter()
        .flat_map(|&(department, code)| {
            let pool: Vec<Uuid> = invigilators
                .iter()
                .filter(|(_, d)| d == department)
                .map(|(id, _)| *id)
                .collect();

            (0..config.exam_sessions_per_department)
                .map(|idx| {
                    let words: Vec<String> = Words(2..4).fake();
                    let day_offset: i64 = (1..28).fake();
                    let hour: i64 = (8..16).fake();
                    let starts_at = (now + Duration::days(day_offset))
                        .date_naive()
                        .and_hms_opt(0, 0, 0)
                        .map(|d| d.and_utc() + Duration::hours(hour))
                        .unwrap_or(now);

                    ExamSessionSeed {
                        course_code: format!("{}{}", code, 101 + idx * 100),
                        course_title: title_case(&words),
                        department: department.to_string(),
                        venue: format!("{} {}", SEED_VENUE_PREFIX, (idx % 5) + 1),
                        starts_at,
                        duration_minutes: [60, 90, 120, 180][idx % 4],
                        expected_scripts: (20..150).fake(),
                        invigilator_id: (!pool.is_empty()).then(|| pool[idx % pool.len()]),
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn title_case(words: &[String]) -> String {
    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub async fn insert_exam_sessions(
    tx: &mut Transaction<'_, Postgres>,
    sessions: &[ExamSessionSeed],
) -> Result<u64, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("📝 Seeding {} exam sessions...", sessions.len());

    let mut total = 0;
    for s in sessions {
        total += sqlx::query(
            "INSERT INTO exam_sessions
                (course_code, course_title, department, venue, starts_at,
                 duration_minutes, expected_scripts, invigilator_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&s.course_code)
        .bind(&s.course_title)
        .bind(&s.department)
        .bind(&s.venue)
        .bind(s.starts_at)
        .bind(s.duration_minutes)
        .bind(s.expected_scripts)
        .bind(s.invigilator_id)
        .execute(&mut **tx)
        .await?
        .rows_affected();
    }

    println!(
        "   ✓ Inserted {} exam sessions in {:?}",
        total,
        start_time.elapsed()
    );

    Ok(total)
}

/// Deletes seeded sessions together with the transfers recorded against them.
pub async fn clear_exam_sessions(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let pattern = format!("{}%", SEED_VENUE_PREFIX);
    let mut tx = db.begin().await?;

    sqlx::query(
        "DELETE FROM batch_transfers
         WHERE exam_session_id IN (SELECT id FROM exam_sessions WHERE venue LIKE $1)",
    )
    .bind(&pattern)
    .execute(&mut *tx)
    .await?;

    let result = sqlx::query("DELETE FROM exam_sessions WHERE venue LIKE $1")
        .bind(&pattern)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    println!("   ✓ Deleted {} exam sessions", result);
    Ok(result)
}
