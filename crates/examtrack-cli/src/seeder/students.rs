//! Student seeding.

use fake::Fake;
use fake::faker::name::en::*;
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use super::models::{SeedConfig, StudentSeed};

/// Matric numbers of seeded students start with this prefix.
pub const SEED_MATRIC_PREFIX: &str = "SEED/";

const LEVELS: [i32; 5] = [100, 200, 300, 400, 500];

pub fn generate_students(config: &SeedConfig) -> Vec<StudentSeed> {
    config
        .departments()
        .par_iter()
        .flat_map(|&(department, code)| {
            (0..config.students_per_department)
                .map(|idx| {
                    let first_name: String = FirstName().fake();
                    let last_name: String = LastName().fake();
                    let matric_number = format!("{}{}/{:05}", SEED_MATRIC_PREFIX, code, idx + 1);
                    StudentSeed {
                        email: format!(
                            "{}.{}.{}@students.example.com",
                            first_name.to_lowercase(),
                            code.to_lowercase(),
                            idx + 1
                        ),
                        matric_number,
                        first_name,
                        last_name,
                        department: department.to_string(),
                        level: LEVELS[idx % LEVELS.len()],
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub async fn insert_students(
    tx: &mut Transaction<'_, Postgres>,
    students: &[StudentSeed],
) -> Result<u64, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🎓 Seeding {} students...", students.len());

    // 6 params per student
    const BATCH_SIZE: usize = 1000;

    let mut total = 0;
    for chunk in students.chunks(BATCH_SIZE) {
        let mut query = String::from(
            "INSERT INTO students (matric_number, first_name, last_name, email, department, level) VALUES ",
        );
        for i in 0..chunk.len() {
            if i > 0 {
                query.push_str(", ");
            }
            let p = i * 6;
            query.push_str(&format!(
                "(${}, ${}, ${}, ${}, ${}, ${})",
                p + 1,
                p + 2,
                p + 3,
                p + 4,
                p + 5,
                p + 6
            ));
        }
        query.push_str(" ON CONFLICT (matric_number) DO NOTHING");

        let mut q = sqlx::query(&query);
        for s in chunk {
            q = q
                .bind(&s.matric_number)
                .bind(&s.first_name)
                .bind(&s.last_name)
                .bind(&s.email)
                .bind(&s.department)
                .bind(s.level);
        }
        total += q.execute(&mut **tx).await?.rows_affected();
    }

    println!(
        "   ✓ Inserted {} students in {:?}",
        total,
        start_time.elapsed()
    );

    Ok(total)
}

pub async fn clear_students(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let result = sqlx::query("DELETE FROM students WHERE matric_number LIKE $1")
        .bind(format!("{}%", SEED_MATRIC_PREFIX))
        .execute(db)
        .await?
        .rows_affected();

    println!("   ✓ Deleted {} students", result);
    Ok(result)
}
