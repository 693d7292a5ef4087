//! Database seeding with fake staff, students and exam sessions.
//!
//! - [`users`]: handler accounts for every department and role
//! - [`students`]: students spread over levels 100-500
//! - [`exam_sessions`]: upcoming sittings with invigilators assigned
//! - [`models`]: seeding configuration
//!
//! Rows are generated in parallel with Rayon and inserted in one
//! transaction. Every seeded row carries a marker (`SEED-` staff numbers,
//! `SEED/` matric numbers, `Seed Hall` venues) so [`clear_all`] can remove
//! them without touching real data or admin accounts.

pub mod exam_sessions;
pub mod models;
pub mod students;
pub mod users;

pub use models::{SeedConfig, StaffPerDepartment};

use examtrack_models::UserRole;
use sqlx::PgPool;
use std::time::Instant;
use uuid::Uuid;

/// Password given to every seeded account.
pub const SEED_PASSWORD: &str = "password123";

pub async fn seed_all(db: &PgPool, config: SeedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();

    println!("🌱 Starting database seeding...");
    println!("   - Departments: {}", config.departments().len());
    println!(
        "   - Per department: {} staff, {} students, {} exam sessions",
        config.staff.total(),
        config.students_per_department,
        config.exam_sessions_per_department
    );

    // Hash once with a low cost; seeded accounts are throwaway.
    let password_hash = bcrypt::hash(SEED_PASSWORD, 4)?;

    let staff = users::generate_staff(&config, &password_hash);
    let students = students::generate_students(&config);

    let mut tx = db.begin().await?;

    let inserted_staff = users::insert_users(&mut tx, &staff).await?;
    let student_count = students::insert_students(&mut tx, &students).await?;

    let invigilators: Vec<(Uuid, String)> = inserted_staff
        .into_iter()
        .filter(|(_, role, _)| *role == UserRole::Invigilator)
        .map(|(id, _, department)| (id, department))
        .collect();
    let sessions = exam_sessions::generate_exam_sessions(&config, &invigilators);
    let session_count = exam_sessions::insert_exam_sessions(&mut tx, &sessions).await?;

    tx.commit().await?;

    println!(
        "\n✅ Seeding complete! Created {} staff, {} students, {} exam sessions in {:?}",
        staff.len(),
        student_count,
        session_count,
        start_time.elapsed()
    );
    println!("\n📝 Default password for all seeded users: {}", SEED_PASSWORD);

    Ok(())
}

/// Removes all seeded rows. Admins and hand-entered data survive.
pub async fn clear_all(db: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing all seeded data...");

    exam_sessions::clear_exam_sessions(db).await?;
    students::clear_students(db).await?;
    users::clear_users(db).await?;

    println!("\n✅ Cleared seeded data in {:?}", start_time.elapsed());
    Ok(())
}
