//! Staff seeding.

use examtrack_models::UserRole;
use fake::Fake;
use fake::faker::name::en::*;
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;
use uuid::Uuid;

use super::models::{SeedConfig, UserSeed};

/// Seeded accounts use this domain; `clear_users` relies on it.
pub const SEED_EMAIL_DOMAIN: &str = "example.com";

/// Generates staff for every configured department in parallel.
pub fn generate_staff(config: &SeedConfig, password_hash: &str) -> Vec<UserSeed> {
    let roles = config.staff.roles();

    config
        .departments()
        .par_iter()
        .enumerate()
        .flat_map(|(dept_idx, &(department, code))| {
            let mut users = Vec::with_capacity(config.staff.total());
            for &(role, count) in &roles {
                for user_idx in 0..count {
                    users.push(generate_user(
                        role,
                        department,
                        code,
                        dept_idx,
                        user_idx,
                        password_hash,
                    ));
                }
            }
            users
        })
        .collect()
}

fn generate_user(
    role: UserRole,
    department: &str,
    code: &str,
    dept_idx: usize,
    user_idx: usize,
    password_hash: &str,
) -> UserSeed {
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();
    let serial = dept_idx * 1000 + user_idx;

    UserSeed {
        email: format!(
            "{}.{}+{}{}@{}",
            first_name.to_lowercase(),
            last_name.to_lowercase(),
            role.as_str(),
            serial,
            SEED_EMAIL_DOMAIN
        ),
        first_name,
        last_name,
        password_hash: password_hash.to_string(),
        role,
        department: department.to_string(),
        staff_number: format!("SEED-{}-{}-{:04}", code, role.as_str(), serial),
    }
}

/// Inserts staff rows, returning `(id, role, department)` for each.
pub async fn insert_users(
    tx: &mut Transaction<'_, Postgres>,
    users: &[UserSeed],
) -> Result<Vec<(Uuid, UserRole, String)>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("👥 Seeding {} staff users...", users.len());

    // 7 params per user
    const BATCH_SIZE: usize = 800;

    let mut inserted = Vec::with_capacity(users.len());
    for chunk in users.chunks(BATCH_SIZE) {
        let ids = insert_users_chunk(tx, chunk).await?;
        for (id, user) in ids.into_iter().zip(chunk) {
            inserted.push((id, user.role, user.department.clone()));
        }
    }

    println!(
        "   ✓ Inserted {} staff users in {:?}",
        inserted.len(),
        start_time.elapsed()
    );

    Ok(inserted)
}

async fn insert_users_chunk(
    tx: &mut Transaction<'_, Postgres>,
    users: &[UserSeed],
) -> Result<Vec<Uuid>, Box<dyn std::error::Error>> {
    if users.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = String::from(
        "INSERT INTO users (first_name, last_name, email, password, role, department, staff_number) VALUES ",
    );

    for i in 0..users.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 7;
        query.push_str(&format!(
            "(${}, ${}, ${}, ${}, ${}, ${}, ${})",
            p + 1,
            p + 2,
            p + 3,
            p + 4,
            p + 5,
            p + 6,
            p + 7
        ));
    }

    query.push_str(" RETURNING id");

    let mut q = sqlx::query_scalar(&query);
    for user in users {
        q = q
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(&user.department)
            .bind(&user.staff_number);
    }

    let ids: Vec<Uuid> = q.fetch_all(&mut **tx).await?;
    Ok(ids)
}

/// Deletes seeded staff. Admin accounts are never touched.
pub async fn clear_users(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded users...");

    let result = sqlx::query(
        "DELETE FROM users
         WHERE staff_number LIKE 'SEED-%'
           AND email LIKE $1
           AND role <> 'admin'",
    )
    .bind(format!("%@{}", SEED_EMAIL_DOMAIN))
    .execute(db)
    .await?
    .rows_affected();

    println!(
        "   ✓ Deleted {} users in {:?}",
        result,
        start_time.elapsed()
    );

    Ok(result)
}
