use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use examtrack_cli::admin::create_admin;
use examtrack_cli::seeder::{self, SeedConfig, StaffPerDepartment};
use sqlx::PgPool;

#[derive(Parser)]
#[command(name = "examtrack-cli")]
#[command(about = "ExamTrack CLI - Administrative tools for ExamTrack", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new administrator account
    CreateAdmin {
        /// First name of the admin
        #[arg(short = 'f', long)]
        first_name: Option<String>,

        /// Last name of the admin
        #[arg(short = 'l', long)]
        last_name: Option<String>,

        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Seed the database with fake staff, students and exam sessions
    Seed {
        /// Number of departments to populate
        #[arg(short = 'd', long, default_value = "3")]
        departments: usize,

        /// Lecturers per department
        #[arg(long, default_value = "4")]
        lecturers: usize,

        /// Invigilators per department
        #[arg(long, default_value = "6")]
        invigilators: usize,

        /// Students per department
        #[arg(long, default_value = "50")]
        students: usize,

        /// Exam sessions per department
        #[arg(long, default_value = "4")]
        exam_sessions: usize,
    },
    /// Clear all seeded data (keeps admins)
    ClearSeed,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cli = Cli::parse();

    let pool = match examtrack_db::init_db_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("❌ Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::CreateAdmin {
            first_name,
            last_name,
            email,
            password,
        } => handle_create_admin(&pool, first_name, last_name, email, password).await,
        Commands::Seed {
            departments,
            lecturers,
            invigilators,
            students,
            exam_sessions,
        } => {
            let config = SeedConfig {
                departments,
                staff: StaffPerDepartment {
                    lecturers,
                    invigilators,
                    ..StaffPerDepartment::default()
                },
                students_per_department: students,
                exam_sessions_per_department: exam_sessions,
            };
            seeder::seed_all(&pool, config).await
        }
        Commands::ClearSeed => seeder::clear_all(&pool).await,
    };

    if let Err(e) = result {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn handle_create_admin(
    pool: &PgPool,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let first_name = match first_name {
        Some(v) => v,
        None => Input::new().with_prompt("First name").interact_text()?,
    };

    let last_name = match last_name {
        Some(v) => v,
        None => Input::new().with_prompt("Last name").interact_text()?,
    };

    let email = match email {
        Some(v) => v,
        None => Input::new().with_prompt("Email address").interact_text()?,
    };

    let password = match password {
        Some(v) => v,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()?,
    };

    create_admin(pool, &first_name, &last_name, &email, &password).await?;

    println!("\n✅ Admin created successfully!");
    println!("   Email: {}", email);
    println!("   Name: {} {}", first_name, last_name);

    Ok(())
}
