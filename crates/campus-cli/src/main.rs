use campus_cli::seeder::{self, PeoplePerUnit, SeedConfig, StructurePerFaculty, SeedResult};
use campus_core::hash_password;
use campus_models::ids::UserId;
use campus_models::system_roles;
use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use sqlx::PgPool;

#[derive(Parser)]
#[command(name = "campus-cli")]
#[command(about = "Campus CLI - Administrative tools for the university platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new system administrator account
    CreateSysadmin {
        /// First name of the system admin
        #[arg(short = 'f', long)]
        first_name: Option<String>,

        /// Last name of the system admin
        #[arg(short = 'l', long)]
        last_name: Option<String>,

        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Seed faculties, departments, programs, subjects, teachers and enrolled students
    Seed {
        /// Number of faculties to create
        #[arg(short = 'f', long, default_value = "3")]
        faculties: usize,

        /// Number of departments per faculty
        #[arg(long, default_value = "3")]
        departments: usize,

        /// Number of programs per department
        #[arg(long, default_value = "2")]
        programs: usize,

        /// Number of subjects per program
        #[arg(long, default_value = "8")]
        subjects: usize,

        /// Number of teachers per department
        #[arg(long, default_value = "4")]
        teachers: usize,

        /// Number of students per program
        #[arg(long, default_value = "30")]
        students: usize,
    },
    /// Clear all seeded data (keeps system admins and data created through the API)
    ClearSeed,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("\n❌ {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> SeedResult<()> {
    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    match cli.command {
        Commands::CreateSysadmin {
            first_name,
            last_name,
            email,
            password,
        } => handle_create_sysadmin(&pool, first_name, last_name, email, password).await,
        Commands::Seed {
            faculties,
            departments,
            programs,
            subjects,
            teachers,
            students,
        } => {
            let config = SeedConfig::new(faculties)
                .with_structure(StructurePerFaculty {
                    departments,
                    programs_per_department: programs,
                    subjects_per_program: subjects,
                })
                .with_people(PeoplePerUnit {
                    teachers_per_department: teachers,
                    students_per_program: students,
                });
            seeder::seed_all(&pool, config).await
        }
        Commands::ClearSeed => seeder::clear_all(&pool).await,
    }
}

fn prompt_or(value: Option<String>, prompt: &str) -> SeedResult<String> {
    match value {
        Some(value) => Ok(value),
        None => Ok(Input::new().with_prompt(prompt).interact_text()?),
    }
}

async fn handle_create_sysadmin(
    pool: &PgPool,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> SeedResult<()> {
    let first_name = prompt_or(first_name, "First name")?;
    let last_name = prompt_or(last_name, "Last name")?;
    let email = prompt_or(email, "Email address")?;
    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()?,
    };

    create_system_admin(pool, &first_name, &last_name, &email, &password).await?;

    println!("\n✅ System admin created successfully!");
    println!("   Email: {}", email);
    println!("   Name: {} {}", first_name, last_name);
    Ok(())
}

async fn create_system_admin(
    db: &PgPool,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> SeedResult<UserId> {
    let hashed_password =
        hash_password(password).map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let mut tx = db.begin().await?;

    let user_id = sqlx::query_scalar::<_, UserId>(
        "INSERT INTO users (first_name, last_name, email, password)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (email) DO NOTHING
         RETURNING id",
    )
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(&hashed_password)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or("User with this email already exists")?;

    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id)
         VALUES ($1, $2)
         ON CONFLICT (user_id, role_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(system_roles::SYSTEM_ADMIN)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(user_id)
}
