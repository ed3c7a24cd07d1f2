use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;

use tutordesk_cli::{assign_lesson_owner, create_admin};
use tutordesk_config::StoreBackend;
use tutordesk_db::connect_store;

#[derive(Parser)]
#[command(name = "tutordesk-cli")]
#[command(about = "Tutordesk CLI - Administrative tools for Tutordesk", long_about = None)]
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
    /// Give every lesson without an owner to the given user
    AssignLessonOwner {
        /// User id or email address of the new owner
        #[arg(short = 'o', long)]
        owner: String,
    },
}

fn prompt(label: &str, value: Option<String>) -> Result<String, dialoguer::Error> {
    match value {
        Some(value) => Ok(value),
        None => Input::new().with_prompt(label).interact_text(),
    }
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("\n❌ {context}: {err}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let cli = Cli::parse();

    let backend = StoreBackend::from_env();
    if backend == StoreBackend::Memory {
        fail(
            "Cannot run administrative commands",
            "DATABASE_URL must point at the Postgres database",
        );
    }
    let store = match connect_store(&backend).await {
        Ok(store) => store,
        Err(e) => fail("Failed to connect to database", e),
    };

    match cli.command {
        Commands::CreateAdmin {
            first_name,
            last_name,
            email,
            password,
        } => {
            let collected = (|| {
                let first_name = prompt("First name", first_name)?;
                let last_name = prompt("Last name", last_name)?;
                let email = prompt("Email address", email)?;
                let password = match password {
                    Some(password) => password,
                    None => Password::new()
                        .with_prompt("Password")
                        .with_confirmation("Confirm password", "Passwords don't match")
                        .interact()?,
                };
                Ok::<_, dialoguer::Error>((first_name, last_name, email, password))
            })();
            let (first_name, last_name, email, password) = match collected {
                Ok(values) => values,
                Err(e) => fail("Failed to read input", e),
            };

            match create_admin(store.as_ref(), &first_name, &last_name, &email, &password).await {
                Ok(user) => {
                    println!("\n✅ Admin created successfully!");
                    println!("   Email: {}", user.email);
                    println!("   Name: {} {}", user.first_name, user.last_name);
                }
                Err(e) => fail("Error creating admin", e),
            }
        }
        Commands::AssignLessonOwner { owner } => {
            match assign_lesson_owner(store.as_ref(), &owner).await {
                Ok(0) => println!("\n✅ No ownerless lessons found, nothing to do."),
                Ok(count) => println!("\n✅ Assigned {count} lesson(s) to {owner}"),
                Err(e) => fail("Error assigning lesson owner", e),
            }
        }
    }
}
