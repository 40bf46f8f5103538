use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::context::AppContext;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "List all users")]
    List,

    #[command(about = "Create an administrator")]
    CreateAdmin {
        #[arg(help = "Username (at least 3 characters)")]
        username: String,
        #[arg(long, help = "Password (at least 6 characters)")]
        password: String,
    },

    #[command(about = "Delete a user")]
    Delete {
        #[arg(help = "Username")]
        username: String,
    },
}

pub async fn handle(cmd: UserCommands, ctx: &AppContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::List => {
            let users = ctx.users.list().await?;
            if users.is_empty() {
                return output_empty_collection(output_format, "users", "No users found");
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "users": users }))?);
                }
                OutputFormat::Text => {
                    println!("{:<6} {:<20} {:<12} {}", "ID", "USERNAME", "ROLE", "ACTIVE");
                    println!("{}", "-".repeat(48));
                    for user in &users {
                        println!("{:<6} {:<20} {:<12} {}", user.id, user.username, user.role, user.active);
                    }
                }
            }
            Ok(())
        }
        UserCommands::CreateAdmin { username, password } => {
            let user = ctx.users.create_admin(&username, &password).await?;
            output_success(
                output_format,
                &format!("Administrator '{}' created", user.username),
                Some(json!({ "id": user.id, "username": user.username, "role": user.role })),
            )
        }
        UserCommands::Delete { username } => {
            ctx.users.delete_by_username(&username).await?;
            output_success(output_format, &format!("User '{}' deleted", username), None)
        }
    }
}
