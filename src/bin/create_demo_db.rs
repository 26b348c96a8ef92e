use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;

use bank_rs::{Amount, PasswordHash, Registration, deposit, initialize_db, register, transfer, withdraw};

/// A utility for creating a demo database for the REST API server of bank_rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

fn demo_registration(name: &str, email: &str, account_type: &str) -> Registration {
    Registration {
        name: Some(name.to_owned()),
        email: Some(email.to_owned()),
        phone: Some("0211234567".to_owned()),
        account_type: Some(account_type.to_owned()),
        password: Some("password".to_owned()),
        confirm_password: Some("password".to_owned()),
    }
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let mut conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating demo customers...");

    let asha = register(
        demo_registration("Asha Rao", "asha@example.com", "savings"),
        PasswordHash::DEFAULT_COST,
        &conn,
    )?;
    let ben = register(
        demo_registration("Ben Hale", "ben@example.com", "current"),
        PasswordHash::DEFAULT_COST,
        &conn,
    )?;

    println!("Adding demo transactions...");

    deposit(asha.id, Amount::new(Decimal::new(1000, 0))?, &mut conn)?;
    withdraw(asha.id, Amount::new(Decimal::new(12050, 2))?, &mut conn)?;
    transfer(
        asha.id,
        ben.account_number.as_str(),
        Amount::new(Decimal::new(250, 0))?,
        &mut conn,
    )?;
    deposit(ben.id, Amount::new(Decimal::new(4999, 2))?, &mut conn)?;

    println!(
        "Success! Log in as {} or {} with the password \"password\".",
        asha.email, ben.email
    );

    Ok(())
}
