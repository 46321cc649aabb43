use std::{process::ExitCode, sync::Arc};

use contact_persistence_csv::CsvContactRepository;
use contact_server_domain::contact::{Contact, ContactId, ContactService, ContactServiceImpl};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if !(4..=7).contains(&args.len()) {
        eprintln!(
            "Usage: add_contact <id> <first_name> <email> [first_surname] [second_surname] [phone]"
        );
        return ExitCode::FAILURE;
    }

    let Ok(id) = args[1].parse::<ContactId>() else {
        eprintln!("Invalid id: {}", args[1]);
        return ExitCode::FAILURE;
    };
    let optional = |i: usize| args.get(i).cloned().unwrap_or_default();
    let contact = Contact {
        id,
        first_name: args[2].clone(),
        email: args[3].clone(),
        first_surname: optional(4),
        second_surname: optional(5),
        phone: optional(6),
    };

    let contacts_file =
        std::env::var("CONTACTS_FILE").unwrap_or_else(|_| "contacts.csv".to_string());
    let repo = match CsvContactRepository::open(&contacts_file).await {
        Ok(repo) => repo,
        Err(e) => {
            eprintln!("Failed to open {}: {}", contacts_file, e);
            return ExitCode::FAILURE;
        }
    };

    let service = ContactServiceImpl::new(Arc::new(Box::new(repo)));
    match service.create_contact(contact).await {
        Ok(contact) => {
            println!(
                "Created contact [{}] {} <{}> in {}",
                contact.id, contact.first_name, contact.email, contacts_file
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to create contact: {}", e);
            ExitCode::FAILURE
        }
    }
}
