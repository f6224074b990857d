//! aigo-admin - CLI for inspecting the aigo store
//!
//! Usage:
//!   aigo-admin rooms
//!   aigo-admin room <room-id>
//!   aigo-admin chats <user-id>
//!   aigo-admin paths

use anyhow::{Context, Result};
use std::env;

use aigo::db::Database;
use aigo::paths;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    if args[1] == "paths" {
        cmd_paths();
        return Ok(());
    }

    let db_path = paths::db_path();
    let db = Database::open(&db_path).context("failed to open database")?;

    match args[1].as_str() {
        "rooms" => cmd_rooms(&db)?,
        "room" => cmd_room(&db, &args[2..])?,
        "chats" => cmd_chats(&db, &args[2..])?,
        "help" | "--help" | "-h" => print_usage(),
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_usage() {
    eprintln!(
        r#"aigo-admin - Inspect aigo rooms and chats

Usage:
  aigo-admin rooms              List every room
  aigo-admin room <room-id>     Show a room and its messages
  aigo-admin chats <user-id>    List a user's solo chats
  aigo-admin paths              Show resolved paths

Environment:
  AIGO_DB    Override database path

Paths:
  Data:   {data}
  Config: {config}
  DB:     {db}
"#,
        data = paths::data_dir().display(),
        config = paths::config_path().display(),
        db = paths::db_path().display(),
    );
}

fn cmd_paths() {
    println!("data:   {}", paths::data_dir().display());
    println!("config: {}", paths::config_path().display());
    println!("db:     {}", paths::db_path().display());
    println!("public: {}", paths::public_dir().display());
}

fn cmd_rooms(db: &Database) -> Result<()> {
    let rooms = db.list_rooms()?;

    if rooms.is_empty() {
        println!("No rooms");
        return Ok(());
    }

    println!("Rooms:");
    for room in rooms {
        let visibility = if room.public { "public" } else { "private" };
        println!(
            "  {} {} ({}, {} participants, owner {})",
            room.id,
            room.name,
            visibility,
            room.participants.len(),
            room.owner_id
        );
    }

    Ok(())
}

fn cmd_room(db: &Database, args: &[String]) -> Result<()> {
    if args.is_empty() {
        anyhow::bail!("Usage: aigo-admin room <room-id>");
    }

    let room_id = &args[0];
    let Some(room) = db.get_room(room_id)? else {
        println!("Room {} not found", room_id);
        return Ok(());
    };

    println!("{} ({})", room.name, room.id);
    if !room.description.is_empty() {
        println!("  {}", room.description);
    }
    println!("  participants: {}", room.participants.join(", "));

    for msg in db.list_room_messages(&room.id)? {
        println!(
            "  [{}] {} ({}): {}",
            msg.timestamp.format("%Y-%m-%d %H:%M"),
            msg.user_id.as_deref().unwrap_or("?"),
            msg.role,
            msg.content
        );
    }

    Ok(())
}

fn cmd_chats(db: &Database, args: &[String]) -> Result<()> {
    if args.is_empty() {
        anyhow::bail!("Usage: aigo-admin chats <user-id>");
    }

    let user_id = &args[0];
    let chats = db.list_chats_for_user(user_id)?;

    if chats.is_empty() {
        println!("No chats for {}", user_id);
        return Ok(());
    }

    println!("Chats for {}:", user_id);
    for chat in chats {
        let count = db.list_chat_messages(&chat.id, Some(user_id))?.len();
        println!(
            "  {} {} ({} messages, {})",
            chat.id,
            chat.title.as_deref().unwrap_or("(untitled)"),
            count,
            chat.timestamp.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}
