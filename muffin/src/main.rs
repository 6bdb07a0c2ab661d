//! CLI entry point for the Muffin Gang interrogation game.

use muffin_core::{CharacterId, GameSession, Phase, SessionConfig};
use std::io::{self, BufRead, Write};

fn read_line(prompt: &str) -> io::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn pick_character(choice: &str) -> Option<CharacterId> {
    match choice {
        "1" => Some(CharacterId::Crumbs),
        "2" => Some(CharacterId::Cherry),
        "3" => Some(CharacterId::Glaze),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut session = GameSession::new(SessionConfig::new());
    let start = session.start_game().await?;
    println!("{}\n", start.intro);

    loop {
        let Some(state) = session.state() else {
            break;
        };
        if state.phase != Phase::Interrogation {
            break;
        }

        let remaining: Vec<String> = CharacterId::ALL
            .iter()
            .map(|&cid| {
                format!(
                    "{}: {}",
                    cid,
                    state.characters[&cid].questions_remaining
                )
            })
            .collect();
        if CharacterId::ALL
            .iter()
            .all(|cid| state.characters[cid].questions_remaining == 0)
        {
            println!("You have no questions left. Time to accuse.");
            break;
        }

        println!("Questions left: {}", remaining.join(", "));
        println!("Choose who to question: 1=Crumbs, 2=Cherry, 3=Glaze, 0=Accuse now");
        let choice = read_line("> ")?;
        if choice == "0" {
            break;
        }
        let Some(character_id) = pick_character(&choice) else {
            println!("Invalid choice.");
            continue;
        };
        if !session.can_ask(character_id) {
            println!("No questions left for {character_id}.");
            continue;
        }

        let question = read_line(&format!("Your question for {character_id}: "))?;
        if question.is_empty() {
            println!("Ask something.");
            continue;
        }

        match session.ask(&start.session_id, character_id, &question).await? {
            Some(turn) => println!("\n{character_id}: {}\n", turn.raw_output),
            None => println!("Could not process that question."),
        }
    }

    println!("\nWho do you accuse? 1=Crumbs, 2=Cherry, 3=Glaze");
    let choice = read_line("> ")?;
    let Some(accused) = pick_character(&choice) else {
        println!("Invalid. Exiting.");
        return Ok(());
    };

    match session.accuse(&start.session_id, accused) {
        Some(verdict) => {
            println!("{}", verdict.reveal);
            println!("{}", if verdict.correct { "You win!" } else { "You lose." });
        }
        None => println!("No active session."),
    }

    Ok(())
}
