use blackjack_protocol::{Card, HandResponse, RoomView};
use blackjack_rooms::GameClient;
use std::env;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("🃏 Blackjack Rooms CLI Client");
    println!("============================");

    let url = env::var("BLACKJACK_URL").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());
    let mut client = GameClient::new(&url)?;
    println!("🔗 Server: {}", client.base_url());

    print_help();
    print!("> ");
    io::stdout().flush()?;

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            print!("> ");
            io::stdout().flush()?;
            continue;
        }

        match parts[0].to_lowercase().as_str() {
            "quit" | "exit" => break,
            "help" => print_help(),
            "create" => match client.create_room().await {
                Ok(created) => {
                    println!("🏠 Room code: {}", created.room_code);
                    println!("🪪 Player id: {}", created.player_id);
                }
                Err(e) => println!("❌ {}", e),
            },
            "join" => match parts.get(1) {
                Some(code) => match client.join_room(code).await {
                    Ok(joined) => println!("🚪 {}", joined.message),
                    Err(e) => println!("❌ {}", e),
                },
                None => println!("❓ Usage: join <room code>"),
            },
            "start" => match client.start().await {
                Ok(started) => {
                    println!("🎲 {}", started.message);
                    println!("🎩 Dealer shows: {}", started.dealer_card);
                    println!("🃏 Your hand: {} ({})", show(&started.hand), started.total);
                }
                Err(e) => println!("❌ {}", e),
            },
            "hit" => match client.hit().await {
                Ok(hit) => {
                    println!("➕ Drew {}", hit.card);
                    println!("🃏 Your hand: {} ({})", show(&hit.hand), hit.total);
                    if hit.game_over {
                        println!("💥 {}", hit.message);
                    }
                }
                Err(e) => println!("❌ {}", e),
            },
            "draw" => {
                let count = parts.get(1).and_then(|c| c.parse().ok()).unwrap_or(1);
                match client.draw(count).await {
                    Ok(drawn) => {
                        println!("➕ Drew {}", show(&drawn.cards));
                        println!("🃏 Your hand: {} ({})", show(&drawn.hand), drawn.total);
                        if drawn.game_over {
                            println!("💥 {}", drawn.message);
                        }
                    }
                    Err(e) => println!("❌ {}", e),
                }
            }
            "stay" | "stand" => match client.stay().await {
                Ok(stay) => {
                    println!("🎩 Dealer: {} ({})", show(&stay.dealer_hand), stay.dealer_total);
                    println!("🃏 You: {}", stay.player_total);
                    println!("🏆 {}", stay.result);
                }
                Err(e) => println!("❌ {}", e),
            },
            "hand" => match client.hand().await {
                Ok(hand) => print_hand(&hand),
                Err(e) => println!("❌ {}", e),
            },
            "room" => match client.room().await {
                Ok(view) => print_room(&view),
                Err(e) => println!("❌ {}", e),
            },
            "reshuffle" => match client.reshuffle().await {
                Ok(r) => println!("🔀 Reshuffled, {} cards remaining", r.remaining),
                Err(e) => println!("❌ {}", e),
            },
            other => println!("❓ Unknown command: {}", other),
        }

        print!("> ");
        io::stdout().flush()?;
    }

    println!("👋 Goodbye!");
    Ok(())
}

fn print_help() {
    println!("\n📋 Commands available:");
    println!("  create      - Create a new room");
    println!("  join <code> - Join an existing room");
    println!("  start       - Deal a new game");
    println!("  hit         - Take one card");
    println!("  draw <n>    - Take n cards");
    println!("  stay        - Stand and let the dealer play");
    println!("  hand        - Show your hand");
    println!("  room        - Show the table");
    println!("  reshuffle   - Reshuffle the room's deck");
    println!("  quit        - Exit");
    println!();
}

fn show(cards: &[Card]) -> String {
    cards
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_hand(hand: &HandResponse) {
    let soft = if hand.soft { " soft" } else { "" };
    println!("🃏 Your hand: {} ({}{})", show(&hand.hand), hand.total, soft);
}

fn print_room(view: &RoomView) {
    println!("\n🎲 === TABLE ===");
    println!("🏠 Room: {}", view.room_code);
    println!("🕹️  Phase: {:?}", view.phase);
    match view.dealer_total {
        Some(total) => println!("🎩 Dealer: {} ({})", show(&view.dealer_hand), total),
        None => println!("🎩 Dealer shows: {}", show(&view.dealer_hand)),
    }
    println!("👥 Players ({}):", view.players.len());
    for p in &view.players {
        let status = match (p.outcome, p.ready) {
            (Some(outcome), _) => format!(" [{}]", outcome),
            (None, true) => " [DONE]".to_string(),
            (None, false) => String::new(),
        };
        println!(
            "  {}: {} ({}){}",
            p.seat,
            show(&p.hand),
            p.total,
            status
        );
    }
    if !view.message.is_empty() {
        println!("📣 {}", view.message);
    }
    println!("===============\n");
}
