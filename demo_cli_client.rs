use blackjack_protocol::{Card, DEALER_STANDS_ON};
use blackjack_rooms::GameClient;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Rounds from the first argument, server from BLACKJACK_URL
    let args: Vec<String> = env::args().collect();
    let rounds: u32 = args.get(1).and_then(|r| r.parse().ok()).unwrap_or(3);
    let url = env::var("BLACKJACK_URL").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());

    println!("🃏 Blackjack Rooms Demo Player");
    println!("=============================");
    println!("🔗 Server: {}  Rounds: {}", url, rounds);

    let mut wins = 0;
    for round in 1..=rounds {
        // A finished room cannot be dealt again, so every round gets a new one
        let mut client = GameClient::new(&url)?;
        let created = client.create_room().await?;
        println!("\n🎯 Round {} in room {}", round, created.room_code);

        let started = client.start().await?;
        println!("🎩 Dealer shows: {}", started.dealer_card);
        println!("🃏 Dealt: {} ({})", show(&started.hand), started.total);

        let mut total = started.total;
        let mut busted = false;
        while total < DEALER_STANDS_ON {
            let hit = client.hit().await?;
            println!("➕ Hit {} -> {}", hit.card, hit.total);
            total = hit.total;
            if hit.game_over {
                println!("💥 {}", hit.message);
                busted = true;
                break;
            }
        }

        if !busted {
            let stay = client.stay().await?;
            println!(
                "🎩 Dealer: {} ({}) vs you {}",
                show(&stay.dealer_hand),
                stay.dealer_total,
                stay.player_total
            );
            println!("🏆 {}", stay.result);
            if stay.outcome == blackjack_protocol::Outcome::PlayerWins {
                wins += 1;
            }
        }
    }

    println!("\n📊 Won {} of {} rounds", wins, rounds);
    Ok(())
}

fn show(cards: &[Card]) -> String {
    cards
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
