use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::canonical::{SuitMapping, SuitSlot};
use crate::cards::{Card, Suit, ALL_SUITS};
use crate::equity::SimulationResult;
use crate::ranker::HoleRanking;

pub fn equity_bar(equity: f64, width: usize) -> String {
    let filled = ((equity.clamp(0.0, 1.0)) * width as f64) as usize;
    let bar: String = "\u{2588}".repeat(filled) + &"\u{2591}".repeat(width - filled);
    let pct = format!("{:.1}%", equity * 100.0);

    if equity >= 0.6 {
        format!("{} {}", bar.green(), pct)
    } else if equity >= 0.4 {
        format!("{} {}", bar.yellow(), pct)
    } else {
        format!("{} {}", bar.red(), pct)
    }
}

pub fn cards_display(cards: &[Card]) -> String {
    cards
        .iter()
        .map(|card| {
            let text = card.pretty();
            match card.suit {
                Suit::Spades => text.white().to_string(),
                Suit::Hearts => text.red().to_string(),
                Suit::Diamonds => text.blue().to_string(),
                Suit::Clubs => text.green().to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn result_table(result: &SimulationResult) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Metric").set_alignment(CellAlignment::Left),
        Cell::new("Value").set_alignment(CellAlignment::Right),
    ]);
    let rows = [
        ("Win rate", format!("{:.4}%", result.win_rate * 100.0)),
        ("Std. deviation", format!("{:.4}%", result.standard_deviation * 100.0)),
        ("95% half-width", format!("{:.4}%", result.confidence_half_width * 100.0)),
        ("Trials", result.trials.to_string()),
        ("Wins", result.wins.to_string()),
    ];
    for (label, value) in rows {
        table.add_row(vec![
            Cell::new(label.bold().to_string()),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

pub fn mapping_table(mapping: &SuitMapping) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![Cell::new("Suit"), Cell::new("Maps to")]);

    for raw in ALL_SUITS {
        let target = match mapping.get(raw) {
            SuitSlot::Unseen => "-".dimmed().to_string(),
            SuitSlot::Resolved(suit) => suit.to_char().to_string().green().to_string(),
            SuitSlot::Candidates(set) => set.to_string().yellow().to_string(),
        };
        table.add_row(vec![
            Cell::new(raw.to_char()).set_alignment(CellAlignment::Center),
            Cell::new(target),
        ]);
    }

    table.to_string()
}

pub fn rankings_table(rankings: &[HoleRanking]) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").set_alignment(CellAlignment::Right),
        Cell::new("Hand"),
        Cell::new("Win rate").set_alignment(CellAlignment::Right),
        Cell::new("SD").set_alignment(CellAlignment::Right),
        Cell::new("Trials").set_alignment(CellAlignment::Right),
    ]);

    for (i, ranking) in rankings.iter().enumerate() {
        let r = &ranking.result;
        table.add_row(vec![
            Cell::new(i + 1).set_alignment(CellAlignment::Right),
            Cell::new(ranking.hand.bold().to_string()),
            Cell::new(format!("{:.2}%", r.win_rate * 100.0)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}%", r.standard_deviation * 100.0)).set_alignment(CellAlignment::Right),
            Cell::new(r.trials).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

pub fn print_section(title: &str, content: &str) {
    println!("\n{}", title.cyan().bold());
    println!("  {}", content);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{}", msg.green().bold());
}
