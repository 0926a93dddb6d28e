use crate::game::AgentSnapshot;
use crate::pos::{Dir, Pos};
use crate::population::GenerationStats;

/// Render an agent snapshot as plain text lines: header, bordered board,
/// then a status line. The high-score line is only drawn when a record is
/// given.
pub fn render_board(snap: &AgentSnapshot, high_score: Option<u32>) -> Vec<String> {
    let mut lines = Vec::new();
    let size = snap.board_size;

    lines.push(if snap.alive { "SNAKE - ALIVE".to_string() } else { "SNAKE - DEAD".to_string() });

    lines.push(format!("╔{}╗", "═".repeat(size as usize)));
    for y in 0..size {
        let mut row = String::from("║");
        for x in 0..size {
            row.push(cell_glyph(snap, Pos::new(x, y)));
        }
        row.push('║');
        lines.push(row);
    }
    lines.push(format!("╚{}╝", "═".repeat(size as usize)));

    lines.push(format!(
        "SCORE: {} | Lifetime: {} | Life left: {} | Old tiles: {}",
        snap.score, snap.lifetime, snap.life_left, snap.revisits
    ));
    if let Some(high) = high_score {
        lines.push(format!("HIGH SCORE: {high}"));
    }
    lines
}

fn cell_glyph(snap: &AgentSnapshot, p: Pos) -> char {
    if p == snap.head {
        match snap.dir {
            Dir::Up => '▲',
            Dir::Down => '▼',
            Dir::Left => '◄',
            Dir::Right => '►',
        }
    } else if snap.body.contains(&p) {
        '●'
    } else if p == snap.food {
        '*'
    } else if snap.recent_tiles.contains(&p) {
        '·'
    } else {
        ' '
    }
}

/// One line per generation, newest first.
pub fn render_stats(stats: &[GenerationStats]) -> Vec<String> {
    stats
        .iter()
        .rev()
        .map(|s| {
            format!(
                "GEN: {} | BEST: {} | AVG.: {} | SCORE: {} | HIGHEST: {}",
                s.generation, s.best_fitness, s.average_fitness, s.best_score, s.highest_score
            )
        })
        .collect()
}
