// SPDX-License-Identifier: MIT OR Apache-2.0

//! ASCII board rendering for the CLI.

use phantomgo_core::{BoardSnapshot, CellState, Coord, Group, Role};

/// Render the board visible to `role`, overlaid with guesses and dead marks
pub fn render_board(
    snapshot: &BoardSnapshot,
    role: Role,
    guesses: &[Coord],
    dead_groups: &[Group],
) -> String {
    let board = snapshot.view_for(role);
    let (rows, cols) = (board.rows(), board.cols());
    let mut output = String::new();

    push_column_labels(&mut output, cols);

    for row in 0..rows {
        // Row number (1-indexed)
        output.push_str(&format!("{:2} ", row + 1));

        for col in 0..cols {
            let coord = Coord::new(row, col);
            let symbol = if dead_groups.iter().any(|g| g.contains(coord)) {
                "×"
            } else {
                match board.get(coord).unwrap_or(CellState::Invalid) {
                    CellState::Black => "●",
                    CellState::White => "○",
                    CellState::Invalid => " ",
                    CellState::Empty if guesses.contains(&coord) => "◌",
                    CellState::Empty => "+",
                }
            };
            output.push_str(&format!(" {}", symbol));
        }

        output.push_str(&format!(" {}", row + 1));
        output.push('\n');
    }

    push_column_labels(&mut output, cols);
    output
}

fn push_column_labels(output: &mut String, cols: usize) {
    output.push_str("   ");
    for col in 0..cols {
        output.push_str(&format!(" {}", coord_to_column_char(col)));
    }
    output.push('\n');
}

/// Convert a column index to a column character (A-Z, skipping I)
pub fn coord_to_column_char(col: usize) -> char {
    let offset = if col < 8 { col } else { col + 1 };
    char::from_u32('A' as u32 + offset as u32).unwrap_or('?')
}

/// Inverse of [`coord_to_column_char`], case-insensitive
pub fn column_char_to_index(c: char) -> Option<usize> {
    let c = c.to_ascii_uppercase();
    match c {
        'A'..='H' => Some(c as usize - 'A' as usize),
        'J'..='Z' => Some(c as usize - 'A' as usize - 1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phantomgo_core::Color;

    #[test]
    fn test_render_empty_9x9_board() {
        let snapshot = BoardSnapshot::empty(9, 9, 0);
        let output = render_board(&snapshot, Role::Spectator, &[], &[]);

        // Column labels skip I
        assert!(output.contains("A B C D E F G H J"));
        assert!(output.contains(" 1 "));
        assert!(output.contains(" 9 "));

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 11); // 2 label rows + 9 board rows
    }

    #[test]
    fn test_render_uses_the_role_view() {
        let mut snapshot = BoardSnapshot::empty(9, 9, 3);
        snapshot.board.place(Coord::new(4, 4), Color::Black);
        snapshot.board.place(Coord::new(3, 3), Color::White);
        snapshot.black_view.place(Coord::new(4, 4), Color::Black);

        let public = render_board(&snapshot, Role::Spectator, &[], &[]);
        assert!(public.contains('●'));
        assert!(public.contains('○'));

        // Black does not see the white stone
        let black = render_board(&snapshot, Role::Black, &[], &[]);
        assert!(black.contains('●'));
        assert!(!black.contains('○'));
    }

    #[test]
    fn test_render_guesses_and_dead_groups() {
        let mut snapshot = BoardSnapshot::empty(9, 9, 1);
        snapshot.board.place(Coord::new(0, 0), Color::White);
        let dead = Group::new(vec![Coord::new(0, 0)]).unwrap();

        let output = render_board(&snapshot, Role::Spectator, &[Coord::new(8, 8)], &[dead]);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[1].starts_with(" 1  ×"));
        assert!(lines[9].contains("◌ 9"));
        assert!(!output.contains('○'));
    }

    #[test]
    fn test_coord_to_column_char() {
        assert_eq!(coord_to_column_char(0), 'A');
        assert_eq!(coord_to_column_char(7), 'H');
        assert_eq!(coord_to_column_char(8), 'J'); // Skip 'I'
        assert_eq!(coord_to_column_char(18), 'T');
    }

    #[test]
    fn test_column_char_round_trip_skips_i() {
        assert_eq!(column_char_to_index('d'), Some(3));
        assert_eq!(column_char_to_index('J'), Some(8));
        assert_eq!(column_char_to_index('I'), None);
        assert_eq!(column_char_to_index('4'), None);
    }
}
