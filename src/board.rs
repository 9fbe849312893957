//! Pure board rules for 15x15 gomoku/caro: legality, win-line discovery,
//! fullness. No I/O, no async — grounded on the teacher's `GameState`
//! (`src/bin/server.rs`), generalized from a piece-overlap board to a
//! fixed-grid five-in-a-row board.

use serde::{Deserialize, Serialize};

pub const BOARD_SIZE: usize = 15;
pub const WIN_LENGTH: usize = 5;

/// The four directions a win-line is searched along. Each is paired with
/// its opposite so a run is counted on both sides of the just-played cell.
const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    pub fn opposite(self) -> Symbol {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Symbol::X => 'X',
            Symbol::O => 'O',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Taken(Symbol),
}

/// A 15x15 grid of cells. Indexed (x, y): x is the column, y is the row.
#[derive(Debug, Clone)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    fn in_bounds(x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < BOARD_SIZE && (y as usize) < BOARD_SIZE
    }

    pub fn get(&self, x: i32, y: i32) -> Option<Cell> {
        if Self::in_bounds(x, y) {
            Some(self.cells[y as usize][x as usize])
        } else {
            None
        }
    }

    /// True iff (x, y) is in range and the cell is empty.
    pub fn is_empty(&self, x: i32, y: i32) -> bool {
        matches!(self.get(x, y), Some(Cell::Empty))
    }

    /// Places `sym` at (x, y). Caller must have already validated the move
    /// (in range, empty) — this is the authoritative write, not a check.
    pub fn place(&mut self, x: usize, y: usize, sym: Symbol) {
        self.cells[y][x] = Cell::Taken(sym);
    }

    /// True iff no cell is empty.
    pub fn is_full(&self) -> bool {
        self.cells
            .iter()
            .flatten()
            .all(|c| !matches!(c, Cell::Empty))
    }

    /// Renders the board as 15 lines of 15 characters using '.', 'X', 'O',
    /// matching the wire's textual convention for empty cells.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(BOARD_SIZE * (BOARD_SIZE + 1));
        for row in &self.cells {
            for cell in row {
                out.push(match cell {
                    Cell::Empty => '.',
                    Cell::Taken(Symbol::X) => 'X',
                    Cell::Taken(Symbol::O) => 'O',
                });
            }
            out.push('\n');
        }
        out
    }

    /// Given that (x, y) just received `sym`, returns the longest
    /// consecutive run of `sym` containing (x, y) across the four
    /// directions. Returns the ordered cell list if any run reaches
    /// `WIN_LENGTH`, otherwise an empty vec. When two directions both
    /// reach the threshold, one is returned arbitrarily (callers must not
    /// depend on which — per spec).
    pub fn find_win_line(&self, x: i32, y: i32, sym: Symbol) -> Vec<(i32, i32)> {
        for &(dx, dy) in &DIRECTIONS {
            let mut line = vec![(x, y)];

            // Walk forward along the direction.
            let (mut cx, mut cy) = (x + dx, y + dy);
            while self.get(cx, cy) == Some(Cell::Taken(sym)) {
                line.push((cx, cy));
                cx += dx;
                cy += dy;
            }

            // Walk backward along the opposite direction.
            let (mut cx, mut cy) = (x - dx, y - dy);
            while self.get(cx, cy) == Some(Cell::Taken(sym)) {
                line.insert(0, (cx, cy));
                cx -= dx;
                cy -= dy;
            }

            if line.len() >= WIN_LENGTH {
                return line;
            }
        }
        Vec::new()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place_all(board: &mut Board, cells: &[(usize, usize)], sym: Symbol) {
        for &(x, y) in cells {
            board.place(x, y, sym);
        }
    }

    #[test]
    fn empty_board_has_no_win() {
        let board = Board::new();
        assert!(board.find_win_line(5, 5, Symbol::X).is_empty());
    }

    #[test]
    fn horizontal_five_wins() {
        let mut board = Board::new();
        place_all(&mut board, &[(5, 5), (6, 5), (7, 5), (8, 5), (9, 5)], Symbol::X);
        let line = board.find_win_line(9, 5, Symbol::X);
        assert_eq!(line.len(), 5);
        assert_eq!(line, vec![(5, 5), (6, 5), (7, 5), (8, 5), (9, 5)]);
    }

    #[test]
    fn diagonal_five_wins() {
        let mut board = Board::new();
        place_all(&mut board, &[(5, 5), (6, 6), (7, 7), (8, 8), (9, 9)], Symbol::X);
        let line = board.find_win_line(9, 9, Symbol::X);
        assert_eq!(line.len(), 5);
    }

    #[test]
    fn anti_diagonal_five_wins() {
        let mut board = Board::new();
        place_all(&mut board, &[(5, 9), (6, 8), (7, 7), (8, 6), (9, 5)], Symbol::X);
        let line = board.find_win_line(7, 7, Symbol::X);
        assert_eq!(line.len(), 5);
    }

    #[test]
    fn four_in_a_row_does_not_win() {
        let mut board = Board::new();
        place_all(&mut board, &[(5, 5), (6, 5), (7, 5), (8, 5)], Symbol::X);
        assert!(board.find_win_line(8, 5, Symbol::X).is_empty());
    }

    #[test]
    fn opponent_symbols_do_not_extend_the_run() {
        let mut board = Board::new();
        place_all(&mut board, &[(5, 5), (6, 5), (7, 5), (8, 5)], Symbol::X);
        board.place(9, 5, Symbol::O);
        assert!(board.find_win_line(8, 5, Symbol::X).is_empty());
    }

    #[test]
    fn is_full_detects_completely_filled_board() {
        let mut board = Board::new();
        assert!(!board.is_full());
        for y in 0..BOARD_SIZE {
            for x in 0..BOARD_SIZE {
                let sym = if (x + y) % 2 == 0 { Symbol::X } else { Symbol::O };
                board.place(x, y, sym);
            }
        }
        assert!(board.is_full());
    }

    #[test]
    fn out_of_range_cells_are_not_empty() {
        let board = Board::new();
        assert!(!board.is_empty(-1, 0));
        assert!(!board.is_empty(0, -1));
        assert!(!board.is_empty(BOARD_SIZE as i32, 0));
    }

    #[test]
    fn six_in_a_row_still_returns_a_valid_line_of_at_least_five() {
        let mut board = Board::new();
        place_all(
            &mut board,
            &[(4, 5), (5, 5), (6, 5), (7, 5), (8, 5), (9, 5)],
            Symbol::X,
        );
        let line = board.find_win_line(9, 5, Symbol::X);
        assert!(line.len() >= WIN_LENGTH);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    /// Generates a shuffled list of distinct in-range coordinates, so a
    /// test can play them in order without ever re-occupying a cell.
    fn distinct_cells(max: usize) -> impl Strategy<Value = Vec<(usize, usize)>> {
        let all: Vec<(usize, usize)> = (0..BOARD_SIZE)
            .flat_map(|y| (0..BOARD_SIZE).map(move |x| (x, y)))
            .collect();
        Just(all).prop_shuffle().prop_map(move |mut v| {
            v.truncate(max);
            v
        })
    }

    proptest! {
        /// Round-trip law (spec.md §8): playing N legal moves in order and
        /// then reading the board back yields exactly the pointwise
        /// placement of those moves, regardless of play order.
        #[test]
        fn playing_moves_in_order_yields_their_pointwise_placement(
            cells in distinct_cells(40),
        ) {
            let mut board = Board::new();
            let mut expected: HashSet<(usize, usize)> = HashSet::new();
            for (i, &(x, y)) in cells.iter().enumerate() {
                let sym = if i % 2 == 0 { Symbol::X } else { Symbol::O };
                prop_assert!(board.is_empty(x as i32, y as i32));
                board.place(x, y, sym);
                expected.insert((x, y));
            }
            for y in 0..BOARD_SIZE {
                for x in 0..BOARD_SIZE {
                    let occupied = !board.is_empty(x as i32, y as i32);
                    prop_assert_eq!(occupied, expected.contains(&(x, y)));
                }
            }
        }

        /// A board is full iff every one of its 225 cells was played.
        #[test]
        fn is_full_matches_the_count_of_played_cells(
            cells in distinct_cells(BOARD_SIZE * BOARD_SIZE),
        ) {
            let mut board = Board::new();
            for (i, &(x, y)) in cells.iter().enumerate() {
                let sym = if i % 2 == 0 { Symbol::X } else { Symbol::O };
                board.place(x, y, sym);
            }
            prop_assert_eq!(board.is_full(), cells.len() == BOARD_SIZE * BOARD_SIZE);
        }
    }
}
