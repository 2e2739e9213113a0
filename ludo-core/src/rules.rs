//! Movement rules: legal destinations, blocks, captures and wins
//!
//! Everything here is a pure function of a piece snapshot. Illegal moves
//! come back as `None`; nothing in this module fails.

use crate::board::{
    is_safe, is_track, next_cell, start_cell, FINISHED_POSITION, HOME_STRETCH_END, MAX_STACK,
};
use crate::pieces::{Color, Piece, PieceId, PieceStatus};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// All pieces of a game, keyed by id
pub type Pieces = BTreeMap<PieceId, Piece>;

/// Where a legal move puts the piece
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveTarget {
    pub position: i8,
    pub status: PieceStatus,
}

/// Per-color piece counts on each contested track cell
struct Occupancy {
    cells: FxHashMap<i8, [usize; 4]>,
}

impl Occupancy {
    fn of(pieces: &Pieces) -> Self {
        let mut cells: FxHashMap<i8, [usize; 4]> = FxHashMap::default();
        for piece in pieces.values() {
            if piece.status == PieceStatus::Active && is_track(piece.position) {
                cells.entry(piece.position).or_default()[piece.color.index()] += 1;
            }
        }
        Self { cells }
    }

    fn counts(&self, cell: i8) -> [usize; 4] {
        self.cells.get(&cell).copied().unwrap_or_default()
    }

    fn own(&self, cell: i8, color: Color) -> usize {
        self.counts(cell)[color.index()]
    }

    /// Two or more pieces of one opposing color
    fn opponent_block(&self, cell: i8, color: Color) -> bool {
        let counts = self.counts(cell);
        Color::ALL
            .iter()
            .any(|&c| c != color && counts[c.index()] >= 2)
    }

    fn has_opponent(&self, cell: i8, color: Color) -> bool {
        let counts = self.counts(cell);
        Color::ALL
            .iter()
            .any(|&c| c != color && counts[c.index()] > 0)
    }
}

/// Compute where `piece` lands with `dice`, or `None` if it may not move.
pub fn compute_move(
    piece: &Piece,
    dice: u8,
    player: Color,
    pieces: &Pieces,
) -> Option<MoveTarget> {
    if piece.color != player || piece.status == PieceStatus::Home {
        return None;
    }
    if !(1..=6).contains(&dice) {
        return None;
    }

    let occupancy = Occupancy::of(pieces);

    if piece.status == PieceStatus::Base {
        return exit_base(dice, player, &occupancy);
    }

    let mut path = Vec::with_capacity(dice as usize);
    let mut cell = piece.position;
    for _ in 0..dice {
        cell = next_cell(player, cell);
        path.push(cell);
    }

    let mut destination = cell;
    if destination > HOME_STRETCH_END {
        return None;
    }
    let mut status = PieceStatus::Active;
    if destination == HOME_STRETCH_END {
        status = PieceStatus::Home;
        destination = FINISHED_POSITION;
    }

    for &step in &path {
        // Home stretch cells are private to their color
        if !is_track(step) {
            continue;
        }
        if occupancy.opponent_block(step, player) {
            return None;
        }
        let own = occupancy.own(step, player);
        if step == destination {
            if own >= MAX_STACK {
                return None;
            }
        } else if own >= 2 {
            return None;
        }
    }

    // Safe cells are exclusive: an opponent there cannot be joined
    if status == PieceStatus::Active
        && is_track(destination)
        && is_safe(destination)
        && occupancy.has_opponent(destination, player)
    {
        return None;
    }

    Some(MoveTarget {
        position: destination,
        status,
    })
}

fn exit_base(dice: u8, player: Color, occupancy: &Occupancy) -> Option<MoveTarget> {
    if dice != 6 {
        return None;
    }
    let start = start_cell(player);
    if occupancy.opponent_block(start, player) || occupancy.own(start, player) >= MAX_STACK {
        return None;
    }
    Some(MoveTarget {
        position: start,
        status: PieceStatus::Active,
    })
}

/// Ids of `player`'s pieces that have a legal move with `dice`, in id order
pub fn find_movable_pieces(player: Color, dice: u8, pieces: &Pieces) -> Vec<PieceId> {
    pieces
        .values()
        .filter(|p| p.color == player && p.status != PieceStatus::Home)
        .filter(|p| compute_move(p, dice, player, pieces).is_some())
        .map(|p| p.id)
        .collect()
}

/// Opposing pieces a completed move onto `target` sends back to base.
///
/// Only non-safe track cells capture. `pieces` is the snapshot before the
/// mover is placed.
pub fn captured_by(target: MoveTarget, player: Color, pieces: &Pieces) -> Vec<PieceId> {
    if target.status != PieceStatus::Active
        || !is_track(target.position)
        || is_safe(target.position)
    {
        return Vec::new();
    }
    pieces
        .values()
        .filter(|p| {
            p.color != player && p.status == PieceStatus::Active && p.position == target.position
        })
        .map(|p| p.id)
        .collect()
}

/// All four of `color`'s pieces are home
pub fn has_won(color: Color, pieces: &Pieces) -> bool {
    pieces
        .values()
        .filter(|p| p.color == color)
        .all(|p| p.status == PieceStatus::Home)
}

/// Every piece of every color in base
pub fn starting_pieces() -> Pieces {
    Color::ALL
        .iter()
        .flat_map(|&c| PieceId::of(c))
        .map(|id| (id, Piece::in_base(id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BASE_POSITION;

    fn id(color: Color, index: u8) -> PieceId {
        PieceId::new(color, index)
    }

    fn place(pieces: &mut Pieces, id: PieceId, position: i8) {
        let piece = pieces.get_mut(&id).unwrap();
        piece.position = position;
        piece.status = match position {
            BASE_POSITION => PieceStatus::Base,
            FINISHED_POSITION => PieceStatus::Home,
            _ => PieceStatus::Active,
        };
    }

    fn target(position: i8) -> Option<MoveTarget> {
        Some(MoveTarget {
            position,
            status: PieceStatus::Active,
        })
    }

    #[test]
    fn test_base_exit_requires_six() {
        let pieces = starting_pieces();
        for color in Color::ALL {
            let piece = pieces[&id(color, 0)];
            for dice in 1..6 {
                assert_eq!(compute_move(&piece, dice, color, &pieces), None);
            }
            assert_eq!(compute_move(&piece, 6, color, &pieces), target(start_cell(color)));
        }
    }

    #[test]
    fn test_wrong_color_or_finished_piece_cannot_move() {
        let mut pieces = starting_pieces();
        let piece = pieces[&id(Color::Green, 0)];
        assert_eq!(compute_move(&piece, 6, Color::Red, &pieces), None);

        place(&mut pieces, id(Color::Red, 0), FINISHED_POSITION);
        let finished = pieces[&id(Color::Red, 0)];
        assert_eq!(compute_move(&finished, 6, Color::Red, &pieces), None);
    }

    #[test]
    fn test_base_exit_blocked_by_opponent_block() {
        let mut pieces = starting_pieces();
        place(&mut pieces, id(Color::Blue, 0), 13);
        place(&mut pieces, id(Color::Blue, 1), 13);
        let piece = pieces[&id(Color::Green, 0)];
        assert_eq!(compute_move(&piece, 6, Color::Green, &pieces), None);
    }

    #[test]
    fn test_base_exit_not_blocked_by_mixed_colors() {
        let mut pieces = starting_pieces();
        place(&mut pieces, id(Color::Blue, 0), 13);
        place(&mut pieces, id(Color::Red, 0), 13);
        let piece = pieces[&id(Color::Green, 0)];
        assert_eq!(compute_move(&piece, 6, Color::Green, &pieces), target(13));
    }

    #[test]
    fn test_base_exit_full_stack() {
        let mut pieces = starting_pieces();
        for i in 0..3 {
            place(&mut pieces, id(Color::Red, i), 0);
        }
        let last = pieces[&id(Color::Red, 3)];
        // Fourth piece still fits
        assert_eq!(compute_move(&last, 6, Color::Red, &pieces), target(0));

        // A fifth piece waiting in base cannot join a full start cell
        place(&mut pieces, id(Color::Red, 3), 0);
        let extra = PieceId::new(Color::Red, 4);
        pieces.insert(
            extra,
            Piece {
                id: extra,
                color: Color::Red,
                status: PieceStatus::Base,
                position: BASE_POSITION,
            },
        );
        let waiting = pieces[&extra];
        assert_eq!(compute_move(&waiting, 6, Color::Red, &pieces), None);
    }

    #[test]
    fn test_red_enters_home_stretch_instead_of_wrapping() {
        let mut pieces = starting_pieces();
        place(&mut pieces, id(Color::Red, 0), 50);
        let piece = pieces[&id(Color::Red, 0)];
        assert_eq!(compute_move(&piece, 3, Color::Red, &pieces), target(53));
    }

    #[test]
    fn test_other_colors_wrap_the_track() {
        let mut pieces = starting_pieces();
        place(&mut pieces, id(Color::Yellow, 0), 50);
        let piece = pieces[&id(Color::Yellow, 0)];
        assert_eq!(compute_move(&piece, 4, Color::Yellow, &pieces), target(2));
    }

    #[test]
    fn test_overshoot_is_illegal() {
        let mut pieces = starting_pieces();
        place(&mut pieces, id(Color::Red, 0), 55);
        let piece = pieces[&id(Color::Red, 0)];
        assert_eq!(compute_move(&piece, 3, Color::Red, &pieces), None);
        assert!(find_movable_pieces(Color::Red, 3, &pieces).is_empty());
    }

    #[test]
    fn test_exact_landing_finishes() {
        let mut pieces = starting_pieces();
        place(&mut pieces, id(Color::Red, 0), 55);
        let piece = pieces[&id(Color::Red, 0)];
        assert_eq!(
            compute_move(&piece, 2, Color::Red, &pieces),
            Some(MoveTarget {
                position: FINISHED_POSITION,
                status: PieceStatus::Home,
            })
        );
    }

    #[test]
    fn test_opponent_block_stops_passing() {
        let mut pieces = starting_pieces();
        place(&mut pieces, id(Color::Red, 0), 2);
        place(&mut pieces, id(Color::Green, 0), 4);
        place(&mut pieces, id(Color::Green, 1), 4);
        let piece = pieces[&id(Color::Red, 0)];
        assert_eq!(compute_move(&piece, 1, Color::Red, &pieces), target(3));
        assert_eq!(compute_move(&piece, 2, Color::Red, &pieces), None);
        assert_eq!(compute_move(&piece, 5, Color::Red, &pieces), None);
    }

    #[test]
    fn test_single_opponents_do_not_block() {
        let mut pieces = starting_pieces();
        place(&mut pieces, id(Color::Red, 0), 2);
        place(&mut pieces, id(Color::Green, 0), 4);
        place(&mut pieces, id(Color::Blue, 0), 4);
        let piece = pieces[&id(Color::Red, 0)];
        assert_eq!(compute_move(&piece, 4, Color::Red, &pieces), target(6));
    }

    #[test]
    fn test_own_block_cannot_be_jumped_but_can_be_joined() {
        let mut pieces = starting_pieces();
        place(&mut pieces, id(Color::Red, 0), 2);
        place(&mut pieces, id(Color::Red, 1), 5);
        place(&mut pieces, id(Color::Red, 2), 5);
        let piece = pieces[&id(Color::Red, 0)];
        assert_eq!(compute_move(&piece, 3, Color::Red, &pieces), target(5));
        assert_eq!(compute_move(&piece, 4, Color::Red, &pieces), None);
    }

    #[test]
    fn test_stack_capacity() {
        let mut pieces = starting_pieces();
        for i in 0..3 {
            place(&mut pieces, id(Color::Red, i), 5);
        }
        place(&mut pieces, id(Color::Red, 3), 3);
        let mover = pieces[&id(Color::Red, 3)];
        assert_eq!(compute_move(&mover, 2, Color::Red, &pieces), target(5));

        // A fifth piece never fits on a full stack
        place(&mut pieces, id(Color::Red, 3), 5);
        let extra = PieceId::new(Color::Red, 4);
        pieces.insert(
            extra,
            Piece {
                id: extra,
                color: Color::Red,
                status: PieceStatus::Active,
                position: 3,
            },
        );
        let mover = pieces[&extra];
        assert_eq!(compute_move(&mover, 2, Color::Red, &pieces), None);
    }

    #[test]
    fn test_safe_cell_with_opponent_is_closed() {
        let mut pieces = starting_pieces();
        place(&mut pieces, id(Color::Red, 0), 5);
        place(&mut pieces, id(Color::Yellow, 0), 8);
        let piece = pieces[&id(Color::Red, 0)];
        assert_eq!(compute_move(&piece, 3, Color::Red, &pieces), None);
        // Passing over it is fine
        assert_eq!(compute_move(&piece, 4, Color::Red, &pieces), target(9));
    }

    #[test]
    fn test_home_stretch_is_never_contested() {
        let mut pieces = starting_pieces();
        place(&mut pieces, id(Color::Red, 0), 52);
        place(&mut pieces, id(Color::Green, 0), 54);
        place(&mut pieces, id(Color::Green, 1), 54);
        let piece = pieces[&id(Color::Red, 0)];
        assert_eq!(compute_move(&piece, 3, Color::Red, &pieces), target(55));
    }

    #[test]
    fn test_capture_on_plain_cell() {
        let mut pieces = starting_pieces();
        place(&mut pieces, id(Color::Green, 0), 10);
        let captured = captured_by(target(10).unwrap(), Color::Red, &pieces);
        assert_eq!(captured, vec![id(Color::Green, 0)]);
    }

    #[test]
    fn test_capture_takes_every_opponent_on_cell() {
        let mut pieces = starting_pieces();
        place(&mut pieces, id(Color::Green, 0), 10);
        place(&mut pieces, id(Color::Blue, 2), 10);
        place(&mut pieces, id(Color::Red, 1), 10);
        let captured = captured_by(target(10).unwrap(), Color::Red, &pieces);
        assert_eq!(captured, vec![id(Color::Green, 0), id(Color::Blue, 2)]);
    }

    #[test]
    fn test_no_capture_on_safe_or_home_cells() {
        let mut pieces = starting_pieces();
        place(&mut pieces, id(Color::Green, 0), 13);
        assert!(captured_by(target(13).unwrap(), Color::Red, &pieces).is_empty());

        // Green in its own home stretch shares the number 53 with red's
        place(&mut pieces, id(Color::Green, 1), 53);
        assert!(captured_by(target(53).unwrap(), Color::Red, &pieces).is_empty());
    }

    #[test]
    fn test_find_movable_pieces() {
        let mut pieces = starting_pieces();
        assert!(find_movable_pieces(Color::Red, 4, &pieces).is_empty());
        assert_eq!(find_movable_pieces(Color::Red, 6, &pieces).len(), 4);

        place(&mut pieces, id(Color::Red, 2), 20);
        assert_eq!(find_movable_pieces(Color::Red, 4, &pieces), vec![id(Color::Red, 2)]);
    }

    #[test]
    fn test_has_won() {
        let mut pieces = starting_pieces();
        for i in 0..3 {
            place(&mut pieces, id(Color::Blue, i), FINISHED_POSITION);
        }
        assert!(!has_won(Color::Blue, &pieces));
        place(&mut pieces, id(Color::Blue, 3), FINISHED_POSITION);
        assert!(has_won(Color::Blue, &pieces));
        assert!(!has_won(Color::Red, &pieces));
    }
}
