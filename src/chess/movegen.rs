//! Pseudo-legal move generation.
//!
//! Moves produced here respect piece movement, blocking and capture rules
//! but not king safety. Filtering out moves that leave the mover's own king
//! in check is the job of [`GameState`](super::GameState).

use super::board::{Board, Color, Move, Piece, PieceKind, Square};

const ORTHOGONALS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

const DIAGONALS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

const EVERY_DIRECTION: [(i8, i8); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];

/// Promotion choices offered when a pawn reaches the last rank, in the
/// order they are generated.
pub const PROMOTION_KINDS: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];

/// All pseudo-legal moves for the piece on `from`. Empty when the square
/// is empty. Generation is deterministic: the same position always yields
/// the same moves in the same order.
pub fn pseudo_legal_moves(board: &Board, from: Square) -> Vec<Move> {
    let Some(piece) = board.piece_at(from) else {
        return Vec::new();
    };
    let mut moves = Vec::new();
    match piece.kind {
        PieceKind::Rook => slide(board, piece, from, &ORTHOGONALS, &mut moves),
        PieceKind::Bishop => slide(board, piece, from, &DIAGONALS, &mut moves),
        PieceKind::Queen => slide(board, piece, from, &EVERY_DIRECTION, &mut moves),
        PieceKind::Knight => step(board, piece, from, &KNIGHT_JUMPS, &mut moves),
        PieceKind::King => step(board, piece, from, &EVERY_DIRECTION, &mut moves),
        PieceKind::Pawn => pawn(board, piece, from, &mut moves),
    }
    moves
}

/// Walk each ray until it hits the edge, a friendly piece (excluded) or an
/// enemy piece (included, then stop).
fn slide(board: &Board, piece: Piece, from: Square, dirs: &[(i8, i8)], out: &mut Vec<Move>) {
    for &(dr, dc) in dirs {
        let mut sq = from;
        while let Some(next) = sq.offset(dr, dc) {
            match board.piece_at(next) {
                None => {
                    out.push(Move::new(from, next));
                    sq = next;
                }
                Some(other) => {
                    if other.color != piece.color {
                        out.push(Move::new(from, next));
                    }
                    break;
                }
            }
        }
    }
}

/// Single fixed-offset targets for knights and kings: empty or
/// enemy-occupied squares only.
fn step(board: &Board, piece: Piece, from: Square, offsets: &[(i8, i8)], out: &mut Vec<Move>) {
    for &(dr, dc) in offsets {
        if let Some(to) = from.offset(dr, dc) {
            match board.piece_at(to) {
                None => out.push(Move::new(from, to)),
                Some(other) if other.color != piece.color => out.push(Move::new(from, to)),
                Some(_) => {}
            }
        }
    }
}

fn pawn(board: &Board, piece: Piece, from: Square, out: &mut Vec<Move>) {
    let (dir, start_row, promo_row) = match piece.color {
        Color::White => (1, 2, 8),
        Color::Black => (-1, 7, 1),
    };

    // Forward pushes never capture.
    if let Some(one) = from.offset(dir, 0) {
        if board.piece_at(one).is_none() {
            push_pawn_move(from, one, promo_row, out);
            if from.row() == start_row {
                if let Some(two) = one.offset(dir, 0) {
                    if board.piece_at(two).is_none() {
                        out.push(Move::new(from, two));
                    }
                }
            }
        }
    }

    // Diagonal steps only when capturing.
    for dc in [-1, 1] {
        if let Some(to) = from.offset(dir, dc) {
            if matches!(board.piece_at(to), Some(other) if other.color != piece.color) {
                push_pawn_move(from, to, promo_row, out);
            }
        }
    }
}

/// A pawn move onto the last rank fans out into one move per promotion
/// choice; anywhere else it is a single plain move.
fn push_pawn_move(from: Square, to: Square, promo_row: u8, out: &mut Vec<Move>) {
    if to.row() == promo_row {
        for kind in PROMOTION_KINDS {
            out.push(Move::promoting(from, to, kind));
        }
    } else {
        out.push(Move::new(from, to));
    }
}
