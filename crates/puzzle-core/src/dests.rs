//! Legal destinations per origin square.

use serde::{Deserialize, Serialize};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Move, Position, Square};
use std::collections::BTreeMap;

use crate::error::TreeError;
use crate::uci::parse_square;

/// Origin square -> destination squares. An empty map means the side to move
/// has no legal move (checkmate or stalemate).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Vec<String>>",
    into = "BTreeMap<String, Vec<String>>"
)]
pub struct Dests(BTreeMap<Square, Vec<Square>>);

impl Dests {
    pub fn new(map: BTreeMap<Square, Vec<Square>>) -> Self {
        Self(map)
    }

    /// Compute destinations from the legal moves of a position.
    /// Castling is listed both as king-to-target and king-to-rook.
    pub fn from_position(pos: &Chess) -> Self {
        let mut map: BTreeMap<Square, Vec<Square>> = BTreeMap::new();
        for m in pos.legal_moves() {
            if let UciMove::Normal { from, to, .. } = m.to_uci(CastlingMode::Standard) {
                push_unique(map.entry(from).or_default(), to);
            }
            if let Move::Castle { king, rook } = m {
                push_unique(map.entry(king).or_default(), rook);
            }
        }
        Self(map)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, orig: Square) -> Option<&[Square]> {
        self.0.get(&orig).map(Vec::as_slice)
    }

    pub fn contains(&self, orig: Square, dest: Square) -> bool {
        self.get(orig).is_some_and(|d| d.contains(&dest))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Square, &Vec<Square>)> {
        self.0.iter()
    }
}

fn push_unique(v: &mut Vec<Square>, sq: Square) {
    if !v.contains(&sq) {
        v.push(sq);
    }
}

impl TryFrom<BTreeMap<String, Vec<String>>> for Dests {
    type Error = TreeError;

    fn try_from(raw: BTreeMap<String, Vec<String>>) -> Result<Self, Self::Error> {
        let mut map = BTreeMap::new();
        for (orig, dests) in raw {
            let dests = dests
                .iter()
                .map(|d| parse_square(d))
                .collect::<Result<Vec<_>, _>>()?;
            map.insert(parse_square(&orig)?, dests);
        }
        Ok(Self(map))
    }
}

impl From<Dests> for BTreeMap<String, Vec<String>> {
    fn from(dests: Dests) -> Self {
        dests
            .0
            .into_iter()
            .map(|(orig, d)| (orig.to_string(), d.iter().map(Square::to_string).collect()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uci::position_from_fen;

    #[test]
    fn test_start_position_dests() {
        let dests = Dests::from_position(&Chess::default());
        assert_eq!(dests.iter().count(), 10); // 8 pawns + 2 knights
        assert!(dests.contains(Square::E2, Square::E4));
        assert!(dests.contains(Square::G1, Square::F3));
        assert!(!dests.contains(Square::E1, Square::E2));
    }

    #[test]
    fn test_checkmate_has_empty_dests() {
        // fool's mate
        let pos =
            position_from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
                .unwrap();
        assert!(Dests::from_position(&pos).is_empty());
    }

    #[test]
    fn test_castling_lists_both_targets() {
        let pos = position_from_fen("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        let dests = Dests::from_position(&pos);
        assert!(dests.contains(Square::E1, Square::G1));
        assert!(dests.contains(Square::E1, Square::H1));
    }

    #[test]
    fn test_json_shape() {
        let dests = Dests::from_position(&Chess::default());
        let json = serde_json::to_value(&dests).unwrap();
        assert_eq!(json["b1"], serde_json::json!(["a3", "c3"]));
        let back: Dests = serde_json::from_value(json).unwrap();
        assert_eq!(back, dests);
    }
}
