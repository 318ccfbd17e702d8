//! UCI / SAN notation helpers and node id encoding.
//!
//! Node ids use a compact two-character encoding of the UCI move: each square
//! maps to one character starting at `'#'`; a promotion replaces the
//! destination character with one encoding the destination file and the
//! promoted role.

use regex::Regex;
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Color, Role, Square};
use std::sync::LazyLock;

use crate::error::TreeError;
use crate::path::NodeId;

const CHAR_SHIFT: u32 = 35;

/// Promotable roles in id-encoding order.
const PROMO_ROLES: [Role; 5] = [Role::Queen, Role::Rook, Role::Bishop, Role::Knight, Role::King];

/// King-takes-rook castling notation and its standard equivalent.
const ALT_CASTLES: [(&str, &str); 4] = [
    ("e1h1", "e1g1"),
    ("e1a1", "e1c1"),
    ("e8h8", "e8g8"),
    ("e8a8", "e8c8"),
];

static CHECK_MARK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[+#]").unwrap());

/// A UCI move split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecomposedUci {
    pub orig: Square,
    pub dest: Square,
    pub promotion: Option<Role>,
}

impl DecomposedUci {
    /// Reassemble the UCI string.
    pub fn to_uci(&self) -> String {
        let mut s = format!("{}{}", self.orig, self.dest);
        if let Some(role) = self.promotion {
            s.push(role.char());
        }
        s
    }
}

/// Parse a square name such as `e4`.
pub fn parse_square(s: &str) -> Result<Square, TreeError> {
    s.parse::<Square>()
        .map_err(|_| TreeError::InvalidSquare(s.to_string()))
}

/// Split `e7e8q` into origin, destination and promotion role.
pub fn decompose_uci(uci: &str) -> Result<DecomposedUci, TreeError> {
    if !uci.is_ascii() || !(4..=5).contains(&uci.len()) {
        return Err(TreeError::InvalidUci(uci.to_string()));
    }
    let orig = parse_square(&uci[0..2])?;
    let dest = parse_square(&uci[2..4])?;
    let promotion = match uci[4..].chars().next() {
        Some(c) => Some(
            Role::from_char(c.to_ascii_lowercase())
                .ok_or_else(|| TreeError::InvalidUci(uci.to_string()))?,
        ),
        None => None,
    };
    Ok(DecomposedUci {
        orig,
        dest,
        promotion,
    })
}

fn square_char(sq: Square) -> char {
    char::from_u32(CHAR_SHIFT + sq as u32).unwrap_or('!')
}

fn promotion_char(dest: Square, role: Role) -> char {
    let role_idx = PROMO_ROLES.iter().position(|r| *r == role).unwrap_or(0) as u32;
    char::from_u32(CHAR_SHIFT + 64 + role_idx * 8 + dest.file() as u32).unwrap_or('!')
}

/// Node id of the node reached by `uci`.
pub fn node_id(uci: &str) -> Result<NodeId, TreeError> {
    let m = decompose_uci(uci)?;
    let dest = match m.promotion {
        Some(role) => promotion_char(m.dest, role),
        None => square_char(m.dest),
    };
    Ok(NodeId::from_chars(square_char(m.orig), dest))
}

/// Standard form of a castling move given as king-takes-rook.
pub fn normalize_castle(uci: &str) -> &str {
    ALT_CASTLES
        .iter()
        .find(|(alt, _)| *alt == uci)
        .map(|(_, standard)| *standard)
        .unwrap_or(uci)
}

/// Origin and destination of the last move, for highlighting.
pub fn last_move(uci: Option<&str>) -> Option<(Square, Square)> {
    let m = decompose_uci(uci?).ok()?;
    Some((m.orig, m.dest))
}

pub fn san_is_capture(san: &str) -> bool {
    san.contains('x')
}

pub fn san_gives_check(san: &str) -> bool {
    CHECK_MARK.is_match(san)
}

pub fn san_is_castle(san: &str) -> bool {
    san.starts_with("O-O")
}

/// Color to move at `ply`.
pub fn turn_at(ply: u32) -> Color {
    if ply % 2 == 0 {
        Color::White
    } else {
        Color::Black
    }
}

/// Color that played the move leading to a node at `ply`.
pub fn played_by(ply: u32) -> Color {
    !turn_at(ply)
}

/// Parse a FEN into a standard chess position.
pub fn position_from_fen(fen: &str) -> Result<Chess, TreeError> {
    let parsed: Fen = fen
        .parse()
        .map_err(|_| TreeError::InvalidFen(fen.to_string()))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|_| TreeError::InvalidFen(fen.to_string()))
}
