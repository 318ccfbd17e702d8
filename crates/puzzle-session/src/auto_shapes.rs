//! Board arrows derived from evaluations.

use puzzle_core::uci::decompose_uci;
use puzzle_core::{ClientEval, GameNode, PvLine};
use shakmaty::{Color, Square};

/// Mate scores are mapped to this many centipawns before conversion.
const MATE_CP: f64 = 2100.0;

/// Alternatives losing more winning chances than this are not drawn.
const MAX_SHIFT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Brush {
    /// Best move from the next mainline node.
    NextBest,
    Best,
    Alternative,
    Threat,
    ThreatAlternative,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub orig: Square,
    pub dest: Square,
    pub brush: Brush,
    pub line_width: Option<u8>,
}

/// Inputs of [`compute`].
#[derive(Debug, Clone, Copy)]
pub struct ShapeContext<'a> {
    pub node: &'a GameNode,
    pub ceval_enabled: bool,
    pub threat_mode: bool,
    pub multi_pv: u32,
    pub next_node_best: Option<&'a str>,
}

/// Winning chances in [-1, 1] from white's point of view.
pub fn winning_chances(pv: &PvLine) -> f64 {
    let cp = match (pv.mate, pv.cp) {
        (Some(mate), _) => {
            let sign = if mate > 0 { 1.0 } else { -1.0 };
            sign * (MATE_CP - f64::from(mate.abs()) * 100.0)
        }
        (None, Some(cp)) => f64::from(cp),
        (None, None) => 0.0,
    };
    let cp = cp.clamp(-1000.0, 1000.0);
    2.0 / (1.0 + (-0.004 * cp).exp()) - 1.0
}

/// How much worse `pv` is than `best` for `color`.
fn pov_shift(color: Color, best: &PvLine, pv: &PvLine) -> f64 {
    let diff = winning_chances(best) - winning_chances(pv);
    match color {
        Color::White => diff,
        Color::Black => -diff,
    }
}

fn arrow(uci: &str, brush: Brush, line_width: Option<u8>) -> Option<Shape> {
    let m = decompose_uci(uci).ok()?;
    Some(Shape {
        orig: m.orig,
        dest: m.dest,
        brush,
        line_width,
    })
}

fn alternatives(color: Color, eval: &ClientEval, brush: Brush) -> Vec<Shape> {
    let Some(best) = eval.pvs.first() else {
        return Vec::new();
    };
    eval.pvs
        .iter()
        .skip(1)
        .filter_map(|pv| {
            let shift = pov_shift(color, best, pv);
            if !(0.0..=MAX_SHIFT).contains(&shift) {
                return None;
            }
            let width = (12.0 - shift * 50.0).round().max(2.0) as u8;
            arrow(pv.moves.first()?, brush, Some(width))
        })
        .collect()
}

/// Arrows for the current node.
pub fn compute(ctx: ShapeContext<'_>) -> Vec<Shape> {
    let node = ctx.node;
    let color = puzzle_core::uci::turn_at(node.ply);
    let mut shapes = Vec::new();

    if let Some(uci) = ctx.next_node_best {
        shapes.extend(arrow(uci, Brush::NextBest, None));
    } else if ctx.ceval_enabled && !ctx.threat_mode {
        if let Some(eval) = &node.ceval {
            shapes.extend(eval.best().and_then(|uci| arrow(uci, Brush::Best, None)));
            if ctx.multi_pv > 1 {
                shapes.extend(alternatives(color, eval, Brush::Alternative));
            }
        }
    }

    if ctx.ceval_enabled && ctx.threat_mode {
        if let Some(threat) = &node.threat {
            shapes.extend(threat.best().and_then(|uci| arrow(uci, Brush::Threat, None)));
            if ctx.multi_pv > 1 {
                shapes.extend(alternatives(!color, threat, Brush::ThreatAlternative));
            }
        }
    }
    shapes
}
