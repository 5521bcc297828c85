//! Coaching hints for the human side.
//!
//! A hint is the move the evaluator likes best at full strength, sorted into
//! one coaching category and explained at the requested level of detail. The
//! level only changes the wording, never the move.

use crate::board::{square_name, Move, Piece, State};
use crate::error::{CoachError, CoachResult};
use crate::evaluate::{is_center_square, score_moves};
use crate::skill::{HintLevel, SkillLevel};
use log::trace;
use noisy_float::prelude::*;
use rand::Rng;
use serde::Serialize;
use std::fmt;

/// Explanations shorter than this are rejected
pub const MIN_EXPLANATION_LEN: usize = 20;

/// Listed from most to least important; a move gets the first that applies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HintCategory {
   Checkmate,
   Check,
   Promotion,
   Castling,
   Capture,
   Center,
   Development,
   General,
}

impl HintCategory {
   pub fn name(self) -> &'static str {
      match self {
         HintCategory::Checkmate => "checkmate",
         HintCategory::Check => "check",
         HintCategory::Promotion => "promotion",
         HintCategory::Castling => "castling",
         HintCategory::Capture => "capture",
         HintCategory::Center => "center",
         HintCategory::Development => "development",
         HintCategory::General => "general",
      }
   }
}

impl fmt::Display for HintCategory {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      f.write_str(self.name())
   }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Hint {
   #[serde(rename = "move")]
   pub a_move: Move,
   pub category: HintCategory,
   pub explanation: String,
   pub from: String,
   pub to: String,
}

/// Best move for the side to move, scored at full strength over every legal
/// move. Ties go to the earliest move in generation order.
pub fn recommend_move<R: Rng + ?Sized>(state: &State, legal_moves: &[Move], rng: &mut R) -> Option<Move> {
   let mut best: Option<(Move, R64)> = None;
   for scored in score_moves(state, legal_moves, SkillLevel::STRONGEST, rng) {
      let score = r64(scored.score);
      match best {
         Some((_, best_score)) if best_score >= score => (),
         _ => best = Some((scored.a_move, score)),
      }
   }
   best.map(|(a_move, _)| a_move)
}

pub fn classify(state: &State, a_move: Move) -> HintCategory {
   let next = state.apply_move(a_move);
   if next.is_checkmate() {
      HintCategory::Checkmate
   } else if next.is_check() {
      HintCategory::Check
   } else if a_move.promotion.is_some() {
      HintCategory::Promotion
   } else if state.position.is_castling(a_move) {
      HintCategory::Castling
   } else if state.position.is_capture(a_move) {
      HintCategory::Capture
   } else if is_center_square(a_move.destination) {
      HintCategory::Center
   } else if a_move.origin / 8 == state.side_to_move().back_rank() {
      HintCategory::Development
   } else {
      HintCategory::General
   }
}

fn summary(category: HintCategory, piece: &str, captured: &str, promoted: &str) -> String {
   match category {
      HintCategory::Checkmate => "This move delivers checkmate".to_string(),
      HintCategory::Check => "This move puts the enemy king in check".to_string(),
      HintCategory::Promotion => format!("Promote your pawn to a {}", promoted),
      HintCategory::Castling => "Castle to bring your king to safety".to_string(),
      HintCategory::Capture => format!("Capture the {} with your {}", captured, piece),
      HintCategory::Center => format!("Move your {} into the center", piece),
      HintCategory::Development => format!("Develop your {} off the back rank", piece),
      HintCategory::General => format!("Improve the position of your {}", piece),
   }
}

fn reason(category: HintCategory) -> &'static str {
   match category {
      HintCategory::Checkmate => "the enemy king is attacked and has no legal way to escape",
      HintCategory::Check => "your opponent must spend the next move dealing with the threat to the king",
      HintCategory::Promotion => "a new piece on the board is a large material gain",
      HintCategory::Castling => "it tucks the king behind its pawns and connects your rooks",
      HintCategory::Capture => "winning material makes every later exchange easier",
      HintCategory::Center => "pieces in the center control more squares and restrict your opponent",
      HintCategory::Development => "every piece that joins the game adds to your attack and defence",
      HintCategory::General => "it keeps your pieces safe and coordinated",
   }
}

fn outlook(category: HintCategory) -> &'static str {
   match category {
      HintCategory::Checkmate => "The game ends here.",
      HintCategory::Check => "Look for follow-up checks or captures once the king has moved.",
      HintCategory::Promotion => "Use the new piece to start an attack before your opponent regroups.",
      HintCategory::Castling => "Next, bring your rooks to the open files.",
      HintCategory::Capture => "Keep trading down while you are ahead in material.",
      HintCategory::Center => "Follow up by developing your minor pieces to support the center.",
      HintCategory::Development => "Aim to castle soon and get your remaining pieces out.",
      HintCategory::General => "Watch for tactics your opponent might be setting up.",
   }
}

pub fn explain(state: &State, a_move: Move, category: HintCategory, level: HintLevel) -> String {
   let piece = state.position.piece_at(a_move.origin).map_or("piece", |(_, p)| p.name());
   let captured = state.position.captured_piece(a_move).map_or("piece", Piece::name);
   let promoted = a_move.promotion.map_or("queen", |t| t.piece().name());
   let route = format!("{} from {} to {}", piece, square_name(a_move.origin), square_name(a_move.destination));

   let summary = summary(category, piece, captured, promoted);
   match level {
      HintLevel::Basic => format!("{}: play {} ({}).", summary, a_move, route),
      HintLevel::Intermediate => format!("{}: play {} ({}), because {}.", summary, a_move, route, reason(category)),
      HintLevel::Advanced => format!(
         "{}: play {} ({}), because {}. {}",
         summary,
         a_move,
         route,
         reason(category),
         outlook(category)
      ),
   }
}

pub fn validate_explanation(explanation: &str) -> CoachResult<()> {
   if explanation.trim().len() < MIN_EXPLANATION_LEN {
      return Err(CoachError::GenerationFailed(format!(
         "explanation too short ({:?})",
         explanation
      )));
   }
   Ok(())
}

/// Builds the hint for playing `a_move` in `state`
pub fn describe(state: &State, a_move: Move, level: HintLevel) -> CoachResult<Hint> {
   let category = classify(state, a_move);
   let explanation = explain(state, a_move, category, level);
   validate_explanation(&explanation)?;
   trace!("hint {} ({}) at level {}", a_move, category, level);
   Ok(Hint {
      a_move,
      category,
      explanation,
      from: square_name(a_move.origin),
      to: square_name(a_move.destination),
   })
}

#[cfg(test)]
mod tests {
   use super::*;
   use rand::rngs::mock::StepRng;

   const SCHOLAR: &str = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";

   fn category(fen: &str, m: &str) -> HintCategory {
      classify(&State::from_fen(fen).unwrap(), m.parse().unwrap())
   }

   #[test]
   fn categories_follow_priority() {
      assert_eq!(category(SCHOLAR, "h5f7"), HintCategory::Checkmate);
      // the rook lands next to the king without checking it
      assert_eq!(category("4k3/5p2/8/8/8/8/8/4KR2 w - - 0 1", "f1f7"), HintCategory::Capture);
      assert_eq!(category("4k3/8/8/8/8/8/8/R3K3 w - - 0 1", "a1a8"), HintCategory::Check);
      assert_eq!(category("4k3/P7/8/8/8/8/8/4K3 w - - 0 1", "a7a8n"), HintCategory::Promotion);
      assert_eq!(category("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", "e1g1"), HintCategory::Castling);
      assert_eq!(category(crate::board::START_FEN, "e2e4"), HintCategory::Center);
      assert_eq!(category(crate::board::START_FEN, "g1f3"), HintCategory::Development);
      assert_eq!(category(crate::board::START_FEN, "a2a3"), HintCategory::General);
   }

   #[test]
   fn promotion_with_check_is_a_check() {
      assert_eq!(category("4k3/P7/8/8/8/8/8/4K3 w - - 0 1", "a7a8q"), HintCategory::Check);
   }

   #[test]
   fn recommends_the_mating_move() {
      let state = State::from_fen(SCHOLAR).unwrap();
      let m = recommend_move(&state, &state.gen_moves(), &mut StepRng::new(0, 0)).unwrap();
      assert_eq!(m.to_string(), "h5f7");
   }

   #[test]
   fn no_moves_no_recommendation() {
      let state = State::from_start();
      assert_eq!(recommend_move(&state, &[], &mut StepRng::new(0, 0)), None);
   }

   #[test]
   fn level_changes_wording_only() {
      let state = State::from_start();
      let m: Move = "g1f3".parse().unwrap();
      let basic = describe(&state, m, HintLevel::Basic).unwrap();
      let intermediate = describe(&state, m, HintLevel::Intermediate).unwrap();
      let advanced = describe(&state, m, HintLevel::Advanced).unwrap();

      assert_eq!(basic.a_move, advanced.a_move);
      assert_eq!(basic.category, advanced.category);
      assert!(basic.explanation.len() < intermediate.explanation.len());
      assert!(intermediate.explanation.len() < advanced.explanation.len());
      assert!(basic.explanation.contains("knight from g1 to f3"));
      assert_eq!((basic.from.as_str(), basic.to.as_str()), ("g1", "f3"));
   }

   #[test]
   fn every_explanation_passes_validation() {
      let state = State::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
      for m in state.gen_moves() {
         for level in [HintLevel::Basic, HintLevel::Intermediate, HintLevel::Advanced] {
            assert!(describe(&state, m, level).is_ok());
         }
      }
   }

   #[test]
   fn trivial_explanations_are_rejected() {
      assert!(matches!(validate_explanation("   ok  "), Err(CoachError::GenerationFailed(_))));
      assert!(validate_explanation("Develop your knight toward the center.").is_ok());
   }

   #[test]
   fn hint_serializes_for_clients() {
      let state = State::from_start();
      let hint = describe(&state, "e2e4".parse().unwrap(), HintLevel::Basic).unwrap();
      let json = serde_json::to_value(&hint).unwrap();
      assert_eq!(json["move"], "e2e4");
      assert_eq!(json["category"], "center");
      assert_eq!(json["from"], "e2");
      assert_eq!(json["to"], "e4");
   }
}
