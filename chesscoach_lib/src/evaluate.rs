use crate::board::{Move, State};
use crate::error::{CoachError, CoachResult};
use crate::skill::SkillLevel;
use log::{debug, trace};
use rand::Rng;

/// d4, e4, d5, e5
pub const CENTER_SQUARES: u64 = (1 << 27) | (1 << 28) | (1 << 35) | (1 << 36);

/// Score of a quiet move with no noise. Also what the skill filter assigns a
/// move it failed to score.
pub const BASE_SCORE: f64 = 50.0;

const CAPTURE_WEIGHT: f64 = 10.0;
const CHECK_BONUS: f64 = 30.0;
const CHECKMATE_BONUS: f64 = 10_000.0;
const HANGING_WEIGHT: f64 = 5.0;
const CENTER_BONUS: f64 = 10.0;
const DEVELOPMENT_BONUS: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredMove {
   pub a_move: Move,
   pub score: f64,
}

pub fn is_center_square(square: u8) -> bool {
   CENTER_SQUARES & (1 << square) != 0
}

/// Scores `a_move` for the side to move in `state`. Higher is better for the
/// mover. `state` is never touched; the move is played on a copy.
///
/// Fails only when `a_move` does not start on one of the mover's pieces.
pub fn evaluate<R: Rng + ?Sized>(state: &State, a_move: Move, skill: SkillLevel, rng: &mut R) -> CoachResult<f64> {
   let mover = state.side_to_move();
   match state.position.piece_at(a_move.origin) {
      Some((color, _)) if color == mover => (),
      _ => return Err(CoachError::IllegalMove(a_move)),
   }

   let mut score = BASE_SCORE;

   if let Some(captured) = state.position.captured_piece(a_move) {
      score += captured.material_value() * CAPTURE_WEIGHT;
   }

   let next = state.apply_move(a_move);
   if next.is_check() {
      score += CHECK_BONUS;
      if next.gen_moves().is_empty() {
         score += CHECKMATE_BONUS;
      }
   }

   if let Some((_, landed)) = next.position.piece_at(a_move.destination) {
      if next.position.attackers(a_move.destination as usize, !mover) != 0 {
         let mut penalty = landed.material_value() * HANGING_WEIGHT;
         if !skill.notices_hanging_pieces() {
            penalty *= rng.gen::<f64>();
         }
         score -= penalty;
      }
   }

   if is_center_square(a_move.destination) {
      score += CENTER_BONUS;
   }

   if a_move.origin / 8 == mover.back_rank() {
      score += DEVELOPMENT_BONUS;
   }

   let noise = skill.noise_amplitude();
   if noise > 0.0 {
      score += rng.gen_range(-noise..=noise);
   }

   trace!("evaluated {} at {:.2} (skill {})", a_move, score, skill);
   Ok(score)
}

/// Scores every move in one pass over the same position. A move that cannot
/// be scored gets [`BASE_SCORE`] instead of failing the whole pass.
pub fn score_moves<R: Rng + ?Sized>(state: &State, moves: &[Move], skill: SkillLevel, rng: &mut R) -> Vec<ScoredMove> {
   moves
      .iter()
      .map(|&a_move| ScoredMove {
         a_move,
         score: evaluate(state, a_move, skill, rng).unwrap_or_else(|e| {
            debug!("could not score {}: {}", a_move, e);
            BASE_SCORE
         }),
      })
      .collect()
}

#[cfg(test)]
mod tests {
   use super::*;
   use rand::rngs::mock::StepRng;
   use rand::rngs::StdRng;
   use rand::SeedableRng;

   fn quiet_rng() -> StepRng {
      StepRng::new(0, 0)
   }

   fn score(fen: &str, m: &str, skill: u8) -> f64 {
      let state = State::from_fen(fen).unwrap();
      evaluate(&state, m.parse().unwrap(), SkillLevel::new(skill), &mut quiet_rng()).unwrap()
   }

   #[test]
   fn central_pawn_push_beats_rim_pawn_push() {
      let state = State::from_start();
      let mut rng = quiet_rng();
      let strong = SkillLevel::STRONGEST;
      let e4 = evaluate(&state, "e2e4".parse().unwrap(), strong, &mut rng).unwrap();
      let a3 = evaluate(&state, "a2a3".parse().unwrap(), strong, &mut rng).unwrap();
      let nf3 = evaluate(&state, "g1f3".parse().unwrap(), strong, &mut rng).unwrap();
      assert_eq!(a3, BASE_SCORE);
      assert_eq!(e4, BASE_SCORE + CENTER_BONUS);
      assert_eq!(nf3, BASE_SCORE + DEVELOPMENT_BONUS);
   }

   #[test]
   fn captures_score_by_material() {
      // knight takes an undefended rook
      let fen = "4k3/8/8/3r4/8/2N5/8/4K3 w - - 0 1";
      assert_eq!(score(fen, "c3d5", 10), BASE_SCORE + 5.0 * CAPTURE_WEIGHT + CENTER_BONUS);
   }

   #[test]
   fn hanging_piece_is_penalised_at_full_weight_for_strong_players() {
      // the c6 pawn covers d5 but not e4
      let fen = "4k3/8/2p5/8/8/2N5/8/4K3 w - - 0 1";
      assert_eq!(score(fen, "c3d5", 10), BASE_SCORE + CENTER_BONUS - 3.0 * HANGING_WEIGHT);
      assert_eq!(score(fen, "c3e4", 10), BASE_SCORE + CENTER_BONUS);
   }

   #[test]
   fn weak_players_may_overlook_hanging_pieces() {
      let fen = "4k3/8/2p5/8/8/2N5/8/4K3 w - - 0 1";
      let state = State::from_fen(fen).unwrap();
      let m: Move = "c3d5".parse().unwrap();
      // a zero draw for the awareness factor, then the low end of the noise
      let mut blind = StepRng::new(0, 0);
      let s = evaluate(&state, m, SkillLevel::new(1), &mut blind).unwrap();
      assert_eq!(s, BASE_SCORE + CENTER_BONUS - 20.0);
   }

   #[test]
   fn checkmate_dominates() {
      let fen = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";
      let state = State::from_fen(fen).unwrap();
      let mut rng = quiet_rng();
      let scored = score_moves(&state, &state.gen_moves(), SkillLevel::STRONGEST, &mut rng);
      let best = scored
         .iter()
         .fold(None::<ScoredMove>, |best, s| match best {
            Some(b) if b.score >= s.score => Some(b),
            _ => Some(*s),
         })
         .unwrap();
      assert_eq!(best.a_move.to_string(), "h5f7");
      assert!(best.score > CHECKMATE_BONUS);
   }

   #[test]
   fn check_earns_a_bonus() {
      let fen = "4k3/8/8/8/8/8/8/R3K3 w - - 0 1";
      // a1a8 checks along the back rank, a1a7 does not
      let check = score(fen, "a1a8", 10);
      let quiet = score(fen, "a1a7", 10);
      assert_eq!(check - quiet, CHECK_BONUS);
   }

   #[test]
   fn noise_stays_in_band() {
      let state = State::from_start();
      let m: Move = "a2a3".parse().unwrap();
      let mut rng = StdRng::seed_from_u64(7);
      for (level, band) in [(1, 20.0), (6, 10.0), (9, 0.0)] {
         for _ in 0..200 {
            let s = evaluate(&state, m, SkillLevel::new(level), &mut rng).unwrap();
            assert!((s - BASE_SCORE).abs() <= band, "skill {} scored {}", level, s);
         }
      }
   }

   #[test]
   fn evaluation_leaves_the_position_alone() {
      let state = State::from_start();
      let before = state.to_fen();
      let _ = score_moves(&state, &state.gen_moves(), SkillLevel::new(3), &mut StdRng::seed_from_u64(1));
      assert_eq!(state.to_fen(), before);
   }

   #[test]
   fn moves_from_empty_squares_are_rejected() {
      let state = State::from_start();
      let mut rng = quiet_rng();
      assert!(evaluate(&state, "e4e5".parse().unwrap(), SkillLevel::new(5), &mut rng).is_err());
      assert!(evaluate(&state, "e7e5".parse().unwrap(), SkillLevel::new(5), &mut rng).is_err());
   }
}
