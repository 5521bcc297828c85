use crate::board::{Move, State};
use crate::evaluate::score_moves;
use crate::skill::SkillLevel;
use log::trace;
use noisy_float::prelude::*;
use rand::Rng;
use std::cmp::Reverse;

/// The filter never narrows the candidates below this many moves
pub const MIN_CANDIDATES: usize = 3;

/// Narrows `legal_moves` to the ones a player of `skill` would seriously
/// consider. Strong players (8+) consider everything. Never returns fewer
/// than `min(MIN_CANDIDATES, legal_moves.len())` moves and cannot fail.
pub fn filter_moves<R: Rng + ?Sized>(state: &State, legal_moves: &[Move], skill: SkillLevel, rng: &mut R) -> Vec<Move> {
   if skill.get() >= 8 || legal_moves.len() <= MIN_CANDIDATES {
      return legal_moves.to_vec();
   }

   let mut scored = score_moves(state, legal_moves, skill, rng);
   scored.sort_by_key(|x| Reverse(r64(x.score)));

   let keep = ((skill.filter_fraction() * legal_moves.len() as f64).floor() as usize).max(MIN_CANDIDATES);
   scored.truncate(keep);

   trace!(
      "skill {} kept {} of {} moves: best {:?}",
      skill,
      scored.len(),
      legal_moves.len(),
      scored.first().map(|x| x.a_move.to_string())
   );
   scored.into_iter().map(|x| x.a_move).collect()
}
