use crate::board::Move;
use crate::skill::SkillLevel;
use log::trace;
use rand::seq::SliceRandom;
use rand::Rng;

/// Sometimes swaps `suggested` for a uniformly random other legal move, with
/// the odds given by [`SkillLevel::mistake_chance`]. When `suggested` is the
/// only legal move it is kept. At full strength the suggestion is returned
/// without touching `rng`.
pub fn inject_mistake<R: Rng + ?Sized>(suggested: Move, legal_moves: &[Move], skill: SkillLevel, rng: &mut R) -> Move {
   let chance = skill.mistake_chance();
   if chance <= 0.0 {
      return suggested;
   }

   if rng.gen::<f64>() < chance {
      let alternatives: Vec<Move> = legal_moves.iter().copied().filter(|m| *m != suggested).collect();
      if let Some(&blunder) = alternatives.choose(rng) {
         trace!("skill {} blunders {} instead of {}", skill, blunder, suggested);
         return blunder;
      }
   }
   suggested
}
