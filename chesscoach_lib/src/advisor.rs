//! The two entry points callers use: picking the computer's move and coaching
//! the human.
//!
//! Neither touches game state. The caller applies the returned move itself.

use crate::board::{Color, Move, State};
use crate::error::{CoachError, CoachResult};
use crate::filter::filter_moves;
use crate::hint::{describe, recommend_move, Hint};
use crate::mistake::inject_mistake;
use crate::skill::{HintLevel, SkillLevel};
use crate::suggest::{SuggestionBackend, SuggestionClient};
use log::{debug, trace};
use rand::Rng;

pub struct Advisor<B, R> {
   client: SuggestionClient<B>,
   rng: R,
}

impl<B: SuggestionBackend, R: Rng> Advisor<B, R> {
   pub fn new(backend: B, rng: R) -> Advisor<B, R> {
      Advisor {
         client: SuggestionClient::new(backend),
         rng,
      }
   }

   pub fn client(&self) -> &SuggestionClient<B> {
      &self.client
   }

   /// Skill filter, then the suggestion service, then mistake injection, all
   /// over one snapshot of the legal moves. Always a member of that snapshot.
   pub fn select_computer_move(&mut self, state: &State, skill: SkillLevel) -> CoachResult<Move> {
      let legal_moves = state.gen_moves();
      if legal_moves.is_empty() {
         return Err(CoachError::NoLegalMoves);
      }

      let candidates = filter_moves(state, &legal_moves, skill, &mut self.rng);
      trace!("{} of {} legal moves are candidates", candidates.len(), legal_moves.len());

      let suggested = self
         .client
         .suggest(state, &candidates, &legal_moves, skill, &mut self.rng)?;
      let chosen = inject_mistake(suggested, &legal_moves, skill, &mut self.rng);

      debug!("skill {} plays {} (suggested {})", skill, chosen, suggested);
      Ok(chosen)
   }

   /// Recommends a move for `human`, who must be the side to move
   pub fn generate_hint(&mut self, state: &State, human: Color, level: HintLevel) -> CoachResult<Hint> {
      if state.side_to_move() != human {
         return Err(CoachError::OutOfTurn);
      }

      let legal_moves = state.gen_moves();
      let a_move = recommend_move(state, &legal_moves, &mut self.rng)
         .ok_or_else(|| CoachError::GenerationFailed("no legal moves to recommend".into()))?;
      describe(state, a_move, level)
   }
}
