use crate::advisor::Advisor;
use crate::board::{square_name, Color, Move, State};
use crate::error::{CoachError, CoachResult};
use crate::hint::Hint;
use crate::skill::{HintLevel, SkillLevel};
use crate::suggest::SuggestionBackend;
use log::info;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PieceInfo {
   /// Lowercase FEN letter
   #[serde(rename = "type")]
   pub kind: char,
   pub color: &'static str,
}

/// What a client needs to draw the board and offer moves
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BoardSnapshot {
   pub fen: String,
   pub turn: &'static str,
   pub is_check: bool,
   pub is_checkmate: bool,
   pub is_stalemate: bool,
   pub is_game_over: bool,
   pub legal_moves: Vec<String>,
   pub pieces: BTreeMap<String, PieceInfo>,
}

/// One game between a human and the advisor. The caller owns it and
/// serializes access to it.
#[derive(Clone)]
pub struct GameSession {
   pub state: State,
   pub human: Color,
   skill: SkillLevel,
   pub learning_mode: bool,
   pub hint_level: HintLevel,
}

impl Default for GameSession {
   fn default() -> GameSession {
      GameSession::new(SkillLevel::default())
   }
}

impl GameSession {
   pub fn new(skill: SkillLevel) -> GameSession {
      GameSession {
         state: State::from_start(),
         human: Color::White,
         skill,
         learning_mode: false,
         hint_level: HintLevel::default(),
      }
   }

   pub fn from_fen(fen: &str, skill: SkillLevel) -> CoachResult<GameSession> {
      let state = State::from_fen(fen).map_err(CoachError::InvalidPosition)?;
      Ok(GameSession {
         state,
         ..GameSession::new(skill)
      })
   }

   /// Back to the starting position. Skill and learning settings are kept.
   pub fn reset(&mut self) {
      self.state = State::from_start();
      info!("game reset");
   }

   pub fn skill(&self) -> SkillLevel {
      self.skill
   }

   pub fn set_skill(&mut self, skill: SkillLevel) {
      info!("skill level set to {} ({})", skill, skill.description());
      self.skill = skill;
   }

   pub fn set_learning_mode(&mut self, enabled: bool, level: HintLevel) {
      info!(
         "learning mode: {}, hint level: {}",
         if enabled { "enabled" } else { "disabled" },
         level
      );
      self.learning_mode = enabled;
      self.hint_level = level;
   }

   pub fn is_human_turn(&self) -> bool {
      self.state.side_to_move() == self.human
   }

   pub fn play_human_move(&mut self, uci: &str) -> CoachResult<Move> {
      let a_move: Move = uci.trim().parse().map_err(CoachError::InvalidMove)?;
      if !self.is_human_turn() {
         return Err(CoachError::OutOfTurn);
      }
      self.state = self
         .state
         .try_apply_move(a_move)
         .map_err(|_| CoachError::IllegalMove(a_move))?;
      Ok(a_move)
   }

   pub fn play_computer_move<B: SuggestionBackend, R: Rng>(&mut self, advisor: &mut Advisor<B, R>) -> CoachResult<Move> {
      if self.is_human_turn() {
         return Err(CoachError::OutOfTurn);
      }
      let a_move = advisor.select_computer_move(&self.state, self.skill)?;
      self.state = self.state.apply_move(a_move);
      Ok(a_move)
   }

   /// Hint at `level`, or at the session's hint level
   pub fn hint<B: SuggestionBackend, R: Rng>(
      &self,
      advisor: &mut Advisor<B, R>,
      level: Option<HintLevel>,
   ) -> CoachResult<Hint> {
      advisor.generate_hint(&self.state, self.human, level.unwrap_or(self.hint_level))
   }

   pub fn snapshot(&self) -> BoardSnapshot {
      let legal_moves = self.state.gen_moves();
      let pieces = (0..64u8)
         .filter_map(|square| {
            self.state.position.piece_at(square).map(|(color, piece)| {
               (
                  square_name(square),
                  PieceInfo {
                     kind: piece.symbol(),
                     color: color.name(),
                  },
               )
            })
         })
         .collect();
      let is_check = self.state.is_check();
      BoardSnapshot {
         fen: self.state.to_fen(),
         turn: self.state.side_to_move().name(),
         is_check,
         is_checkmate: is_check && legal_moves.is_empty(),
         is_stalemate: !is_check && legal_moves.is_empty(),
         is_game_over: self.state.is_game_over(),
         legal_moves: legal_moves.iter().map(|m| m.to_string()).collect(),
         pieces,
      }
   }
}
