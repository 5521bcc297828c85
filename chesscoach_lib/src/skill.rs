//! The skill dial and everything it controls.
//!
//! A [`SkillLevel`] is always in `1..=10`: 1 plays like someone who just
//! learned how the pieces move, 10 plays the best move it can find without
//! ever blundering on purpose. Every per-level table lives here so the
//! pipeline stages only ever ask the level for a number.

use crate::error::CoachError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const MIN_SKILL: u8 = 1;
pub const MAX_SKILL: u8 = 10;

const DESCRIPTIONS: [&str; 10] = [
   "Complete Beginner",
   "Novice",
   "Learning",
   "Improving",
   "Intermediate",
   "Club Player",
   "Strong Player",
   "Advanced",
   "Expert",
   "Master",
];

const PERSONAS: [&str; 10] = [
   "You are a complete beginner at chess. You barely know how the pieces move and you often miss obvious threats to your own pieces.",
   "You are a chess novice. You know the rules but rarely look more than one move ahead and frequently leave pieces undefended.",
   "You are learning chess. You try to capture free material but often overlook your opponent's replies.",
   "You are an improving chess player. You notice simple threats and try to develop your pieces, but you still make tactical errors.",
   "You are an intermediate chess player. You play solid developing moves and spot most one-move tactics.",
   "You are a club chess player. You understand opening principles, piece activity and basic tactics.",
   "You are a strong chess player. You calculate a few moves ahead and rarely leave material hanging.",
   "You are an advanced chess player. You combine careful calculation with good positional judgement.",
   "You are an expert chess player. You find strong tactical and positional moves and punish mistakes.",
   "You are a chess master. Find the objectively best move in the position.",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SkillLevel(u8);

impl SkillLevel {
   pub const STRONGEST: SkillLevel = SkillLevel(MAX_SKILL);

   /// Clamps `level` into `1..=10`
   pub fn new(level: u8) -> SkillLevel {
      SkillLevel(level.clamp(MIN_SKILL, MAX_SKILL))
   }

   pub fn get(self) -> u8 {
      self.0
   }

   fn index(self) -> usize {
      (self.0 - MIN_SKILL) as usize
   }

   pub fn description(self) -> &'static str {
      DESCRIPTIONS[self.index()]
   }

   /// Instruction prefixed to every prompt sent to the move-generation service
   pub fn persona(self) -> &'static str {
      PERSONAS[self.index()]
   }

   /// Share of the legal moves the skill filter keeps
   pub fn filter_fraction(self) -> f64 {
      match self.0 {
         0..=3 => 0.40,
         4..=6 => 0.65,
         7 => 0.80,
         _ => 1.0,
      }
   }

   /// Half-width of the uniform noise added to every move score
   pub fn noise_amplitude(self) -> f64 {
      match self.0 {
         0..=4 => 20.0,
         5..=7 => 10.0,
         _ => 0.0,
      }
   }

   /// Below this level a hanging piece is only sometimes noticed
   pub fn notices_hanging_pieces(self) -> bool {
      self.0 >= 5
   }

   /// Odds that the final move is swapped for a random legal one
   pub fn mistake_chance(self) -> f64 {
      match self.0 {
         0..=2 => 0.50,
         3..=4 => 0.35,
         5..=6 => 0.20,
         7..=8 => 0.10,
         9 => 0.05,
         _ => 0.0,
      }
   }

   pub fn temperature(self) -> f64 {
      (1.0 - f64::from(self.0) * 0.09).max(0.1)
   }

   pub fn top_p(self) -> f64 {
      if self.0 < 5 {
         0.85
      } else {
         0.95
      }
   }
}

impl Default for SkillLevel {
   fn default() -> SkillLevel {
      SkillLevel(5)
   }
}

impl fmt::Display for SkillLevel {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      write!(f, "{}", self.0)
   }
}

/// Strict parse for untrusted input: out of range is an error, not a clamp
impl FromStr for SkillLevel {
   type Err = CoachError;

   fn from_str(s: &str) -> Result<SkillLevel, CoachError> {
      match s.trim().parse::<i64>() {
         Ok(level) if (i64::from(MIN_SKILL)..=i64::from(MAX_SKILL)).contains(&level) => Ok(SkillLevel(level as u8)),
         _ => Err(CoachError::InvalidSkillLevel(s.to_string())),
      }
   }
}

/// How much detail a hint explanation carries. Never changes the move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HintLevel {
   #[default]
   Basic,
   Intermediate,
   Advanced,
}

impl HintLevel {
   pub fn name(self) -> &'static str {
      match self {
         HintLevel::Basic => "basic",
         HintLevel::Intermediate => "intermediate",
         HintLevel::Advanced => "advanced",
      }
   }
}

impl fmt::Display for HintLevel {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      f.write_str(self.name())
   }
}

impl FromStr for HintLevel {
   type Err = CoachError;

   fn from_str(s: &str) -> Result<HintLevel, CoachError> {
      match s {
         "basic" => Ok(HintLevel::Basic),
         "intermediate" => Ok(HintLevel::Intermediate),
         "advanced" => Ok(HintLevel::Advanced),
         _ => Err(CoachError::InvalidHintLevel(s.to_string())),
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn construction_clamps() {
      assert_eq!(SkillLevel::new(0).get(), 1);
      assert_eq!(SkillLevel::new(7).get(), 7);
      assert_eq!(SkillLevel::new(200).get(), 10);
   }

   #[test]
   fn parsing_is_strict() {
      assert_eq!("1".parse::<SkillLevel>(), Ok(SkillLevel::new(1)));
      assert_eq!(" 10 ".parse::<SkillLevel>(), Ok(SkillLevel::STRONGEST));
      for bad in ["0", "11", "-1", "100", "abc", ""] {
         assert!(bad.parse::<SkillLevel>().is_err(), "{} should be rejected", bad);
      }
   }

   #[test]
   fn descriptions_cover_every_level() {
      assert_eq!(SkillLevel::new(1).description(), "Complete Beginner");
      assert_eq!(SkillLevel::new(6).description(), "Club Player");
      assert_eq!(SkillLevel::new(10).description(), "Master");
      assert_eq!(SkillLevel::default().description(), "Intermediate");
   }

   #[test]
   fn sampling_parameters_follow_the_dial() {
      assert!((SkillLevel::new(1).temperature() - 0.91).abs() < 1e-9);
      assert!((SkillLevel::new(10).temperature() - 0.1).abs() < 1e-9);
      assert_eq!(SkillLevel::new(4).top_p(), 0.85);
      assert_eq!(SkillLevel::new(5).top_p(), 0.95);
      let mut last = f64::INFINITY;
      for level in 1..=10 {
         let t = SkillLevel::new(level).temperature();
         assert!(t <= last);
         last = t;
      }
   }

   #[test]
   fn mistake_table_steps_down() {
      let chances: Vec<f64> = (1..=10).map(|l| SkillLevel::new(l).mistake_chance()).collect();
      assert_eq!(chances, vec![0.5, 0.5, 0.35, 0.35, 0.2, 0.2, 0.1, 0.1, 0.05, 0.0]);
   }

   #[test]
   fn personas_are_distinct() {
      for a in 1..=10 {
         for b in (a + 1)..=10 {
            assert_ne!(SkillLevel::new(a).persona(), SkillLevel::new(b).persona());
         }
      }
   }

   #[test]
   fn hint_levels_parse() {
      assert_eq!("advanced".parse::<HintLevel>(), Ok(HintLevel::Advanced));
      assert!("expert".parse::<HintLevel>().is_err());
      assert_eq!(HintLevel::default(), HintLevel::Basic);
   }
}
