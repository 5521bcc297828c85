use chesscoach_lib::advisor::Advisor;
use chesscoach_lib::board::GameStatus;
use chesscoach_lib::error::CoachError;
use chesscoach_lib::hint::Hint;
use chesscoach_lib::session::GameSession;
use chesscoach_lib::skill::{HintLevel, SkillLevel};
use chesscoach_lib::suggest::SuggestionBackend;
use log::{error, trace};
use rand::Rng;
use std::io::{self, BufRead, Write};

const HELP: &str = "\
commands:
  <move> | move <move>        play a move in UCI notation, e.g. e2e4 or e7e8q
  hint [level]                suggest a move (basic, intermediate, advanced)
  skill [1-10]                show or set the computer's skill level
  learning on|off [level]     show a hint after every computer move
  board                       print the board as JSON
  fen                         print the position as FEN
  reset                       start a new game
  help                        show this message
  quit                        leave
";

fn write_hint<W: Write>(out: &mut W, hint: &Hint) -> io::Result<()> {
   writeln!(out, "hint ({}): {}", hint.category, hint.a_move)?;
   writeln!(out, "  {}", hint.explanation)
}

/// Reports a finished game, returning whether it is over
fn write_status<W: Write>(out: &mut W, session: &GameSession) -> io::Result<bool> {
   let moves = session.state.gen_moves();
   match session.state.status(&moves) {
      GameStatus::Ongoing => Ok(false),
      GameStatus::Draw => {
         writeln!(out, "game over: draw")?;
         Ok(true)
      }
      GameStatus::Victory(color) => {
         writeln!(out, "game over: {} wins", color)?;
         Ok(true)
      }
   }
}

fn computer_turn<B: SuggestionBackend, R: Rng, W: Write>(
   out: &mut W,
   session: &mut GameSession,
   advisor: &mut Advisor<B, R>,
) -> io::Result<()> {
   match session.play_computer_move(advisor) {
      Ok(a_move) => writeln!(out, "computer plays {}", a_move)?,
      Err(e) => {
         writeln!(out, "error: {}", e)?;
         return Ok(());
      }
   }
   if write_status(out, session)? {
      return Ok(());
   }
   if session.learning_mode {
      match session.hint(advisor, None) {
         Ok(hint) => write_hint(out, &hint)?,
         Err(e) => writeln!(out, "error: {}", e)?,
      }
   }
   Ok(())
}

fn play<B: SuggestionBackend, R: Rng, W: Write>(
   out: &mut W,
   session: &mut GameSession,
   advisor: &mut Advisor<B, R>,
   uci: &str,
) -> io::Result<()> {
   match session.play_human_move(uci) {
      Ok(a_move) => trace!("human played {}", a_move),
      Err(e) => return writeln!(out, "error: {}", e),
   }
   if write_status(out, session)? {
      return Ok(());
   }
   computer_turn(out, session, advisor)
}

fn parse_learning(args: &[&str], current: HintLevel) -> Result<(bool, HintLevel), String> {
   let enabled = match args.first() {
      Some(&"on") => true,
      Some(&"off") => false,
      _ => return Err("expected 'on' or 'off' after 'learning'".to_string()),
   };
   let level = match args.get(1) {
      Some(level) => level.parse().map_err(|e: CoachError| e.to_string())?,
      None => current,
   };
   Ok((enabled, level))
}

pub(crate) fn main_loop<I, W, B, R>(mut input: I, mut out: W, session: &mut GameSession, advisor: &mut Advisor<B, R>)
where
   I: BufRead,
   W: Write,
   B: SuggestionBackend,
   R: Rng,
{
   let mut line_buf = String::new();

   loop {
      line_buf.clear();
      if let Err(e) = input.read_line(&mut line_buf) {
         error!("Encountered I/O error reading input: {}", e);
         break;
      }
      if line_buf.is_empty() {
         break;
      }
      let args: Vec<&str> = line_buf.split_whitespace().collect();
      if args.is_empty() {
         continue;
      }

      let res: io::Result<()> = match args[0] {
         "quit" | "exit" => break,
         "help" => out.write_all(HELP.as_bytes()),
         "board" => match serde_json::to_string_pretty(&session.snapshot()) {
            Ok(json) => writeln!(out, "{}", json),
            Err(e) => writeln!(out, "error: {}", e),
         },
         "fen" => writeln!(out, "{}", session.state.to_fen()),
         "reset" => {
            session.reset();
            writeln!(out, "new game, you play {}", session.human)
         }
         "skill" => match args.get(1).map(|x| x.parse::<SkillLevel>()) {
            None => writeln!(out, "skill {} ({})", session.skill(), session.skill().description()),
            Some(Ok(skill)) => {
               session.set_skill(skill);
               writeln!(out, "skill {} ({})", skill, skill.description())
            }
            Some(Err(e)) => writeln!(out, "error: {}", e),
         },
         "learning" => match parse_learning(&args[1..], session.hint_level) {
            Ok((enabled, level)) => {
               session.set_learning_mode(enabled, level);
               writeln!(
                  out,
                  "learning mode {}, hint level {}",
                  if enabled { "on" } else { "off" },
                  level
               )
            }
            Err(e) => writeln!(out, "error: {}", e),
         },
         "hint" => {
            let level = match args.get(1).map(|x| x.parse::<HintLevel>()).transpose() {
               Ok(level) => level,
               Err(e) => {
                  if let Err(e) = writeln!(out, "error: {}", e) {
                     error!("Encountered I/O error writing output: {}", e);
                     break;
                  }
                  continue;
               }
            };
            match session.hint(advisor, level) {
               Ok(hint) => write_hint(&mut out, &hint),
               Err(e) => writeln!(out, "error: {}", e),
            }
         }
         "move" => match args.get(1) {
            Some(uci) => play(&mut out, session, advisor, uci),
            None => writeln!(out, "error: expected a move after 'move'"),
         },
         uci => play(&mut out, session, advisor, uci),
      };
      if let Err(e) = res.and_then(|_| out.flush()) {
         error!("Encountered I/O error writing output: {}", e);
         break;
      }
   }
}
