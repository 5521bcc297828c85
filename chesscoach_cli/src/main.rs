mod repl;

use chesscoach_lib::advisor::Advisor;
use chesscoach_lib::session::GameSession;
use chesscoach_lib::skill::{HintLevel, SkillLevel};
use chesscoach_lib::suggest::{OllamaBackend, SuggestionBackend, SuggestionConfig, Unavailable};
use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;
use std::time::Duration;
use structopt::StructOpt;

/// Play chess against a coach that adapts to your level
#[derive(StructOpt, Debug)]
#[structopt(name = "chesscoach")]
struct Opt {
   /// Computer skill level, 1 (beginner) to 10 (master)
   #[structopt(short = "s", long = "skill", default_value = "5")]
   skill: SkillLevel,
   /// Detail of hints: basic, intermediate or advanced
   #[structopt(long = "hint-level", default_value = "basic")]
   hint_level: HintLevel,
   /// Show a hint after every computer move
   #[structopt(long = "learning")]
   learning: bool,
   /// Base URL of the move generation service (overrides OLLAMA_HOST)
   #[structopt(long = "endpoint")]
   endpoint: Option<String>,
   /// Model name (overrides CHESSCOACH_MODEL)
   #[structopt(long = "model")]
   model: Option<String>,
   /// Seconds to wait for the move generation service
   #[structopt(long = "timeout")]
   timeout: Option<u64>,
   /// Never contact the move generation service; computer moves are random picks
   #[structopt(long = "offline")]
   offline: bool,
   /// Seed for reproducible games
   #[structopt(long = "seed")]
   seed: Option<u64>,
}

fn backend(opt: &Opt) -> Box<dyn SuggestionBackend> {
   if opt.offline {
      return Box::new(Unavailable);
   }

   let mut config = SuggestionConfig::from_env();
   if let Some(host) = &opt.endpoint {
      config = config.with_host(host);
   }
   if let Some(model) = &opt.model {
      config.model = model.clone();
   }
   if let Some(secs) = opt.timeout {
      config.timeout = Duration::from_secs(secs);
   }

   match OllamaBackend::new(config) {
      Ok(backend) => {
         info!("using model {} at {}", backend.config().model, backend.config().endpoint);
         Box::new(backend)
      }
      Err(e) => {
         error!("{}. Playing offline", e);
         Box::new(Unavailable)
      }
   }
}

fn main() {
   pretty_env_logger::init();
   let opt = Opt::from_args();

   let rng = match opt.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
   };
   let mut advisor = Advisor::new(backend(&opt), rng);

   let mut session = GameSession::new(opt.skill);
   session.set_learning_mode(opt.learning, opt.hint_level);

   println!(
      "chesscoach: you play {} against skill {} ({}). Type 'help' for commands.",
      session.human,
      session.skill(),
      session.skill().description()
   );

   let stdin = io::stdin();
   let stdout = io::stdout();
   repl::main_loop(stdin.lock(), stdout.lock(), &mut session, &mut advisor);
}
