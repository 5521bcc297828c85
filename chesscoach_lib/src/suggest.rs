//! Asks an external text-generation service which move to play, and never
//! trusts the answer.
//!
//! The service gets a prompt listing the candidate moves. Whatever comes back
//! is matched against those candidates ([`parse_reply`]); if nothing matches,
//! or the service could not be reached at all, a uniformly random move from
//! the *full* legal set is played instead. A broken service slows nothing
//! down beyond its timeout and never blocks play.

use crate::board::{Move, State};
use crate::error::{CoachError, CoachResult};
use crate::skill::SkillLevel;
use log::{debug, trace, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq)]
pub struct SuggestionConfig {
   pub endpoint: String,
   pub model: String,
   pub timeout: Duration,
}

impl Default for SuggestionConfig {
   fn default() -> SuggestionConfig {
      SuggestionConfig {
         endpoint: generate_endpoint(DEFAULT_HOST),
         model: DEFAULT_MODEL.into(),
         timeout: DEFAULT_TIMEOUT,
      }
   }
}

fn generate_endpoint(host: &str) -> String {
   format!("{}/api/generate", host.trim_end_matches('/'))
}

fn read_env(name: &str) -> Option<String> {
   match env::var(name) {
      Ok(value) => Some(value),
      Err(env::VarError::NotPresent) => None,
      Err(env::VarError::NotUnicode(_)) => {
         warn!("{} environment variable found, but with invalid unicode. Ignoring.", name);
         None
      }
   }
}

impl SuggestionConfig {
   /// Defaults, overridden by `OLLAMA_HOST` and `CHESSCOACH_MODEL`
   pub fn from_env() -> SuggestionConfig {
      let mut config = SuggestionConfig::default();
      if let Some(host) = read_env("OLLAMA_HOST") {
         config.endpoint = generate_endpoint(&host);
      }
      if let Some(model) = read_env("CHESSCOACH_MODEL") {
         config.model = model;
      }
      config
   }

   pub fn with_host(mut self, host: &str) -> SuggestionConfig {
      self.endpoint = generate_endpoint(host);
      self
   }
}

/// One request to the move-generation service
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
   pub prompt: String,
   pub temperature: f64,
   pub top_p: f64,
}

impl GenerationRequest {
   pub fn new(state: &State, candidates: &[Move], skill: SkillLevel) -> GenerationRequest {
      GenerationRequest {
         prompt: build_prompt(state, candidates, skill),
         temperature: skill.temperature(),
         top_p: skill.top_p(),
      }
   }
}

/// The external text generator. Implementations may fail in any way; the
/// client treats every error the same.
pub trait SuggestionBackend {
   fn generate(&self, request: &GenerationRequest) -> CoachResult<String>;
}

impl<T: SuggestionBackend + ?Sized> SuggestionBackend for Box<T> {
   fn generate(&self, request: &GenerationRequest) -> CoachResult<String> {
      (**self).generate(request)
   }
}

#[derive(Serialize)]
struct GenerateBody<'a> {
   model: &'a str,
   prompt: &'a str,
   stream: bool,
   options: SamplingOptions,
}

#[derive(Serialize)]
struct SamplingOptions {
   temperature: f64,
   top_p: f64,
}

#[derive(Deserialize)]
struct GenerateResponse {
   response: String,
}

/// Ollama's `/api/generate`, non-streaming
pub struct OllamaBackend {
   client: reqwest::blocking::Client,
   config: SuggestionConfig,
}

impl OllamaBackend {
   pub fn new(config: SuggestionConfig) -> CoachResult<OllamaBackend> {
      let client = reqwest::blocking::Client::builder().timeout(config.timeout).build()?;
      Ok(OllamaBackend { client, config })
   }

   pub fn config(&self) -> &SuggestionConfig {
      &self.config
   }
}

impl SuggestionBackend for OllamaBackend {
   fn generate(&self, request: &GenerationRequest) -> CoachResult<String> {
      let body = GenerateBody {
         model: &self.config.model,
         prompt: &request.prompt,
         stream: false,
         options: SamplingOptions {
            temperature: request.temperature,
            top_p: request.top_p,
         },
      };
      let reply: GenerateResponse = self
         .client
         .post(&self.config.endpoint)
         .json(&body)
         .send()?
         .error_for_status()?
         .json()?;
      Ok(reply.response)
   }
}

/// A service that is never there. Every suggestion falls back.
pub struct Unavailable;

impl SuggestionBackend for Unavailable {
   fn generate(&self, _request: &GenerationRequest) -> CoachResult<String> {
      Err(CoachError::Service("no move generation service configured".into()))
   }
}

pub fn build_prompt(state: &State, candidates: &[Move], skill: SkillLevel) -> String {
   let moves: Vec<String> = candidates.iter().map(|m| m.to_string()).collect();
   format!(
      "{persona}\n\n\
       Analyze this chess position in FEN notation:\n{fen}\n\n\
       You are playing as {side}. The moves you may choose from, in UCI notation, are:\n{moves}\n\n\
       Choose one move for {side} from that list.\n\
       Respond with only the UCI notation of the move (e.g. 'e2e4').",
      persona = skill.persona(),
      fen = state.to_fen(),
      side = state.side_to_move(),
      moves = moves.join(", "),
   )
}

/// How a service reply was turned into a move
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyMatch {
   /// The trimmed reply is exactly one of the candidates
   Exact(Move),
   /// The first candidate found somewhere inside the reply
   Substring(Move),
   /// No usable reply: play a random legal move
   Fallback,
}

/// `None` stands for a service that failed before replying
pub fn parse_reply(reply: Option<&str>, candidates: &[Move]) -> ReplyMatch {
   let reply = match reply {
      Some(text) => text.trim(),
      None => return ReplyMatch::Fallback,
   };
   let texts: Vec<String> = candidates.iter().map(|m| m.to_string()).collect();

   if let Some(i) = texts.iter().position(|t| t == reply) {
      return ReplyMatch::Exact(candidates[i]);
   }
   if let Some(i) = texts.iter().position(|t| reply.contains(t.as_str())) {
      return ReplyMatch::Substring(candidates[i]);
   }
   ReplyMatch::Fallback
}

pub struct SuggestionClient<B> {
   backend: B,
}

impl<B: SuggestionBackend> SuggestionClient<B> {
   pub fn new(backend: B) -> SuggestionClient<B> {
      SuggestionClient { backend }
   }

   pub fn backend(&self) -> &B {
      &self.backend
   }

   /// Asks the service for one of `candidates`, returning a member of
   /// `legal_moves`. Service failures are logged and recovered; the only
   /// error is an empty `legal_moves`.
   pub fn suggest<R: Rng + ?Sized>(
      &self,
      state: &State,
      candidates: &[Move],
      legal_moves: &[Move],
      skill: SkillLevel,
      rng: &mut R,
   ) -> CoachResult<Move> {
      if legal_moves.is_empty() {
         return Err(CoachError::NoLegalMoves);
      }

      let request = GenerationRequest::new(state, candidates, skill);
      let reply = match self.backend.generate(&request) {
         Ok(text) => Some(text),
         Err(e) => {
            warn!("{}. Using a random move as fallback", e);
            None
         }
      };

      match parse_reply(reply.as_deref(), candidates) {
         ReplyMatch::Exact(m) => {
            trace!("service suggested {}", m);
            Ok(m)
         }
         ReplyMatch::Substring(m) => {
            debug!("found {} inside service reply {:?}", m, reply);
            Ok(m)
         }
         ReplyMatch::Fallback => {
            if reply.is_some() {
               debug!("no candidate move in service reply {:?}, falling back", reply);
            }
            legal_moves.choose(rng).copied().ok_or(CoachError::NoLegalMoves)
         }
      }
   }
}
