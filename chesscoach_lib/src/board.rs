use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt::{self, Write};
use std::str::FromStr;

const WHITE: usize = 0;
const BLACK: usize = 1;

const PAWN: usize = 0;
const ROOK: usize = 1;
const KNIGHT: usize = 2;
const BISHOP: usize = 3;
const QUEEN: usize = 4;
const KING: usize = 5;

const NORTH: usize = 0;
const SOUTH: usize = 1;
const EAST: usize = 2;
const WEST: usize = 3;
const NORTH_EAST: usize = 4;
const NORTH_WEST: usize = 5;
const SOUTH_EAST: usize = 6;
const SOUTH_WEST: usize = 7;

const RANK_1: u64 = 0xff;
const RANK_4: u64 = 0xff000000;
const RANK_5: u64 = 0xff00000000;
const RANK_8: u64 = 0xff00000000000000;

const FILE_H: u64 = 0x8080808080808080;
const FILE_A: u64 = 0x101010101010101;

// (file, rank) steps, indexed by the direction constants above
const RAY_STEPS: [(i8, i8); 8] = [(0, 1), (0, -1), (1, 0), (-1, 0), (1, 1), (-1, 1), (1, -1), (-1, -1)];
const KING_STEPS: [(i8, i8); 8] = RAY_STEPS;
const KNIGHT_STEPS: [(i8, i8); 8] = [(1, 2), (2, 1), (2, -1), (1, -2), (-1, -2), (-2, -1), (-2, 1), (-1, 2)];
const WHITE_PAWN_STEPS: [(i8, i8); 2] = [(-1, 1), (1, 1)];
const BLACK_PAWN_STEPS: [(i8, i8); 2] = [(-1, -1), (1, -1)];

const PAWN_ATTACKS: [[u64; 64]; 2] = [gen_step_attacks(&WHITE_PAWN_STEPS), gen_step_attacks(&BLACK_PAWN_STEPS)];
const KING_ATTACKS: [u64; 64] = gen_step_attacks(&KING_STEPS);
const KNIGHT_ATTACKS: [u64; 64] = gen_step_attacks(&KNIGHT_STEPS);

// 65 entries so that a trailing_zeros() of 64 (no blocker) indexes an empty ray
const RAYS: [[u64; 65]; 8] = gen_rays();

const fn on_board(file: i8, rank: i8) -> bool {
   file >= 0 && file < 8 && rank >= 0 && rank < 8
}

const fn gen_step_attacks(steps: &[(i8, i8)]) -> [u64; 64] {
   let mut array: [u64; 64] = [0; 64];

   let mut i = 0;
   while i < 64 {
      let file = (i % 8) as i8;
      let rank = (i / 8) as i8;
      let mut s = 0;
      while s < steps.len() {
         let (df, dr) = steps[s];
         if on_board(file + df, rank + dr) {
            array[i] |= 1u64 << (((rank + dr) * 8 + file + df) as u32);
         }
         s += 1;
      }
      i += 1;
   }
   array
}

const fn gen_rays() -> [[u64; 65]; 8] {
   let mut array: [[u64; 65]; 8] = [[0; 65]; 8];

   let mut dir = 0;
   while dir < 8 {
      let (df, dr) = RAY_STEPS[dir];
      let mut i = 0;
      while i < 64 {
         let mut file = (i % 8) as i8 + df;
         let mut rank = (i / 8) as i8 + dr;
         while on_board(file, rank) {
            array[dir][i] |= 1u64 << ((rank * 8 + file) as u32);
            file += df;
            rank += dr;
         }
         i += 1;
      }
      dir += 1;
   }
   array
}

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
   White,
   Black,
}

impl Color {
   fn as_num(self) -> usize {
      match self {
         Color::White => WHITE,
         Color::Black => BLACK,
      }
   }

   /// The rank (0-based) this side's pieces start on
   pub fn back_rank(self) -> u8 {
      match self {
         Color::White => 0,
         Color::Black => 7,
      }
   }

   pub fn name(self) -> &'static str {
      match self {
         Color::White => "white",
         Color::Black => "black",
      }
   }
}

impl fmt::Display for Color {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      f.write_str(self.name())
   }
}

impl std::ops::Not for Color {
   type Output = Color;
   fn not(self) -> Color {
      match self {
         Color::Black => Color::White,
         Color::White => Color::Black,
      }
   }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Piece {
   Pawn,
   Rook,
   Knight,
   Bishop,
   Queen,
   King,
}

const PIECES: [Piece; 6] = [Piece::Pawn, Piece::Rook, Piece::Knight, Piece::Bishop, Piece::Queen, Piece::King];

impl Piece {
   fn as_num(self) -> usize {
      match self {
         Piece::Pawn => PAWN,
         Piece::Rook => ROOK,
         Piece::Knight => KNIGHT,
         Piece::Bishop => BISHOP,
         Piece::Queen => QUEEN,
         Piece::King => KING,
      }
   }

   /// Classic material value in pawns. The king is priceless, so 0.
   pub fn material_value(self) -> f64 {
      match self {
         Piece::Pawn => 1.0,
         Piece::Knight => 3.0,
         Piece::Bishop => 3.0,
         Piece::Rook => 5.0,
         Piece::Queen => 9.0,
         Piece::King => 0.0,
      }
   }

   pub fn name(self) -> &'static str {
      match self {
         Piece::Pawn => "pawn",
         Piece::Rook => "rook",
         Piece::Knight => "knight",
         Piece::Bishop => "bishop",
         Piece::Queen => "queen",
         Piece::King => "king",
      }
   }

   /// FEN letter, lowercase
   pub fn symbol(self) -> char {
      match self {
         Piece::Pawn => 'p',
         Piece::Rook => 'r',
         Piece::Knight => 'n',
         Piece::Bishop => 'b',
         Piece::Queen => 'q',
         Piece::King => 'k',
      }
   }

   fn from_symbol(symbol: u8) -> Option<(Color, Piece)> {
      let color = if symbol.is_ascii_uppercase() { Color::White } else { Color::Black };
      let piece = match symbol.to_ascii_lowercase() {
         b'p' => Piece::Pawn,
         b'r' => Piece::Rook,
         b'n' => Piece::Knight,
         b'b' => Piece::Bishop,
         b'q' => Piece::Queen,
         b'k' => Piece::King,
         _ => return None,
      };
      Some((color, piece))
   }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PromotionTarget {
   Knight,
   Bishop,
   Rook,
   Queen,
}

const PROMOTION_TARGETS: [PromotionTarget; 4] = [
   PromotionTarget::Queen,
   PromotionTarget::Bishop,
   PromotionTarget::Knight,
   PromotionTarget::Rook,
];

impl PromotionTarget {
   pub fn piece(self) -> Piece {
      match self {
         PromotionTarget::Knight => Piece::Knight,
         PromotionTarget::Bishop => Piece::Bishop,
         PromotionTarget::Rook => Piece::Rook,
         PromotionTarget::Queen => Piece::Queen,
      }
   }
}

impl fmt::Display for PromotionTarget {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      write!(f, "{}", self.piece().symbol())
   }
}

impl FromStr for PromotionTarget {
   type Err = String;

   fn from_str(s: &str) -> Result<PromotionTarget, String> {
      match s {
         "n" => Ok(PromotionTarget::Knight),
         "b" => Ok(PromotionTarget::Bishop),
         "r" => Ok(PromotionTarget::Rook),
         "q" => Ok(PromotionTarget::Queen),
         _ => Err(format!("Expected one of ASCII nbrq for promotion target, got {}", s)),
      }
   }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
   pub pieces: [[u64; 6]; 2],
   pub all_pieces: [u64; 2],
   pub attackable: [u64; 2],
   pub occupied: u64,
   pub unoccupied: u64,
}

impl Board {
   /// Not the starting position. All bitboards empty
   fn empty() -> Board {
      Board {
         pieces: [[0; 6]; 2],
         all_pieces: [0; 2],
         attackable: [0; 2],
         occupied: 0,
         unoccupied: !0,
      }
   }

   fn update_derived_bitboards(&mut self) {
      for color in [WHITE, BLACK] {
         self.all_pieces[color] = self.pieces[color].iter().fold(0, |acc, bb| acc | bb);
         self.attackable[color] = self.all_pieces[color] & !self.pieces[color][KING];
      }
      self.occupied = self.all_pieces[WHITE] | self.all_pieces[BLACK];
      self.unoccupied = !self.occupied;
   }

   fn remove_piece(&mut self, color: usize, piece: usize, index: u8) {
      let shifted = !(1 << index);

      self.pieces[color][piece] &= shifted;
      self.all_pieces[color] &= shifted;
      self.attackable[color] &= shifted;

      self.occupied &= shifted;
      self.unoccupied = !self.occupied;
   }

   fn add_piece(&mut self, color: usize, piece: usize, index: u8) {
      let shifted = 1 << index;

      self.pieces[color][piece] |= shifted;
      self.all_pieces[color] |= shifted;
      if piece != KING {
         self.attackable[color] |= shifted;
      }

      self.occupied |= shifted;
      self.unoccupied = !self.occupied;
   }

   fn piece_at(&self, index: u8) -> Option<(Color, Piece)> {
      let shifted = 1 << index;
      if self.occupied & shifted == 0 {
         return None;
      }
      let color = if self.all_pieces[WHITE] & shifted != 0 { Color::White } else { Color::Black };
      PIECES
         .iter()
         .find(|p| self.pieces[color.as_num()][p.as_num()] & shifted != 0)
         .map(|p| (color, *p))
   }
}

// ----

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Position {
   pub squares: Board,
   pub white_kingside_castle: bool,
   pub white_queenside_castle: bool,
   pub black_kingside_castle: bool,
   pub black_queenside_castle: bool,
   pub en_passant_square: u64,
   pub side_to_move: Color,
}

impl Position {
   pub fn piece_at(&self, square: u8) -> Option<(Color, Piece)> {
      self.squares.piece_at(square)
   }

   /// Whether `a_move` lands on an enemy piece, including en passant
   pub fn is_capture(&self, a_move: Move) -> bool {
      let mover = match self.piece_at(a_move.origin) {
         Some((color, _)) => color,
         None => return false,
      };
      if self.squares.all_pieces[(!mover).as_num()] & (1 << a_move.destination) != 0 {
         return true;
      }
      self.is_en_passant(a_move)
   }

   /// Piece taken by `a_move`, if any. En passant always takes a pawn.
   pub fn captured_piece(&self, a_move: Move) -> Option<Piece> {
      match self.piece_at(a_move.destination) {
         Some((color, piece)) if Some(color) != self.piece_at(a_move.origin).map(|x| x.0) => Some(piece),
         Some(_) => None,
         None if self.is_en_passant(a_move) => Some(Piece::Pawn),
         None => None,
      }
   }

   fn is_en_passant(&self, a_move: Move) -> bool {
      matches!(self.piece_at(a_move.origin), Some((_, Piece::Pawn)))
         && (1 << a_move.destination) == self.en_passant_square
         && a_move.origin % 8 != a_move.destination % 8
   }

   /// A king stepping two files is how castling is spelled in UCI
   pub fn is_castling(&self, a_move: Move) -> bool {
      matches!(self.piece_at(a_move.origin), Some((_, Piece::King)))
         && (a_move.origin % 8).abs_diff(a_move.destination % 8) == 2
   }

   fn apply_move(&mut self, a_move: Move) {
      let (mover, moved_piece) = match self.piece_at(a_move.origin) {
         Some(x) => x,
         None => return,
      };
      let piece_color = mover.as_num();
      let piece_kind = moved_piece.as_num();

      let destination_piece = self.piece_at(a_move.destination);

      // Piece movement
      {
         self.squares.remove_piece(piece_color, piece_kind, a_move.origin);

         if let Some((captured_color, captured)) = destination_piece {
            self.squares.remove_piece(captured_color.as_num(), captured.as_num(), a_move.destination);
         }

         let landing = a_move.promotion.map(|p| p.piece().as_num()).unwrap_or(piece_kind);
         self.squares.add_piece(piece_color, landing, a_move.destination);
      }

      // If king moved, do castling rook movement (potentially) and revoke castling rights (always)
      // If pawn moved, do en-passant checking
      let old_eps = self.en_passant_square;
      self.en_passant_square = 0;
      match (piece_color, piece_kind) {
         (WHITE, KING) => {
            self.white_kingside_castle = false;
            self.white_queenside_castle = false;
            if a_move.origin == 4 && a_move.destination == 2 {
               self.squares.remove_piece(WHITE, ROOK, 0);
               self.squares.add_piece(WHITE, ROOK, 3);
            } else if a_move.origin == 4 && a_move.destination == 6 {
               self.squares.remove_piece(WHITE, ROOK, 7);
               self.squares.add_piece(WHITE, ROOK, 5);
            }
         }
         (BLACK, KING) => {
            self.black_kingside_castle = false;
            self.black_queenside_castle = false;
            if a_move.origin == 60 && a_move.destination == 62 {
               self.squares.remove_piece(BLACK, ROOK, 63);
               self.squares.add_piece(BLACK, ROOK, 61);
            } else if a_move.origin == 60 && a_move.destination == 58 {
               self.squares.remove_piece(BLACK, ROOK, 56);
               self.squares.add_piece(BLACK, ROOK, 59);
            }
         }
         (WHITE, PAWN) => {
            if a_move.destination.wrapping_sub(a_move.origin) == 16 {
               self.en_passant_square = 1 << (a_move.origin + 8);
            } else if (1 << a_move.destination) == old_eps {
               self.squares.remove_piece(BLACK, PAWN, a_move.destination - 8);
            }
         }
         (BLACK, PAWN) => {
            if a_move.origin.wrapping_sub(a_move.destination) == 16 {
               self.en_passant_square = 1 << (a_move.origin - 8);
            } else if (1 << a_move.destination) == old_eps {
               self.squares.remove_piece(WHITE, PAWN, a_move.destination + 8);
            }
         }
         _ => {}
      }

      // Revoke castling rights if a rook moved or was captured
      for square in [a_move.origin, a_move.destination] {
         match square {
            0 => self.white_queenside_castle = false,
            7 => self.white_kingside_castle = false,
            56 => self.black_queenside_castle = false,
            63 => self.black_kingside_castle = false,
            _ => {}
         }
      }

      self.side_to_move = !self.side_to_move;
   }

   pub fn gen_moves_color(&self, color: Color, do_check_checking: bool) -> Vec<Move> {
      let mut results = Vec::with_capacity(128);
      let c = color.as_num();
      pawn_movegen(self, color, &mut results);
      king_movegen(self, c, &mut results);
      castling_movegen(self, color, &mut results);
      knight_movegen(self, c, &mut results);
      bishop_movegen(self, c, &mut results);
      rook_movegen(self, c, &mut results);
      queen_movegen(self, c, &mut results);

      if do_check_checking {
         results.retain(|x| {
            let mut cb = self.clone();
            cb.apply_move(*x);
            !cb.in_check(color)
         });
      }

      results
   }

   pub fn in_check(&self, color: Color) -> bool {
      let king = self.squares.pieces[color.as_num()][KING];
      if king == 0 {
         return false;
      }
      self.square_is_attacked(color, king.trailing_zeros() as usize)
   }

   pub fn square_is_attacked(&self, defender: Color, square: usize) -> bool {
      self.attackers(square, !defender) != 0
   }

   /// Bitboard of every `attacker` piece that attacks `square`
   pub fn attackers(&self, square: usize, attacker: Color) -> u64 {
      let a = attacker.as_num();
      let defender = (!attacker).as_num();
      let pieces = &self.squares.pieces[a];

      let bishops_and_queens = pieces[BISHOP] | pieces[QUEEN];
      let rooks_and_queens = pieces[ROOK] | pieces[QUEEN];

      (PAWN_ATTACKS[defender][square] & pieces[PAWN])
         | (KNIGHT_ATTACKS[square] & pieces[KNIGHT])
         | (KING_ATTACKS[square] & pieces[KING])
         | (bishop_attacks(self, square) & bishops_and_queens)
         | (rook_attacks(self, square) & rooks_and_queens)
   }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct State {
   pub position: Position,
   pub prior_positions: SmallVec<[Position; 8]>,
   pub halfmove_clock: u64,
   pub fullmove_number: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move {
   pub origin: u8,
   pub destination: u8,
   pub promotion: Option<PromotionTarget>,
}

impl fmt::Display for Move {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      write_square(self.origin, f)?;
      write_square(self.destination, f)?;
      if let Some(promotion) = self.promotion {
         write!(f, "{}", promotion)?;
      }
      Ok(())
   }
}

impl Serialize for Move {
   fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
      serializer.collect_str(self)
   }
}

impl FromStr for Move {
   type Err = String;

   fn from_str(s: &str) -> Result<Move, String> {
      if s.len() < 4 || s.len() > 5 || !s.is_ascii() {
         return Err(format!(
            "A full move has to be 4-5 ASCII bytes long, got a move ({}) that was {} bytes long",
            s,
            s.len()
         ));
      }
      let promotion = match s.get(4..5) {
         Some(target) => Some(target.parse::<PromotionTarget>()?),
         None => None,
      };
      Ok(Move {
         origin: algebraic_to_index(&s[..2])?,
         destination: algebraic_to_index(&s[2..4])?,
         promotion,
      })
   }
}

fn write_square<W: Write>(index: u8, f: &mut W) -> fmt::Result {
   let file = (b'a' + index % 8) as char;
   write!(f, "{}{}", file, (index / 8) + 1)
}

/// `28` -> `"e4"`
pub fn square_name(index: u8) -> String {
   let mut name = String::with_capacity(2);
   let _ = write_square(index, &mut name);
   name
}

pub fn algebraic_to_index(algebraic: &str) -> Result<u8, String> {
   let bytes = algebraic.as_bytes();
   if bytes.len() != 2 {
      return Err(format!("{} not a valid algebraic location; wrong length", algebraic));
   }
   let col = match bytes[0] {
      file @ b'a'..=b'h' => file - b'a',
      file => return Err(format!("{} is not a valid algebraic file, expected a..=h", file as char)),
   };
   let row = match bytes[1] {
      rank @ b'1'..=b'8' => rank - b'1',
      rank => return Err(format!("{} is not a valid algebraic rank, expected 1..=8", rank as char)),
   };
   Ok((row * 8) + col)
}

impl State {
   #[cfg(test)]
   pub fn from_moves(moves: &str) -> Result<State, String> {
      State::from_start().apply_moves_from_uci(moves)
   }

   pub fn from_start() -> State {
      State::from_fen(START_FEN).expect("start position FEN is valid")
   }

   pub fn side_to_move(&self) -> Color {
      self.position.side_to_move
   }

   pub fn apply_moves_from_uci(&self, moves: &str) -> Result<State, String> {
      let mut state = self.clone();
      for a_move in moves.split_whitespace() {
         state = state.try_apply_move(a_move.parse()?)?;
      }
      Ok(state)
   }

   /// Applies `a_move` only if it is in the legal-move set
   pub fn try_apply_move(&self, a_move: Move) -> Result<State, String> {
      if !self.gen_moves().contains(&a_move) {
         return Err(format!("{} is not a legal move in this position", a_move));
      }
      Ok(self.apply_move(a_move))
   }

   #[must_use]
   pub fn apply_move(&self, a_move: Move) -> State {
      let is_capture = (self.position.squares.occupied & (1 << a_move.destination)) != 0;
      let is_pawn_move = ((self.position.squares.pieces[WHITE][PAWN] | self.position.squares.pieces[BLACK][PAWN])
         & (1 << a_move.origin))
         != 0;
      let (new_halfmove_clock, new_prior_positions) = if is_capture | is_pawn_move {
         (0, SmallVec::new())
      } else {
         let mut npp = self.prior_positions.clone();
         npp.push(self.position.clone());
         (self.halfmove_clock + 1, npp)
      };

      let mut new_position = self.position.clone();
      new_position.apply_move(a_move);

      let fullmove_number = if self.position.side_to_move == Color::Black {
         self.fullmove_number + 1
      } else {
         self.fullmove_number
      };

      State {
         halfmove_clock: new_halfmove_clock,
         position: new_position,
         prior_positions: new_prior_positions,
         fullmove_number,
      }
   }

   pub fn gen_moves(&self) -> Vec<Move> {
      self.position.gen_moves_color(self.position.side_to_move, true)
   }

   pub fn is_check(&self) -> bool {
      self.position.in_check(self.position.side_to_move)
   }

   pub fn is_checkmate(&self) -> bool {
      self.is_check() && self.gen_moves().is_empty()
   }

   pub fn is_stalemate(&self) -> bool {
      !self.is_check() && self.gen_moves().is_empty()
   }

   pub fn is_game_over(&self) -> bool {
      self.status(&self.gen_moves()) != GameStatus::Ongoing
   }

   pub fn from_fen(fen: &str) -> Result<State, String> {
      let mut board = Board::empty();
      let fen_sections: Vec<&str> = fen.split_whitespace().collect();
      if fen_sections.len() != 6 {
         return Err(format!(
            "malformed FEN; expected 6 whitespace delimited sections, found {}",
            fen_sections.len()
         ));
      }

      let ranks: Vec<&str> = fen_sections[0].split('/').collect();
      if ranks.len() != 8 {
         return Err(format!("malformed FEN; expected 8 ranks, found {}", ranks.len()));
      }
      for (i, rank) in ranks.iter().enumerate() {
         let rank_start = (7 - i as u8) * 8;
         let mut file: u8 = 0;
         for ascii_char in rank.bytes() {
            if file >= 8 {
               return Err(format!("malformed FEN; rank {} describes more than 8 squares", 8 - i));
            }
            match ascii_char {
               b'1'..=b'8' => file += ascii_char - b'0',
               _ => match Piece::from_symbol(ascii_char) {
                  Some((color, piece)) => {
                     board.pieces[color.as_num()][piece.as_num()] |= 1 << (rank_start + file);
                     file += 1;
                  }
                  None => {
                     return Err(format!("malformed FEN; got unexpected byte {} (ASCII: {}) during piece placement, expecting one of ASCII pbnrqkPBNRQK12345678/", ascii_char, ascii_char as char));
                  }
               },
            }
         }
         if file != 8 {
            return Err(format!("malformed FEN; rank {} does not account for exactly 8 squares", 8 - i));
         }
      }

      let side_to_move = match fen_sections[1] {
         "w" => Color::White,
         "b" => Color::Black,
         other => {
            return Err(format!(
               "malformed FEN; got unexpected {} parsing player to move. Expecting one of ASCII wb",
               other
            ));
         }
      };

      let castling = fen_sections[2];
      if castling.len() > 4 {
         return Err(format!(
            "malformed FEN; castling rights section shouldn't be longer than 4 bytes or less than 1, found {}",
            castling.len()
         ));
      }
      let mut rights = [false; 4];
      if castling != "-" {
         for ascii_char in castling.bytes() {
            let slot = match ascii_char {
               b'K' => 0,
               b'Q' => 1,
               b'k' => 2,
               b'q' => 3,
               _ => {
                  return Err(format!(
                     "malformed FEN; found byte {} (ASCII: {}) when parsing castling rights. Expected one of ASCII KQkq",
                     ascii_char, ascii_char as char
                  ));
               }
            };
            if rights[slot] {
               return Err(format!(
                  "malformed FEN; encountered castling right {} twice",
                  ascii_char as char
               ));
            }
            rights[slot] = true;
         }
      }

      let en_passant_square = match fen_sections[3] {
         "-" => 0,
         algebraic => match algebraic_to_index(algebraic) {
            Ok(index) => 1 << index,
            Err(e) => {
               return Err(format!(
                  "malformed FEN; en passant square was not valid algebraic notation: {}",
                  e
               ));
            }
         },
      };

      let halfmove_clock: u64 = fen_sections[4].parse().map_err(|e| {
         format!(
            "malformed FEN; halfmove clock value {} couldn't be parsed as a number: {}",
            fen_sections[4], e
         )
      })?;
      let fullmove_number: u64 = fen_sections[5].parse().map_err(|e| {
         format!(
            "malformed FEN; fullmove number {} couldn't be parsed as a number: {}",
            fen_sections[5], e
         )
      })?;

      board.update_derived_bitboards();

      Ok(State {
         position: Position {
            squares: board,
            white_kingside_castle: rights[0],
            white_queenside_castle: rights[1],
            black_kingside_castle: rights[2],
            black_queenside_castle: rights[3],
            en_passant_square,
            side_to_move,
         },
         prior_positions: SmallVec::new(),
         halfmove_clock,
         fullmove_number,
      })
   }

   pub fn to_fen(&self) -> String {
      let mut buf = String::with_capacity(90);
      for rank in (0..8u8).rev() {
         let mut empty = 0;
         for file in 0..8u8 {
            match self.position.piece_at(rank * 8 + file) {
               Some((color, piece)) => {
                  if empty > 0 {
                     let _ = write!(buf, "{}", empty);
                     empty = 0;
                  }
                  let symbol = piece.symbol();
                  buf.push(if color == Color::White { symbol.to_ascii_uppercase() } else { symbol });
               }
               None => empty += 1,
            }
         }
         if empty > 0 {
            let _ = write!(buf, "{}", empty);
         }
         if rank > 0 {
            buf.push('/');
         }
      }

      buf.push(' ');
      buf.push(match self.position.side_to_move {
         Color::White => 'w',
         Color::Black => 'b',
      });

      buf.push(' ');
      let rights = [
         (self.position.white_kingside_castle, 'K'),
         (self.position.white_queenside_castle, 'Q'),
         (self.position.black_kingside_castle, 'k'),
         (self.position.black_queenside_castle, 'q'),
      ];
      let castling: String = rights.iter().filter(|x| x.0).map(|x| x.1).collect();
      if castling.is_empty() {
         buf.push('-');
      } else {
         buf.push_str(&castling);
      }

      buf.push(' ');
      if self.position.en_passant_square == 0 {
         buf.push('-');
      } else {
         buf.push_str(&square_name(self.position.en_passant_square.trailing_zeros() as u8));
      }

      let _ = write!(buf, " {} {}", self.halfmove_clock, self.fullmove_number);
      buf
   }

   pub fn status(&self, moves: &[Move]) -> GameStatus {
      if self.prior_positions.iter().filter(|x| **x == self.position).count() >= 2 {
         return GameStatus::Draw;
      }

      if moves.is_empty() && !self.position.in_check(self.position.side_to_move) {
         return GameStatus::Draw;
      }

      if !moves.is_empty() && self.halfmove_clock >= 100 {
         return GameStatus::Draw;
      }

      if moves.is_empty() {
         return GameStatus::Victory(!self.position.side_to_move);
      }

      GameStatus::Ongoing
   }
}

#[derive(Debug, PartialEq, Eq)]
pub enum GameStatus {
   Draw,
   Victory(Color),
   Ongoing,
}

fn pop_lsb(board: &mut u64) -> u32 {
   debug_assert!(*board != 0);
   let lsb_index = board.trailing_zeros();
   *board &= *board - 1;
   lsb_index
}

fn push_pawn_moves(origin_offset: i8, mut targets: u64, promotion_rank: u64, results: &mut Vec<Move>) {
   while targets > 0 {
      let to = pop_lsb(&mut targets) as u8;
      let origin = (to as i8 - origin_offset) as u8;
      if (1 << to) & promotion_rank != 0 {
         for target in PROMOTION_TARGETS {
            results.push(Move {
               origin,
               destination: to,
               promotion: Some(target),
            });
         }
      } else {
         results.push(Move {
            origin,
            destination: to,
            promotion: None,
         });
      }
   }
}

fn pawn_movegen(cur_position: &Position, color: Color, results: &mut Vec<Move>) {
   let squares = &cur_position.squares;
   let pawns = squares.pieces[color.as_num()][PAWN];
   let enemies = squares.attackable[(!color).as_num()] | cur_position.en_passant_square;

   // shift forward by n ranks, toward the opponent
   let forward = |bb: u64, n: u32| match color {
      Color::White => bb << (8 * n),
      Color::Black => bb >> (8 * n),
   };
   let (direction, double_push_rank, promotion_rank) = match color {
      Color::White => (8i8, RANK_4, RANK_8),
      Color::Black => (-8i8, RANK_5, RANK_1),
   };

   let single_pushes = forward(pawns, 1) & squares.unoccupied;
   push_pawn_moves(direction, single_pushes, promotion_rank, results);

   let double_pushes = forward(single_pushes, 1) & squares.unoccupied & double_push_rank;
   push_pawn_moves(direction * 2, double_pushes, 0, results);

   // toward the a-file, then toward the h-file
   let left = forward(pawns & !FILE_A, 1) >> 1;
   let right = forward(pawns & !FILE_H, 1) << 1;
   push_pawn_moves(direction - 1, left & enemies, promotion_rank, results);
   push_pawn_moves(direction + 1, right & enemies, promotion_rank, results);
}

fn castling_movegen(cur_position: &Position, color: Color, results: &mut Vec<Move>) {
   let (kingside, queenside, king_square) = match color {
      Color::White => (cur_position.white_kingside_castle, cur_position.white_queenside_castle, 4u8),
      Color::Black => (cur_position.black_kingside_castle, cur_position.black_queenside_castle, 60u8),
   };
   let king_home = cur_position.squares.pieces[color.as_num()][KING] & (1 << king_square) != 0;
   if (!kingside && !queenside) || !king_home || cur_position.in_check(color) {
      return;
   }
   let occupied = cur_position.squares.occupied;
   let safe = |offset: u8| !cur_position.square_is_attacked(color, (king_square + offset) as usize);
   let safe_left = |offset: u8| !cur_position.square_is_attacked(color, (king_square - offset) as usize);

   let kingside_path: u64 = (1 << (king_square + 1)) | (1 << (king_square + 2));
   if kingside && occupied & kingside_path == 0 && safe(1) && safe(2) {
      results.push(Move {
         origin: king_square,
         destination: king_square + 2,
         promotion: None,
      });
   }

   let queenside_path: u64 = (1 << (king_square - 1)) | (1 << (king_square - 2)) | (1 << (king_square - 3));
   if queenside && occupied & queenside_path == 0 && safe_left(1) && safe_left(2) {
      results.push(Move {
         origin: king_square,
         destination: king_square - 2,
         promotion: None,
      });
   }
}

fn king_movegen(cur_position: &Position, color: usize, results: &mut Vec<Move>) {
   let king_position = cur_position.squares.pieces[color][KING];
   if king_position == 0 {
      return;
   }

   let king_index = king_position.trailing_zeros();
   let moves = KING_ATTACKS[king_index as usize] & !cur_position.squares.all_pieces[color];
   add_moves(cur_position, color, king_index as u8, moves, results);
}

fn knight_movegen(cur_position: &Position, color: usize, results: &mut Vec<Move>) {
   let mut knights = cur_position.squares.pieces[color][KNIGHT];
   while knights > 0 {
      let origin = pop_lsb(&mut knights);
      let moves = KNIGHT_ATTACKS[origin as usize] & !cur_position.squares.all_pieces[color];
      add_moves(cur_position, color, origin as u8, moves, results);
   }
}

fn positive_ray_attack(direction: usize, square: usize, blockers: u64) -> u64 {
   let mut attacks = RAYS[direction][square];
   let blocked = attacks & blockers;

   let block_square = blocked.trailing_zeros();
   attacks ^= RAYS[direction][block_square as usize];

   attacks
}

fn negative_ray_attack(direction: usize, square: usize, blockers: u64) -> u64 {
   let mut attacks = RAYS[direction][square];
   let blocked = attacks & blockers;

   if blocked > 0 {
      let block_square = blocked.leading_zeros() ^ 63;
      attacks ^= RAYS[direction][block_square as usize];
   }

   attacks
}

fn bishop_attacks(cur_position: &Position, square: usize) -> u64 {
   let occupied = cur_position.squares.occupied;
   positive_ray_attack(NORTH_WEST, square, occupied)
      | positive_ray_attack(NORTH_EAST, square, occupied)
      | negative_ray_attack(SOUTH_WEST, square, occupied)
      | negative_ray_attack(SOUTH_EAST, square, occupied)
}

fn rook_attacks(cur_position: &Position, square: usize) -> u64 {
   let occupied = cur_position.squares.occupied;
   positive_ray_attack(NORTH, square, occupied)
      | positive_ray_attack(EAST, square, occupied)
      | negative_ray_attack(SOUTH, square, occupied)
      | negative_ray_attack(WEST, square, occupied)
}

fn slider_movegen(
   cur_position: &Position,
   color: usize,
   mut sliders: u64,
   attacks: fn(&Position, usize) -> u64,
   results: &mut Vec<Move>,
) {
   while sliders > 0 {
      let origin = pop_lsb(&mut sliders);
      let moves = attacks(cur_position, origin as usize) & !cur_position.squares.all_pieces[color];
      add_moves(cur_position, color, origin as u8, moves, results);
   }
}

fn bishop_movegen(cur_position: &Position, color: usize, results: &mut Vec<Move>) {
   let bishops = cur_position.squares.pieces[color][BISHOP];
   slider_movegen(cur_position, color, bishops, bishop_attacks, results);
}

fn rook_movegen(cur_position: &Position, color: usize, results: &mut Vec<Move>) {
   let rooks = cur_position.squares.pieces[color][ROOK];
   slider_movegen(cur_position, color, rooks, rook_attacks, results);
}

fn queen_movegen(cur_position: &Position, color: usize, results: &mut Vec<Move>) {
   let queens = cur_position.squares.pieces[color][QUEEN];
   slider_movegen(
      cur_position,
      color,
      queens,
      |p, sq| bishop_attacks(p, sq) | rook_attacks(p, sq),
      results,
   );
}

fn add_moves(cur_position: &Position, color: usize, origin: u8, mut moves: u64, results: &mut Vec<Move>) {
   moves &= !(cur_position.squares.pieces[color ^ 1][KING]);

   while moves > 0 {
      let to = pop_lsb(&mut moves);
      results.push(Move {
         origin,
         destination: to as u8,
         promotion: None,
      });
   }
}

#[cfg(test)]
mod tests {
   use crate::board::*;

   fn sorted_uci(moves: &[Move]) -> Vec<String> {
      let mut v: Vec<String> = moves.iter().map(|m| m.to_string()).collect();
      v.sort();
      v
   }

   #[test]
   fn algebraic_to_index_conversions() {
      assert_eq!(algebraic_to_index("a8"), Ok(56));
      assert_eq!(algebraic_to_index("e4"), Ok(28));
      assert_eq!(algebraic_to_index("e2"), Ok(12));
      assert_eq!(algebraic_to_index("h1"), Ok(7));
      assert!(algebraic_to_index("i1").is_err());
      assert!(algebraic_to_index("a9").is_err());
      assert_eq!(square_name(28), "e4");
   }

   #[test]
   fn algebraic_to_moves() {
      assert_eq!(
         "e2e4".parse::<Move>(),
         Ok(Move {
            origin: 12,
            destination: 28,
            promotion: None
         })
      );
      assert_eq!(
         "a7a8q".parse::<Move>(),
         Ok(Move {
            origin: 48,
            destination: 56,
            promotion: Some(PromotionTarget::Queen)
         })
      );
      assert_eq!(
         "a7a8n".parse::<Move>().map(|m| m.promotion),
         Ok(Some(PromotionTarget::Knight))
      );
      assert!("e2".parse::<Move>().is_err());
      assert!("e2e4x".parse::<Move>().is_err());
      assert!("é2e4".parse::<Move>().is_err());
   }

   #[test]
   fn moves_display_as_uci() {
      for text in ["e2e4", "a1h8", "h7h8q", "b2b1n"] {
         assert_eq!(text.parse::<Move>().unwrap().to_string(), text);
      }
   }

   #[test]
   fn parses_valid_fen_ok() {
      let fens = include_str!("../tests/positions.fen");
      for fen in fens.lines().filter(|l| !l.trim().is_empty()) {
         let state = State::from_fen(fen);
         assert!(state.is_ok(), "{}: {:?}", fen, state.err());
      }
   }

   #[test]
   fn fen_round_trips_through_state() {
      let fens = include_str!("../tests/positions.fen");
      for fen in fens.lines().filter(|l| !l.trim().is_empty()) {
         assert_eq!(State::from_fen(fen).unwrap().to_fen(), fen.trim());
      }
   }

   #[test]
   fn rejects_malformed_fen() {
      assert!(State::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1").is_err());
      assert!(State::from_fen("rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_err());
      assert!(State::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1").is_err());
      assert!(State::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KKkq - 0 1").is_err());
      assert!(State::from_fen("not a fen").is_err());
   }

   #[test]
   fn fen_tracks_move_counters() {
      let state = State::from_moves("e2e4 e7e5 g1f3").unwrap();
      assert_eq!(state.to_fen(), "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2");
   }

   #[test]
   fn movegen_test() {
      let mut a = State::from_start();
      assert_eq!(a.gen_moves().len(), 20);
      a = a.apply_move("e2e4".parse().unwrap());
      assert_eq!(a.gen_moves().len(), 20);
      a = State::from_moves("g2g4 e7e5").unwrap();
      assert_eq!(a.gen_moves().len(), 21); // -1 because no 2 move pawn, +2 because bishop is free
   }

   #[test]
   fn queen_moves_along_both_lines() {
      let a = State::from_fen("4k3/8/8/8/3Q4/8/8/4K3 w - - 0 1").unwrap();
      let queen_moves = a.gen_moves().iter().filter(|m| m.origin == 27).count();
      assert_eq!(queen_moves, 27);
   }

   #[test]
   fn king_movegen_test() {
      let mut a = State::from_fen("8/5k2/8/8/2K5/8/8/8 w - - 0 1").unwrap();
      assert_eq!(a.gen_moves().len(), 8);
      a = a.apply_move("c4c5".parse().unwrap());
      assert_eq!(a.gen_moves().len(), 8);
   }

   #[test]
   fn capture_promotions_are_generated() {
      let a = State::from_fen("1n2k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
      let moves = sorted_uci(&a.gen_moves());
      for expected in ["a7a8q", "a7a8n", "a7b8q", "a7b8r"] {
         assert!(moves.contains(&expected.to_string()), "missing {}", expected);
      }
      let b = State::from_fen("4k3/8/8/8/8/8/7p/4K1N1 b - - 0 1").unwrap();
      let moves = sorted_uci(&b.gen_moves());
      assert!(moves.contains(&"h2g1q".to_string()));
      assert!(moves.contains(&"h2h1r".to_string()));
   }

   #[test]
   fn castling_moves_the_rook() {
      let a = State::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
      let moves = sorted_uci(&a.gen_moves());
      assert!(moves.contains(&"e1g1".to_string()));
      assert!(moves.contains(&"e1c1".to_string()));

      let castled = a.apply_move("e1g1".parse().unwrap());
      assert_eq!(castled.position.piece_at(5), Some((Color::White, Piece::Rook)));
      assert_eq!(castled.position.piece_at(6), Some((Color::White, Piece::King)));
      assert!(!castled.position.white_kingside_castle);
      assert!(!castled.position.white_queenside_castle);
      assert!(castled.position.black_kingside_castle);
   }

   #[test]
   fn rook_moves_revoke_castling() {
      let a = State::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
      let a = a.apply_move("a1a8".parse().unwrap());
      assert!(!a.position.white_queenside_castle);
      assert!(!a.position.black_queenside_castle);
      assert!(a.position.white_kingside_castle);
      assert!(a.position.black_kingside_castle);
   }

   #[test]
   fn castling_through_check_is_illegal() {
      let a = State::from_fen("4kr2/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
      assert!(!sorted_uci(&a.gen_moves()).contains(&"e1g1".to_string()));
   }

   #[test]
   fn en_passant_square() {
      let mut a = State::from_moves("e2e4").unwrap().position;
      assert_eq!(a.en_passant_square, 1 << algebraic_to_index("e3").unwrap());
      a = State::from_moves("e2e4 e7e5").unwrap().position;
      assert_eq!(a.en_passant_square, 1 << algebraic_to_index("e6").unwrap());
   }

   #[test]
   fn en_passant_capture_removes_pawn() {
      let a = State::from_moves("e2e4 a7a6 e4e5 d7d5").unwrap();
      let ep: Move = "e5d6".parse().unwrap();
      assert!(a.gen_moves().contains(&ep));
      assert!(a.position.is_capture(ep));
      assert_eq!(a.position.captured_piece(ep), Some(Piece::Pawn));
      let b = a.apply_move(ep);
      assert_eq!(b.position.piece_at(algebraic_to_index("d5").unwrap()), None);
   }

   #[test]
   fn is_in_check_works() {
      let mut a = State::from_moves("e2e4").unwrap().position;
      assert!(!a.in_check(Color::White));
      assert!(!a.in_check(Color::Black));
      a = State::from_moves("e2e4 e7e5 d1h5 a7a6 h5f7").unwrap().position;
      assert!(!a.in_check(Color::White));
      assert!(a.in_check(Color::Black));
      a = State::from_moves("a2a4 e7e5 a4a5 d7d5 a5a6 b7a6 b2b4 e5e4 c2c3 d5d4 c3d4 d8d4 e2e3 d4d2")
         .unwrap()
         .position;
      assert!(a.in_check(Color::White));
      assert!(!a.in_check(Color::Black));
   }

   #[test]
   fn pawn_seventh_check_bug() {
      let a = State::from_moves("g2g3 d7d5 g1f3 d5d4 h1g1 b8c6 g1h1 c8g4 f1g2 e7e5 h1f1 e5e4 f3h4 e4e3 h2h3 e3d2")
         .unwrap()
         .position;
      assert!(a.in_check(Color::White));
   }

   #[test]
   fn attackers_lists_every_attacker() {
      // d6 pawn and d7 knight both hit e5
      let a = State::from_fen("4k3/3n4/3p4/4P3/8/8/8/4K3 w - - 0 1").unwrap();
      let e5 = algebraic_to_index("e5").unwrap() as usize;
      let attackers = a.position.attackers(e5, Color::Black);
      assert_eq!(attackers.count_ones(), 2);
      assert_eq!(a.position.attackers(e5, Color::White), 0);
   }

   #[test]
   fn checkmate_no_moves() {
      let game = State::from_fen("2b1kr2/4Qp2/8/pP1Np2p/3P4/3BP3/PP3PPP/R3K2R b KQ - 1 19").unwrap();
      assert!(game.gen_moves().is_empty());
      assert!(game.is_checkmate());
      assert!(game.is_game_over());
      assert_eq!(game.status(&game.gen_moves()), GameStatus::Victory(Color::White));
   }

   #[test]
   fn stalemate_is_a_draw() {
      let game = State::from_fen("k7/8/1Q6/8/8/8/8/1K6 b - - 0 1").unwrap();
      assert!(game.is_stalemate());
      assert!(!game.is_checkmate());
      assert_eq!(game.status(&game.gen_moves()), GameStatus::Draw);
   }

   #[test]
   fn try_apply_rejects_illegal_moves() {
      let a = State::from_start();
      assert!(a.try_apply_move("e2e5".parse().unwrap()).is_err());
      assert!(a.try_apply_move("e7e5".parse().unwrap()).is_err());
      let b = a.try_apply_move("e2e4".parse().unwrap()).unwrap();
      assert_eq!(b.side_to_move(), Color::Black);
      assert!(a == State::from_start());
   }
}
